//! Opaque pagination cursor for transaction history.
//!
//! Encoded as URL-safe base64 over a small JSON document carrying the
//! `(created_at, id)` keyset position. Clients treat it as opaque.

use crate::error::AppError;
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub created_at: DateTime<Utc>,
    pub id: String,
}

pub fn encode_cursor(created_at: DateTime<Utc>, id: &str) -> String {
    let cursor = Cursor {
        created_at,
        id: id.to_string(),
    };
    // Serialization of this shape cannot fail.
    let data = serde_json::to_vec(&cursor).unwrap_or_default();
    URL_SAFE.encode(data)
}

/// Decode a client-supplied cursor. Empty input means "from the top".
pub fn decode_cursor(cursor: &str) -> Result<Option<Cursor>, AppError> {
    if cursor.is_empty() {
        return Ok(None);
    }

    let data = URL_SAFE
        .decode(cursor)
        .map_err(|_| AppError::bad_request("invalid cursor"))?;

    let cursor: Cursor =
        serde_json::from_slice(&data).map_err(|_| AppError::bad_request("invalid cursor"))?;

    Ok(Some(cursor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn roundtrip() {
        let at = Utc.with_ymd_and_hms(2024, 5, 17, 12, 30, 45).unwrap();
        let encoded = encode_cursor(at, "txn_abc");
        let decoded = decode_cursor(&encoded).unwrap().unwrap();
        assert_eq!(decoded.created_at, at);
        assert_eq!(decoded.id, "txn_abc");
    }

    #[test]
    fn empty_cursor_means_first_page() {
        assert!(decode_cursor("").unwrap().is_none());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(decode_cursor("not-base64!!!").is_err());

        // Valid base64 of invalid JSON
        let junk = URL_SAFE.encode(b"{\"nope\":true}");
        assert!(decode_cursor(&junk).is_err());
    }
}
