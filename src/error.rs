//! Application error taxonomy.
//!
//! Domain code raises these categories directly; the gateway maps them to
//! HTTP status codes. The set is closed: anything that is not one of the
//! named client-facing categories is `internal` and surfaces as a 500.

use crate::money::MoneyError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    DuplicateKey(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotImplemented(String),

    #[error("cache miss: {0}")]
    CacheMiss(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("queue error: {0}")]
    Queue(#[from] redis::RedisError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        AppError::BadRequest(msg.into())
    }

    pub fn duplicate_key(msg: impl Into<String>) -> Self {
        AppError::DuplicateKey(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        AppError::Unauthorized(msg.into())
    }

    pub fn internal(err: impl std::fmt::Display) -> Self {
        AppError::Internal(err.to_string())
    }

    /// Category tag used in logs and error envelopes.
    pub fn category(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "not_found",
            AppError::BadRequest(_) => "bad_request",
            AppError::DuplicateKey(_) => "duplicate_key",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Forbidden(_) => "forbidden",
            AppError::NotImplemented(_) => "not_implemented",
            AppError::CacheMiss(_) => "cache_miss",
            AppError::Database(_) | AppError::Queue(_) | AppError::Internal(_) => "internal",
        }
    }

    /// True when the underlying database error is a unique-constraint
    /// violation. Idempotency-key races are resolved by re-reading on this.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            AppError::Database(e) => e
                .as_database_error()
                .map(|d| d.is_unique_violation())
                .unwrap_or(false),
            _ => false,
        }
    }
}

impl From<MoneyError> for AppError {
    fn from(err: MoneyError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Currency;

    #[test]
    fn categories_are_stable() {
        assert_eq!(AppError::not_found("x").category(), "not_found");
        assert_eq!(AppError::bad_request("x").category(), "bad_request");
        assert_eq!(AppError::duplicate_key("x").category(), "duplicate_key");
        assert_eq!(AppError::unauthorized("x").category(), "unauthorized");
        assert_eq!(AppError::Forbidden("x".into()).category(), "forbidden");
        assert_eq!(AppError::internal("boom").category(), "internal");
    }

    #[test]
    fn money_errors_become_bad_request() {
        let err: AppError = MoneyError::InsufficientFunds {
            available: 1,
            required: 2,
        }
        .into();
        assert_eq!(err.category(), "bad_request");

        let err: AppError = MoneyError::CurrencyMismatch(Currency::Usd, Currency::Eur).into();
        assert_eq!(err.category(), "bad_request");
    }

    #[test]
    fn non_database_errors_are_not_unique_violations() {
        assert!(!AppError::bad_request("x").is_unique_violation());
        assert!(!AppError::internal("x").is_unique_violation());
    }
}
