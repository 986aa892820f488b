//! Request middleware: trusted user identity and trace propagation.

use crate::error::AppError;
use axum::extract::Request;
use axum::http::{HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

pub const USER_ID_HEADER: &str = "X-User-ID";
pub const TRACE_ID_HEADER: &str = "X-Trace-ID";

/// Authenticated caller identity, supplied by a trusted upstream.
#[derive(Debug, Clone)]
pub struct AuthUser(pub String);

/// Request-scoped correlation id, accepted from the client or generated,
/// echoed on the response, and embedded into async job payloads.
#[derive(Debug, Clone)]
pub struct TraceId(pub String);

pub async fn trace_id_middleware(mut req: Request, next: Next) -> Response {
    let trace_id = req
        .headers()
        .get(TRACE_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    req.extensions_mut().insert(TraceId(trace_id.clone()));

    let mut res = next.run(req).await;

    if let Ok(value) = HeaderValue::from_str(&trace_id) {
        res.headers_mut()
            .insert(HeaderName::from_static("x-trace-id"), value);
    }

    res
}

/// Reject requests without a caller identity. Applied to all `/api` routes
/// except the webhook ingress and test endpoints.
pub async fn require_user_id(mut req: Request, next: Next) -> Result<Response, AppError> {
    let user_id = req
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .ok_or_else(|| AppError::unauthorized("X-User-ID header is required"))?;

    req.extensions_mut().insert(AuthUser(user_id));
    Ok(next.run(req).await)
}
