//! Provider webhook ingress.
//!
//! Minimal validation, then straight onto the webhook queue carrying the raw
//! body. Losing a job here is recoverable because providers re-send their
//! webhooks, so this path may enqueue directly instead of via the outbox.

use super::super::state::AppState;
use super::super::types::{ok, validation_failed, WebhookRequest};
use crate::error::AppError;
use crate::queue::{JobType, WebhookJobPayload};
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::response::Response;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct WebhookQuery {
    pub reference: Option<String>,
}

pub async fn receive_webhook(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
    Query(query): Query<WebhookQuery>,
    body: Bytes,
) -> Result<Response, AppError> {
    let request: WebhookRequest = serde_json::from_slice(&body)
        .map_err(|_| AppError::bad_request("invalid webhook payload"))?;

    if request.event_type.is_empty() {
        let mut errors = BTreeMap::new();
        errors.insert("event_type", "is required");
        return Ok(validation_failed(errors));
    }

    // Reference may arrive in the query string or the body.
    let reference = query
        .reference
        .filter(|s| !s.is_empty())
        .or_else(|| request.reference.clone().filter(|s| !s.is_empty()))
        .ok_or_else(|| AppError::bad_request("provider reference is required"))?;

    let raw_payload: serde_json::Value = serde_json::from_slice(&body)
        .map_err(|_| AppError::bad_request("invalid webhook payload"))?;

    let payload = WebhookJobPayload {
        provider_name: provider.clone(),
        event_type: request.event_type.clone(),
        provider_reference: reference,
        transaction_id: request.transaction_id.clone(),
        payload: raw_payload,
    };

    let value = serde_json::to_value(&payload)
        .map_err(|e| AppError::internal(format!("marshal webhook payload: {e}")))?;

    state.queue.enqueue(JobType::Webhook, value).await?;

    tracing::info!(
        provider = %provider,
        event_type = %request.event_type,
        "webhook accepted and queued"
    );

    Ok(ok((), "webhook accepted"))
}
