//! Account name resolution.

use super::super::state::AppState;
use super::super::types::{ok, validation_failed, NameEnquiryRequest, NameEnquiryResponse};
use crate::error::AppError;
use axum::extract::State;
use axum::response::Response;
use axum::Json;
use std::collections::BTreeMap;
use std::sync::Arc;

pub async fn name_enquiry(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NameEnquiryRequest>,
) -> Result<Response, AppError> {
    let mut errors = BTreeMap::new();
    if req.account_number.is_empty() {
        errors.insert("account_number", "is required");
    }
    if req.bank_code.is_empty() {
        errors.insert("bank_code", "is required");
    }
    if !errors.is_empty() {
        return Ok(validation_failed(errors));
    }

    let result = state
        .engine
        .enquire_account_name(&req.account_number, &req.bank_code)
        .await?;

    Ok(ok(
        NameEnquiryResponse::from(&result),
        "name enquiry completed successfully",
    ))
}
