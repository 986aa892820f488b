//! Payment endpoints: create, confirm, fetch, history, exchange rate.

use super::super::middleware::{AuthUser, TraceId};
use super::super::state::AppState;
use super::super::types::{
    created, ok, validation_failed, ConfirmTransactionRequest, CreateExternalTransferRequest,
    CreateInternalTransferRequest, ExchangeRateResponse, TransactionHistoryResponse,
    TransactionResponse,
};
use crate::error::AppError;
use crate::money::Currency;
use crate::payment::{ExternalTransferRequest, InternalTransferRequest, TransactionStatus};
use crate::pin;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use axum::{Extension, Json};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

fn idempotency_key(headers: &HeaderMap) -> Result<String, AppError> {
    headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .ok_or_else(|| AppError::bad_request("Idempotency-Key header is required"))
}

fn validate_transfer_fields(
    from_currency: &str,
    to_account_number: &str,
    to_bank_code: &str,
    amount_currency: &str,
) -> BTreeMap<&'static str, &'static str> {
    let mut errors = BTreeMap::new();

    if Currency::from_str(from_currency).is_err() {
        errors.insert("from_currency", "must be one of USD, EUR, GBP");
    }
    if to_account_number.is_empty() {
        errors.insert("to_account_number", "is required");
    }
    if to_bank_code.is_empty() {
        errors.insert("to_bank_code", "is required");
    }
    if Currency::from_str(amount_currency).is_err() {
        errors.insert("amount.currency", "must be one of USD, EUR, GBP");
    }

    errors
}

pub async fn create_internal_transfer(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Extension(trace): Extension<TraceId>,
    headers: HeaderMap,
    Json(req): Json<CreateInternalTransferRequest>,
) -> Result<Response, AppError> {
    let errors = validate_transfer_fields(
        &req.from_currency,
        &req.to_account_number,
        &req.to_bank_code,
        &req.amount.currency,
    );
    if !errors.is_empty() {
        return Ok(validation_failed(errors));
    }

    let idempotency_key = idempotency_key(&headers)?;
    let from_currency = Currency::from_str(&req.from_currency)
        .map_err(|_| AppError::bad_request("invalid from currency"))?;
    let to_amount = req.amount.to_money()?;

    let transaction = state
        .engine
        .create_internal_transfer(InternalTransferRequest {
            from_user_id: user.0,
            to_account_number: req.to_account_number,
            to_bank_code: req.to_bank_code,
            from_currency,
            to_amount,
            idempotency_key,
            trace_id: Some(trace.0),
        })
        .await?;

    let message = if transaction.status == TransactionStatus::Completed {
        "transfer completed successfully"
    } else {
        "transfer initiated, please confirm with PIN"
    };

    Ok(created(TransactionResponse::from(&transaction), message))
}

pub async fn create_external_transfer(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Extension(trace): Extension<TraceId>,
    headers: HeaderMap,
    Json(req): Json<CreateExternalTransferRequest>,
) -> Result<Response, AppError> {
    let errors = validate_transfer_fields(
        &req.from_currency,
        &req.to_account_number,
        &req.to_bank_code,
        &req.amount.currency,
    );
    if !errors.is_empty() {
        return Ok(validation_failed(errors));
    }

    let idempotency_key = idempotency_key(&headers)?;
    let from_currency = Currency::from_str(&req.from_currency)
        .map_err(|_| AppError::bad_request("invalid from currency"))?;
    let to_amount = req.amount.to_money()?;

    let transaction = state
        .engine
        .create_external_transfer(ExternalTransferRequest {
            from_user_id: user.0,
            to_account_number: req.to_account_number,
            to_bank_code: req.to_bank_code,
            from_currency,
            to_amount,
            idempotency_key,
            trace_id: Some(trace.0),
        })
        .await?;

    Ok(created(
        TransactionResponse::from(&transaction),
        "external transfer initiated, please confirm with PIN",
    ))
}

pub async fn confirm_transaction(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(transaction_id): Path<String>,
    Json(req): Json<ConfirmTransactionRequest>,
) -> Result<Response, AppError> {
    if !pin::is_valid_pin(&req.pin) {
        return Err(AppError::bad_request("PIN must be exactly 4 numeric digits"));
    }

    let transaction = state
        .engine
        .confirm_transaction(&transaction_id, &user.0, &req.pin)
        .await?;

    let message = if transaction.status == TransactionStatus::Completed {
        "transaction confirmed and completed successfully"
    } else {
        "transaction confirmed and queued for processing"
    };

    Ok(ok(TransactionResponse::from(&transaction), message))
}

pub async fn get_transaction(
    State(state): State<Arc<AppState>>,
    Path(transaction_id): Path<String>,
) -> Result<Response, AppError> {
    let transaction = state.engine.get_transaction(&transaction_id).await?;
    Ok(ok(
        TransactionResponse::from(&transaction),
        "transaction retrieved successfully",
    ))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub cursor: Option<String>,
    pub limit: Option<String>,
}

pub async fn get_transaction_history(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<HistoryQuery>,
) -> Result<Response, AppError> {
    let limit = match query.limit.as_deref() {
        None | Some("") => 20,
        Some(raw) => match raw.parse::<i64>() {
            Ok(parsed) if parsed > 0 => parsed,
            _ => return Err(AppError::bad_request("invalid limit parameter")),
        },
    };

    let history = state
        .engine
        .get_transaction_history(&user.0, query.cursor.as_deref().unwrap_or(""), limit)
        .await?;

    let response = TransactionHistoryResponse {
        transactions: history
            .transactions
            .iter()
            .map(TransactionResponse::from)
            .collect(),
        next_cursor: history.next_cursor,
    };

    Ok(ok(response, "transaction history retrieved successfully"))
}

#[derive(Debug, Deserialize)]
pub struct ExchangeRateQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

pub async fn get_exchange_rate(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ExchangeRateQuery>,
) -> Result<Response, AppError> {
    let from = query
        .from
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::bad_request("from currency parameter is required"))?;
    let to = query
        .to
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::bad_request("to currency parameter is required"))?;

    let from = Currency::from_str(from).map_err(|_| AppError::bad_request("invalid from currency"))?;
    let to = Currency::from_str(to).map_err(|_| AppError::bad_request("invalid to currency"))?;

    let rate = state.engine.exchange_rate(from, to).await?;

    Ok(ok(
        ExchangeRateResponse {
            from_currency: from.as_str().to_string(),
            to_currency: to.as_str().to_string(),
            rate,
        },
        "exchange rate retrieved successfully",
    ))
}
