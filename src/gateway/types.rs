//! Request/response DTOs and the HTTP error mapping.
//!
//! The wire speaks decimal major units; everything behind the DTO boundary
//! is integer minor units. Error categories map onto status codes here and
//! nowhere else.

use crate::error::AppError;
use crate::money::{Currency, Money};
use crate::payment::{NameEnquiryResult, Transaction};
use crate::wallet::WalletWithBankAccount;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::str::FromStr;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::DuplicateKey(_) => StatusCode::CONFLICT,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            AppError::CacheMiss(_)
            | AppError::Database(_)
            | AppError::Queue(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(category = self.category(), error = %self, "request failed");
            let body = json!({"message": "internal error", "detail": self.to_string()});
            return (status, Json(body)).into_response();
        }

        let body = json!({"message": self.to_string()});
        (status, Json(body)).into_response()
    }
}

/// Field-level validation failure, rendered as
/// `{"message": "Validation failed", "errors": {field: reason}}`.
pub fn validation_failed(errors: BTreeMap<&'static str, &'static str>) -> Response {
    let body = json!({"message": "Validation failed", "errors": errors});
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}

#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

pub fn ok<T: Serialize>(data: T, message: &str) -> Response {
    (
        StatusCode::OK,
        Json(Envelope {
            message: message.to_string(),
            data: Some(data),
        }),
    )
        .into_response()
}

pub fn created<T: Serialize>(data: T, message: &str) -> Response {
    (
        StatusCode::CREATED,
        Json(Envelope {
            message: message.to_string(),
            data: Some(data),
        }),
    )
        .into_response()
}

// ============================================================================
// Requests
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct AmountRequest {
    pub amount: Decimal,
    pub currency: String,
}

impl AmountRequest {
    pub fn to_money(&self) -> Result<Money, AppError> {
        let currency = Currency::from_str(&self.currency)
            .map_err(|_| AppError::bad_request("invalid currency"))?;
        Ok(Money::from_major_units(self.amount, currency)?)
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateInternalTransferRequest {
    pub from_currency: String,
    pub to_account_number: String,
    pub to_bank_code: String,
    pub amount: AmountRequest,
}

#[derive(Debug, Deserialize)]
pub struct CreateExternalTransferRequest {
    pub from_currency: String,
    pub to_account_number: String,
    pub to_bank_code: String,
    pub amount: AmountRequest,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmTransactionRequest {
    pub pin: String,
}

#[derive(Debug, Deserialize)]
pub struct NameEnquiryRequest {
    pub account_number: String,
    pub bank_code: String,
}

#[derive(Debug, Deserialize)]
pub struct WebhookRequest {
    pub event_type: String,
    pub reference: Option<String>,
    pub transaction_id: Option<String>,
    pub status: Option<String>,
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    pub id: String,
    pub idempotency_key: String,
    pub from_wallet_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_wallet_id: Option<String>,
    #[serde(rename = "type")]
    pub tx_type: String,
    /// Major units.
    pub amount: Decimal,
    pub currency: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange_rate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Transaction> for TransactionResponse {
    fn from(t: &Transaction) -> Self {
        Self {
            id: t.id.clone(),
            idempotency_key: t.idempotency_key.clone(),
            from_wallet_id: t.from_wallet_id.clone(),
            to_wallet_id: t.to_wallet_id.clone(),
            tx_type: t.tx_type.as_str().to_string(),
            amount: Money::to_major_units(t.amount),
            currency: t.currency.clone(),
            status: t.status.as_str().to_string(),
            provider_name: t.provider_name.clone(),
            provider_reference: t.provider_reference.clone(),
            exchange_rate: t.exchange_rate.clone(),
            failure_reason: t.failure_reason.clone(),
            created_at: t.created_at,
            updated_at: t.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TransactionHistoryResponse {
    pub transactions: Vec<TransactionResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WalletResponse {
    pub id: String,
    pub currency: String,
    /// Major units.
    pub balance: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&WalletWithBankAccount> for WalletResponse {
    fn from(w: &WalletWithBankAccount) -> Self {
        Self {
            id: w.id.clone(),
            currency: w.currency.clone(),
            balance: Money::to_major_units(w.balance),
            account_number: w.account_number.clone(),
            bank_name: w.bank_name.clone(),
            account_name: w.account_name.clone(),
            provider: w.provider.clone(),
            created_at: w.created_at,
            updated_at: w.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ExchangeRateResponse {
    pub from_currency: String,
    pub to_currency: String,
    pub rate: Decimal,
}

#[derive(Debug, Serialize)]
pub struct NameEnquiryResponse {
    pub account_name: String,
    pub is_internal: bool,
    pub currency: String,
}

impl From<&NameEnquiryResult> for NameEnquiryResponse {
    fn from(r: &NameEnquiryResult) -> Self {
        Self {
            account_name: r.account_name.clone(),
            is_internal: r.is_internal,
            currency: r.currency.as_str().to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TestUserResponse {
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub pin: String,
    pub wallets: Vec<WalletResponse>,
}
