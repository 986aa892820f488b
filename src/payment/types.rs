//! Transaction model and lifecycle types.

use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::Row;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Internal,
    External,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Internal => "internal",
            TransactionType::External => "external",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "internal" => Ok(TransactionType::Internal),
            "external" => Ok(TransactionType::External),
            other => Err(format!("invalid transaction type: {other}")),
        }
    }
}

/// Lifecycle states. Transitions are monotonic:
/// `initiated -> {pending, failed}`, `pending -> {completed, failed}`;
/// `completed` and `failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Initiated,
    Pending,
    Completed,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Initiated => "initiated",
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TransactionStatus::Completed | TransactionStatus::Failed)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initiated" => Ok(TransactionStatus::Initiated),
            "pending" => Ok(TransactionStatus::Pending),
            "completed" => Ok(TransactionStatus::Completed),
            "failed" => Ok(TransactionStatus::Failed),
            other => Err(format!("invalid transaction status: {other}")),
        }
    }
}

/// A payment transaction row.
///
/// `amount` and `currency` describe the destination side in minor units.
/// `exchange_rate` is the rate locked at initiation, stored as a decimal
/// string with 8 fractional digits. While the transaction is `initiated`,
/// external transfers park the recipient routing JSON in
/// `provider_reference`; the payout worker overwrites it with the real
/// provider reference.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub id: String,
    pub idempotency_key: String,
    pub trace_id: Option<String>,
    pub from_wallet_id: String,
    pub to_wallet_id: Option<String>,
    pub tx_type: TransactionType,
    pub amount: i64,
    pub currency: String,
    pub status: TransactionStatus,
    pub provider_name: Option<String>,
    pub provider_reference: Option<String>,
    pub exchange_rate: Option<String>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Map a database row to a [`Transaction`], rejecting rows with unknown
/// type or status tags.
pub fn row_to_transaction(row: &PgRow) -> Result<Transaction, AppError> {
    let type_str: String = row.get("type");
    let tx_type = type_str
        .parse::<TransactionType>()
        .map_err(AppError::Internal)?;

    let status_str: String = row.get("status");
    let status = status_str
        .parse::<TransactionStatus>()
        .map_err(AppError::Internal)?;

    Ok(Transaction {
        id: row.get("id"),
        idempotency_key: row.get("idempotency_key"),
        trace_id: row.get("trace_id"),
        from_wallet_id: row.get("from_wallet_id"),
        to_wallet_id: row.get("to_wallet_id"),
        tx_type,
        amount: row.get("amount"),
        currency: row.get("currency"),
        status,
        provider_name: row.get("provider_name"),
        provider_reference: row.get("provider_reference"),
        exchange_rate: row.get("exchange_rate"),
        failure_reason: row.get("failure_reason"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
