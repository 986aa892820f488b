//! Transaction row store.
//!
//! Runtime-checked queries against `transactions_tb`. Status updates are
//! monotonic; terminal rows are never rewritten back to live states by any
//! query here (the engine and workers gate on the current status before
//! calling in).

use super::types::{row_to_transaction, Transaction, TransactionStatus, TransactionType};
use crate::cursor::Cursor;
use crate::error::AppError;
use sqlx::PgConnection;

const TRANSACTION_COLUMNS: &str = "id, idempotency_key, trace_id, from_wallet_id, to_wallet_id, \
     type, amount, currency, status, provider_name, provider_reference, \
     exchange_rate, failure_reason, created_at, updated_at";

/// Parameters for inserting a new transaction row.
#[derive(Debug, Clone)]
pub struct NewTransaction<'a> {
    pub idempotency_key: &'a str,
    pub trace_id: Option<&'a str>,
    pub from_wallet_id: &'a str,
    pub to_wallet_id: Option<&'a str>,
    pub tx_type: TransactionType,
    pub amount: i64,
    pub currency: &'a str,
    pub status: TransactionStatus,
    pub exchange_rate: &'a str,
}

/// Insert a transaction. A unique-constraint violation on
/// `idempotency_key` surfaces as `AppError::Database`; callers detect it
/// with [`AppError::is_unique_violation`] and re-read.
pub async fn create(
    conn: &mut PgConnection,
    new: NewTransaction<'_>,
) -> Result<Transaction, AppError> {
    let row = sqlx::query(&format!(
        "INSERT INTO transactions_tb \
            (idempotency_key, trace_id, from_wallet_id, to_wallet_id, type, \
             amount, currency, status, exchange_rate) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
         RETURNING {TRANSACTION_COLUMNS}"
    ))
    .bind(new.idempotency_key)
    .bind(new.trace_id)
    .bind(new.from_wallet_id)
    .bind(new.to_wallet_id)
    .bind(new.tx_type.as_str())
    .bind(new.amount)
    .bind(new.currency)
    .bind(new.status.as_str())
    .bind(new.exchange_rate)
    .fetch_one(&mut *conn)
    .await?;

    row_to_transaction(&row)
}

pub async fn get_by_id(
    conn: &mut PgConnection,
    transaction_id: &str,
) -> Result<Option<Transaction>, AppError> {
    let row = sqlx::query(&format!(
        "SELECT {TRANSACTION_COLUMNS} FROM transactions_tb WHERE id = $1"
    ))
    .bind(transaction_id)
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(row_to_transaction).transpose()
}

pub async fn get_by_idempotency_key(
    conn: &mut PgConnection,
    idempotency_key: &str,
) -> Result<Option<Transaction>, AppError> {
    let row = sqlx::query(&format!(
        "SELECT {TRANSACTION_COLUMNS} FROM transactions_tb WHERE idempotency_key = $1"
    ))
    .bind(idempotency_key)
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(row_to_transaction).transpose()
}

pub async fn update_status(
    conn: &mut PgConnection,
    transaction_id: &str,
    status: TransactionStatus,
) -> Result<(), AppError> {
    sqlx::query("UPDATE transactions_tb SET status = $1, updated_at = NOW() WHERE id = $2")
        .bind(status.as_str())
        .bind(transaction_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Record provider outcome (or park recipient routing in
/// `provider_reference` while `initiated`).
pub async fn update_provider(
    conn: &mut PgConnection,
    transaction_id: &str,
    provider_name: Option<&str>,
    provider_reference: &str,
    status: TransactionStatus,
) -> Result<(), AppError> {
    sqlx::query(
        "UPDATE transactions_tb \
         SET provider_name = $1, provider_reference = $2, status = $3, updated_at = NOW() \
         WHERE id = $4",
    )
    .bind(provider_name)
    .bind(provider_reference)
    .bind(status.as_str())
    .bind(transaction_id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn update_failure(
    conn: &mut PgConnection,
    transaction_id: &str,
    reason: &str,
) -> Result<(), AppError> {
    sqlx::query(
        "UPDATE transactions_tb \
         SET status = $1, failure_reason = $2, updated_at = NOW() \
         WHERE id = $3",
    )
    .bind(TransactionStatus::Failed.as_str())
    .bind(reason)
    .bind(transaction_id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Insert the idempotency-key record. Runs inside the same transaction as
/// the balance mutation it guards; a unique violation here aborts the whole
/// money movement.
pub async fn create_idempotency_key(
    conn: &mut PgConnection,
    key: &str,
    transaction_id: &str,
) -> Result<(), AppError> {
    sqlx::query("INSERT INTO idempotency_keys_tb (key, transaction_id) VALUES ($1, $2)")
        .bind(key)
        .bind(transaction_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Keyset-paginated history for a user's wallets, newest first. Fetches
/// exactly `limit` rows; the caller passes `limit + 1` to probe for a next
/// page.
pub async fn list_by_user(
    conn: &mut PgConnection,
    user_id: &str,
    cursor: Option<&Cursor>,
    limit: i64,
) -> Result<Vec<Transaction>, AppError> {
    let rows = match cursor {
        Some(cursor) => {
            sqlx::query(&format!(
                "SELECT {TRANSACTION_COLUMNS} FROM transactions_tb \
                 WHERE (from_wallet_id IN (SELECT id FROM wallets_tb WHERE user_id = $1) \
                     OR to_wallet_id IN (SELECT id FROM wallets_tb WHERE user_id = $1)) \
                   AND (created_at, id) < ($2, $3) \
                 ORDER BY created_at DESC, id DESC \
                 LIMIT $4"
            ))
            .bind(user_id)
            .bind(cursor.created_at)
            .bind(&cursor.id)
            .bind(limit)
            .fetch_all(&mut *conn)
            .await?
        }
        None => {
            sqlx::query(&format!(
                "SELECT {TRANSACTION_COLUMNS} FROM transactions_tb \
                 WHERE (from_wallet_id IN (SELECT id FROM wallets_tb WHERE user_id = $1) \
                     OR to_wallet_id IN (SELECT id FROM wallets_tb WHERE user_id = $1)) \
                 ORDER BY created_at DESC, id DESC \
                 LIMIT $2"
            ))
            .bind(user_id)
            .bind(limit)
            .fetch_all(&mut *conn)
            .await?
        }
    };

    rows.iter().map(row_to_transaction).collect()
}
