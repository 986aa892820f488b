//! Double-entry ledger.
//!
//! Append-only record of every balance change. Debits are strictly
//! negative, credits strictly positive; the sign convention is enforced at
//! this interface so misuse fails fast instead of skewing the ledger. The
//! ledger sum is the balance authority; `wallets_tb.balance` is a mirror
//! updated by the payment engine in the same transaction.
//!
//! All operations require the caller to hold an open transaction on the
//! supplied connection.

use crate::error::AppError;
use crate::money::Currency;
use chrono::{DateTime, Utc};
use sqlx::PgConnection;

/// One leg of a transaction. `wallet_id` is NULL only for the external
/// counterparty leg of a payout.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LedgerEntry {
    pub id: String,
    pub wallet_id: Option<String>,
    pub transaction_id: String,
    pub amount: i64,
    pub currency: String,
    pub balance_before: i64,
    pub balance_after: i64,
    pub created_at: DateTime<Utc>,
}

/// Append a debit entry. Precondition: `amount < 0`.
pub async fn debit_entry(
    conn: &mut PgConnection,
    wallet_id: &str,
    transaction_id: &str,
    amount: i64,
    currency: Currency,
) -> Result<(), AppError> {
    if amount >= 0 {
        return Err(AppError::bad_request("debit amount must be negative"));
    }

    let balance_before = wallet_balance(conn, wallet_id, currency).await?;
    insert_entry(
        conn,
        Some(wallet_id),
        transaction_id,
        amount,
        currency,
        balance_before,
        balance_before + amount,
    )
    .await
}

/// Append a credit entry. Precondition: `amount > 0`.
pub async fn credit_entry(
    conn: &mut PgConnection,
    wallet_id: &str,
    transaction_id: &str,
    amount: i64,
    currency: Currency,
) -> Result<(), AppError> {
    if amount <= 0 {
        return Err(AppError::bad_request("credit amount must be positive"));
    }

    let balance_before = wallet_balance(conn, wallet_id, currency).await?;
    insert_entry(
        conn,
        Some(wallet_id),
        transaction_id,
        amount,
        currency,
        balance_before,
        balance_before + amount,
    )
    .await
}

/// Append the "money leaves the system" leg of an external payout: a credit
/// against the external counterparty pseudo-account (NULL wallet).
pub async fn external_counterparty_credit(
    conn: &mut PgConnection,
    transaction_id: &str,
    amount: i64,
    currency: Currency,
) -> Result<(), AppError> {
    if amount <= 0 {
        return Err(AppError::bad_request(
            "external counterparty credit amount must be positive",
        ));
    }

    insert_entry(conn, None, transaction_id, amount, currency, 0, amount).await
}

async fn insert_entry(
    conn: &mut PgConnection,
    wallet_id: Option<&str>,
    transaction_id: &str,
    amount: i64,
    currency: Currency,
    balance_before: i64,
    balance_after: i64,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO ledger_entries_tb
            (wallet_id, transaction_id, amount, currency, balance_before, balance_after)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(wallet_id)
    .bind(transaction_id)
    .bind(amount)
    .bind(currency.as_str())
    .bind(balance_before)
    .bind(balance_after)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Signed sum of all entries for a wallet. This is the balance authority.
pub async fn wallet_balance(
    conn: &mut PgConnection,
    wallet_id: &str,
    currency: Currency,
) -> Result<i64, AppError> {
    let balance: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(amount), 0)::BIGINT FROM ledger_entries_tb \
         WHERE wallet_id = $1 AND currency = $2",
    )
    .bind(wallet_id)
    .bind(currency.as_str())
    .fetch_one(&mut *conn)
    .await?;

    Ok(balance)
}

/// All entries belonging to a transaction, oldest first.
pub async fn entries_for_transaction(
    conn: &mut PgConnection,
    transaction_id: &str,
) -> Result<Vec<LedgerEntry>, AppError> {
    let entries = sqlx::query_as::<_, LedgerEntry>(
        r#"
        SELECT id, wallet_id, transaction_id, amount, currency,
               balance_before, balance_after, created_at
        FROM ledger_entries_tb
        WHERE transaction_id = $1
        ORDER BY created_at ASC, id ASC
        "#,
    )
    .bind(transaction_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(entries)
}
