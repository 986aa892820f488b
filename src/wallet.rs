//! Wallet and bank-account stores.
//!
//! Every function takes a `&mut PgConnection` so the same call composes
//! inside a transaction (`&mut *tx`) or against a pooled connection.
//! Balance-mutating paths must go through the locking variants; the plain
//! getters never block.

use crate::error::AppError;
use crate::money::Currency;
use chrono::{DateTime, Utc};
use sqlx::PgConnection;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Wallet {
    pub id: String,
    pub user_id: String,
    pub bank_account_id: Option<String>,
    pub currency: String,
    pub balance: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BankAccount {
    pub id: String,
    pub user_id: String,
    pub bank_name: String,
    pub bank_code: String,
    pub account_number: String,
    pub account_name: Option<String>,
    pub currency: String,
    pub provider: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Wallet joined with its bank-account descriptor, for listings.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WalletWithBankAccount {
    pub id: String,
    pub currency: String,
    pub balance: i64,
    pub account_number: Option<String>,
    pub bank_name: Option<String>,
    pub account_name: Option<String>,
    pub provider: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const WALLET_COLUMNS: &str =
    "id, user_id, bank_account_id, currency, balance, created_at, updated_at";

pub async fn get_by_id(conn: &mut PgConnection, wallet_id: &str) -> Result<Wallet, AppError> {
    let wallet = sqlx::query_as::<_, Wallet>(&format!(
        "SELECT {WALLET_COLUMNS} FROM wallets_tb WHERE id = $1"
    ))
    .bind(wallet_id)
    .fetch_optional(&mut *conn)
    .await?;

    wallet.ok_or_else(|| AppError::not_found("wallet not found"))
}

pub async fn get_by_user_and_currency(
    conn: &mut PgConnection,
    user_id: &str,
    currency: Currency,
) -> Result<Option<Wallet>, AppError> {
    let wallet = sqlx::query_as::<_, Wallet>(&format!(
        "SELECT {WALLET_COLUMNS} FROM wallets_tb WHERE user_id = $1 AND currency = $2"
    ))
    .bind(user_id)
    .bind(currency.as_str())
    .fetch_optional(&mut *conn)
    .await?;

    Ok(wallet)
}

pub async fn get_by_bank_account(
    conn: &mut PgConnection,
    bank_account_id: &str,
) -> Result<Option<Wallet>, AppError> {
    let wallet = sqlx::query_as::<_, Wallet>(&format!(
        "SELECT {WALLET_COLUMNS} FROM wallets_tb WHERE bank_account_id = $1"
    ))
    .bind(bank_account_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(wallet)
}

/// Take a row lock on a wallet for the duration of the caller's transaction.
pub async fn lock_for_update(
    conn: &mut PgConnection,
    wallet_id: &str,
) -> Result<Wallet, AppError> {
    let wallet = sqlx::query_as::<_, Wallet>(&format!(
        "SELECT {WALLET_COLUMNS} FROM wallets_tb WHERE id = $1 FOR UPDATE"
    ))
    .bind(wallet_id)
    .fetch_optional(&mut *conn)
    .await?;

    wallet.ok_or_else(|| AppError::not_found("wallet not found"))
}

pub async fn lock_by_user_and_currency(
    conn: &mut PgConnection,
    user_id: &str,
    currency: Currency,
) -> Result<Wallet, AppError> {
    let wallet = sqlx::query_as::<_, Wallet>(&format!(
        "SELECT {WALLET_COLUMNS} FROM wallets_tb \
         WHERE user_id = $1 AND currency = $2 FOR UPDATE"
    ))
    .bind(user_id)
    .bind(currency.as_str())
    .fetch_optional(&mut *conn)
    .await?;

    wallet.ok_or_else(|| AppError::not_found("wallet not found"))
}

/// Lock two wallets, always acquiring in ascending id order. This is the
/// lock-ordering invariant that keeps opposed transfers on the same wallet
/// pair from deadlocking. Returns `(first, second)` in the order requested.
pub async fn lock_pair(
    conn: &mut PgConnection,
    first_id: &str,
    second_id: &str,
) -> Result<(Wallet, Wallet), AppError> {
    if first_id <= second_id {
        let first = lock_for_update(conn, first_id).await?;
        let second = lock_for_update(conn, second_id).await?;
        Ok((first, second))
    } else {
        let second = lock_for_update(conn, second_id).await?;
        let first = lock_for_update(conn, first_id).await?;
        Ok((first, second))
    }
}

/// Write the cached balance mirror. Must only be called inside the same
/// transaction as the ledger entries it reflects.
pub async fn update_balance(
    conn: &mut PgConnection,
    wallet_id: &str,
    balance: i64,
) -> Result<(), AppError> {
    sqlx::query("UPDATE wallets_tb SET balance = $1, updated_at = NOW() WHERE id = $2")
        .bind(balance)
        .bind(wallet_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// All wallets for a user, joined with their bank-account descriptors.
pub async fn user_wallets(
    conn: &mut PgConnection,
    user_id: &str,
) -> Result<Vec<WalletWithBankAccount>, AppError> {
    let wallets = sqlx::query_as::<_, WalletWithBankAccount>(
        r#"
        SELECT w.id, w.currency, w.balance,
               b.account_number, b.bank_name, b.account_name, b.provider,
               w.created_at, w.updated_at
        FROM wallets_tb w
        LEFT JOIN bank_accounts_tb b ON w.bank_account_id = b.id
        WHERE w.user_id = $1
        ORDER BY w.currency
        "#,
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(wallets)
}

/// Resolve a bank account by its external routing key.
pub async fn get_bank_account_by_routing(
    conn: &mut PgConnection,
    account_number: &str,
    bank_code: &str,
) -> Result<Option<BankAccount>, AppError> {
    let account = sqlx::query_as::<_, BankAccount>(
        r#"
        SELECT id, user_id, bank_name, bank_code, account_number, account_name,
               currency, provider, created_at, updated_at
        FROM bank_accounts_tb
        WHERE account_number = $1 AND bank_code = $2
        "#,
    )
    .bind(account_number)
    .bind(bank_code)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(account)
}
