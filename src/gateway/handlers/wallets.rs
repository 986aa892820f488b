//! Wallet listing for the authenticated caller.

use super::super::middleware::AuthUser;
use super::super::state::AppState;
use super::super::types::{ok, WalletResponse};
use crate::error::AppError;
use crate::wallet;
use axum::extract::State;
use axum::response::Response;
use axum::Extension;
use std::sync::Arc;

pub async fn get_user_wallets(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Response, AppError> {
    let mut conn = state.pool.acquire().await?;
    let wallets = wallet::user_wallets(&mut conn, &user.0).await?;

    let response: Vec<WalletResponse> = wallets.iter().map(WalletResponse::from).collect();
    Ok(ok(response, "wallets retrieved successfully"))
}
