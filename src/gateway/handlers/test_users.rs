//! Seeded demo users, exposed for manual testing against a fresh deploy.

use super::super::state::AppState;
use super::super::types::{ok, TestUserResponse, WalletResponse};
use crate::error::AppError;
use crate::{user, wallet};
use axum::extract::State;
use axum::response::Response;
use std::sync::Arc;

const TEST_USER_IDS: [&str; 2] = ["user_1", "user_2"];
const TEST_PIN: &str = "1234";

pub async fn get_test_users(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let mut conn = state.pool.acquire().await?;

    let mut users = Vec::with_capacity(TEST_USER_IDS.len());
    for user_id in TEST_USER_IDS {
        let record = user::get_by_id(&mut conn, user_id).await?;
        let wallets = wallet::user_wallets(&mut conn, user_id).await?;

        users.push(TestUserResponse {
            user_id: record.id,
            name: record.name,
            pin: TEST_PIN.to_string(),
            wallets: wallets.iter().map(WalletResponse::from).collect(),
        });
    }

    Ok(ok(users, "test users retrieved successfully"))
}
