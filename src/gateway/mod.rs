//! HTTP gateway.
//!
//! Thin collaborator layer: routing, DTO validation, identity/trace
//! middleware, and status-code mapping. All payment semantics live in the
//! engine.

pub mod handlers;
pub mod middleware;
pub mod state;
pub mod types;

use axum::middleware as axum_middleware;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;

pub use state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    // Webhook ingress and test fixtures carry no caller identity.
    let open_routes = Router::new()
        .route("/webhooks/{provider}", post(handlers::webhooks::receive_webhook))
        .route("/test/users", get(handlers::test_users::get_test_users));

    let protected_routes = Router::new()
        .route("/exchange-rate", get(handlers::payments::get_exchange_rate))
        .route("/wallets", get(handlers::wallets::get_user_wallets))
        .route(
            "/transactions",
            get(handlers::payments::get_transaction_history),
        )
        .route(
            "/payments/internal",
            post(handlers::payments::create_internal_transfer),
        )
        .route(
            "/payments/external",
            post(handlers::payments::create_external_transfer),
        )
        .route(
            "/payments/{id}/confirm",
            post(handlers::payments::confirm_transaction),
        )
        .route("/payments/{id}", get(handlers::payments::get_transaction))
        .route("/name-enquiry", post(handlers::name_enquiry::name_enquiry))
        .route_layer(axum_middleware::from_fn(middleware::require_user_id));

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .nest("/api", open_routes.merge(protected_routes))
        .layer(axum_middleware::from_fn(middleware::trace_id_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until shutdown is signalled.
pub async fn run_server(
    state: Arc<AppState>,
    port: u16,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let app = build_router(state);

    let addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "payment processing service listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.changed().await;
        })
        .await?;

    Ok(())
}
