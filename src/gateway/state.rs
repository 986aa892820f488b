//! Shared state handed to every request handler.

use crate::payment::PaymentEngine;
use crate::providers::ProviderRegistry;
use crate::queue::JobQueue;
use sqlx::PgPool;
use std::sync::Arc;

pub struct AppState {
    pub pool: PgPool,
    pub engine: PaymentEngine,
    pub queue: Arc<dyn JobQueue>,
    pub providers: Arc<ProviderRegistry>,
}

impl AppState {
    pub fn new(
        pool: PgPool,
        engine: PaymentEngine,
        queue: Arc<dyn JobQueue>,
        providers: Arc<ProviderRegistry>,
    ) -> Self {
        Self {
            pool,
            engine,
            queue,
            providers,
        }
    }
}
