//! Multi-currency payment processing service.
//!
//! Users hold per-currency wallets and move funds through internal
//! transfers (wallet to wallet) or external transfers (payout providers).
//! Monetary correctness is enforced by a double-entry ledger, single-
//! transaction balance mutation under row locks, client idempotency keys,
//! and a transactional outbox feeding the async payout pipeline.

pub mod config;
pub mod cursor;
pub mod db;
pub mod error;
pub mod gateway;
pub mod ledger;
pub mod logging;
pub mod money;
pub mod outbox;
pub mod payment;
pub mod pin;
pub mod providers;
pub mod queue;
pub mod user;
pub mod wallet;
pub mod workers;
