pub mod relay;
pub mod store;

pub use relay::OutboxRelay;
pub use store::{OutboxEntry, MAX_RELAY_RETRIES};
