pub mod engine;
pub mod store;
pub mod types;

pub use engine::{
    ExternalTransferRequest, InternalTransferRequest, NameEnquiryResult, PaymentEngine,
    TransactionHistory,
};
pub use types::{Transaction, TransactionStatus, TransactionType};
