//! Payment provider capabilities and selection.
//!
//! Providers are described by narrow capability traits (payout,
//! name-enquiry, exchange-rate); the registry holds ordered lists per
//! capability and picks by support. Everything behind these traits is
//! mocked — real SDK integrations live outside this core.

pub mod mock;

use crate::error::AppError;
use crate::money::{Currency, Money};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;

pub use mock::{CurrencyCloudProvider, DLocalProvider};

/// Destination bank account for a payout.
#[derive(Debug, Clone)]
pub struct BankDestination {
    pub bank_name: Option<String>,
    pub bank_code: String,
    pub account_number: String,
    pub account_name: Option<String>,
    pub currency: Currency,
}

#[derive(Debug, Clone)]
pub struct PayoutRequest {
    pub amount: Money,
    pub destination: BankDestination,
    /// Provisional reference pre-generated by the caller so a crash mid-call
    /// still has something to correlate on. Providers may echo it or issue
    /// their own.
    pub provider_ref: Option<String>,
    pub transaction_id: String,
}

#[derive(Debug, Clone)]
pub struct PayoutResponse {
    /// Filled in by the registry from the selected provider.
    pub provider_name: String,
    pub provider_ref: String,
    pub status: String,
}

#[derive(Debug, Clone)]
pub struct NameEnquiryOutcome {
    pub account_name: String,
    pub currency: Currency,
}

#[async_trait]
pub trait PayoutProvider: Send + Sync {
    fn name(&self) -> &'static str;
    fn supports_currency(&self, currency: Currency) -> bool;
    async fn send_payout(&self, req: &PayoutRequest) -> Result<PayoutResponse, AppError>;
}

#[async_trait]
pub trait NameEnquiryProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn name_enquiry(
        &self,
        account_number: &str,
        bank_code: &str,
    ) -> Result<NameEnquiryOutcome, AppError>;
}

#[async_trait]
pub trait ExchangeRateProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn exchange_rate(&self, from: Currency, to: Currency) -> Result<Decimal, AppError>;
}

/// Ordered provider registry. Payouts select the first provider supporting
/// the currency; name-enquiry and FX use the first registered.
#[derive(Default)]
pub struct ProviderRegistry {
    payout: Vec<Arc<dyn PayoutProvider>>,
    name_enquiry: Vec<Arc<dyn NameEnquiryProvider>>,
    exchange_rate: Vec<Arc<dyn ExchangeRateProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_payout(&mut self, provider: Arc<dyn PayoutProvider>) {
        self.payout.push(provider);
    }

    pub fn register_name_enquiry(&mut self, provider: Arc<dyn NameEnquiryProvider>) {
        self.name_enquiry.push(provider);
    }

    pub fn register_exchange_rate(&mut self, provider: Arc<dyn ExchangeRateProvider>) {
        self.exchange_rate.push(provider);
    }

    pub fn select_payout(&self, currency: Currency) -> Result<Arc<dyn PayoutProvider>, AppError> {
        self.payout
            .iter()
            .find(|p| p.supports_currency(currency))
            .cloned()
            .ok_or_else(|| {
                AppError::internal(format!("no payout provider available for currency: {currency}"))
            })
    }

    pub async fn send_payout(&self, req: &PayoutRequest) -> Result<PayoutResponse, AppError> {
        let provider = self.select_payout(req.amount.currency)?;
        let mut resp = provider.send_payout(req).await?;
        resp.provider_name = provider.name().to_string();
        Ok(resp)
    }

    pub async fn name_enquiry(
        &self,
        account_number: &str,
        bank_code: &str,
    ) -> Result<NameEnquiryOutcome, AppError> {
        let provider = self
            .name_enquiry
            .first()
            .ok_or_else(|| AppError::internal("no name enquiry providers available"))?;

        provider.name_enquiry(account_number, bank_code).await
    }

    pub async fn exchange_rate(&self, from: Currency, to: Currency) -> Result<Decimal, AppError> {
        let provider = self
            .exchange_rate
            .first()
            .ok_or_else(|| AppError::internal("no exchange rate providers available"))?;

        provider.exchange_rate(from, to).await
    }
}

/// Wire up the default (mock) provider set, in selection order.
pub fn setup_registry() -> ProviderRegistry {
    let currency_cloud = Arc::new(CurrencyCloudProvider::new());
    let dlocal = Arc::new(DLocalProvider::new());

    let mut registry = ProviderRegistry::new();

    registry.register_payout(currency_cloud.clone());
    registry.register_payout(dlocal.clone());

    registry.register_name_enquiry(currency_cloud.clone());
    registry.register_name_enquiry(dlocal.clone());

    registry.register_exchange_rate(currency_cloud);
    registry.register_exchange_rate(dlocal);

    registry
}
