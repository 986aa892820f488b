//! Mock provider implementations.
//!
//! Simulate third-party payout/name-enquiry/FX APIs with small artificial
//! latencies and a fixed rate matrix. No network calls.

use super::{
    ExchangeRateProvider, NameEnquiryOutcome, NameEnquiryProvider, PayoutProvider, PayoutRequest,
    PayoutResponse,
};
use crate::error::AppError;
use crate::money::Currency;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::time::Duration;
use uuid::Uuid;

/// Fixed FX matrix shared by the mocks.
fn mock_rate(from: Currency, to: Currency) -> Result<Decimal, AppError> {
    if from == to {
        return Ok(Decimal::ONE);
    }

    // Rates expressed as destination per source unit.
    let rate = match (from, to) {
        (Currency::Usd, Currency::Eur) => Decimal::new(85, 2),  // 0.85
        (Currency::Usd, Currency::Gbp) => Decimal::new(75, 2),  // 0.75
        (Currency::Eur, Currency::Usd) => Decimal::new(118, 2), // 1.18
        (Currency::Eur, Currency::Gbp) => Decimal::new(88, 2),  // 0.88
        (Currency::Gbp, Currency::Usd) => Decimal::new(133, 2), // 1.33
        (Currency::Gbp, Currency::Eur) => Decimal::new(114, 2), // 1.14
        _ => return Err(AppError::internal(format!("unsupported currency pair: {from}->{to}"))),
    };

    Ok(rate)
}

fn echo_or_issue_reference(req: &PayoutRequest, prefix: &str) -> String {
    match &req.provider_ref {
        Some(provisional) => provisional.clone(),
        None => format!("{}-{}", prefix, Uuid::new_v4()),
    }
}

pub struct CurrencyCloudProvider;

impl CurrencyCloudProvider {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CurrencyCloudProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PayoutProvider for CurrencyCloudProvider {
    fn name(&self) -> &'static str {
        "CurrencyCloud"
    }

    fn supports_currency(&self, currency: Currency) -> bool {
        matches!(currency, Currency::Usd | Currency::Eur)
    }

    async fn send_payout(&self, req: &PayoutRequest) -> Result<PayoutResponse, AppError> {
        tokio::time::sleep(Duration::from_millis(30)).await;

        Ok(PayoutResponse {
            provider_name: String::new(),
            provider_ref: echo_or_issue_reference(req, "CC"),
            status: "pending".to_string(),
        })
    }
}

#[async_trait]
impl NameEnquiryProvider for CurrencyCloudProvider {
    fn name(&self) -> &'static str {
        "CurrencyCloud"
    }

    async fn name_enquiry(
        &self,
        account_number: &str,
        _bank_code: &str,
    ) -> Result<NameEnquiryOutcome, AppError> {
        tokio::time::sleep(Duration::from_millis(50)).await;

        let account_name = if account_number.len() < 4 {
            "Mock Account Holder".to_string()
        } else {
            let last_four = &account_number[account_number.len() - 4..];
            format!("Mock Account Holder {last_four}")
        };

        Ok(NameEnquiryOutcome {
            account_name,
            currency: Currency::Usd,
        })
    }
}

#[async_trait]
impl ExchangeRateProvider for CurrencyCloudProvider {
    fn name(&self) -> &'static str {
        "CurrencyCloud"
    }

    async fn exchange_rate(&self, from: Currency, to: Currency) -> Result<Decimal, AppError> {
        tokio::time::sleep(Duration::from_millis(30)).await;
        mock_rate(from, to)
    }
}

pub struct DLocalProvider;

impl DLocalProvider {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DLocalProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PayoutProvider for DLocalProvider {
    fn name(&self) -> &'static str {
        "DLocal"
    }

    fn supports_currency(&self, currency: Currency) -> bool {
        matches!(currency, Currency::Usd | Currency::Eur | Currency::Gbp)
    }

    async fn send_payout(&self, req: &PayoutRequest) -> Result<PayoutResponse, AppError> {
        tokio::time::sleep(Duration::from_millis(40)).await;

        Ok(PayoutResponse {
            provider_name: String::new(),
            provider_ref: echo_or_issue_reference(req, "DL"),
            status: "pending".to_string(),
        })
    }
}

#[async_trait]
impl NameEnquiryProvider for DLocalProvider {
    fn name(&self) -> &'static str {
        "DLocal"
    }

    async fn name_enquiry(
        &self,
        account_number: &str,
        _bank_code: &str,
    ) -> Result<NameEnquiryOutcome, AppError> {
        tokio::time::sleep(Duration::from_millis(40)).await;

        Ok(NameEnquiryOutcome {
            account_name: format!("DLocal Holder {account_number}"),
            currency: Currency::Gbp,
        })
    }
}

#[async_trait]
impl ExchangeRateProvider for DLocalProvider {
    fn name(&self) -> &'static str {
        "DLocal"
    }

    async fn exchange_rate(&self, from: Currency, to: Currency) -> Result<Decimal, AppError> {
        tokio::time::sleep(Duration::from_millis(40)).await;
        mock_rate(from, to)
    }
}
