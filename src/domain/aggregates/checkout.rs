//! Checkout hand-off
//!
//! Checkout echoes a resolved quote; it never re-estimates bags or discounts.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use super::quote::{Quote, QuoteEngine};
use crate::domain::services::delivery::DistanceLookup;

/// Free-form customer fields forwarded to the payment provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct CustomerMetadata {
    #[validate(length(min = 1, max = 120))]
    pub customer_name: String,
    #[validate(email)]
    pub customer_email: String,
    #[validate(length(min = 7, max = 20))]
    pub customer_phone: String,
    #[serde(default)]
    #[validate(length(max = 120))]
    pub business_name: Option<String>,
    #[serde(default)]
    pub delivery_date: Option<NaiveDate>,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub delivery_instructions: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
pub struct CheckoutSessionRequest {
    #[validate(range(min = 1))]
    pub bags: u32,
    #[validate(length(min = 1))]
    pub delivery_address: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub delivery_fee: Decimal,
    #[validate(range(max = 100))]
    pub discount_percent: u8,
    #[serde(with = "rust_decimal::serde::float")]
    pub discount_amount: Decimal,
    #[validate]
    pub metadata: CustomerMetadata,
    /// Lets the backend drop a resubmitted request instead of opening a second order.
    pub idempotency_key: Uuid,
}

impl CheckoutSessionRequest {
    pub fn from_quote(quote: &Quote, metadata: CustomerMetadata) -> Result<Self, CheckoutError> {
        let delivery_fee = quote
            .delivery_fee()
            .ok_or_else(|| CheckoutError::ProvisionalQuote(quote.delivery_area_label().to_string()))?;

        let request = Self {
            bags: quote.bags().value(),
            delivery_address: quote.delivery_address().as_str().trim().to_string(),
            delivery_fee,
            discount_percent: quote.discount_percent(),
            discount_amount: quote.discount_amount(),
            metadata,
            idempotency_key: Uuid::new_v4(),
        };
        request.validate()?;
        Ok(request)
    }

    pub fn echoes(&self, quote: &Quote) -> bool {
        self.bags == quote.bags().value()
            && Some(self.delivery_fee) == quote.delivery_fee()
            && self.discount_percent == quote.discount_percent()
            && self.discount_amount == quote.discount_amount()
            && self.delivery_address == quote.delivery_address().as_str().trim()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub session_id: String,
    pub url: String,
}

/// Creates a hosted payment session and returns where to redirect the customer.
#[async_trait]
pub trait CheckoutGateway: Send + Sync {
    async fn create_session(&self, request: &CheckoutSessionRequest) -> anyhow::Result<CheckoutSession>;
}

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Delivery fee not determined yet: {0}")]
    ProvisionalQuote(String),

    #[error("Quote does not match current pricing")]
    PricingDrift,

    #[error("Invalid checkout request: {0}")]
    InvalidRequest(#[from] ValidationErrors),

    #[error("Checkout session could not be created: {0}")]
    Gateway(anyhow::Error),
}

/// Sends a prepared request for `quote`. Retrying with the same request reuses
/// its idempotency key.
pub async fn submit_checkout<L, G>(
    engine: &QuoteEngine<L>,
    gateway: &G,
    quote: &Quote,
    request: &CheckoutSessionRequest,
) -> Result<CheckoutSession, CheckoutError>
where
    L: DistanceLookup,
    G: CheckoutGateway + ?Sized,
{
    if !engine.verify(quote) || !request.echoes(quote) {
        return Err(CheckoutError::PricingDrift);
    }
    request.validate()?;
    let session = gateway.create_session(request).await.map_err(CheckoutError::Gateway)?;
    info!(
        session_id = %session.session_id,
        idempotency_key = %request.idempotency_key,
        bags = request.bags,
        "checkout session created"
    );
    Ok(session)
}
