//! Ice Delivery Quote Engine
//!
//! Pricing core for an ice delivery storefront.
//!
//! ## Features
//! - Bag estimation from guests, hours and event type
//! - Volume discount tiers
//! - Delivery fees from a free zone or driving distance
//! - Last-request-wins live quotes
//! - Checkout hand-off that echoes the confirmed quote

pub mod config;
pub mod domain;
pub mod session;
pub mod telemetry;

pub use config::{ConfigError, EventMultipliers, PricingPolicy};
pub use domain::aggregates::{
    submit_checkout, CheckoutError, CheckoutGateway, CheckoutSession, CheckoutSessionRequest, CustomerMetadata,
    EventInput, Quote, QuoteEngine,
};
pub use domain::events::QuoteEvent;
pub use domain::services::{BagSizing, DeliveryResolution, Discount, DistanceLookup, LookupError};
pub use domain::value_objects::{BagCount, DeliveryAddress, EventType};
pub use session::{QuoteSession, Ticket};

use thiserror::Error;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum QuoteError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Delivery lookup error: {0}")]
    Lookup(#[from] LookupError),

    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),
}

pub type Result<T> = std::result::Result<T, QuoteError>;
