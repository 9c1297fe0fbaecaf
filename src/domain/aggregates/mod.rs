//! Aggregates module
pub mod quote;
pub mod checkout;

pub use quote::{EventInput, Quote, QuoteEngine};
pub use checkout::{submit_checkout, CheckoutError, CheckoutGateway, CheckoutSession, CheckoutSessionRequest, CustomerMetadata};
