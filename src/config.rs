//! Pricing policy
//!
//! Every business constant the engine uses lives here. Defaults are the
//! storefront's published prices; individual values can be overridden from
//! the environment (optionally via a `.env` file).

use rust_decimal::Decimal;
use std::{fmt::Display, str::FromStr, time::Duration};
use thiserror::Error;
use tracing::info;

use crate::domain::services::discount::DiscountSchedule;
use crate::domain::value_objects::EventType;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    InvalidValue { key: &'static str, value: String, reason: String },

    #[error("Invalid pricing policy: {0}")]
    Policy(String),
}

/// Pounds of ice per guest-hour are scaled by the kind of event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventMultipliers {
    pub party: Decimal,
    pub wedding: Decimal,
    pub restaurant: Decimal,
    pub bar: Decimal,
    pub corporate: Decimal,
    /// Used when no (or an unknown) event type was picked.
    pub fallback: Decimal,
}

impl EventMultipliers {
    pub fn for_event(&self, event_type: Option<EventType>) -> Decimal {
        match event_type {
            Some(EventType::Party) => self.party,
            Some(EventType::Wedding) => self.wedding,
            Some(EventType::Restaurant) => self.restaurant,
            Some(EventType::Bar) => self.bar,
            Some(EventType::Corporate) => self.corporate,
            None => self.fallback,
        }
    }
}

impl Default for EventMultipliers {
    fn default() -> Self {
        Self {
            party: Decimal::new(8, 1),
            wedding: Decimal::ONE,
            restaurant: Decimal::new(12, 1),
            bar: Decimal::new(15, 1),
            corporate: Decimal::new(7, 1),
            fallback: Decimal::new(8, 1),
        }
    }
}

#[derive(Clone, Debug)]
pub struct PricingPolicy {
    pub currency: String,
    pub price_per_bag: Decimal,
    pub bag_weight_lbs: Decimal,
    pub base_lbs_per_guest_hour: Decimal,
    pub event_multipliers: EventMultipliers,
    pub guests_per_bag: u32,
    pub checkout_discounts: DiscountSchedule,
    pub preview_discounts: DiscountSchedule,
    /// Lowercase substrings that put an address in the free delivery zone.
    pub free_zone_keywords: Vec<String>,
    pub free_zone_label: String,
    pub origin_label: String,
    pub min_address_len: usize,
    pub delivery_base_fee: Decimal,
    pub per_mile_rate: Decimal,
    pub lookup_timeout: Duration,
    pub debounce: Duration,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            currency: "JMD".to_string(),
            price_per_bag: Decimal::new(35000, 2),
            bag_weight_lbs: Decimal::TEN,
            base_lbs_per_guest_hour: Decimal::new(5, 1),
            event_multipliers: EventMultipliers::default(),
            guests_per_bag: 25,
            checkout_discounts: DiscountSchedule::checkout(),
            preview_discounts: DiscountSchedule::savings_preview(),
            free_zone_keywords: ["washington gardens", "washington garden", "wash gardens", "wash garden"]
                .into_iter()
                .map(String::from)
                .collect(),
            free_zone_label: "Washington Gardens".to_string(),
            origin_label: "Washington Gardens".to_string(),
            min_address_len: 11,
            delivery_base_fee: Decimal::new(300, 0),
            per_mile_rate: Decimal::new(35, 0),
            lookup_timeout: Duration::from_secs(10),
            debounce: Duration::from_millis(800),
        }
    }
}

impl PricingPolicy {
    /// Loads `.env` if present, then applies `ICE_*` overrides from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut policy = Self::default();

        if let Some(currency) = var("ICE_CURRENCY") {
            policy.currency = currency.trim().to_uppercase();
        }
        if let Some(v) = parse_var(&var, "ICE_PRICE_PER_BAG")? { policy.price_per_bag = v; }
        if let Some(v) = parse_var(&var, "ICE_BAG_WEIGHT_LBS")? { policy.bag_weight_lbs = v; }
        if let Some(v) = parse_var(&var, "ICE_LBS_PER_GUEST_HOUR")? { policy.base_lbs_per_guest_hour = v; }
        if let Some(v) = parse_var(&var, "ICE_GUESTS_PER_BAG")? { policy.guests_per_bag = v; }
        if let Some(v) = parse_var(&var, "ICE_CHECKOUT_DISCOUNTS")? { policy.checkout_discounts = v; }
        if let Some(v) = parse_var(&var, "ICE_PREVIEW_DISCOUNTS")? { policy.preview_discounts = v; }
        if let Some(keywords) = var("ICE_FREE_ZONE_KEYWORDS") {
            policy.free_zone_keywords = keywords
                .split(',')
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect();
        }
        if let Some(label) = var("ICE_FREE_ZONE_LABEL") { policy.free_zone_label = label; }
        if let Some(label) = var("ICE_DELIVERY_ORIGIN") { policy.origin_label = label; }
        if let Some(v) = parse_var(&var, "ICE_MIN_ADDRESS_LEN")? { policy.min_address_len = v; }
        if let Some(v) = parse_var(&var, "ICE_DELIVERY_BASE_FEE")? { policy.delivery_base_fee = v; }
        if let Some(v) = parse_var(&var, "ICE_PER_MILE_RATE")? { policy.per_mile_rate = v; }
        if let Some(ms) = parse_var::<u64, _>(&var, "ICE_LOOKUP_TIMEOUT_MS")? {
            policy.lookup_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var::<u64, _>(&var, "ICE_DEBOUNCE_MS")? {
            policy.debounce = Duration::from_millis(ms);
        }

        policy.validate()?;
        info!(
            currency = %policy.currency,
            price_per_bag = %policy.price_per_bag,
            base_fee = %policy.delivery_base_fee,
            per_mile = %policy.per_mile_rate,
            "pricing policy loaded"
        );
        Ok(policy)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.currency.is_empty() {
            return Err(ConfigError::Policy("currency code is empty".into()));
        }
        if self.price_per_bag <= Decimal::ZERO {
            return Err(ConfigError::Policy("price per bag must be positive".into()));
        }
        if self.bag_weight_lbs <= Decimal::ZERO {
            return Err(ConfigError::Policy("bag weight must be positive".into()));
        }
        if self.base_lbs_per_guest_hour < Decimal::ZERO {
            return Err(ConfigError::Policy("pounds per guest-hour cannot be negative".into()));
        }
        if self.guests_per_bag == 0 {
            return Err(ConfigError::Policy("guests per bag must be at least 1".into()));
        }
        if self.free_zone_keywords.is_empty() {
            return Err(ConfigError::Policy("at least one free-zone keyword is required".into()));
        }
        if self.delivery_base_fee < Decimal::ZERO || self.per_mile_rate < Decimal::ZERO {
            return Err(ConfigError::Policy("delivery rates cannot be negative".into()));
        }
        if self.lookup_timeout.is_zero() {
            return Err(ConfigError::Policy("lookup timeout must be non-zero".into()));
        }
        // Re-run the schedule invariants; the fields are public.
        DiscountSchedule::new(self.checkout_discounts.tiers().to_vec())?;
        DiscountSchedule::new(self.preview_discounts.tiers().to_vec())?;
        Ok(())
    }
}

fn parse_var<T, F>(var: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    var(key)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|e| ConfigError::InvalidValue {
                key,
                value: raw.clone(),
                reason: e.to_string(),
            })
        })
        .transpose()
}
