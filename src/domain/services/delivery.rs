//! Delivery fee resolution
//!
//! Addresses inside the free zone are recognised locally and never reach the
//! distance service. Everything else is priced as a base fee plus a per-mile
//! rate on the driving distance the service reports. A failed, slow or
//! nonsensical lookup leaves the fee undetermined rather than failing the
//! quote.

use async_trait::async_trait;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::PricingPolicy;
use crate::domain::value_objects::{BagCount, DeliveryAddress};

/// Body sent to the distance service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryFeeRequest {
    pub destination_address: String,
    pub bags: u32,
}

/// Successful distance service reply.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeliveryFeeResponse {
    pub delivery_fee: f64,
    pub distance_miles: f64,
    pub distance_text: String,
    pub duration_text: String,
    #[serde(default)]
    pub is_washington_gardens: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub free_delivery_reason: Option<String>,
}

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("Distance lookup timed out after {0:?}")]
    Timeout(Duration),

    #[error("Distance service returned status {0}")]
    Status(u16),

    #[error("No route to address: {0}")]
    Unroutable(String),

    #[error("Malformed distance response: {0}")]
    Malformed(String),

    #[error("Distance lookup failed: {0}")]
    Transport(#[from] anyhow::Error),
}

/// Remote distance/duration service. Implementations own the transport.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DistanceLookup: Send + Sync {
    async fn lookup(&self, request: &DeliveryFeeRequest) -> Result<DeliveryFeeResponse, LookupError>;
}

#[async_trait]
impl<T: DistanceLookup + ?Sized> DistanceLookup for Arc<T> {
    async fn lookup(&self, request: &DeliveryFeeRequest) -> Result<DeliveryFeeResponse, LookupError> {
        (**self).lookup(request).await
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub distance_miles: Decimal,
    pub distance_text: String,
    pub duration_text: String,
}

/// Outcome of resolving a delivery fee. Only `FreeZone`, `Waived` and
/// `Distance` carry a fee; the rest are waiting on better input or a retry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeliveryResolution {
    AwaitingAddress,
    IncompleteAddress,
    FreeZone { zone: String },
    Waived { reason: String, route: Route },
    Distance { fee: Decimal, route: Route, origin: String },
    Unavailable { reason: String },
}

impl DeliveryResolution {
    pub fn fee(&self) -> Option<Decimal> {
        match self {
            DeliveryResolution::FreeZone { .. } | DeliveryResolution::Waived { .. } => Some(Decimal::ZERO),
            DeliveryResolution::Distance { fee, .. } => Some(*fee),
            DeliveryResolution::AwaitingAddress
            | DeliveryResolution::IncompleteAddress
            | DeliveryResolution::Unavailable { .. } => None,
        }
    }

    pub fn is_resolved(&self) -> bool { self.fee().is_some() }

    pub fn route(&self) -> Option<&Route> {
        match self {
            DeliveryResolution::Waived { route, .. } | DeliveryResolution::Distance { route, .. } => Some(route),
            _ => None,
        }
    }

    pub fn label(&self) -> String {
        match self {
            DeliveryResolution::AwaitingAddress => "enter address".to_string(),
            DeliveryResolution::IncompleteAddress => "enter complete address".to_string(),
            DeliveryResolution::FreeZone { zone } => format!("{zone} - free delivery"),
            DeliveryResolution::Waived { reason, route } => {
                format!("{} - free delivery ({reason})", route.distance_text)
            }
            DeliveryResolution::Distance { route, origin, .. } => {
                format!("{} from {origin}", route.distance_text)
            }
            DeliveryResolution::Unavailable { .. } => "unable to calculate - please check address".to_string(),
        }
    }
}

/// Stateless: it neither caches nor debounces. Callers that re-run it on
/// every keystroke should go through [`crate::session::QuoteSession`].
pub struct DeliveryFeeResolver<L> {
    lookup: L,
    free_zone_keywords: Vec<String>,
    free_zone_label: String,
    origin_label: String,
    min_address_len: usize,
    base_fee: Decimal,
    per_mile_rate: Decimal,
    timeout: Duration,
}

impl<L: DistanceLookup> DeliveryFeeResolver<L> {
    pub fn new(lookup: L, policy: &PricingPolicy) -> Self {
        Self {
            lookup,
            free_zone_keywords: policy.free_zone_keywords.iter().map(|k| k.to_lowercase()).collect(),
            free_zone_label: policy.free_zone_label.clone(),
            origin_label: policy.origin_label.clone(),
            min_address_len: policy.min_address_len,
            base_fee: policy.delivery_base_fee,
            per_mile_rate: policy.per_mile_rate,
            timeout: policy.lookup_timeout,
        }
    }

    /// The checks that need no network: blank, free zone, too short.
    pub fn resolve_locally(&self, address: &DeliveryAddress) -> Option<DeliveryResolution> {
        if address.is_blank() {
            return Some(DeliveryResolution::AwaitingAddress);
        }
        if address.mentions_any(&self.free_zone_keywords) {
            debug!(%address, "free delivery zone");
            return Some(DeliveryResolution::FreeZone { zone: self.free_zone_label.clone() });
        }
        if address.len() < self.min_address_len {
            return Some(DeliveryResolution::IncompleteAddress);
        }
        None
    }

    /// `None` when the distance is too large to price.
    pub fn fee_for_distance(&self, miles: Decimal) -> Option<Decimal> {
        let fee = self.per_mile_rate.checked_mul(miles)?.checked_add(self.base_fee)?;
        Some(fee.round_dp(2))
    }

    /// Never fails: lookup problems become [`DeliveryResolution::Unavailable`].
    pub async fn resolve(&self, address: &DeliveryAddress, bags: BagCount) -> DeliveryResolution {
        match self.try_resolve(address, bags).await {
            Ok(resolution) => resolution,
            Err(err) => {
                warn!(%address, error = %err, "delivery fee unavailable");
                DeliveryResolution::Unavailable { reason: err.to_string() }
            }
        }
    }

    pub async fn try_resolve(
        &self,
        address: &DeliveryAddress,
        bags: BagCount,
    ) -> Result<DeliveryResolution, LookupError> {
        if let Some(resolution) = self.resolve_locally(address) {
            return Ok(resolution);
        }

        let request = DeliveryFeeRequest {
            destination_address: address.as_str().trim().to_string(),
            bags: bags.value(),
        };
        debug!(address = %request.destination_address, bags = request.bags, "requesting distance");

        let response = tokio::time::timeout(self.timeout, self.lookup.lookup(&request))
            .await
            .map_err(|_| LookupError::Timeout(self.timeout))??;

        let resolution = self.interpret(response)?;
        info!(%address, fee = ?resolution.fee(), label = %resolution.label(), "delivery fee resolved");
        Ok(resolution)
    }

    fn interpret(&self, response: DeliveryFeeResponse) -> Result<DeliveryResolution, LookupError> {
        if response.is_washington_gardens {
            return Ok(DeliveryResolution::FreeZone { zone: self.free_zone_label.clone() });
        }
        if !response.distance_miles.is_finite() || response.distance_miles < 0.0 {
            return Err(LookupError::Malformed(format!("distance_miles = {}", response.distance_miles)));
        }
        let distance_miles = Decimal::from_f64(response.distance_miles)
            .ok_or_else(|| LookupError::Malformed(format!("distance_miles = {}", response.distance_miles)))?
            .round_dp(2);
        let route = Route {
            distance_miles,
            distance_text: response.distance_text,
            duration_text: response.duration_text,
        };

        if let Some(reason) = response.free_delivery_reason.filter(|r| !r.trim().is_empty()) {
            return Ok(DeliveryResolution::Waived { reason, route });
        }

        let fee = self
            .fee_for_distance(distance_miles)
            .ok_or_else(|| LookupError::Malformed(format!("distance_miles = {} overflows the fee", response.distance_miles)))?;
        Ok(DeliveryResolution::Distance {
            fee,
            route,
            origin: self.origin_label.clone(),
        })
    }
}
