//! Bag quantity estimation

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{EventMultipliers, PricingPolicy};
use crate::domain::value_objects::{BagCount, EventType};

/// How the customer sized the order. Exactly one mode applies per estimate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum BagSizing {
    /// The bag count is already known (quick order, bulk tier, chat link).
    Direct { bags: i64 },
    /// Full event calculator: guests, hours and kind of event.
    GuestDuration {
        guests: i64,
        hours: Decimal,
        #[serde(default)]
        event_type: Option<EventType>,
    },
    /// Instant-quote shortcut: one bag per block of guests.
    GuestOnly { guests: i64 },
    /// The customer asked for a weight of ice.
    IceWeight { pounds: Decimal },
}

/// Turns sizing inputs into a bag count. Bad input never errors; it clamps
/// to the one-bag minimum.
#[derive(Clone, Debug)]
pub struct BagQuantityEstimator {
    bag_weight_lbs: Decimal,
    base_lbs_per_guest_hour: Decimal,
    multipliers: EventMultipliers,
    guests_per_bag: u32,
}

impl BagQuantityEstimator {
    pub fn from_policy(policy: &PricingPolicy) -> Self {
        Self {
            bag_weight_lbs: policy.bag_weight_lbs,
            base_lbs_per_guest_hour: policy.base_lbs_per_guest_hour,
            multipliers: policy.event_multipliers.clone(),
            guests_per_bag: policy.guests_per_bag.max(1),
        }
    }

    pub fn estimate(&self, sizing: &BagSizing) -> BagCount {
        let bags = match sizing {
            BagSizing::Direct { bags } => BagCount::at_least_one(*bags),
            BagSizing::GuestDuration { guests, hours, event_type } => {
                match self.ice_pounds(*guests, *hours, *event_type) {
                    Some(pounds) => self.bags_for_pounds(pounds),
                    None => BagCount::MAX,
                }
            }
            BagSizing::GuestOnly { guests } => self.bags_for_guests(*guests),
            BagSizing::IceWeight { pounds } => self.bags_for_pounds(*pounds),
        };
        debug!(?sizing, bags = bags.value(), "estimated bags");
        bags
    }

    /// `guests × hours × lbs per guest-hour × event multiplier`. Non-positive
    /// guests or hours need no ice. `None` only on decimal overflow.
    pub fn ice_pounds(&self, guests: i64, hours: Decimal, event_type: Option<EventType>) -> Option<Decimal> {
        if guests <= 0 || hours <= Decimal::ZERO {
            return Some(Decimal::ZERO);
        }
        Decimal::from(guests)
            .checked_mul(hours)?
            .checked_mul(self.base_lbs_per_guest_hour)?
            .checked_mul(self.multipliers.for_event(event_type))
    }

    fn bags_for_pounds(&self, pounds: Decimal) -> BagCount {
        if pounds <= Decimal::ZERO {
            return BagCount::MIN;
        }
        let bags = (pounds / self.bag_weight_lbs).ceil();
        BagCount::at_least_one(bags.to_i64().unwrap_or(i64::MAX))
    }

    fn bags_for_guests(&self, guests: i64) -> BagCount {
        if guests <= 0 {
            return BagCount::MIN;
        }
        let per_bag = i64::from(self.guests_per_bag);
        BagCount::at_least_one(guests / per_bag + i64::from(guests % per_bag != 0))
    }
}
