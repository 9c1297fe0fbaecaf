//! Bulk discount tiers

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::config::ConfigError;
use crate::domain::value_objects::BagCount;

/// Applies `percent` off the subtotal once an order reaches `min_bags`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountTier {
    pub min_bags: u32,
    pub percent: u8,
}

/// Step function from bag quantity to discount percent.
///
/// Tiers are kept sorted with both thresholds and percentages strictly
/// increasing, so a larger order never gets a smaller discount.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountSchedule {
    tiers: Vec<DiscountTier>,
}

impl DiscountSchedule {
    pub fn new(mut tiers: Vec<DiscountTier>) -> Result<Self, ConfigError> {
        tiers.sort_by_key(|t| t.min_bags);
        for tier in &tiers {
            if tier.min_bags == 0 {
                return Err(ConfigError::Policy("discount tier threshold must be at least 1 bag".into()));
            }
            if tier.percent == 0 || tier.percent > 100 {
                return Err(ConfigError::Policy(format!("discount tier percent {} out of range", tier.percent)));
            }
        }
        for pair in tiers.windows(2) {
            if pair[0].min_bags == pair[1].min_bags || pair[0].percent >= pair[1].percent {
                return Err(ConfigError::Policy(format!(
                    "discount tiers must strictly increase: {}+ -> {}% then {}+ -> {}%",
                    pair[0].min_bags, pair[0].percent, pair[1].min_bags, pair[1].percent
                )));
            }
        }
        Ok(Self { tiers })
    }

    /// The schedule enforced at checkout: 10% off from 15 bags.
    pub fn checkout() -> Self {
        Self { tiers: vec![DiscountTier { min_bags: 15, percent: 10 }] }
    }

    /// Finer schedule shown by the event calculators as a non-binding savings hint.
    pub fn savings_preview() -> Self {
        Self {
            tiers: vec![
                DiscountTier { min_bags: 5, percent: 5 },
                DiscountTier { min_bags: 10, percent: 10 },
                DiscountTier { min_bags: 20, percent: 15 },
            ],
        }
    }

    pub fn tiers(&self) -> &[DiscountTier] { &self.tiers }

    /// A count equal to a threshold qualifies for that tier.
    pub fn percent_for(&self, bags: BagCount) -> u8 {
        self.tiers
            .iter()
            .rev()
            .find(|t| bags.value() >= t.min_bags)
            .map_or(0, |t| t.percent)
    }
}

/// Parses `"15:10,20:15"` (min bags : percent). An empty string is a schedule
/// with no discounts.
impl FromStr for DiscountSchedule {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut tiers = Vec::new();
        for entry in s.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (bags, percent) = entry
                .split_once(':')
                .ok_or_else(|| ConfigError::Policy(format!("discount tier {entry:?} is not <bags>:<percent>")))?;
            let min_bags = bags
                .trim()
                .parse()
                .map_err(|_| ConfigError::Policy(format!("invalid tier threshold in {entry:?}")))?;
            let percent = percent
                .trim()
                .trim_end_matches('%')
                .parse()
                .map_err(|_| ConfigError::Policy(format!("invalid tier percent in {entry:?}")))?;
            tiers.push(DiscountTier { min_bags, percent });
        }
        Self::new(tiers)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discount {
    pub percent: u8,
    pub amount: Decimal,
}

impl Discount {
    pub const NONE: Discount = Discount { percent: 0, amount: Decimal::ZERO };
}

pub struct DiscountTierResolver {
    schedule: DiscountSchedule,
}

impl DiscountTierResolver {
    pub fn new(schedule: DiscountSchedule) -> Self { Self { schedule } }

    pub fn schedule(&self) -> &DiscountSchedule { &self.schedule }

    pub fn resolve(&self, bags: BagCount, subtotal: Decimal) -> Discount {
        let percent = self.schedule.percent_for(bags);
        if percent == 0 {
            return Discount::NONE;
        }
        let percent_dec = Decimal::from(percent);
        let amount = match subtotal.checked_mul(percent_dec) {
            Some(scaled) => scaled / Decimal::ONE_HUNDRED,
            None => subtotal / Decimal::ONE_HUNDRED * percent_dec,
        };
        let amount = amount.round_dp(2).min(subtotal);
        Discount { percent, amount }
    }
}
