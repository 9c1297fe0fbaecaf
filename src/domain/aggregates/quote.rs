//! Quote Aggregate

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::PricingPolicy;
use crate::domain::services::delivery::{DeliveryFeeResolver, DeliveryResolution, DistanceLookup};
use crate::domain::services::discount::{Discount, DiscountTierResolver};
use crate::domain::services::estimator::{BagQuantityEstimator, BagSizing};
use crate::domain::value_objects::{BagCount, DeliveryAddress, EventType};

/// One snapshot of the quote form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventInput {
    pub sizing: BagSizing,
    #[serde(default)]
    pub delivery_address: DeliveryAddress,
}

impl EventInput {
    pub fn direct(bags: i64, address: impl Into<DeliveryAddress>) -> Self {
        Self { sizing: BagSizing::Direct { bags }, delivery_address: address.into() }
    }

    pub fn event(guests: i64, hours: Decimal, event_type: Option<EventType>, address: impl Into<DeliveryAddress>) -> Self {
        Self { sizing: BagSizing::GuestDuration { guests, hours, event_type }, delivery_address: address.into() }
    }

    pub fn guests(guests: i64, address: impl Into<DeliveryAddress>) -> Self {
        Self { sizing: BagSizing::GuestOnly { guests }, delivery_address: address.into() }
    }

    pub fn ice_weight(pounds: Decimal, address: impl Into<DeliveryAddress>) -> Self {
        Self { sizing: BagSizing::IceWeight { pounds }, delivery_address: address.into() }
    }
}

/// A priced proposal. Provisional while `delivery_fee` is `None`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    bags: BagCount,
    price_per_bag: Decimal,
    currency: String,
    subtotal: Decimal,
    discount_percent: u8,
    discount_amount: Decimal,
    delivery_fee: Option<Decimal>,
    total: Decimal,
    delivery_area_label: String,
    delivery_address: DeliveryAddress,
    delivery: DeliveryResolution,
}

impl Quote {
    pub fn bags(&self) -> BagCount { self.bags }
    pub fn price_per_bag(&self) -> Decimal { self.price_per_bag }
    pub fn currency(&self) -> &str { &self.currency }
    pub fn subtotal(&self) -> Decimal { self.subtotal }
    pub fn discount_percent(&self) -> u8 { self.discount_percent }
    pub fn discount_amount(&self) -> Decimal { self.discount_amount }
    pub fn delivery_fee(&self) -> Option<Decimal> { self.delivery_fee }
    pub fn total(&self) -> Decimal { self.total }
    pub fn delivery_area_label(&self) -> &str { &self.delivery_area_label }
    pub fn delivery_address(&self) -> &DeliveryAddress { &self.delivery_address }
    pub fn delivery(&self) -> &DeliveryResolution { &self.delivery }

    /// Delivery fee not yet included in `total`.
    pub fn is_provisional(&self) -> bool { self.delivery_fee.is_none() }

    /// Compares every number on the quote, ignoring label wording.
    pub fn same_pricing(&self, other: &Quote) -> bool {
        self.bags == other.bags
            && self.price_per_bag == other.price_per_bag
            && self.currency == other.currency
            && self.subtotal == other.subtotal
            && self.discount_percent == other.discount_percent
            && self.discount_amount == other.discount_amount
            && self.delivery_fee == other.delivery_fee
            && self.total == other.total
    }
}

/// Composes estimation, discount and delivery into a [`Quote`]. The same
/// engine serves live previews and checkout confirmation.
pub struct QuoteEngine<L> {
    currency: String,
    price_per_bag: Decimal,
    estimator: BagQuantityEstimator,
    discounts: DiscountTierResolver,
    preview_discounts: DiscountTierResolver,
    delivery: DeliveryFeeResolver<L>,
}

impl<L: DistanceLookup> QuoteEngine<L> {
    pub fn new(policy: &PricingPolicy, lookup: L) -> Self {
        Self {
            currency: policy.currency.clone(),
            price_per_bag: policy.price_per_bag,
            estimator: BagQuantityEstimator::from_policy(policy),
            discounts: DiscountTierResolver::new(policy.checkout_discounts.clone()),
            preview_discounts: DiscountTierResolver::new(policy.preview_discounts.clone()),
            delivery: DeliveryFeeResolver::new(lookup, policy),
        }
    }

    pub fn from_env(lookup: L) -> crate::Result<Self> {
        let policy = PricingPolicy::from_env()?;
        Ok(Self::new(&policy, lookup))
    }

    pub fn delivery(&self) -> &DeliveryFeeResolver<L> { &self.delivery }

    pub fn estimate_bags(&self, sizing: &BagSizing) -> BagCount { self.estimator.estimate(sizing) }

    /// Always yields a quote. A delivery lookup failure produces a provisional
    /// quote whose total leaves the fee out.
    pub async fn compute_quote(&self, input: &EventInput) -> Quote {
        let bags = self.estimator.estimate(&input.sizing);
        let delivery = self.delivery.resolve(&input.delivery_address, bags).await;
        self.price(bags, &input.delivery_address, delivery)
    }

    /// Like [`compute_quote`](Self::compute_quote) but surfaces lookup failures.
    pub async fn try_compute_quote(&self, input: &EventInput) -> crate::Result<Quote> {
        let bags = self.estimator.estimate(&input.sizing);
        let delivery = self.delivery.try_resolve(&input.delivery_address, bags).await?;
        Ok(self.price(bags, &input.delivery_address, delivery))
    }

    /// Pure pricing step once bags and delivery are known.
    pub fn price(&self, bags: BagCount, address: &DeliveryAddress, delivery: DeliveryResolution) -> Quote {
        let subtotal = self.subtotal(bags);
        let Discount { percent, amount } = self.discounts.resolve(bags, subtotal);
        let delivery_fee = delivery.fee();
        let total = (subtotal - amount)
            .checked_add(delivery_fee.unwrap_or(Decimal::ZERO))
            .unwrap_or(Decimal::MAX)
            .max(Decimal::ZERO);
        debug!(bags = bags.value(), %subtotal, discount = percent, ?delivery_fee, %total, "priced quote");

        Quote {
            bags,
            price_per_bag: self.price_per_bag,
            currency: self.currency.clone(),
            subtotal,
            discount_percent: percent,
            discount_amount: amount,
            delivery_fee,
            total,
            delivery_area_label: delivery.label(),
            delivery_address: address.clone(),
            delivery,
        }
    }

    /// Checks that a quote's numbers are consistent with its own bags and
    /// stored delivery outcome under the current policy. No new lookup is
    /// made, so an edited delivery outcome is taken at face value.
    pub fn verify(&self, quote: &Quote) -> bool {
        let repriced = self.price(quote.bags, &quote.delivery_address, quote.delivery.clone());
        repriced.same_pricing(quote)
    }

    /// Non-binding savings hint from the finer calculator schedule.
    pub fn preview_savings(&self, bags: BagCount) -> Discount {
        self.preview_discounts.resolve(bags, self.subtotal(bags))
    }

    /// Saturates instead of overflowing on absurd policies.
    fn subtotal(&self, bags: BagCount) -> Decimal {
        self.price_per_bag.checked_mul(Decimal::from(bags.value())).unwrap_or(Decimal::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::services::delivery::{DeliveryFeeResponse, LookupError, MockDistanceLookup};
    use crate::domain::services::discount::{DiscountSchedule, DiscountTier};

    fn engine(mock: MockDistanceLookup) -> QuoteEngine<MockDistanceLookup> {
        QuoteEngine::new(&PricingPolicy::default(), mock)
    }

    fn offline() -> QuoteEngine<MockDistanceLookup> {
        let mut mock = MockDistanceLookup::new();
        mock.expect_lookup().times(0);
        engine(mock)
    }

    #[tokio::test]
    async fn test_tier_boundary() {
        let engine = offline();
        let q14 = engine.compute_quote(&EventInput::direct(14, "Washington Gardens")).await;
        assert_eq!(q14.subtotal(), Decimal::new(4900, 0));
        assert_eq!(q14.discount_percent(), 0);
        assert_eq!(q14.total(), Decimal::new(4900, 0));

        let q15 = engine.compute_quote(&EventInput::direct(15, "Washington Gardens")).await;
        assert_eq!(q15.subtotal(), Decimal::new(5250, 0));
        assert_eq!(q15.discount_percent(), 10);
        assert_eq!(q15.discount_amount(), Decimal::new(525, 0));
        assert_eq!(q15.total(), Decimal::new(4725, 0));
        assert_eq!(q15.delivery_fee(), Some(Decimal::ZERO));
    }

    #[tokio::test]
    async fn test_distance_fee_added_to_total() {
        let mut mock = MockDistanceLookup::new();
        mock.expect_lookup().times(1).returning(|_| {
            Ok(DeliveryFeeResponse {
                delivery_fee: 0.0,
                distance_miles: 10.0,
                distance_text: "10 mi".into(),
                duration_text: "25 mins".into(),
                is_washington_gardens: false,
                free_delivery_reason: None,
            })
        });
        let quote = engine(mock).compute_quote(&EventInput::guests(50, "8 Hope Road, Kingston 10")).await;
        assert_eq!(quote.bags().value(), 2);
        // 700 + 300 + 35 * 10
        assert_eq!(quote.delivery_fee(), Some(Decimal::new(650, 0)));
        assert_eq!(quote.total(), Decimal::new(1350, 0));
        assert!(!quote.is_provisional());
    }

    #[tokio::test]
    async fn test_failed_lookup_gives_provisional_quote() {
        let mut mock = MockDistanceLookup::new();
        mock.expect_lookup().times(2).returning(|_| Err(LookupError::Status(500)));
        let engine = engine(mock);
        let input = EventInput::direct(3, "456 Somewhere St");

        let quote = engine.compute_quote(&input).await;
        assert!(quote.is_provisional());
        assert_eq!(quote.total(), Decimal::new(1050, 0));
        assert!(quote.delivery_area_label().contains("unable to calculate"));

        assert!(matches!(
            engine.try_compute_quote(&input).await,
            Err(crate::QuoteError::Lookup(LookupError::Status(500)))
        ));
    }

    #[tokio::test]
    async fn test_no_address_is_provisional() {
        let quote = offline().compute_quote(&EventInput::guests(10, "")).await;
        assert!(quote.is_provisional());
        assert_eq!(quote.delivery_area_label(), "enter address");
        assert_eq!(quote.total(), Decimal::new(350, 0));
    }

    fn zero_mile_route() -> crate::domain::services::delivery::Route {
        crate::domain::services::delivery::Route {
            distance_miles: Decimal::ZERO,
            distance_text: String::new(),
            duration_text: String::new(),
        }
    }

    fn with_schedule(schedule: DiscountSchedule) -> QuoteEngine<MockDistanceLookup> {
        let mut mock = MockDistanceLookup::new();
        mock.expect_lookup().times(0);
        let policy = PricingPolicy { checkout_discounts: schedule, ..PricingPolicy::default() };
        QuoteEngine::new(&policy, mock)
    }

    #[test]
    fn test_total_never_negative() {
        // 0% below 5 bags, then 5%, 10%, 15%
        let engine = with_schedule(DiscountSchedule::savings_preview());
        let address = DeliveryAddress::new("Washington Gardens");
        let mut seen = std::collections::BTreeSet::new();
        for bags in [1, 4, 5, 9, 10, 14, 15, 20, 999, 1000] {
            let bags = BagCount::new(bags).unwrap();
            for fee in [0, 1, 2500, 10000] {
                let delivery = DeliveryResolution::Distance {
                    fee: Decimal::from(fee),
                    route: zero_mile_route(),
                    origin: "Washington Gardens".into(),
                };
                let quote = engine.price(bags, &address, delivery);
                seen.insert(quote.discount_percent());
                assert!(quote.total() >= Decimal::ZERO);
                assert_eq!(quote.total(), quote.subtotal() - quote.discount_amount() + Decimal::from(fee));
            }
        }
        assert_eq!(seen.into_iter().collect::<Vec<_>>(), vec![0, 5, 10, 15]);
    }

    #[test]
    fn test_total_clamps_at_zero() {
        let full = DiscountSchedule::new(vec![DiscountTier { min_bags: 1, percent: 100 }]).unwrap();
        let engine = with_schedule(full);
        let address = DeliveryAddress::new("Washington Gardens");
        let bags = BagCount::new(6).unwrap();

        let free = engine.price(bags, &address, DeliveryResolution::FreeZone { zone: "Washington Gardens".into() });
        assert_eq!(free.discount_amount(), free.subtotal());
        assert_eq!(free.total(), Decimal::ZERO);

        let credit = DeliveryResolution::Distance {
            fee: Decimal::new(-500, 0),
            route: zero_mile_route(),
            origin: "Washington Gardens".into(),
        };
        assert_eq!(engine.price(bags, &address, credit).total(), Decimal::ZERO);
    }

    #[test]
    fn test_absurd_price_saturates() {
        let mut mock = MockDistanceLookup::new();
        mock.expect_lookup().times(0);
        let policy = PricingPolicy { price_per_bag: Decimal::from_i128_with_scale(10i128.pow(24), 0), ..PricingPolicy::default() };
        let engine = QuoteEngine::new(&policy, mock);
        let bags = engine.estimate_bags(&BagSizing::Direct { bags: i64::MAX });
        assert_eq!(bags, BagCount::MAX);

        let quote = engine.price(bags, &DeliveryAddress::new("Washington Gardens"), DeliveryResolution::AwaitingAddress);
        assert_eq!(quote.subtotal(), Decimal::MAX);
        assert!(quote.total() >= Decimal::ZERO);
        assert!(engine.preview_savings(bags).amount <= Decimal::MAX);
    }

    #[tokio::test]
    async fn test_verify_detects_edited_totals() {
        let engine = offline();
        let quote = engine.compute_quote(&EventInput::direct(20, "Washington Gardens")).await;
        assert!(engine.verify(&quote));

        let mut json = serde_json::to_value(&quote).unwrap();
        json["total"] = serde_json::json!("1.00");
        let tampered: Quote = serde_json::from_value(json).unwrap();
        assert!(!engine.verify(&tampered));
    }

    #[tokio::test]
    async fn test_unpriceable_distance_gives_provisional_quote() {
        let mut mock = MockDistanceLookup::new();
        mock.expect_lookup().times(1).returning(|_| {
            Ok(DeliveryFeeResponse {
                delivery_fee: 0.0,
                distance_miles: 1e28,
                distance_text: "far".into(),
                duration_text: "forever".into(),
                is_washington_gardens: false,
                free_delivery_reason: None,
            })
        });
        let quote = engine(mock).compute_quote(&EventInput::direct(2, "456 Somewhere St")).await;
        assert!(quote.is_provisional());
        assert_eq!(quote.total(), Decimal::new(700, 0));
        assert!(quote.delivery_area_label().contains("unable to calculate"));
    }

    #[tokio::test]
    async fn test_engine_parts_agree_with_quote() {
        let engine = offline();
        let sizing = BagSizing::GuestOnly { guests: 80 };
        let address = DeliveryAddress::new("Washington Gardens");
        let bags = engine.estimate_bags(&sizing);
        let delivery = engine.delivery().resolve(&address, bags).await;
        let quote = engine.compute_quote(&EventInput { sizing, delivery_address: address.clone() }).await;
        assert!(engine.price(bags, &address, delivery).same_pricing(&quote));
        assert_eq!(quote.bags().value(), 4);
    }

    #[test]
    fn test_preview_savings_is_separate() {
        let engine = offline();
        let savings = engine.preview_savings(BagCount::new(10).unwrap());
        assert_eq!(savings.percent, 10);
        assert_eq!(savings.amount, Decimal::new(350, 0));
        // checkout schedule gives nothing below 15 bags
        let address = DeliveryAddress::new("Washington Gardens");
        let quote = engine.price(BagCount::new(10).unwrap(), &address, DeliveryResolution::AwaitingAddress);
        assert_eq!(quote.discount_percent(), 0);
    }
}
