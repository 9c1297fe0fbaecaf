//! Pricing rules the quote aggregate is built from
pub mod estimator;
pub mod discount;
pub mod delivery;

pub use estimator::{BagQuantityEstimator, BagSizing};
pub use discount::{Discount, DiscountSchedule, DiscountTier, DiscountTierResolver};
pub use delivery::{
    DeliveryFeeRequest, DeliveryFeeResolver, DeliveryFeeResponse, DeliveryResolution, DistanceLookup, LookupError, Route,
};
