//! Value Objects for ice quotes

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Number of 10 lb bags on an order. Never below one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct BagCount(u32);

impl BagCount {
    pub const MIN: BagCount = BagCount(1);
    pub const MAX: BagCount = BagCount(u32::MAX);

    pub fn new(value: u32) -> Result<Self, BagCountError> {
        if value == 0 { return Err(BagCountError::Zero); }
        Ok(Self(value))
    }

    /// Clamps a raw count into range; zero and negative inputs become one bag.
    pub fn at_least_one(raw: i64) -> Self {
        Self(raw.clamp(1, i64::from(u32::MAX)) as u32)
    }

    pub fn value(&self) -> u32 { self.0 }
}

impl Default for BagCount { fn default() -> Self { Self::MIN } }

impl TryFrom<u32> for BagCount {
    type Error = BagCountError;
    fn try_from(value: u32) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<BagCount> for u32 {
    fn from(bags: BagCount) -> Self { bags.0 }
}

impl fmt::Display for BagCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BagCountError {
    #[error("An order needs at least one bag")]
    Zero,
}

/// Delivery address as typed by the customer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeliveryAddress(String);

impl DeliveryAddress {
    pub fn new(value: impl Into<String>) -> Self { Self(value.into()) }
    pub fn as_str(&self) -> &str { &self.0 }
    pub fn is_blank(&self) -> bool { self.0.trim().is_empty() }

    /// Trimmed length in characters.
    pub fn len(&self) -> usize { self.0.trim().chars().count() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    pub fn normalized(&self) -> String { self.0.trim().to_lowercase() }

    /// Case-insensitive substring match against already-lowercased keywords.
    pub fn mentions_any(&self, keywords: &[String]) -> bool {
        let normalized = self.normalized();
        keywords.iter().any(|k| !k.is_empty() && normalized.contains(k.as_str()))
    }
}

impl From<&str> for DeliveryAddress {
    fn from(value: &str) -> Self { Self::new(value) }
}

impl From<String> for DeliveryAddress {
    fn from(value: String) -> Self { Self(value) }
}

impl fmt::Display for DeliveryAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Kind of event the ice is for; drives the consumption multiplier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Party,
    Wedding,
    Restaurant,
    Bar,
    Corporate,
}

impl EventType {
    pub const ALL: [EventType; 5] = [
        EventType::Party,
        EventType::Wedding,
        EventType::Restaurant,
        EventType::Bar,
        EventType::Corporate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Party => "party",
            EventType::Wedding => "wedding",
            EventType::Restaurant => "restaurant",
            EventType::Bar => "bar",
            EventType::Corporate => "corporate",
        }
    }

    /// Form values are free text; anything unrecognised means "no event type".
    pub fn parse_lenient(raw: Option<&str>) -> Option<Self> {
        raw.and_then(|value| value.parse().ok())
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.as_str()) }
}

impl FromStr for EventType {
    type Err = EventTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "party" => Ok(EventType::Party),
            "wedding" => Ok(EventType::Wedding),
            "restaurant" => Ok(EventType::Restaurant),
            "bar" => Ok(EventType::Bar),
            "corporate" => Ok(EventType::Corporate),
            other => Err(EventTypeError::Unknown(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventTypeError {
    #[error("Unknown event type: {0}")]
    Unknown(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bag_count_clamps() {
        assert_eq!(BagCount::at_least_one(0), BagCount::MIN);
        assert_eq!(BagCount::at_least_one(-12), BagCount::MIN);
        assert_eq!(BagCount::at_least_one(15).value(), 15);
        assert_eq!(BagCount::at_least_one(i64::MAX), BagCount::MAX);
        assert_eq!(BagCount::new(0), Err(BagCountError::Zero));
    }

    #[test]
    fn test_bag_count_rejects_zero_on_deserialize() {
        assert!(serde_json::from_str::<BagCount>("0").is_err());
        assert_eq!(serde_json::from_str::<BagCount>("3").unwrap().value(), 3);
    }

    #[test]
    fn test_address_matching() {
        let address = DeliveryAddress::new("  12 Palm Ave, WASHINGTON Gardens ");
        assert!(address.mentions_any(&["washington garden".to_string()]));
        assert!(!address.mentions_any(&["half way tree".to_string()]));
        assert_eq!(address.len(), 31);
        assert!(DeliveryAddress::new("   ").is_blank());
    }

    #[test]
    fn test_event_type_parse() {
        assert_eq!(" Wedding ".parse::<EventType>().unwrap(), EventType::Wedding);
        assert!("gala".parse::<EventType>().is_err());
        assert_eq!(EventType::parse_lenient(Some("gala")), None);
        assert_eq!(EventType::parse_lenient(Some("bar")), Some(EventType::Bar));
        assert_eq!(EventType::parse_lenient(None), None);
    }

    #[test]
    fn test_event_type_names_round_trip() {
        for event_type in EventType::ALL {
            assert_eq!(event_type.to_string().parse::<EventType>(), Ok(event_type));
            assert_eq!(serde_json::to_string(&event_type).unwrap(), format!("\"{}\"", event_type.as_str()));
        }
    }
}
