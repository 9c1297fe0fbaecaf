//! Domain events
use rust_decimal::Decimal;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QuoteEvent {
    Computed { ticket: u64, bags: u32, total: Decimal, provisional: bool },
    StaleResultDiscarded { ticket: u64, latest: u64 },
    Closed { last_ticket: u64 },
}
