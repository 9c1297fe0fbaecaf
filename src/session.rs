//! Live quote state for one form.
//!
//! Every recalculation takes a ticket. Only the newest ticket's result is
//! applied; anything that resolves later than a newer request, or after the
//! form was closed, is dropped.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::debug;

use crate::config::PricingPolicy;
use crate::domain::aggregates::quote::{EventInput, Quote, QuoteEngine};
use crate::domain::events::QuoteEvent;
use crate::domain::services::delivery::DistanceLookup;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

impl Ticket {
    pub fn value(&self) -> u64 { self.0 }
}

#[derive(Default)]
struct SessionState {
    current: Option<Quote>,
    events: Vec<QuoteEvent>,
}

pub struct QuoteSession<L> {
    engine: QuoteEngine<L>,
    debounce: Duration,
    issued: AtomicU64,
    closed: AtomicBool,
    state: Mutex<SessionState>,
}

impl<L: DistanceLookup> QuoteSession<L> {
    pub fn new(engine: QuoteEngine<L>, debounce: Duration) -> Self {
        Self {
            engine,
            debounce,
            issued: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn with_policy(policy: &PricingPolicy, lookup: L) -> Self {
        Self::new(QuoteEngine::new(policy, lookup), policy.debounce)
    }

    pub fn engine(&self) -> &QuoteEngine<L> { &self.engine }

    pub fn issue(&self) -> Ticket {
        Ticket(self.issued.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_latest(&self, ticket: Ticket) -> bool {
        self.issued.load(Ordering::SeqCst) == ticket.0
    }

    pub fn is_closed(&self) -> bool { self.closed.load(Ordering::SeqCst) }

    /// Computes the quote for `ticket` and applies it if still current.
    /// Returns the applied quote, or `None` if it was discarded.
    pub async fn complete(&self, ticket: Ticket, input: &EventInput) -> Option<Quote> {
        let quote = self.engine.compute_quote(input).await;
        self.apply(ticket, quote)
    }

    pub async fn recalculate(&self, input: &EventInput) -> Option<Quote> {
        let ticket = self.issue();
        self.complete(ticket, input).await
    }

    /// Waits out the debounce window first; if another edit arrived in the
    /// meantime no lookup is made for this one.
    pub async fn recalculate_debounced(&self, input: &EventInput) -> Option<Quote> {
        let ticket = self.issue();
        tokio::time::sleep(self.debounce).await;
        if !self.is_latest(ticket) || self.is_closed() {
            debug!(ticket = ticket.0, "superseded before lookup");
            return None;
        }
        self.complete(ticket, input).await
    }

    pub fn current(&self) -> Option<Quote> { self.lock().current.clone() }

    /// Form torn down; results still in flight are dropped on arrival.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            let last_ticket = self.issued.load(Ordering::SeqCst);
            self.lock().events.push(QuoteEvent::Closed { last_ticket });
        }
    }

    pub fn take_events(&self) -> Vec<QuoteEvent> { std::mem::take(&mut self.lock().events) }

    fn apply(&self, ticket: Ticket, quote: Quote) -> Option<Quote> {
        let mut state = self.lock();
        if self.is_closed() {
            debug!(ticket = ticket.0, "session closed, dropping quote");
            return None;
        }
        let latest = self.issued.load(Ordering::SeqCst);
        if ticket.0 != latest {
            debug!(ticket = ticket.0, latest, "stale quote discarded");
            state.events.push(QuoteEvent::StaleResultDiscarded { ticket: ticket.0, latest });
            return None;
        }
        state.events.push(QuoteEvent::Computed {
            ticket: ticket.0,
            bags: quote.bags().value(),
            total: quote.total(),
            provisional: quote.is_provisional(),
        });
        state.current = Some(quote.clone());
        Some(quote)
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
