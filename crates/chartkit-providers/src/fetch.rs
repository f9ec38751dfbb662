//! Stale-response guarding for asynchronous fetches.
//!
//! A chart's data fetch can be superseded (ticker or date range changed)
//! or orphaned (the view unmounted) before it resolves. Each fetch takes a
//! ticket from a monotonically increasing generation counter; by the time
//! the response arrives, the ticket is only honored if no newer fetch has
//! started and the consumer has not been retired. A stale result is
//! dropped silently, never applied to a disposed pane and never surfaced
//! as an error.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

/// Proof that a fetch was the latest one issued at some point in time.
#[derive(Debug)]
pub struct FetchTicket {
    generation: u64,
}

/// Generation counter shared between a fetching view and its in-flight
/// requests.
#[derive(Debug, Clone, Default)]
pub struct FetchGeneration {
    current: Arc<AtomicU64>,
}

impl FetchGeneration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new fetch, superseding every outstanding ticket.
    pub fn begin(&self) -> FetchTicket {
        let generation = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        FetchTicket { generation }
    }

    /// Whether the ticket still belongs to the latest fetch.
    pub fn is_current(&self, ticket: &FetchTicket) -> bool {
        self.current.load(Ordering::SeqCst) == ticket.generation
    }

    /// Invalidate all outstanding tickets without starting a new fetch;
    /// called when the consuming view is torn down.
    pub fn retire(&self) {
        self.current.fetch_add(1, Ordering::SeqCst);
    }

    /// Pass `value` through only if `ticket` is still current; a stale
    /// result is dropped.
    pub fn accept<T>(&self, ticket: &FetchTicket, value: T) -> Option<T> {
        if self.is_current(ticket) {
            Some(value)
        } else {
            debug!("dropping stale fetch result (generation {})", ticket.generation);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_ticket_is_current() {
        let generation = FetchGeneration::new();
        let ticket = generation.begin();
        assert!(generation.is_current(&ticket));
    }

    #[test]
    fn new_fetch_supersedes_outstanding_tickets() {
        let generation = FetchGeneration::new();
        let first = generation.begin();
        let second = generation.begin();

        assert!(!generation.is_current(&first));
        assert!(generation.is_current(&second));
    }

    #[test]
    fn retire_invalidates_everything() {
        let generation = FetchGeneration::new();
        let ticket = generation.begin();
        generation.retire();
        assert!(!generation.is_current(&ticket));
    }

    #[test]
    fn accept_drops_stale_values() {
        let generation = FetchGeneration::new();
        let stale = generation.begin();
        let fresh = generation.begin();

        assert_eq!(generation.accept(&stale, 1), None);
        assert_eq!(generation.accept(&fresh, 2), Some(2));
    }

    #[test]
    fn clones_share_the_counter() {
        let generation = FetchGeneration::new();
        let view_handle = generation.clone();
        let ticket = generation.begin();

        view_handle.retire();
        assert!(!generation.is_current(&ticket));
    }
}
