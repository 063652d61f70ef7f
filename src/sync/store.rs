use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use tokio::sync::watch;
use tracing::debug;

use crate::observability::api_metrics;

/// Sequence number handed out when a request is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

impl Ticket {
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Holder for one cached, server-owned value.
///
/// Every fetch or mutation takes a [`Ticket`] before it goes out. A response
/// is applied only if its ticket is newer than the last applied one, so a
/// slow poll can never overwrite the result of a later refresh or mutation.
/// Applied values are published on a `watch` channel.
#[derive(Debug)]
pub struct EntityCell<T> {
    label: String,
    next_ticket: AtomicU64,
    applied: Mutex<u64>,
    tx: watch::Sender<T>,
}

impl<T: Clone> EntityCell<T> {
    /// Seed the cell with the result of the initial load.
    pub fn new(label: impl Into<String>, initial: T) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self {
            label: label.into(),
            next_ticket: AtomicU64::new(1),
            applied: Mutex::new(0),
            tx,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn begin_request(&self) -> Ticket {
        Ticket(self.next_ticket.fetch_add(1, Ordering::SeqCst))
    }

    /// Replace the cached value wholesale. Returns `false` when the response
    /// was older than what is already shown and got discarded.
    pub fn apply(&self, ticket: Ticket, value: T) -> bool {
        let mut applied = self.applied.lock().unwrap_or_else(PoisonError::into_inner);
        if ticket.0 <= *applied {
            api_metrics().record_stale_response();
            debug!(
                cell = %self.label,
                ticket = ticket.0,
                applied = *applied,
                "Discarding stale response"
            );
            return false;
        }
        *applied = ticket.0;
        self.tx.send_replace(value);
        true
    }

    pub fn current(&self) -> T {
        self.tx.borrow().clone()
    }

    pub fn with_current<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.tx.borrow())
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }

    pub fn last_applied(&self) -> u64 {
        *self.applied.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newer_ticket_replaces_value() {
        let cell = EntityCell::new("event:1", "pending".to_string());
        let ticket = cell.begin_request();

        assert!(cell.apply(ticket, "approved".to_string()));
        assert_eq!(cell.current(), "approved");
        assert_eq!(cell.last_applied(), ticket.value());
    }

    #[test]
    fn test_stale_response_is_discarded() {
        let cell = EntityCell::new("event:1", 0u32);

        // A poll goes out, then a manual refresh; the refresh lands first
        let poll = cell.begin_request();
        let refresh = cell.begin_request();
        assert!(cell.apply(refresh, 2));

        assert!(!cell.apply(poll, 1));
        assert_eq!(cell.current(), 2);
    }

    #[test]
    fn test_same_ticket_applies_once() {
        let cell = EntityCell::new("event:1", 0u32);
        let ticket = cell.begin_request();
        assert!(cell.apply(ticket, 1));
        assert!(!cell.apply(ticket, 5));
        assert_eq!(cell.current(), 1);
    }

    #[tokio::test]
    async fn test_subscribers_see_applied_values() {
        let cell = EntityCell::new("event:1", 0u32);
        let mut rx = cell.subscribe();

        let ticket = cell.begin_request();
        cell.apply(ticket, 7);

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), 7);
    }

    #[test]
    fn test_stale_response_does_not_wake_subscribers() {
        let cell = EntityCell::new("event:1", 0u32);
        let mut rx = cell.subscribe();

        let poll = cell.begin_request();
        let refresh = cell.begin_request();
        cell.apply(refresh, 2);
        rx.borrow_and_update();

        let mut changed = tokio_test::task::spawn(rx.changed());
        tokio_test::assert_pending!(changed.poll());

        cell.apply(poll, 1);
        assert!(!changed.is_woken());
        tokio_test::assert_pending!(changed.poll());
    }
}
