//! Page-level state for each console screen: a polled resource, its action
//! gate and the banner for the last failed action.

pub mod event_detail;
pub mod events_list;
pub mod incidents;
pub mod monitoring;
pub mod organizer;
pub mod sessions;

use std::sync::{Mutex, PoisonError};

use crate::api::{EntityId, Event, SharedApi};
use crate::sync::{FetchFn, InvokeError};

pub use event_detail::EventDetailView;
pub use events_list::EventsListView;
pub use incidents::IncidentsView;
pub use monitoring::{MonitoringFrame, MonitoringView};
pub use organizer::{OrganizerView, ProofError, ProofForm};
pub use sessions::SessionsView;

pub(crate) fn event_fetch(api: SharedApi, id: EntityId) -> FetchFn<Event> {
    std::sync::Arc::new(move || {
        let api = api.clone();
        let id = id.clone();
        Box::pin(async move { api.get_event(&id).await })
    })
}

pub(crate) fn not_terminal(event: &Event) -> bool {
    !event.state.is_terminal()
}

/// Last mutation error, shown until the next action succeeds or the user
/// dismisses it.
#[derive(Debug, Default)]
pub struct ErrorBanner(Mutex<Option<String>>);

impl ErrorBanner {
    pub fn get(&self) -> Option<String> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn clear(&self) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Record the outcome of an action. Only server failures are kept;
    /// local refusals are returned to the caller as they are.
    pub(crate) fn track<T>(&self, result: &Result<T, InvokeError>) {
        let mut slot = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        match result {
            Ok(_) => *slot = None,
            Err(e @ InvokeError::Api(_)) => *slot = Some(e.user_message()),
            Err(_) => {}
        }
    }
}

/// Replace the row with a matching id; used after a row-level mutation.
pub(crate) fn replace_row<T: Clone>(rows: &[T], updated: &T, same: impl Fn(&T, &T) -> bool) -> Vec<T> {
    rows.iter()
        .map(|row| if same(row, updated) { updated.clone() } else { row.clone() })
        .collect()
}
