use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};

use super::poller::{spawn_poller, PollHandle, PollPolicy, PollStats};
use super::store::EntityCell;
use super::{ErrorOrigin, FetchFn};
use crate::api::ApiError;

/// A server-owned value kept fresh for as long as a view is mounted.
///
/// Mounting performs the initial fetch; its error is returned to the caller.
/// Only after it succeeds is the poller started. Manual refreshes surface
/// their errors too; background polls never do.
pub struct LiveResource<T> {
    cell: Arc<EntityCell<T>>,
    fetch: FetchFn<T>,
    policy: PollPolicy<T>,
    poller: Option<PollHandle>,
}

impl<T> LiveResource<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub async fn mount(label: impl Into<String>, fetch: FetchFn<T>, policy: PollPolicy<T>) -> Result<Self, ApiError> {
        let label = label.into();
        let initial = fetch().await.inspect_err(|e| {
            error!(cell = %label, origin = ?ErrorOrigin::InitialLoad, error = %e, "Initial load failed");
        })?;

        let cell = Arc::new(EntityCell::new(label, initial));
        let poller = spawn_poller(cell.clone(), policy, fetch.clone());
        info!(cell = %cell.label(), "Resource mounted");

        Ok(Self {
            cell,
            fetch,
            policy,
            poller: Some(poller),
        })
    }

    /// User-initiated refetch. Errors are returned; the cached value is
    /// left untouched on failure.
    pub async fn refresh(&self) -> Result<T, ApiError> {
        let ticket = self.cell.begin_request();
        let value = (self.fetch)().await.inspect_err(|e| {
            error!(cell = %self.cell.label(), origin = ?ErrorOrigin::Manual, error = %e, "Refresh failed");
        })?;
        self.cell.apply(ticket, value.clone());
        Ok(value)
    }

    pub fn current(&self) -> T {
        self.cell.current()
    }

    pub fn with_current<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.cell.with_current(f)
    }

    pub fn cell(&self) -> &Arc<EntityCell<T>> {
        &self.cell
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.cell.subscribe()
    }

    /// Mounted and the policy currently allows polling.
    pub fn is_polling(&self) -> bool {
        self.poller.is_some() && self.cell.with_current(|v| self.policy.is_active(v))
    }

    pub fn poll_stats(&self) -> Option<&PollStats> {
        self.poller.as_ref().map(PollHandle::stats)
    }

    /// Stop polling. Also happens on drop.
    pub fn unmount(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.stop();
            info!(cell = %self.cell.label(), "Resource unmounted");
        }
    }
}
