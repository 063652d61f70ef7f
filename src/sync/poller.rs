use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use super::store::EntityCell;
use super::{ErrorOrigin, FetchFn};
use crate::observability::api_metrics;

/// How often to refetch and when polling is worthwhile at all.
pub struct PollPolicy<T> {
    pub interval: Duration,
    /// Polling is suspended while this returns `false` for the cached value.
    pub active_when: fn(&T) -> bool,
}

impl<T> PollPolicy<T> {
    pub fn new(interval: Duration, active_when: fn(&T) -> bool) -> Self {
        Self { interval, active_when }
    }

    /// Poll on every tick regardless of the cached value.
    pub fn always(interval: Duration) -> Self {
        Self {
            interval,
            active_when: |_| true,
        }
    }

    pub fn is_active(&self, value: &T) -> bool {
        (self.active_when)(value)
    }
}

impl<T> Clone for PollPolicy<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for PollPolicy<T> {}

#[derive(Debug, Default)]
pub struct PollStats {
    pub fetches: AtomicU64,
    pub failures: AtomicU64,
}

impl PollStats {
    pub fn fetches(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}

/// Running poller. Dropping the handle stops it.
#[derive(Debug)]
pub struct PollHandle {
    label: String,
    task: JoinHandle<()>,
    stats: Arc<PollStats>,
}

impl PollHandle {
    pub fn stats(&self) -> &PollStats {
        &self.stats
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    pub fn stop(self) {
        // Drop does the work
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.task.abort();
        debug!(cell = %self.label, "Poller stopped");
    }
}

/// Start polling `fetch` into `cell`.
///
/// The first tick fires one interval from now; the caller is expected to
/// have done the initial fetch already. While `policy.active_when` is false
/// for the cached value the interval is not ticking at all; the poller
/// waits for the cell to change and re-arms a full interval once the
/// predicate holds again. Poll failures never reach the caller: they are
/// logged and counted and the stale value stays in place.
pub fn spawn_poller<T>(cell: Arc<EntityCell<T>>, policy: PollPolicy<T>, fetch: FetchFn<T>) -> PollHandle
where
    T: Clone + Send + Sync + 'static,
{
    let stats = Arc::new(PollStats::default());
    let label = cell.label().to_string();
    let start = Instant::now() + policy.interval;
    let task = tokio::spawn(run(cell, policy, fetch, stats.clone(), start));
    debug!(cell = %label, interval_ms = policy.interval.as_millis() as u64, "Poller started");

    PollHandle { label, task, stats }
}

async fn run<T>(
    cell: Arc<EntityCell<T>>,
    policy: PollPolicy<T>,
    fetch: FetchFn<T>,
    stats: Arc<PollStats>,
    start: Instant,
) where
    T: Clone + Send + Sync + 'static,
{
    let mut updates = cell.subscribe();
    let mut ticker = time::interval_at(start, policy.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let active = policy.is_active(&updates.borrow_and_update());

        if !active {
            debug!(cell = %cell.label(), "Polling suspended");
            if updates.changed().await.is_err() {
                break;
            }
            if policy.is_active(&updates.borrow()) {
                debug!(cell = %cell.label(), "Polling resumed");
                ticker.reset();
            }
            continue;
        }

        tokio::select! {
            _ = ticker.tick() => poll_once(&cell, &fetch, &stats).await,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }
}

async fn poll_once<T>(cell: &EntityCell<T>, fetch: &FetchFn<T>, stats: &PollStats)
where
    T: Clone + Send + Sync + 'static,
{
    let ticket = cell.begin_request();
    stats.fetches.fetch_add(1, Ordering::Relaxed);

    match fetch().await {
        Ok(value) => {
            cell.apply(ticket, value);
        }
        Err(e) => {
            stats.failures.fetch_add(1, Ordering::Relaxed);
            api_metrics().record_poll_failure();
            warn!(
                cell = %cell.label(),
                origin = ?ErrorOrigin::BackgroundPoll,
                error = %e,
                "Background poll failed, keeping last known value"
            );
        }
    }
}
