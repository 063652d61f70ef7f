use chrono::{DateTime, Duration, Utc};
use std::fmt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::debug;

use crate::api::Event;
use crate::lifecycle::EventState;

const TICK: std::time::Duration = std::time::Duration::from_secs(1);

/// Render a positive duration as `Dd Hh Mm Ss`, leaving out leading zero
/// units. Sub-second remainders are truncated.
pub fn format_remaining(remaining: Duration) -> String {
    let total = remaining.num_seconds().max(0);
    let units = [
        (total / 86_400, "d"),
        ((total % 86_400) / 3_600, "h"),
        ((total % 3_600) / 60, "m"),
        (total % 60, "s"),
    ];

    let parts: Vec<String> = units
        .iter()
        .skip_while(|(value, unit)| *value == 0 && *unit != "s")
        .map(|(value, unit)| format!("{value}{unit}"))
        .collect();
    parts.join(" ")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountdownDisplay {
    Remaining(String),
    PastDue,
}

impl CountdownDisplay {
    pub fn is_past_due(&self) -> bool {
        matches!(self, CountdownDisplay::PastDue)
    }
}

impl fmt::Display for CountdownDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CountdownDisplay::Remaining(text) => f.write_str(text),
            CountdownDisplay::PastDue => f.write_str("Past due"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    pub target: DateTime<Utc>,
}

impl Countdown {
    pub fn new(target: DateTime<Utc>) -> Self {
        Self { target }
    }

    pub fn display_at(&self, now: DateTime<Utc>) -> CountdownDisplay {
        let remaining = self.target - now;
        if remaining <= Duration::zero() {
            CountdownDisplay::PastDue
        } else {
            CountdownDisplay::Remaining(format_remaining(remaining))
        }
    }

    pub fn display(&self) -> CountdownDisplay {
        self.display_at(Utc::now())
    }
}

/// What an event's countdown counts toward: the start before it goes live,
/// the end while it is live.
pub fn countdown_target(event: &Event) -> Option<DateTime<Utc>> {
    match &event.state {
        EventState::Live => event.end_date,
        state if state.is_upcoming() => event.start_date,
        _ => None,
    }
}

/// Once-a-second countdown publishing on a `watch` channel.
///
/// `retarget` recomputes right away instead of waiting for the next tick.
/// The display is `None` while there is no target. Dropping the ticker
/// stops it.
#[derive(Debug)]
pub struct CountdownTicker {
    target: watch::Sender<Option<DateTime<Utc>>>,
    display: watch::Receiver<Option<CountdownDisplay>>,
    task: JoinHandle<()>,
}

impl CountdownTicker {
    pub fn spawn(target: Option<DateTime<Utc>>) -> Self {
        let (target_tx, target_rx) = watch::channel(target);
        let initial = target.map(|t| Countdown::new(t).display());
        let (display_tx, display_rx) = watch::channel(initial);
        let task = tokio::spawn(tick(target_rx, display_tx));

        Self {
            target: target_tx,
            display: display_rx,
            task,
        }
    }

    pub fn retarget(&self, target: Option<DateTime<Utc>>) {
        self.target.send_if_modified(|current| {
            if *current == target {
                return false;
            }
            *current = target;
            true
        });
    }

    pub fn current(&self) -> Option<CountdownDisplay> {
        self.display.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<CountdownDisplay>> {
        self.display.clone()
    }
}

impl Drop for CountdownTicker {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn tick(
    mut target: watch::Receiver<Option<DateTime<Utc>>>,
    display: watch::Sender<Option<CountdownDisplay>>,
) {
    let mut ticker = time::interval(TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            changed = target.changed() => {
                if changed.is_err() {
                    break;
                }
                debug!("Countdown retargeted");
                ticker.reset();
            }
        }

        let next = (*target.borrow_and_update()).map(|t| Countdown::new(t).display());
        display.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_drops_leading_zero_units() {
        assert_eq!(format_remaining(Duration::seconds(3661)), "1h 1m 1s");
        assert_eq!(format_remaining(Duration::seconds(59)), "59s");
        assert_eq!(format_remaining(Duration::seconds(90061)), "1d 1h 1m 1s");
    }

    #[test]
    fn test_format_keeps_inner_zero_units() {
        assert_eq!(format_remaining(Duration::seconds(86_400)), "1d 0h 0m 0s");
        assert_eq!(format_remaining(Duration::seconds(3_605)), "1h 0m 5s");
        assert_eq!(format_remaining(Duration::milliseconds(400)), "0s");
    }

    #[test]
    fn test_display_switches_to_past_due() {
        let now = Utc::now();
        let ahead = Countdown::new(now + Duration::milliseconds(3_661_000));
        assert_eq!(ahead.display_at(now), CountdownDisplay::Remaining("1h 1m 1s".to_string()));

        let behind = Countdown::new(now - Duration::milliseconds(1_000));
        assert_eq!(behind.display_at(now), CountdownDisplay::PastDue);
        assert_eq!(Countdown::new(now).display_at(now), CountdownDisplay::PastDue);
        assert_eq!(CountdownDisplay::PastDue.to_string(), "Past due");
    }

    #[test]
    fn test_target_follows_event_state() {
        let mut event: Event = serde_json::from_value(json!({
            "id": 1,
            "state": "payment_done",
            "start_date": "2026-05-01T09:00:00Z",
            "end_date": "2026-05-03T18:00:00Z"
        }))
        .unwrap();

        assert_eq!(countdown_target(&event), event.start_date);

        event.state = EventState::Live;
        assert_eq!(countdown_target(&event), event.end_date);

        event.state = EventState::Closed;
        assert_eq!(countdown_target(&event), None);
    }

    #[tokio::test]
    async fn test_ticker_recomputes_on_retarget() {
        let ticker = CountdownTicker::spawn(Some(Utc::now() + Duration::days(2)));
        let initial = ticker.current();
        assert!(
            matches!(initial, Some(CountdownDisplay::Remaining(ref text)) if text.starts_with("1d") || text.starts_with("2d"))
        );

        let mut rx = ticker.subscribe();
        ticker.retarget(Some(Utc::now() - Duration::seconds(5)));
        rx.wait_for(|display| *display == Some(CountdownDisplay::PastDue))
            .await
            .unwrap();

        ticker.retarget(None);
        rx.wait_for(Option::is_none).await.unwrap();
        assert_eq!(ticker.current(), None);
    }
}
