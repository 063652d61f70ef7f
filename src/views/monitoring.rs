use std::sync::Arc;

use crate::api::{ApiError, EntityId, Event, MonitoringSnapshot, SharedApi};
use crate::config::PollingConfig;
use crate::sync::{FetchFn, LiveResource, PollPolicy};

/// One refresh of the monitoring dashboard.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitoringFrame {
    pub event: Event,
    /// Only fetched while the event is live.
    pub snapshot: Option<MonitoringSnapshot>,
}

impl MonitoringFrame {
    pub fn is_live(&self) -> bool {
        self.event.state.is_live()
    }
}

/// Live counters for a running event. Polls only while the event is live.
pub struct MonitoringView {
    resource: LiveResource<MonitoringFrame>,
}

impl MonitoringView {
    pub async fn mount(api: SharedApi, id: EntityId, polling: &PollingConfig) -> Result<Self, ApiError> {
        let fetch: FetchFn<MonitoringFrame> = Arc::new(move || {
            let api = api.clone();
            let id = id.clone();
            Box::pin(async move { fetch_frame(api, id).await })
        });

        let policy = PollPolicy::new(polling.monitoring(), MonitoringFrame::is_live);
        let resource = LiveResource::mount("monitoring", fetch, policy).await?;
        Ok(Self { resource })
    }

    pub fn frame(&self) -> MonitoringFrame {
        self.resource.current()
    }

    pub fn resource(&self) -> &LiveResource<MonitoringFrame> {
        &self.resource
    }

    pub fn is_polling(&self) -> bool {
        self.resource.is_polling()
    }

    pub async fn refresh(&self) -> Result<MonitoringFrame, ApiError> {
        self.resource.refresh().await
    }

    pub fn unmount(&mut self) {
        self.resource.unmount();
    }
}

async fn fetch_frame(api: SharedApi, id: EntityId) -> Result<MonitoringFrame, ApiError> {
    let event = api.get_event(&id).await?;
    let snapshot = if event.state.is_live() {
        Some(api.monitoring_snapshot(&id).await?)
    } else {
        None
    };
    Ok(MonitoringFrame { event, snapshot })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockEventApi;
    use crate::config::ExpoConsoleConfig;
    use serde_json::json;
    use std::time::Duration;

    fn event(state: &str) -> Event {
        serde_json::from_value(json!({ "id": 3, "title": "Auto Show", "state": state })).unwrap()
    }

    fn snapshot(active: u64) -> MonitoringSnapshot {
        serde_json::from_value(json!({ "event_id": 3, "active_visitors": active, "total_visits": 400 })).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_event_is_fetched_once_and_never_polled() {
        let mut api = MockEventApi::new();
        api.expect_get_event().times(1).returning(|_| Ok(event("closed")));
        api.expect_monitoring_snapshot().times(0);

        let polling = ExpoConsoleConfig::default().polling;
        let view = MonitoringView::mount(Arc::new(api), EntityId::from("3"), &polling)
            .await
            .unwrap();

        assert!(!view.is_polling());
        assert_eq!(view.frame().snapshot, None);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(view.resource().poll_stats().map(|s| s.fetches()), Some(0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_live_event_polls_every_ten_seconds() {
        let mut api = MockEventApi::new();
        api.expect_get_event().times(2).returning(|_| Ok(event("live")));
        let mut seq = mockall::Sequence::new();
        api.expect_monitoring_snapshot()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(snapshot(12)));
        api.expect_monitoring_snapshot()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(snapshot(19)));

        let polling = ExpoConsoleConfig::default().polling;
        let view = MonitoringView::mount(Arc::new(api), EntityId::from("3"), &polling)
            .await
            .unwrap();
        assert!(view.is_polling());
        assert_eq!(view.frame().snapshot.map(|s| s.active_visitors), Some(12));

        tokio::time::sleep(Duration::from_millis(10_500)).await;
        assert_eq!(view.frame().snapshot.map(|s| s.active_visitors), Some(19));
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_stops_when_event_closes() {
        let mut api = MockEventApi::new();
        let mut seq = mockall::Sequence::new();
        api.expect_get_event()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(event("live")));
        api.expect_get_event()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(event("closed")));
        api.expect_monitoring_snapshot().times(1).returning(|_| Ok(snapshot(5)));

        let polling = ExpoConsoleConfig::default().polling;
        let view = MonitoringView::mount(Arc::new(api), EntityId::from("3"), &polling)
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_secs(65)).await;
        assert!(!view.frame().is_live());
        assert!(!view.is_polling());
        assert_eq!(view.resource().poll_stats().map(|s| s.fetches()), Some(1));
    }
}
