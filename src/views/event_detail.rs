use tracing::Instrument;

use super::{event_fetch, not_terminal, ErrorBanner};
use crate::api::{ApiError, EntityId, Event, SharedApi};
use crate::config::PollingConfig;
use crate::countdown::{countdown_target, Countdown, CountdownDisplay};
use crate::lifecycle::{EventAction, Role};
use crate::sync::{ActionRequest, InvokeError, LiveResource, PollPolicy, TransitionInvoker};
use crate::telemetry::create_view_span;

/// Single event page: details, countdown and the admin action buttons.
///
/// Polls while the event can still change state.
pub struct EventDetailView {
    api: SharedApi,
    role: Role,
    resource: LiveResource<Event>,
    invoker: TransitionInvoker,
    banner: ErrorBanner,
}

impl EventDetailView {
    pub async fn mount(api: SharedApi, id: EntityId, role: Role, polling: &PollingConfig) -> Result<Self, ApiError> {
        let span = create_view_span("event_detail", id.as_str());
        let policy = PollPolicy::new(polling.event_detail(), not_terminal);
        let resource = LiveResource::mount(format!("event:{id}"), event_fetch(api.clone(), id), policy)
            .instrument(span)
            .await?;

        Ok(Self {
            api,
            role,
            resource,
            invoker: TransitionInvoker::new(),
            banner: ErrorBanner::default(),
        })
    }

    pub fn event(&self) -> Event {
        self.resource.current()
    }

    pub fn resource(&self) -> &LiveResource<Event> {
        &self.resource
    }

    pub fn is_busy(&self) -> bool {
        self.resource.with_current(|e| self.invoker.is_pending(e.id.as_str()))
    }

    /// Buttons to offer right now. Empty while an action is in flight.
    pub fn available_actions(&self) -> Vec<EventAction> {
        if self.is_busy() {
            return Vec::new();
        }
        self.resource
            .with_current(|e| self.role.actions_for(&e.state).to_vec())
    }

    pub fn countdown(&self) -> Option<CountdownDisplay> {
        self.resource
            .with_current(countdown_target)
            .map(|target| Countdown::new(target).display())
    }

    pub fn error_banner(&self) -> Option<String> {
        self.banner.get()
    }

    pub fn dismiss_error(&self) {
        self.banner.clear();
    }

    pub fn is_polling(&self) -> bool {
        self.resource.is_polling()
    }

    pub async fn refresh(&self) -> Result<Event, ApiError> {
        self.resource.refresh().await
    }

    pub async fn invoke(&self, request: ActionRequest) -> Result<Event, InvokeError> {
        if self.role != Role::Admin {
            let state = self.resource.with_current(|e| e.state.clone());
            return Err(InvokeError::not_available(request.action, state));
        }

        let result = self
            .invoker
            .invoke_event(self.api.as_ref(), self.resource.cell(), request)
            .await;
        self.banner.track(&result);
        result
    }

    pub fn unmount(&mut self) {
        self.resource.unmount();
    }
}
