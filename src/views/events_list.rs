use std::sync::Arc;

use super::{replace_row, ErrorBanner};
use crate::api::{ApiError, EntityId, Event, SharedApi};
use crate::config::PollingConfig;
use crate::lifecycle::{EventAction, EventState, Role};
use crate::sync::{ActionRequest, FetchFn, InvokeError, LiveResource, PollPolicy, TransitionInvoker};

/// Admin events table, optionally filtered by state.
pub struct EventsListView {
    api: SharedApi,
    filter: Option<EventState>,
    role: Role,
    resource: LiveResource<Vec<Event>>,
    invoker: TransitionInvoker,
    banner: ErrorBanner,
}

impl EventsListView {
    pub async fn mount(
        api: SharedApi,
        filter: Option<EventState>,
        role: Role,
        polling: &PollingConfig,
    ) -> Result<Self, ApiError> {
        let fetch_api = api.clone();
        let fetch_filter = filter.clone();
        let fetch: FetchFn<Vec<Event>> = Arc::new(move || {
            let api = fetch_api.clone();
            let filter = fetch_filter.clone();
            Box::pin(async move { api.list_events(filter).await })
        });

        let label = match &filter {
            Some(state) => format!("events:{state}"),
            None => "events".to_string(),
        };
        let resource = LiveResource::mount(label, fetch, PollPolicy::always(polling.events_list())).await?;

        Ok(Self {
            api,
            filter,
            role,
            resource,
            invoker: TransitionInvoker::new(),
            banner: ErrorBanner::default(),
        })
    }

    pub fn filter(&self) -> Option<&EventState> {
        self.filter.as_ref()
    }

    pub fn events(&self) -> Vec<Event> {
        self.resource.current()
    }

    pub fn resource(&self) -> &LiveResource<Vec<Event>> {
        &self.resource
    }

    /// Action buttons for one row; empty while that row has an action in
    /// flight or the row is gone.
    pub fn actions_for_row(&self, id: &EntityId) -> Vec<EventAction> {
        if self.invoker.is_pending(id.as_str()) {
            return Vec::new();
        }
        self.resource.with_current(|rows| {
            rows.iter()
                .find(|e| &e.id == id)
                .map(|e| self.role.actions_for(&e.state).to_vec())
                .unwrap_or_default()
        })
    }

    pub fn error_banner(&self) -> Option<String> {
        self.banner.get()
    }

    pub async fn refresh(&self) -> Result<Vec<Event>, ApiError> {
        self.resource.refresh().await
    }

    /// Run an admin action on one row. The response replaces that row only.
    pub async fn invoke(&self, id: &EntityId, request: ActionRequest) -> Result<Event, InvokeError> {
        let state = self
            .resource
            .with_current(|rows| rows.iter().find(|e| &e.id == id).map(|e| e.state.clone()))
            .ok_or_else(|| InvokeError::NotFound { entity: id.to_string() })?;

        if self.role != Role::Admin {
            return Err(InvokeError::not_available(request.action, state));
        }
        request.check(&state)?;

        let ActionRequest { action, reason, .. } = request;
        let result = self
            .invoker
            .run_with(
                id.as_str(),
                self.resource.cell(),
                action.as_str(),
                self.api.perform_action(id, action, reason),
                |rows: &Vec<Event>, updated: &Event| replace_row(rows, updated, |a, b| a.id == b.id),
            )
            .await;
        self.banner.track(&result);
        result
    }

    pub fn unmount(&mut self) {
        self.resource.unmount();
    }
}
