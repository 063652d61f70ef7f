use std::sync::Arc;

use super::{replace_row, ErrorBanner};
use crate::api::{ApiError, EntityId, Session, SharedApi};
use crate::config::PollingConfig;
use crate::lifecycle::{session_actions_for, SessionAction};
use crate::sync::{FetchFn, InvokeError, LiveResource, PollPolicy, TransitionInvoker};

#[allow(clippy::ptr_arg)]
fn any_open(sessions: &Vec<Session>) -> bool {
    sessions.iter().any(|s| !s.status.is_ended())
}

/// Live session management for one event.
///
/// Polls while at least one session has not ended.
pub struct SessionsView {
    api: SharedApi,
    event_id: EntityId,
    resource: LiveResource<Vec<Session>>,
    invoker: TransitionInvoker,
    banner: ErrorBanner,
}

impl SessionsView {
    pub async fn mount(api: SharedApi, event_id: EntityId, polling: &PollingConfig) -> Result<Self, ApiError> {
        let fetch_api = api.clone();
        let fetch_id = event_id.clone();
        let fetch: FetchFn<Vec<Session>> = Arc::new(move || {
            let api = fetch_api.clone();
            let id = fetch_id.clone();
            Box::pin(async move { api.list_sessions(&id).await })
        });

        let policy = PollPolicy::new(polling.sessions(), any_open);
        let resource = LiveResource::mount(format!("sessions:{event_id}"), fetch, policy).await?;

        Ok(Self {
            api,
            event_id,
            resource,
            invoker: TransitionInvoker::new(),
            banner: ErrorBanner::default(),
        })
    }

    pub fn event_id(&self) -> &EntityId {
        &self.event_id
    }

    pub fn sessions(&self) -> Vec<Session> {
        self.resource.current()
    }

    pub fn actions_for(&self, session_id: &EntityId) -> Vec<SessionAction> {
        if self.invoker.is_pending(session_id.as_str()) {
            return Vec::new();
        }
        self.resource.with_current(|rows| {
            rows.iter()
                .find(|s| &s.id == session_id)
                .map(|s| session_actions_for(&s.status).to_vec())
                .unwrap_or_default()
        })
    }

    pub fn error_banner(&self) -> Option<String> {
        self.banner.get()
    }

    pub fn resource(&self) -> &LiveResource<Vec<Session>> {
        &self.resource
    }

    pub fn is_polling(&self) -> bool {
        self.resource.is_polling()
    }

    pub async fn refresh(&self) -> Result<Vec<Session>, ApiError> {
        self.resource.refresh().await
    }

    pub async fn start(&self, session_id: &EntityId) -> Result<Session, InvokeError> {
        self.perform(session_id, SessionAction::Start).await
    }

    pub async fn end(&self, session_id: &EntityId) -> Result<Session, InvokeError> {
        self.perform(session_id, SessionAction::End).await
    }

    async fn perform(&self, session_id: &EntityId, action: SessionAction) -> Result<Session, InvokeError> {
        let status = self
            .resource
            .with_current(|rows| rows.iter().find(|s| &s.id == session_id).map(|s| s.status.clone()))
            .ok_or_else(|| InvokeError::NotFound {
                entity: session_id.to_string(),
            })?;
        if !session_actions_for(&status).contains(&action) {
            return Err(InvokeError::not_available(action, status));
        }

        let result = self
            .invoker
            .run_with(
                session_id.as_str(),
                self.resource.cell(),
                action.as_str(),
                self.api.perform_session_action(session_id, action),
                |rows: &Vec<Session>, updated: &Session| replace_row(rows, updated, |a, b| a.id == b.id),
            )
            .await;
        self.banner.track(&result);
        result
    }

    pub fn unmount(&mut self) {
        self.resource.unmount();
    }
}
