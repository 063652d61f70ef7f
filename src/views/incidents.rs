use statig::prelude::*;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use super::{replace_row, ErrorBanner};
use crate::api::{ApiError, EntityId, Incident, SharedApi};
use crate::config::PollingConfig;
use crate::lifecycle::{IncidentEvent, IncidentStatus, IncidentTracker};
use crate::sync::{FetchFn, InvokeError, LiveResource, PollPolicy, TransitionInvoker};

#[allow(clippy::ptr_arg)]
fn any_unresolved(incidents: &Vec<Incident>) -> bool {
    incidents.iter().any(|i| !i.status.is_resolved())
}

/// Incident board for one event. Advancing asks the server for the step
/// after its reported status. Trackers only keep the history seen here.
pub struct IncidentsView {
    api: SharedApi,
    resource: LiveResource<Vec<Incident>>,
    invoker: TransitionInvoker,
    trackers: Mutex<HashMap<EntityId, StateMachine<IncidentTracker>>>,
    banner: ErrorBanner,
}

impl IncidentsView {
    pub async fn mount(api: SharedApi, event_id: EntityId, polling: &PollingConfig) -> Result<Self, ApiError> {
        let fetch_api = api.clone();
        let fetch_id = event_id.clone();
        let fetch: FetchFn<Vec<Incident>> = Arc::new(move || {
            let api = fetch_api.clone();
            let id = fetch_id.clone();
            Box::pin(async move { api.list_incidents(&id).await })
        });

        let policy = PollPolicy::new(polling.incidents(), any_unresolved);
        let resource = LiveResource::mount(format!("incidents:{event_id}"), fetch, policy).await?;

        Ok(Self {
            api,
            resource,
            invoker: TransitionInvoker::new(),
            trackers: Mutex::new(HashMap::new()),
            banner: ErrorBanner::default(),
        })
    }

    pub fn incidents(&self) -> Vec<Incident> {
        self.resource.current()
    }

    pub fn error_banner(&self) -> Option<String> {
        self.banner.get()
    }

    pub fn is_polling(&self) -> bool {
        self.resource.is_polling()
    }

    pub async fn refresh(&self) -> Result<Vec<Incident>, ApiError> {
        self.resource.refresh().await
    }

    /// Record a server-reported status in the incident's tracker.
    fn observe(&self, id: &EntityId, status: &IncidentStatus) {
        let mut trackers = self.trackers.lock().unwrap_or_else(PoisonError::into_inner);
        let tracker = trackers
            .entry(id.clone())
            .or_insert_with(|| IncidentTracker::new(id.to_string()).state_machine());
        tracker.handle(&IncidentEvent::Observe(status.clone()));
    }

    /// Statuses the tracker has seen this incident move through.
    pub fn history(&self, id: &EntityId) -> Vec<IncidentStatus> {
        self.trackers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .map(|tracker| tracker.history().to_vec())
            .unwrap_or_default()
    }

    /// The status an advance would request, if any.
    pub fn next_status(&self, id: &EntityId) -> Option<IncidentStatus> {
        if self.invoker.is_pending(id.as_str()) {
            return None;
        }
        let status = self
            .resource
            .with_current(|rows| rows.iter().find(|i| &i.id == id).map(|i| i.status.clone()))?;
        self.observe(id, &status);
        status.next()
    }

    /// Move the incident one step along open, investigating, mitigating,
    /// resolved.
    pub async fn advance(&self, id: &EntityId) -> Result<Incident, InvokeError> {
        let reported = self
            .resource
            .with_current(|rows| rows.iter().find(|i| &i.id == id).map(|i| i.status.clone()))
            .ok_or_else(|| InvokeError::NotFound { entity: id.to_string() })?;

        self.observe(id, &reported);
        // The server's status decides the step; unrecognised ones offer none
        let next = reported
            .next()
            .ok_or_else(|| InvokeError::not_available("advance", &reported))?;

        let result = self
            .invoker
            .run_with(
                id.as_str(),
                self.resource.cell(),
                "advance_incident",
                self.api.update_incident_status(id, next),
                |rows: &Vec<Incident>, updated: &Incident| replace_row(rows, updated, |a, b| a.id == b.id),
            )
            .await;

        if let Ok(incident) = &result {
            self.observe(id, &incident.status);
        }
        self.banner.track(&result);
        result
    }

    pub fn unmount(&mut self) {
        self.resource.unmount();
    }
}
