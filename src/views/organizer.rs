use thiserror::Error;
use tracing::info;

use super::{event_fetch, not_terminal};
use crate::api::{ApiError, EntityId, Event, EventApi, ProofFile, SharedApi};
use crate::config::PollingConfig;
use crate::lifecycle::{EventState, Role};
use crate::sync::{EntityCell, InvokeError, LiveResource, PollPolicy, TransitionInvoker};

#[derive(Debug, Error)]
pub enum ProofError {
    #[error("no payment proof file selected")]
    NoFileSelected,

    #[error("payment proof is not accepted while the event is {0}")]
    NotAccepting(EventState),

    #[error("a payment proof upload is already in progress")]
    InProgress,

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl ProofError {
    pub fn user_message(&self) -> String {
        match self {
            ProofError::Api(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

/// Payment proof upload form on the organizer page.
#[derive(Debug, Default)]
pub struct ProofForm {
    file: Option<ProofFile>,
    invoker: TransitionInvoker,
}

impl ProofForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(&mut self, file: ProofFile) {
        self.file = Some(file);
    }

    pub fn clear(&mut self) {
        self.file = None;
    }

    pub fn selected(&self) -> Option<&ProofFile> {
        self.file.as_ref()
    }

    pub fn is_submitting(&self) -> bool {
        self.invoker.pending_count() > 0
    }

    /// The submit button is enabled.
    pub fn can_submit(&self, state: &EventState) -> bool {
        *state == EventState::WaitingForPayment && self.file.is_some() && !self.is_submitting()
    }

    /// Upload the selected file. On success the response replaces the
    /// cached event; on failure the cache keeps its current state.
    pub async fn submit(&self, api: &dyn EventApi, cell: &EntityCell<Event>) -> Result<Event, ProofError> {
        let (id, state) = cell.with_current(|e| (e.id.clone(), e.state.clone()));
        if state != EventState::WaitingForPayment {
            return Err(ProofError::NotAccepting(state));
        }
        let file = self.file.clone().ok_or(ProofError::NoFileSelected)?;
        info!(event_id = %id, file = %file.file_name, bytes = file.bytes.len(), "Submitting payment proof");

        self.invoker
            .run(id.as_str(), cell, "payment_proof", api.submit_payment_proof(&id, file))
            .await
            .map_err(|e| match e {
                InvokeError::Api(api_error) => ProofError::Api(api_error),
                _ => ProofError::InProgress,
            })
    }
}

/// Organizer's report for one of their events, with the payment proof form.
pub struct OrganizerView {
    api: SharedApi,
    resource: LiveResource<Event>,
    form: ProofForm,
    last_error: Option<String>,
}

impl OrganizerView {
    pub async fn mount(api: SharedApi, id: EntityId, polling: &PollingConfig) -> Result<Self, ApiError> {
        let policy = PollPolicy::new(polling.organizer_report(), not_terminal);
        let resource = LiveResource::mount(format!("organizer:{id}"), event_fetch(api.clone(), id), policy).await?;

        Ok(Self {
            api,
            resource,
            form: ProofForm::new(),
            last_error: None,
        })
    }

    pub fn event(&self) -> Event {
        self.resource.current()
    }

    pub fn form(&self) -> &ProofForm {
        &self.form
    }

    pub fn select_file(&mut self, file: ProofFile) {
        self.form.select(file);
    }

    pub fn can_submit(&self) -> bool {
        self.resource.with_current(|e| {
            Role::Organizer.can_submit_payment_proof(&e.state) && self.form.can_submit(&e.state)
        })
    }

    pub fn error_banner(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_polling(&self) -> bool {
        self.resource.is_polling()
    }

    pub async fn refresh(&self) -> Result<Event, ApiError> {
        self.resource.refresh().await
    }

    pub async fn submit_proof(&mut self) -> Result<Event, ProofError> {
        let result = self.form.submit(self.api.as_ref(), self.resource.cell()).await;
        match &result {
            Ok(_) => {
                self.form.clear();
                self.last_error = None;
            }
            Err(e @ ProofError::Api(_)) => self.last_error = Some(e.user_message()),
            Err(_) => {}
        }
        result
    }

    pub fn unmount(&mut self) {
        self.resource.unmount();
    }
}
