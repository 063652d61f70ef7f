use std::collections::HashSet;
use std::future::Future;
use std::sync::{Mutex, PoisonError};
use thiserror::Error;
use tracing::{info, warn};

use super::store::EntityCell;
use super::ErrorOrigin;
use crate::api::{ApiError, Event, EventApi};
use crate::lifecycle::{is_enabled, EventAction, EventState};
use crate::observability::{api_metrics, OperationTimer};

#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("'{action}' is not available while {state}")]
    NotAvailable { action: String, state: String },

    #[error("{entity} is not in the current listing")]
    NotFound { entity: String },

    #[error("'{0}' must be confirmed before it is sent")]
    ConfirmationRequired(EventAction),

    #[error("another action on {entity} is still in progress")]
    Busy { entity: String },

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl InvokeError {
    pub fn not_available(action: impl std::fmt::Display, state: impl std::fmt::Display) -> Self {
        InvokeError::NotAvailable {
            action: action.to_string(),
            state: state.to_string(),
        }
    }

    /// Text for the view's error banner.
    pub fn user_message(&self) -> String {
        match self {
            InvokeError::Api(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

/// Proof that the user confirmed one specific action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Confirmation(EventAction);

impl Confirmation {
    pub fn confirm(action: EventAction) -> Self {
        Self(action)
    }

    pub fn covers(&self, action: EventAction) -> bool {
        self.0 == action
    }
}

/// One admin action plus its optional reason and confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRequest {
    pub action: EventAction,
    pub reason: Option<String>,
    confirmation: Option<Confirmation>,
}

impl ActionRequest {
    pub fn new(action: EventAction) -> Self {
        Self {
            action,
            reason: None,
            confirmation: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_confirmation(mut self, confirmation: Confirmation) -> Self {
        self.confirmation = Some(confirmation);
        self
    }

    /// Shorthand for confirming the request's own action.
    pub fn confirmed(self) -> Self {
        let confirmation = Confirmation::confirm(self.action);
        self.with_confirmation(confirmation)
    }

    pub fn is_confirmed(&self) -> bool {
        self.confirmation.is_some_and(|c| c.covers(self.action))
    }

    /// Gate and confirmation checks against the cached state. Nothing is
    /// sent when this fails.
    pub fn check(&self, state: &EventState) -> Result<(), InvokeError> {
        if !is_enabled(state, self.action) {
            return Err(InvokeError::not_available(self.action, state));
        }
        if self.action.requires_confirmation() && !self.is_confirmed() {
            return Err(InvokeError::ConfirmationRequired(self.action));
        }
        Ok(())
    }
}

/// Runs mutations against cached entities, one at a time per entity.
///
/// A successful response replaces the cached value; a failed one leaves it
/// exactly as it was.
#[derive(Debug, Default)]
pub struct TransitionInvoker {
    in_flight: Mutex<HashSet<String>>,
}

struct InFlightGuard<'a> {
    invoker: &'a TransitionInvoker,
    key: String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.invoker.lock().remove(&self.key);
    }
}

impl TransitionInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_pending(&self, key: &str) -> bool {
        self.lock().contains(key)
    }

    pub fn pending_count(&self) -> usize {
        self.lock().len()
    }

    fn acquire(&self, key: &str) -> Result<InFlightGuard<'_>, InvokeError> {
        if !self.lock().insert(key.to_string()) {
            return Err(InvokeError::Busy {
                entity: key.to_string(),
            });
        }
        Ok(InFlightGuard {
            invoker: self,
            key: key.to_string(),
        })
    }

    /// Run `request` for the entity `key`; its response replaces `cell`.
    pub async fn run<T, F>(&self, key: &str, cell: &EntityCell<T>, label: &str, request: F) -> Result<T, InvokeError>
    where
        T: Clone,
        F: Future<Output = Result<T, ApiError>>,
    {
        self.run_with(key, cell, label, request, |_, response: &T| response.clone())
            .await
    }

    /// Like [`run`](Self::run) but the response is folded into the cached
    /// value by `merge`, e.g. to replace one row of a list.
    pub async fn run_with<T, R, F, M>(
        &self,
        key: &str,
        cell: &EntityCell<T>,
        label: &str,
        request: F,
        merge: M,
    ) -> Result<R, InvokeError>
    where
        T: Clone,
        F: Future<Output = Result<R, ApiError>>,
        M: FnOnce(&T, &R) -> T,
    {
        let _guard = self.acquire(key)?;
        let timer = OperationTimer::new(&format!("{label}:{key}"));

        let result = request.await;
        api_metrics().record_mutation(result.is_ok());
        timer.finish();

        match result {
            Ok(response) => {
                // Ticketed on arrival so polls issued meanwhile count as older
                let ticket = cell.begin_request();
                let next = cell.with_current(|current| merge(current, &response));
                cell.apply(ticket, next);
                info!(entity = %key, action = %label, "Action applied");
                Ok(response)
            }
            Err(e) => {
                warn!(
                    entity = %key,
                    action = %label,
                    origin = ?ErrorOrigin::Mutation,
                    error = %e,
                    "Action failed, cached value unchanged"
                );
                Err(e.into())
            }
        }
    }

    /// Gate-checked admin action on a single cached event.
    pub async fn invoke_event(
        &self,
        api: &dyn EventApi,
        cell: &EntityCell<Event>,
        request: ActionRequest,
    ) -> Result<Event, InvokeError> {
        let (id, state) = cell.with_current(|event| (event.id.clone(), event.state.clone()));
        request.check(&state)?;

        let ActionRequest { action, reason, .. } = request;
        self.run(id.as_str(), cell, action.as_str(), api.perform_action(&id, action, reason))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{EntityId, MockEventApi};
    use serde_json::json;
    use tokio::sync::oneshot;

    fn event(state: &str) -> Event {
        serde_json::from_value(json!({
            "id": 42,
            "title": "Spring Expo",
            "state": state,
            "venue": "Hall B"
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_success_replaces_cached_event_verbatim() {
        let mut approved = event("waiting_for_payment");
        approved.payment_amount = Some(1500.0);
        let response = approved.clone();

        let mut api = MockEventApi::new();
        api.expect_perform_action()
            .withf(|id, action, reason| id.as_str() == "42" && *action == EventAction::Approve && reason.is_none())
            .times(1)
            .returning(move |_, _, _| Ok(response.clone()));

        let cell = EntityCell::new("event:42", event("pending_approval"));
        let invoker = TransitionInvoker::new();

        let result = invoker
            .invoke_event(&api, &cell, ActionRequest::new(EventAction::Approve))
            .await
            .unwrap();

        assert_eq!(result, approved);
        assert_eq!(cell.current(), approved);
        assert!(!invoker.is_pending("42"));
    }

    #[tokio::test]
    async fn test_failure_leaves_cached_event_untouched() {
        let mut api = MockEventApi::new();
        api.expect_perform_action().times(1).returning(|_, _, _| {
            Err(ApiError::Http {
                status: 409,
                message: "Event was already approved".to_string(),
            })
        });

        let before = event("pending_approval");
        let cell = EntityCell::new("event:42", before.clone());
        let invoker = TransitionInvoker::new();

        let err = invoker
            .invoke_event(&api, &cell, ActionRequest::new(EventAction::Approve))
            .await
            .unwrap_err();

        assert_eq!(err.user_message(), "Event was already approved");
        assert_eq!(cell.current(), before);
        assert!(!invoker.is_pending("42"));
    }

    #[tokio::test]
    async fn test_reject_carries_reason() {
        let rejected = event("rejected");
        let mut api = MockEventApi::new();
        api.expect_perform_action()
            .withf(|_, action, reason| *action == EventAction::Reject && reason.as_deref() == Some("Incomplete floor plan"))
            .times(1)
            .returning(move |_, _, _| Ok(rejected.clone()));

        let cell = EntityCell::new("event:42", event("pending_approval"));
        let invoker = TransitionInvoker::new();
        let request = ActionRequest::new(EventAction::Reject).with_reason("Incomplete floor plan");

        let result = invoker.invoke_event(&api, &cell, request).await.unwrap();
        assert_eq!(result.state, EventState::Rejected);
    }

    #[tokio::test]
    async fn test_gated_actions_need_confirmation() {
        let mut api = MockEventApi::new();
        api.expect_perform_action().times(0);

        let cell = EntityCell::new("event:42", event("payment_done"));
        let invoker = TransitionInvoker::new();

        let err = invoker
            .invoke_event(&api, &cell, ActionRequest::new(EventAction::ForceStart))
            .await
            .unwrap_err();
        assert!(matches!(err, InvokeError::ConfirmationRequired(EventAction::ForceStart)));

        // A confirmation for a different action does not count
        let request =
            ActionRequest::new(EventAction::ForceStart).with_confirmation(Confirmation::confirm(EventAction::ForceClose));
        let err = invoker.invoke_event(&api, &cell, request).await.unwrap_err();
        assert!(matches!(err, InvokeError::ConfirmationRequired(_)));
    }

    #[tokio::test]
    async fn test_unavailable_action_is_rejected_locally() {
        let mut api = MockEventApi::new();
        api.expect_perform_action().times(0);

        let cell = EntityCell::new("event:42", event("live"));
        let invoker = TransitionInvoker::new();

        let err = invoker
            .invoke_event(&api, &cell, ActionRequest::new(EventAction::Approve))
            .await
            .unwrap_err();
        match err {
            InvokeError::NotAvailable { action, state } => {
                assert_eq!(action, "approve");
                assert_eq!(state, "live");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_second_action_while_pending_is_busy() {
        let cell = EntityCell::new("event:42", event("pending_approval"));
        let invoker = TransitionInvoker::new();
        let (tx, rx) = oneshot::channel::<Result<Event, ApiError>>();

        let first = invoker.run("42", &cell, "approve", async move { rx.await.unwrap() });
        tokio::pin!(first);

        // Drive the first action until it is waiting on the server
        tokio::select! {
            biased;
            _ = &mut first => panic!("first action should still be pending"),
            _ = async {} => {}
        }
        assert!(invoker.is_pending("42"));

        let mut api = MockEventApi::new();
        api.expect_perform_action().times(0);
        let err = invoker
            .invoke_event(&api, &cell, ActionRequest::new(EventAction::Reject))
            .await
            .unwrap_err();
        assert!(matches!(err, InvokeError::Busy { ref entity } if entity == "42"));

        tx.send(Ok(event("waiting_for_payment"))).unwrap();
        let applied = first.await.unwrap();
        assert_eq!(applied.state, EventState::WaitingForPayment);
        assert!(!invoker.is_pending("42"));
    }

    #[tokio::test]
    async fn test_poll_landing_mid_action_does_not_hide_the_response() {
        let cell = EntityCell::new("event:42", event("pending_approval"));
        let invoker = TransitionInvoker::new();
        let (tx, rx) = oneshot::channel::<Result<Event, ApiError>>();

        let action = invoker.run("42", &cell, "approve", async move { rx.await.unwrap() });
        tokio::pin!(action);
        tokio::select! {
            biased;
            _ = &mut action => panic!("action should still be waiting on the server"),
            _ = async {} => {}
        }

        // A poll goes out and reads the pre-approval state
        let poll = cell.begin_request();
        assert!(cell.apply(poll, event("pending_approval")));

        tx.send(Ok(event("waiting_for_payment"))).unwrap();
        let applied = action.await.unwrap();

        assert_eq!(applied.state, EventState::WaitingForPayment);
        assert_eq!(cell.current().state, EventState::WaitingForPayment);
    }

    #[tokio::test]
    async fn test_poll_issued_before_action_completes_is_discarded() {
        let cell = EntityCell::new("event:42", event("pending_approval"));
        let invoker = TransitionInvoker::new();

        let poll = cell.begin_request();
        invoker
            .run("42", &cell, "approve", async { Ok(event("waiting_for_payment")) })
            .await
            .unwrap();

        assert!(!cell.apply(poll, event("pending_approval")));
        assert_eq!(cell.current().state, EventState::WaitingForPayment);
    }

    #[tokio::test]
    async fn test_run_with_merges_into_list() {
        let cell = EntityCell::new("events", vec![event("pending_approval")]);
        let invoker = TransitionInvoker::new();
        let id = EntityId::from("42");

        invoker
            .run_with(
                id.as_str(),
                &cell,
                "approve",
                async { Ok(event("waiting_for_payment")) },
                |rows: &Vec<Event>, updated: &Event| {
                    rows.iter()
                        .map(|row| if row.id == updated.id { updated.clone() } else { row.clone() })
                        .collect()
                },
            )
            .await
            .unwrap();

        assert_eq!(cell.current()[0].state, EventState::WaitingForPayment);
    }
}
