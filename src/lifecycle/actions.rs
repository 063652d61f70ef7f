use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::normalize;
use super::state::EventState;

/// Admin actions that request an event transition from the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    Approve,
    Reject,
    ConfirmPayment,
    ForceStart,
    ForceClose,
}

impl EventAction {
    pub const ALL: [EventAction; 5] = [
        EventAction::Approve,
        EventAction::Reject,
        EventAction::ConfirmPayment,
        EventAction::ForceStart,
        EventAction::ForceClose,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventAction::Approve => "approve",
            EventAction::Reject => "reject",
            EventAction::ConfirmPayment => "confirm_payment",
            EventAction::ForceStart => "force_start",
            EventAction::ForceClose => "force_close",
        }
    }

    /// Path segment under `/events/{id}/`.
    pub fn endpoint(&self) -> &'static str {
        match self {
            EventAction::Approve => "approve",
            EventAction::Reject => "reject",
            EventAction::ConfirmPayment => "confirm-payment",
            EventAction::ForceStart => "start",
            EventAction::ForceClose => "close",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EventAction::Approve => "Approve",
            EventAction::Reject => "Reject",
            EventAction::ConfirmPayment => "Confirm payment",
            EventAction::ForceStart => "Force start",
            EventAction::ForceClose => "Force close",
        }
    }

    /// Actions that need an explicit second confirmation from the user
    /// before any request is sent.
    pub fn requires_confirmation(&self) -> bool {
        matches!(
            self,
            EventAction::ConfirmPayment | EventAction::ForceStart | EventAction::ForceClose
        )
    }

    /// Stage the server is expected to report after a successful call.
    pub fn expected_state(&self) -> EventState {
        match self {
            EventAction::Approve => EventState::WaitingForPayment,
            EventAction::Reject => EventState::Rejected,
            EventAction::ConfirmPayment => EventState::PaymentDone,
            EventAction::ForceStart => EventState::Live,
            EventAction::ForceClose => EventState::Closed,
        }
    }
}

impl fmt::Display for EventAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "approve" => Ok(EventAction::Approve),
            "reject" => Ok(EventAction::Reject),
            "confirm_payment" => Ok(EventAction::ConfirmPayment),
            "force_start" | "start" => Ok(EventAction::ForceStart),
            "force_close" | "close" => Ok(EventAction::ForceClose),
            other => Err(format!(
                "unknown action '{other}' (expected one of: approve, reject, confirm_payment, force_start, force_close)"
            )),
        }
    }
}

const PENDING_APPROVAL_ACTIONS: &[EventAction] = &[EventAction::Approve, EventAction::Reject];
const PROOF_SUBMITTED_ACTIONS: &[EventAction] = &[EventAction::ConfirmPayment];
const PAYMENT_DONE_ACTIONS: &[EventAction] = &[EventAction::ForceStart];
const LIVE_ACTIONS: &[EventAction] = &[EventAction::ForceClose];
const NO_ACTIONS: &[EventAction] = &[];

/// Action gate: the admin actions valid for `state`.
///
/// A pure lookup. Unrecognised states enable nothing.
pub fn actions_for(state: &EventState) -> &'static [EventAction] {
    match state {
        EventState::PendingApproval => PENDING_APPROVAL_ACTIONS,
        EventState::PaymentProofSubmitted => PROOF_SUBMITTED_ACTIONS,
        EventState::PaymentDone => PAYMENT_DONE_ACTIONS,
        EventState::Live => LIVE_ACTIONS,
        EventState::WaitingForPayment
        | EventState::Closed
        | EventState::Rejected
        | EventState::Unknown(_) => NO_ACTIONS,
    }
}

pub fn is_enabled(state: &EventState, action: EventAction) -> bool {
    actions_for(state).contains(&action)
}

/// Platform roles. Only admins drive event transitions; organizers upload
/// payment proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Organizer,
    Visitor,
    Enterprise,
}

impl Role {
    pub fn actions_for(&self, state: &EventState) -> &'static [EventAction] {
        match self {
            Role::Admin => actions_for(state),
            Role::Organizer | Role::Visitor | Role::Enterprise => NO_ACTIONS,
        }
    }

    pub fn can_submit_payment_proof(&self, state: &EventState) -> bool {
        matches!(self, Role::Organizer) && matches!(state, EventState::WaitingForPayment)
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "admin" => Ok(Role::Admin),
            "organizer" => Ok(Role::Organizer),
            "visitor" => Ok(Role::Visitor),
            "enterprise" => Ok(Role::Enterprise),
            other => Err(format!(
                "unknown role '{other}' (expected one of: admin, organizer, visitor, enterprise)"
            )),
        }
    }
}
