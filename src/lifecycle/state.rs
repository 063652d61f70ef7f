use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use super::normalize;

/// Lifecycle stage of an exhibition event as reported by the server.
///
/// ```text
/// pending_approval -> waiting_for_payment -> payment_proof_submitted
///        |                -> payment_done -> live -> closed
///        +-> rejected
/// ```
///
/// Anything the server sends that is not one of the known stages is kept
/// verbatim in [`EventState::Unknown`] and enables nothing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventState {
    PendingApproval,
    WaitingForPayment,
    PaymentProofSubmitted,
    PaymentDone,
    Live,
    Closed,
    Rejected,
    Unknown(String),
}

impl EventState {
    /// Every recognised stage in lifecycle order, side branch last.
    pub const KNOWN: [EventState; 7] = [
        EventState::PendingApproval,
        EventState::WaitingForPayment,
        EventState::PaymentProofSubmitted,
        EventState::PaymentDone,
        EventState::Live,
        EventState::Closed,
        EventState::Rejected,
    ];

    /// Parse a wire value. Never fails.
    pub fn parse(raw: &str) -> Self {
        match normalize(raw).as_str() {
            "pending_approval" => EventState::PendingApproval,
            "waiting_for_payment" => EventState::WaitingForPayment,
            "payment_proof_submitted" => EventState::PaymentProofSubmitted,
            "payment_done" => EventState::PaymentDone,
            "live" => EventState::Live,
            "closed" => EventState::Closed,
            "rejected" => EventState::Rejected,
            _ => EventState::Unknown(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            EventState::PendingApproval => "pending_approval",
            EventState::WaitingForPayment => "waiting_for_payment",
            EventState::PaymentProofSubmitted => "payment_proof_submitted",
            EventState::PaymentDone => "payment_done",
            EventState::Live => "live",
            EventState::Closed => "closed",
            EventState::Rejected => "rejected",
            EventState::Unknown(raw) => raw,
        }
    }

    /// Human readable label for terminal output.
    pub fn label(&self) -> &str {
        match self {
            EventState::PendingApproval => "Pending approval",
            EventState::WaitingForPayment => "Waiting for payment",
            EventState::PaymentProofSubmitted => "Payment proof submitted",
            EventState::PaymentDone => "Payment done",
            EventState::Live => "Live",
            EventState::Closed => "Closed",
            EventState::Rejected => "Rejected",
            EventState::Unknown(_) => "Unknown",
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, EventState::Unknown(_))
    }

    /// No further transitions can happen from here.
    pub fn is_terminal(&self) -> bool {
        matches!(self, EventState::Closed | EventState::Rejected)
    }

    pub fn is_live(&self) -> bool {
        matches!(self, EventState::Live)
    }

    /// The event has not started yet but is on its way to going live.
    pub fn is_upcoming(&self) -> bool {
        matches!(
            self,
            EventState::PendingApproval
                | EventState::WaitingForPayment
                | EventState::PaymentProofSubmitted
                | EventState::PaymentDone
        )
    }

    /// Stages directly reachable from this one, including server-driven
    /// edges (proof upload by the organizer, auto-start, auto-close).
    pub fn successors(&self) -> &'static [EventState] {
        const AFTER_PENDING: &[EventState] = &[EventState::WaitingForPayment, EventState::Rejected];
        const AFTER_WAITING: &[EventState] = &[EventState::PaymentProofSubmitted];
        const AFTER_PROOF: &[EventState] = &[EventState::PaymentDone];
        const AFTER_PAID: &[EventState] = &[EventState::Live];
        const AFTER_LIVE: &[EventState] = &[EventState::Closed];

        match self {
            EventState::PendingApproval => AFTER_PENDING,
            EventState::WaitingForPayment => AFTER_WAITING,
            EventState::PaymentProofSubmitted => AFTER_PROOF,
            EventState::PaymentDone => AFTER_PAID,
            EventState::Live => AFTER_LIVE,
            EventState::Closed | EventState::Rejected | EventState::Unknown(_) => &[],
        }
    }

    pub fn can_transition_to(&self, next: &EventState) -> bool {
        self.successors().contains(next)
    }
}

impl From<String> for EventState {
    fn from(raw: String) -> Self {
        EventState::parse(&raw)
    }
}

impl From<EventState> for String {
    fn from(state: EventState) -> Self {
        match state {
            EventState::Unknown(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl FromStr for EventState {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(EventState::parse(s))
    }
}

impl fmt::Display for EventState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_states_round_trip_through_wire_names() {
        for state in EventState::KNOWN {
            assert_eq!(EventState::parse(state.as_str()), state);
        }
    }

    #[test]
    fn test_parse_tolerates_case_and_separators() {
        assert_eq!(EventState::parse("PENDING_APPROVAL"), EventState::PendingApproval);
        assert_eq!(EventState::parse("payment-done"), EventState::PaymentDone);
        assert_eq!(EventState::parse(" Live "), EventState::Live);
    }

    #[test]
    fn test_unknown_state_keeps_raw_value() {
        let state = EventState::parse("archived");
        assert_eq!(state, EventState::Unknown("archived".to_string()));
        assert_eq!(state.as_str(), "archived");
        assert!(!state.is_known());
        assert!(state.successors().is_empty());
    }

    #[test]
    fn test_serde_uses_wire_strings() {
        let state: EventState = serde_json::from_str("\"payment_proof_submitted\"").unwrap();
        assert_eq!(state, EventState::PaymentProofSubmitted);
        assert_eq!(serde_json::to_string(&EventState::Live).unwrap(), "\"live\"");

        let unknown: EventState = serde_json::from_str("\"on_hold\"").unwrap();
        assert_eq!(serde_json::to_string(&unknown).unwrap(), "\"on_hold\"");
    }

    #[test]
    fn test_rejected_only_reachable_from_pending_approval() {
        for state in EventState::KNOWN {
            let reaches_rejected = state.can_transition_to(&EventState::Rejected);
            assert_eq!(reaches_rejected, state == EventState::PendingApproval, "{state}");
        }
    }

    #[test]
    fn test_main_chain_is_linear() {
        let chain = [
            EventState::PendingApproval,
            EventState::WaitingForPayment,
            EventState::PaymentProofSubmitted,
            EventState::PaymentDone,
            EventState::Live,
            EventState::Closed,
        ];
        for pair in chain.windows(2) {
            assert!(pair[0].can_transition_to(&pair[1]));
            assert!(!pair[1].can_transition_to(&pair[0]));
        }
        assert!(EventState::Closed.is_terminal());
        assert!(EventState::Rejected.is_terminal());
        assert!(!EventState::Live.is_terminal());
    }
}
