// Lifecycle Module - Client mirror of server-owned entity states
//
// The server owns every state below. These types only classify what the server
// reports so the client can decide which actions to offer.

pub mod actions;
pub mod incident;
pub mod session;
pub mod state;

pub use actions::{actions_for, is_enabled, EventAction, Role};
pub use incident::{IncidentEvent, IncidentSeverity, IncidentStatus, IncidentTracker};
pub use session::{session_actions_for, SessionAction, SessionStatus};
pub use state::EventState;

/// Lowercase a wire value and fold `-` and spaces into `_`.
pub(crate) fn normalize(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| match c {
            '-' | ' ' => '_',
            other => other.to_ascii_lowercase(),
        })
        .collect()
}
