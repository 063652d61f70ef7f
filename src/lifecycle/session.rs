use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::normalize;

/// Status of a conference session (talk) inside an event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SessionStatus {
    Scheduled,
    Live,
    Ended,
    Unknown(String),
}

impl SessionStatus {
    pub fn parse(raw: &str) -> Self {
        match normalize(raw).as_str() {
            "scheduled" => SessionStatus::Scheduled,
            "live" => SessionStatus::Live,
            "ended" => SessionStatus::Ended,
            _ => SessionStatus::Unknown(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            SessionStatus::Scheduled => "scheduled",
            SessionStatus::Live => "live",
            SessionStatus::Ended => "ended",
            SessionStatus::Unknown(raw) => raw,
        }
    }

    pub fn is_ended(&self) -> bool {
        matches!(self, SessionStatus::Ended)
    }
}

impl From<String> for SessionStatus {
    fn from(raw: String) -> Self {
        SessionStatus::parse(&raw)
    }
}

impl From<SessionStatus> for String {
    fn from(status: SessionStatus) -> Self {
        match status {
            SessionStatus::Unknown(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionAction {
    Start,
    End,
}

impl SessionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionAction::Start => "start",
            SessionAction::End => "end",
        }
    }

    /// Path segment under `/sessions/{id}/`.
    pub fn endpoint(&self) -> &'static str {
        self.as_str()
    }
}

impl fmt::Display for SessionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "start" => Ok(SessionAction::Start),
            "end" => Ok(SessionAction::End),
            other => Err(format!("unknown session action '{other}' (expected start or end)")),
        }
    }
}

pub fn session_actions_for(status: &SessionStatus) -> &'static [SessionAction] {
    match status {
        SessionStatus::Scheduled => &[SessionAction::Start],
        SessionStatus::Live => &[SessionAction::End],
        SessionStatus::Ended | SessionStatus::Unknown(_) => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_action_gate() {
        assert_eq!(session_actions_for(&SessionStatus::Scheduled), &[SessionAction::Start]);
        assert_eq!(session_actions_for(&SessionStatus::Live), &[SessionAction::End]);
        assert!(session_actions_for(&SessionStatus::Ended).is_empty());
        assert!(session_actions_for(&SessionStatus::parse("paused")).is_empty());
    }

    #[test]
    fn test_session_status_wire_format() {
        let status: SessionStatus = serde_json::from_str("\"LIVE\"").unwrap();
        assert_eq!(status, SessionStatus::Live);
        assert_eq!(serde_json::to_string(&SessionStatus::Ended).unwrap(), "\"ended\"");
    }
}
