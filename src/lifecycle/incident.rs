use serde::{Deserialize, Serialize};
use statig::prelude::*;
use std::fmt;

use super::normalize;

/// Incident handling progress. Strictly linear and forward-only:
/// open -> investigating -> mitigating -> resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum IncidentStatus {
    #[default]
    Open,
    Investigating,
    Mitigating,
    Resolved,
    Unknown(String),
}

impl IncidentStatus {
    pub fn parse(raw: &str) -> Self {
        match normalize(raw).as_str() {
            "open" => IncidentStatus::Open,
            "investigating" => IncidentStatus::Investigating,
            "mitigating" => IncidentStatus::Mitigating,
            "resolved" => IncidentStatus::Resolved,
            _ => IncidentStatus::Unknown(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            IncidentStatus::Open => "open",
            IncidentStatus::Investigating => "investigating",
            IncidentStatus::Mitigating => "mitigating",
            IncidentStatus::Resolved => "resolved",
            IncidentStatus::Unknown(raw) => raw,
        }
    }

    /// Position in the chain; `None` for unrecognised values.
    pub fn rank(&self) -> Option<u8> {
        match self {
            IncidentStatus::Open => Some(0),
            IncidentStatus::Investigating => Some(1),
            IncidentStatus::Mitigating => Some(2),
            IncidentStatus::Resolved => Some(3),
            IncidentStatus::Unknown(_) => None,
        }
    }

    pub fn next(&self) -> Option<IncidentStatus> {
        match self {
            IncidentStatus::Open => Some(IncidentStatus::Investigating),
            IncidentStatus::Investigating => Some(IncidentStatus::Mitigating),
            IncidentStatus::Mitigating => Some(IncidentStatus::Resolved),
            IncidentStatus::Resolved | IncidentStatus::Unknown(_) => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, IncidentStatus::Resolved)
    }
}

impl From<String> for IncidentStatus {
    fn from(raw: String) -> Self {
        IncidentStatus::parse(&raw)
    }
}

impl From<IncidentStatus> for String {
    fn from(status: IncidentStatus) -> Self {
        match status {
            IncidentStatus::Unknown(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum IncidentSeverity {
    Low,
    Medium,
    High,
    Critical,
    Unknown(String),
}

impl IncidentSeverity {
    pub fn as_str(&self) -> &str {
        match self {
            IncidentSeverity::Low => "low",
            IncidentSeverity::Medium => "medium",
            IncidentSeverity::High => "high",
            IncidentSeverity::Critical => "critical",
            IncidentSeverity::Unknown(raw) => raw,
        }
    }
}

impl From<String> for IncidentSeverity {
    fn from(raw: String) -> Self {
        match normalize(&raw).as_str() {
            "low" => IncidentSeverity::Low,
            "medium" => IncidentSeverity::Medium,
            "high" => IncidentSeverity::High,
            "critical" => IncidentSeverity::Critical,
            _ => IncidentSeverity::Unknown(raw),
        }
    }
}

impl From<IncidentSeverity> for String {
    fn from(severity: IncidentSeverity) -> Self {
        match severity {
            IncidentSeverity::Unknown(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for IncidentSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncidentEvent {
    /// Move exactly one step along the chain.
    Advance,
    /// A status reported by the server. Forward jumps are accepted,
    /// regressions are ignored.
    Observe(IncidentStatus),
}

/// Local forward-only tracker for one incident.
#[derive(Debug, Default)]
pub struct IncidentTracker {
    pub incident_id: String,
    status: IncidentStatus,
    history: Vec<IncidentStatus>,
}

impl IncidentTracker {
    pub fn new(incident_id: String) -> Self {
        Self {
            incident_id,
            ..Default::default()
        }
    }
}

#[state_machine(initial = "State::open()")]
impl IncidentTracker {
    #[state]
    fn open(&mut self, event: &IncidentEvent) -> Outcome<State> {
        self.step(IncidentStatus::Open, event)
    }

    #[state]
    fn investigating(&mut self, event: &IncidentEvent) -> Outcome<State> {
        self.step(IncidentStatus::Investigating, event)
    }

    #[state]
    fn mitigating(&mut self, event: &IncidentEvent) -> Outcome<State> {
        self.step(IncidentStatus::Mitigating, event)
    }

    #[state]
    fn resolved(&mut self, event: &IncidentEvent) -> Outcome<State> {
        self.step(IncidentStatus::Resolved, event)
    }
}

impl IncidentTracker {
    fn step(&mut self, current: IncidentStatus, event: &IncidentEvent) -> Outcome<State> {
        let target = match event {
            IncidentEvent::Advance => match current.next() {
                Some(next) => next,
                None => {
                    tracing::debug!(incident_id = %self.incident_id, "Incident already resolved");
                    return Handled;
                }
            },
            IncidentEvent::Observe(observed) => match (observed.rank(), current.rank()) {
                (Some(seen), Some(at)) if seen > at => observed.clone(),
                (Some(seen), Some(at)) if seen < at => {
                    tracing::warn!(
                        incident_id = %self.incident_id,
                        current = %current,
                        observed = %observed,
                        "Ignoring backward incident status"
                    );
                    return Handled;
                }
                (None, _) => {
                    tracing::warn!(
                        incident_id = %self.incident_id,
                        observed = %observed,
                        "Ignoring unrecognised incident status"
                    );
                    return Handled;
                }
                _ => return Handled,
            },
        };

        tracing::info!(
            incident_id = %self.incident_id,
            from = %current,
            to = %target,
            "Incident status advanced"
        );
        self.status = target.clone();
        self.history.push(target.clone());

        match target {
            IncidentStatus::Investigating => Transition(State::investigating()),
            IncidentStatus::Mitigating => Transition(State::mitigating()),
            IncidentStatus::Resolved => Transition(State::resolved()),
            IncidentStatus::Open | IncidentStatus::Unknown(_) => Handled,
        }
    }

    pub fn status(&self) -> &IncidentStatus {
        &self.status
    }

    /// Statuses entered since tracking began, oldest first.
    pub fn history(&self) -> &[IncidentStatus] {
        &self.history
    }

    /// The only status a mutation may request next.
    pub fn next_status(&self) -> Option<IncidentStatus> {
        self.status.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incident_advances_one_step_at_a_time() {
        let mut sm = IncidentTracker::new("inc-1".to_string()).state_machine();

        sm.handle(&IncidentEvent::Advance);
        assert_eq!(sm.status(), &IncidentStatus::Investigating);

        sm.handle(&IncidentEvent::Advance);
        sm.handle(&IncidentEvent::Advance);
        assert_eq!(sm.status(), &IncidentStatus::Resolved);

        // Resolved is the end of the chain
        sm.handle(&IncidentEvent::Advance);
        assert_eq!(sm.status(), &IncidentStatus::Resolved);
        assert_eq!(
            sm.history(),
            &[
                IncidentStatus::Investigating,
                IncidentStatus::Mitigating,
                IncidentStatus::Resolved
            ]
        );
        assert_eq!(sm.next_status(), None);
    }

    #[test]
    fn test_observed_status_may_jump_forward() {
        let mut sm = IncidentTracker::new("inc-2".to_string()).state_machine();

        sm.handle(&IncidentEvent::Observe(IncidentStatus::Mitigating));
        assert_eq!(sm.status(), &IncidentStatus::Mitigating);
        assert_eq!(sm.next_status(), Some(IncidentStatus::Resolved));
    }

    #[test]
    fn test_observed_regression_is_ignored() {
        let mut sm = IncidentTracker::new("inc-3".to_string()).state_machine();

        sm.handle(&IncidentEvent::Observe(IncidentStatus::Mitigating));
        sm.handle(&IncidentEvent::Observe(IncidentStatus::Open));
        sm.handle(&IncidentEvent::Observe(IncidentStatus::parse("escalated")));

        assert_eq!(sm.status(), &IncidentStatus::Mitigating);
        assert_eq!(sm.history().len(), 1);
    }

    #[test]
    fn test_status_chain() {
        assert_eq!(IncidentStatus::Open.next(), Some(IncidentStatus::Investigating));
        assert_eq!(IncidentStatus::Resolved.next(), None);
        assert_eq!(IncidentStatus::parse("Mitigating"), IncidentStatus::Mitigating);
        assert_eq!(IncidentStatus::parse("escalated").rank(), None);
    }
}
