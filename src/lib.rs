// Expo Console Library - Exhibition Event Lifecycle Client
// This exposes the core components for testing and integration

pub mod api;
pub mod cli;
pub mod config;
pub mod countdown;
pub mod lifecycle;
pub mod observability;
pub mod shutdown;
pub mod sync;
pub mod telemetry;
pub mod views;

// Re-export key types for easy access
pub use api::{ApiClient, ApiError, EntityId, Event, EventApi, Incident, MonitoringSnapshot, ProofFile, Session};
pub use crate::config::{config, init_config, ExpoConsoleConfig};
pub use countdown::{countdown_target, format_remaining, Countdown, CountdownDisplay, CountdownTicker};
pub use lifecycle::{
    actions_for, session_actions_for, EventAction, EventState, IncidentStatus, Role, SessionAction,
    SessionStatus,
};
pub use observability::{api_metrics, ApiMetrics, OperationTimer};
pub use shutdown::ShutdownCoordinator;
pub use sync::{
    ActionRequest, Confirmation, EntityCell, ErrorOrigin, InvokeError, LiveResource, PollHandle,
    PollPolicy, TransitionInvoker,
};
pub use telemetry::{create_request_span, generate_correlation_id, init_telemetry, shutdown_telemetry};
pub use views::{EventDetailView, EventsListView, IncidentsView, MonitoringView, OrganizerView, SessionsView};
