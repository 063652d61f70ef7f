pub mod client;
pub mod errors;
pub mod types;

pub use client::{ApiClient, EventApi};
pub use errors::ApiError;
pub use types::{EntityId, Event, Incident, MonitoringSnapshot, ProofFile, Session};

#[cfg(any(test, feature = "testing"))]
pub use client::MockEventApi;

/// Shared handle used by every view.
pub type SharedApi = std::sync::Arc<dyn EventApi>;
