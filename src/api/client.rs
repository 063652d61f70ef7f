use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Jitter, Quota, RateLimiter};
use reqwest::{Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, Instrument};

use super::errors::ApiError;
use super::types::{EntityId, Event, Incident, MonitoringSnapshot, ProofFile, Session};
use crate::config::ApiConfig;
use crate::lifecycle::{EventAction, EventState, IncidentStatus, SessionAction};
use crate::observability::api_metrics;
use crate::telemetry::{create_request_span, generate_correlation_id};

/// Everything the views need from the platform backend.
///
/// Implemented by [`ApiClient`] over HTTP; mocked in tests.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait EventApi: Send + Sync {
    async fn list_events(&self, state: Option<EventState>) -> Result<Vec<Event>, ApiError>;
    async fn get_event(&self, id: &EntityId) -> Result<Event, ApiError>;
    async fn perform_action(
        &self,
        id: &EntityId,
        action: EventAction,
        reason: Option<String>,
    ) -> Result<Event, ApiError>;
    async fn submit_payment_proof(&self, id: &EntityId, proof: ProofFile) -> Result<Event, ApiError>;
    async fn list_sessions(&self, event_id: &EntityId) -> Result<Vec<Session>, ApiError>;
    async fn perform_session_action(
        &self,
        session_id: &EntityId,
        action: SessionAction,
    ) -> Result<Session, ApiError>;
    async fn monitoring_snapshot(&self, event_id: &EntityId) -> Result<MonitoringSnapshot, ApiError>;
    async fn list_incidents(&self, event_id: &EntityId) -> Result<Vec<Incident>, ApiError>;
    async fn update_incident_status(
        &self,
        incident_id: &EntityId,
        status: IncidentStatus,
    ) -> Result<Incident, ApiError>;
}

/// Rate-limited JSON client for the exhibition platform REST API
#[derive(Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    token: Option<String>,
    rate_limiter: Arc<DefaultDirectRateLimiter>,
}

impl ApiClient {
    pub fn new(settings: &ApiConfig) -> Result<Self, ApiError> {
        let mut base = settings.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)
            .map_err(|e| ApiError::Config(format!("invalid api.base_url '{}': {e}", settings.base_url)))?;

        let per_second = NonZeroU32::new(settings.rate_limit.requests_per_second)
            .ok_or_else(|| ApiError::Config("api.rate_limit.requests_per_second must be > 0".to_string()))?;
        let burst = NonZeroU32::new(settings.rate_limit.burst_capacity)
            .ok_or_else(|| ApiError::Config("api.rate_limit.burst_capacity must be > 0".to_string()))?;
        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_second(per_second).allow_burst(burst)));

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .user_agent(concat!("expo-console/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url,
            token: settings.token.clone().filter(|t| !t.is_empty()),
            rate_limiter,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::Config(format!("invalid request path '{path}': {e}")))
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        let builder = self.http.request(method, self.url(path)?);
        Ok(match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    /// Send a request and decode the JSON body, mapping non-2xx answers to
    /// [`ApiError::Http`].
    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder, context: &str) -> Result<T, ApiError> {
        let correlation_id = generate_correlation_id();
        let span = create_request_span(context, &correlation_id);

        async move {
            self.rate_limiter
                .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(25)))
                .await;
            api_metrics().record_request();

            let response = builder
                .header("x-correlation-id", correlation_id.as_str())
                .send()
                .await
                .inspect_err(|_| api_metrics().record_error())?;
            let status = response.status();
            let body = response.bytes().await?;
            debug!(status = status.as_u16(), bytes = body.len(), "API response received");

            if !status.is_success() {
                api_metrics().record_error();
                return Err(ApiError::from_response(status, &body));
            }

            serde_json::from_slice(&body).map_err(|source| {
                api_metrics().record_error();
                ApiError::Decode {
                    context: context.to_string(),
                    source,
                }
            })
        }
        .instrument(span)
        .await
    }
}

#[async_trait]
impl EventApi for ApiClient {
    async fn list_events(&self, state: Option<EventState>) -> Result<Vec<Event>, ApiError> {
        let mut builder = self.request(Method::GET, "events")?;
        if let Some(state) = state {
            builder = builder.query(&[("state", state.as_str())]);
        }
        self.send(builder, "list events").await
    }

    async fn get_event(&self, id: &EntityId) -> Result<Event, ApiError> {
        let builder = self.request(Method::GET, &format!("events/{id}"))?;
        self.send(builder, "get event").await
    }

    async fn perform_action(
        &self,
        id: &EntityId,
        action: EventAction,
        reason: Option<String>,
    ) -> Result<Event, ApiError> {
        let builder = self.request(Method::POST, &format!("events/{id}/{}", action.endpoint()))?;
        let builder = match (action, reason) {
            (EventAction::Reject, Some(reason)) => builder.json(&json!({ "reason": reason })),
            _ => builder.json(&json!({})),
        };
        self.send(builder, action.as_str()).await
    }

    async fn submit_payment_proof(&self, id: &EntityId, proof: ProofFile) -> Result<Event, ApiError> {
        let part = reqwest::multipart::Part::bytes(proof.bytes)
            .file_name(proof.file_name)
            .mime_str(&proof.content_type)?;
        let form = reqwest::multipart::Form::new().part("file", part);
        let builder = self
            .request(Method::POST, &format!("events/{id}/payment-proof"))?
            .multipart(form);
        self.send(builder, "submit payment proof").await
    }

    async fn list_sessions(&self, event_id: &EntityId) -> Result<Vec<Session>, ApiError> {
        let builder = self.request(Method::GET, &format!("events/{event_id}/sessions"))?;
        self.send(builder, "list sessions").await
    }

    async fn perform_session_action(
        &self,
        session_id: &EntityId,
        action: SessionAction,
    ) -> Result<Session, ApiError> {
        let builder = self
            .request(Method::POST, &format!("sessions/{session_id}/{}", action.endpoint()))?
            .json(&json!({}));
        self.send(builder, "session action").await
    }

    async fn monitoring_snapshot(&self, event_id: &EntityId) -> Result<MonitoringSnapshot, ApiError> {
        let builder = self.request(Method::GET, &format!("events/{event_id}/monitoring"))?;
        self.send(builder, "monitoring snapshot").await
    }

    async fn list_incidents(&self, event_id: &EntityId) -> Result<Vec<Incident>, ApiError> {
        let builder = self.request(Method::GET, &format!("events/{event_id}/incidents"))?;
        self.send(builder, "list incidents").await
    }

    async fn update_incident_status(
        &self,
        incident_id: &EntityId,
        status: IncidentStatus,
    ) -> Result<Incident, ApiError> {
        let builder = self
            .request(Method::POST, &format!("incidents/{incident_id}/status"))?
            .json(&json!({ "status": status.as_str() }));
        self.send(builder, "update incident status").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExpoConsoleConfig;

    fn settings(base_url: &str) -> ApiConfig {
        let mut api = ExpoConsoleConfig::default().api;
        api.base_url = base_url.to_string();
        api
    }

    #[test]
    fn test_paths_are_joined_under_base_path() {
        let client = ApiClient::new(&settings("https://expo.example/api/v1")).unwrap();
        assert_eq!(
            client.url("events/7/approve").unwrap().as_str(),
            "https://expo.example/api/v1/events/7/approve"
        );
        assert_eq!(
            client.url("/events").unwrap().as_str(),
            "https://expo.example/api/v1/events"
        );
    }

    #[test]
    fn test_invalid_settings_are_config_errors() {
        assert!(matches!(
            ApiClient::new(&settings("not a url")),
            Err(ApiError::Config(_))
        ));

        let mut zero_rate = settings("https://expo.example");
        zero_rate.rate_limit.requests_per_second = 0;
        assert!(matches!(ApiClient::new(&zero_rate), Err(ApiError::Config(_))));
    }
}
