//! Platform API client tests
//!
//! These tests use wiremock to stand in for the exhibition platform so that
//! request shapes and error mapping are checked without a real backend.

use expo_console::api::EventApi;
use expo_console::config::ExpoConsoleConfig;
use expo_console::lifecycle::{EventAction, IncidentStatus, SessionAction, SessionStatus};
use expo_console::{ApiClient, ApiError, EntityId, EventState};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Mock platform API rooted at `/api`
pub struct PlatformApiMock {
    pub server: MockServer,
}

impl PlatformApiMock {
    pub async fn new() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn client(&self) -> ApiClient {
        let mut settings = ExpoConsoleConfig::default().api;
        settings.base_url = format!("{}/api", self.server.uri());
        settings.token = Some("test-token".to_string());
        ApiClient::new(&settings).unwrap()
    }

    pub async fn mock_event(&self, id: &str, state: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/api/events/{id}")))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": id,
                "title": "Design Week",
                "state": state,
                "start_date": "2026-11-02T09:00:00Z",
                "end_date": "2026-11-04T18:00:00",
                "payment_amount": "2500.00",
                "booth_count": 40
            })))
            .mount(&self.server)
            .await;
    }
}

#[tokio::test]
async fn test_get_event_decodes_and_keeps_unknown_fields() {
    let mock = PlatformApiMock::new().await;
    mock.mock_event("12", "payment_done").await;

    let event = mock.client().get_event(&EntityId::from("12")).await.unwrap();

    assert_eq!(event.id.as_str(), "12");
    assert_eq!(event.state, EventState::PaymentDone);
    assert_eq!(event.payment_amount, Some(2500.0));
    assert!(event.start_date.is_some());
    // Naive timestamps are taken as UTC
    assert_eq!(
        event.end_date.map(|d| d.to_rfc3339()),
        Some("2026-11-04T18:00:00+00:00".to_string())
    );
    assert_eq!(event.extra.get("booth_count"), Some(&json!(40)));
}

#[tokio::test]
async fn test_unknown_state_string_is_preserved() {
    let mock = PlatformApiMock::new().await;
    mock.mock_event("13", "on_hold").await;

    let event = mock.client().get_event(&EntityId::from("13")).await.unwrap();
    assert_eq!(event.state, EventState::Unknown("on_hold".to_string()));
    assert_eq!(event.state.as_str(), "on_hold");
}

#[tokio::test]
async fn test_list_events_sends_state_filter() {
    let mock = PlatformApiMock::new().await;
    Mock::given(method("GET"))
        .and(path("/api/events"))
        .and(query_param("state", "pending_approval"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 1, "title": "Book Fair", "state": "pending_approval" },
            { "id": 2, "title": "Game Expo", "state": "pending_approval" }
        ])))
        .expect(1)
        .mount(&mock.server)
        .await;

    let events = mock
        .client()
        .list_events(Some(EventState::PendingApproval))
        .await
        .unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].id.as_str(), "2");
}

#[tokio::test]
async fn test_reject_posts_reason() {
    let mock = PlatformApiMock::new().await;
    Mock::given(method("POST"))
        .and(path("/api/events/5/reject"))
        .and(body_json(json!({ "reason": "Venue not confirmed" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 5, "title": "Food Festival", "state": "rejected"
        })))
        .expect(1)
        .mount(&mock.server)
        .await;

    let event = mock
        .client()
        .perform_action(
            &EntityId::from("5"),
            EventAction::Reject,
            Some("Venue not confirmed".to_string()),
        )
        .await
        .unwrap();
    assert_eq!(event.state, EventState::Rejected);
}

#[tokio::test]
async fn test_action_endpoints() {
    let mock = PlatformApiMock::new().await;
    for (segment, state) in [("confirm-payment", "payment_done"), ("start", "live"), ("close", "closed")] {
        Mock::given(method("POST"))
            .and(path(format!("/api/events/8/{segment}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 8, "title": "Art Show", "state": state
            })))
            .expect(1)
            .mount(&mock.server)
            .await;
    }

    let client = mock.client();
    let id = EntityId::from("8");
    let paid = client.perform_action(&id, EventAction::ConfirmPayment, None).await.unwrap();
    let live = client.perform_action(&id, EventAction::ForceStart, None).await.unwrap();
    let closed = client.perform_action(&id, EventAction::ForceClose, None).await.unwrap();

    assert_eq!(paid.state, EventState::PaymentDone);
    assert_eq!(live.state, EventState::Live);
    assert_eq!(closed.state, EventState::Closed);
}

#[tokio::test]
async fn test_error_message_is_taken_from_body() {
    let mock = PlatformApiMock::new().await;
    Mock::given(method("POST"))
        .and(path("/api/events/3/approve"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "detail": "Event is not pending approval"
        })))
        .mount(&mock.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/events/4/approve"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&mock.server)
        .await;

    let client = mock.client();

    let err = client
        .perform_action(&EntityId::from("3"), EventAction::Approve, None)
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(409));
    assert_eq!(err.user_message(), "Event is not pending approval");

    let err = client
        .perform_action(&EntityId::from("4"), EventAction::Approve, None)
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "upstream exploded");
}

#[tokio::test]
async fn test_not_found_without_body_uses_reason_phrase() {
    let mock = PlatformApiMock::new().await;
    Mock::given(method("GET"))
        .and(path("/api/events/404"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock.server)
        .await;

    let err = mock.client().get_event(&EntityId::from("404")).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "HTTP 404: Not Found");
}

#[tokio::test]
async fn test_malformed_body_is_a_decode_error() {
    let mock = PlatformApiMock::new().await;
    Mock::given(method("GET"))
        .and(path("/api/events/6"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "title": "No id or state" })))
        .mount(&mock.server)
        .await;

    let err = mock.client().get_event(&EntityId::from("6")).await.unwrap_err();
    assert!(matches!(err, ApiError::Decode { .. }));
}

#[tokio::test]
async fn test_session_and_incident_mutations() {
    let mock = PlatformApiMock::new().await;
    Mock::given(method("POST"))
        .and(path("/api/sessions/s-1/end"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "s-1", "event_id": 8, "title": "Opening", "status": "ended"
        })))
        .expect(1)
        .mount(&mock.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/incidents/77/status"))
        .and(body_json(json!({ "status": "investigating" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 77, "event_id": 8, "title": "Audio lag", "severity": "medium", "status": "investigating"
        })))
        .expect(1)
        .mount(&mock.server)
        .await;

    let client = mock.client();
    let session = client
        .perform_session_action(&EntityId::from("s-1"), SessionAction::End)
        .await
        .unwrap();
    assert_eq!(session.status, SessionStatus::Ended);

    let incident = client
        .update_incident_status(&EntityId::from("77"), IncidentStatus::Investigating)
        .await
        .unwrap();
    assert_eq!(incident.status, IncidentStatus::Investigating);
}

#[tokio::test]
async fn test_monitoring_snapshot() {
    let mock = PlatformApiMock::new().await;
    Mock::given(method("GET"))
        .and(path("/api/events/8/monitoring"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "event_id": 8,
            "active_visitors": 131,
            "total_visits": 2048,
            "open_incidents": 1,
            "captured_at": "2026-11-03T10:15:00Z"
        })))
        .mount(&mock.server)
        .await;

    let snapshot = mock
        .client()
        .monitoring_snapshot(&EntityId::from("8"))
        .await
        .unwrap();
    assert_eq!(snapshot.active_visitors, 131);
    assert_eq!(snapshot.open_incidents, 1);
}
