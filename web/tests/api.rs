//! End-to-end router tests over the in-memory providers.

#![allow(clippy::unwrap_used)]

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use rsvp_core::{Event, EventId, EventStatus, Money, Role, UserId};
use rsvp_testing::{FixedClock, InMemoryStore, MockGateway};
use rsvp_web::{AppState, CORRELATION_ID_HEADER};
use tower::ServiceExt;
use uuid::Uuid;

struct TestApp {
    router: Router,
    store: InMemoryStore,
    gateway: MockGateway,
    event_id: EventId,
}

fn published_event(max_participants: Option<u32>, is_paid: bool) -> Event {
    let now = Utc::now();
    Event {
        id: EventId::new(),
        title: "Spring Meetup".to_string(),
        description: None,
        event_date: now + Duration::days(30),
        registration_deadline: now + Duration::days(7),
        is_paid,
        price: if is_paid {
            Money::from_major(500)
        } else {
            Money::ZERO
        },
        max_participants,
        current_participants: 0,
        status: EventStatus::Published,
        created_by: UserId::new(),
        form_schema: None,
        created_at: now,
        updated_at: now,
    }
}

fn test_app(event: Event) -> TestApp {
    let store = InMemoryStore::new();
    let gateway = MockGateway::default();
    let clock = FixedClock::at(Utc::now());
    let event_id = event.id;
    store.seed_event(event);

    let state = AppState::new(store.clone(), gateway.clone(), clock);
    TestApp {
        router: rsvp_web::router(state),
        store,
        gateway,
        event_id,
    }
}

fn request(
    method: Method,
    uri: &str,
    actor: Option<(Uuid, Role)>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some((user_id, role)) = actor {
        builder = builder
            .header("X-User-Id", user_id.to_string())
            .header("X-User-Role", role.as_str());
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn register_returns_created_registration() {
    let app = test_app(published_event(Some(10), false));
    let response = app
        .router
        .oneshot(request(
            Method::POST,
            "/api/v1/registrations",
            Some((Uuid::new_v4(), Role::Client)),
            Some(serde_json::json!({ "event_id": app.event_id })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    assert!(response.headers().contains_key(CORRELATION_ID_HEADER));
    let body = json_body(response).await;
    assert_eq!(body["status"], "pending");
    assert_eq!(body["payment_status"], "not_required");
}

#[tokio::test]
async fn register_without_identity_is_unauthorized() {
    let app = test_app(published_event(None, false));
    let response = app
        .router
        .oneshot(request(
            Method::POST,
            "/api/v1/registrations",
            None,
            Some(serde_json::json!({ "event_id": app.event_id })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_route_rejects_client_role() {
    let app = test_app(published_event(None, false));
    let response = app
        .router
        .oneshot(request(
            Method::PATCH,
            &format!("/api/v1/admin/registrations/{}", Uuid::new_v4()),
            Some((Uuid::new_v4(), Role::Client)),
            Some(serde_json::json!({ "status": "accepted" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn transition_of_unknown_registration_is_not_found() {
    let app = test_app(published_event(None, false));
    let response = app
        .router
        .oneshot(request(
            Method::PATCH,
            &format!("/api/v1/admin/registrations/{}", Uuid::new_v4()),
            Some((Uuid::new_v4(), Role::Admin)),
            Some(serde_json::json!({ "status": "accepted" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn registering_for_a_full_event_conflicts() {
    let mut event = published_event(Some(1), false);
    event.current_participants = 1;
    let app = test_app(event);

    let response = app
        .router
        .oneshot(request(
            Method::POST,
            "/api/v1/registrations",
            Some((Uuid::new_v4(), Role::Client)),
            Some(serde_json::json!({ "event_id": app.event_id })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = json_body(response).await;
    assert_eq!(body["code"], "CAPACITY_EXHAUSTED");
}

#[tokio::test]
async fn webhook_with_bad_signature_is_rejected() {
    let app = test_app(published_event(None, true));
    let body = serde_json::json!({
        "event": "payment.captured",
        "payload": { "payment": { "entity": { "id": "pay_1", "order_id": "order_x" } } }
    });

    let response = app
        .router
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/v1/payments/webhook")
                .header("X-Razorpay-Signature", "forged")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn webhook_without_signature_is_rejected() {
    let app = test_app(published_event(None, true));
    let response = app
        .router
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/v1/payments/webhook")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn paid_registration_flow_over_http() {
    let app = test_app(published_event(Some(10), true));
    let client = Uuid::new_v4();
    let admin = Uuid::new_v4();

    // Register.
    let response = app
        .router
        .clone()
        .oneshot(request(
            Method::POST,
            "/api/v1/registrations",
            Some((client, Role::Client)),
            Some(serde_json::json!({ "event_id": app.event_id })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let registration = json_body(response).await;
    let registration_id = registration["id"].as_str().unwrap().to_string();

    // Accept, which opens the payment window.
    let response = app
        .router
        .clone()
        .oneshot(request(
            Method::PATCH,
            &format!("/api/v1/admin/registrations/{registration_id}"),
            Some((admin, Role::Admin)),
            Some(serde_json::json!({ "status": "accepted" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let accepted = json_body(response).await;
    assert_eq!(accepted["payment_status"], "pending");

    // Create the order.
    let response = app
        .router
        .clone()
        .oneshot(request(
            Method::POST,
            "/api/v1/payments/create-order",
            Some((client, Role::Client)),
            Some(serde_json::json!({ "registration_id": registration_id })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let order = json_body(response).await;
    let order_id = order["order_id"].as_str().unwrap().to_string();
    assert_eq!(app.gateway.orders_created(), 1);

    // Gateway webhook lands.
    let webhook_body = serde_json::json!({
        "event": "payment.captured",
        "payload": { "payment": { "entity": { "id": "pay_77", "order_id": order_id } } }
    })
    .to_string();
    let signature = app.gateway.sign_webhook(webhook_body.as_bytes());
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/v1/payments/webhook")
                .header("X-Razorpay-Signature", signature)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(webhook_body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Transition + webhook confirmation both audited.
    assert_eq!(app.store.audit_count("registration_accepted"), 1);
}

#[tokio::test]
async fn audit_logs_require_developer_role() {
    let app = test_app(published_event(None, false));

    let response = app
        .router
        .clone()
        .oneshot(request(
            Method::GET,
            "/api/v1/developer/audit-logs",
            Some((Uuid::new_v4(), Role::Admin)),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .router
        .oneshot(request(
            Method::GET,
            "/api/v1/developer/audit-logs",
            Some((Uuid::new_v4(), Role::Developer)),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn reconcile_reports_drift_repair() {
    let mut event = published_event(Some(10), false);
    event.current_participants = 4;
    let app = test_app(event);

    let response = app
        .router
        .oneshot(request(
            Method::POST,
            &format!("/api/v1/developer/events/{}/reconcile", app.event_id),
            Some((Uuid::new_v4(), Role::Developer)),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["stored"], 4);
    assert_eq!(body["actual"], 0);
    assert_eq!(body["repaired"], true);
}
