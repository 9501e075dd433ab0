//! Router-level tests that run without a live database: the pool is
//! connected lazily and every request here is resolved before any
//! query would execute.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;
use uuid::Uuid;

use campus_events_server::models::Role;
use campus_events_server::routes::create_routes;
use campus_events_server::security::jwt::{Claims, JwtManager};
use campus_events_server::state::AppState;

const TEST_SECRET: &str = "integration-test-secret";

fn test_app() -> Router {
    let pool = PgPoolOptions::new()
        .connect_lazy("postgres://localhost/campus_events_test")
        .expect("lazy pool");
    create_routes(AppState::new(pool, JwtManager::new(TEST_SECRET)))
}

fn issue_token(id: Uuid, role: Role) -> String {
    JwtManager::new(TEST_SECRET).issue(id, role).expect("token")
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

fn json_request(method: &str, uri: &str, token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_is_public_and_reports_time() {
    let response = test_app().oneshot(get("/api/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("x-content-type-options")
            .and_then(|v| v.to_str().ok()),
        Some("nosniff")
    );

    let body = body_json(response).await;
    assert_eq!(body["ok"], Value::Bool(true));
    assert!(body["time"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let response = test_app().oneshot(get("/api/me", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "Missing token");
}

#[tokio::test]
async fn garbage_token_is_unauthorized() {
    let response = test_app()
        .oneshot(get("/api/me", Some("not.a.jwt")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "Invalid or expired token");
}

#[tokio::test]
async fn expired_token_is_unauthorized() {
    let now = Utc::now();
    let claims = Claims {
        sub: Uuid::new_v4(),
        role: Role::Admin,
        iat: (now - Duration::days(8)).timestamp(),
        exp: (now - Duration::days(1)).timestamp(),
    };
    let expired = jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .unwrap();

    let response = test_app()
        .oneshot(get("/api/me", Some(&expired)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn me_round_trips_the_token_identity() {
    let id = Uuid::new_v4();
    let token = issue_token(id, Role::Organizer);

    let response = test_app().oneshot(get("/api/me", Some(&token))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["id"], id.to_string());
    assert_eq!(body["role"], "organizer");
}

#[tokio::test]
async fn students_cannot_create_events() {
    let token = issue_token(Uuid::new_v4(), Role::Student);
    let request = json_request(
        "POST",
        "/api/events",
        &token,
        serde_json::json!({
            "title": "T", "category": "Tech", "capacity": 10,
            "startAt": "2025-01-01T10:00:00Z", "endAt": "2025-01-01T12:00:00Z",
            "venue": "V"
        }),
    );
    let response = test_app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn students_cannot_touch_the_status_route() {
    let token = issue_token(Uuid::new_v4(), Role::Student);
    let request = json_request(
        "PATCH",
        &format!("/api/events/{}/status", Uuid::new_v4()),
        &token,
        serde_json::json!({"status": "approved"}),
    );
    let response = test_app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn status_outside_the_three_states_is_a_validation_error() {
    let token = issue_token(Uuid::new_v4(), Role::Admin);
    let request = json_request(
        "PATCH",
        &format!("/api/events/{}/status", Uuid::new_v4()),
        &token,
        serde_json::json!({"status": "published"}),
    );
    let response = test_app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"], "Validation error");
    assert_eq!(
        body["details"][0],
        "status must be one of pending, approved, rejected"
    );
}

#[tokio::test]
async fn roster_is_admin_only() {
    let token = issue_token(Uuid::new_v4(), Role::Organizer);
    let response = test_app()
        .oneshot(get("/api/users", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn event_creation_reports_every_missing_field() {
    let token = issue_token(Uuid::new_v4(), Role::Organizer);
    let request = json_request("POST", "/api/events", &token, serde_json::json!({}));
    let response = test_app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    let details = body["details"].as_array().unwrap();
    assert_eq!(details.len(), 6);
}

#[tokio::test]
async fn registration_rejects_bad_fields_before_touching_storage() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            serde_json::json!({
                "name": "x",
                "kfupmId": "12",
                "email": "nope",
                "password": "short",
                "role": "superuser"
            })
            .to_string(),
        ))
        .unwrap();

    let response = test_app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["details"].as_array().unwrap().len(), 5);
}
