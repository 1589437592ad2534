use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use chrono::{TimeZone, Utc};
use govreg_storage::Database;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use crate::router::{app_router, AppState};
use crate::telemetry;

pub struct TestApp {
    _dir: TempDir,
    pub state: AppState,
}

impl TestApp {
    /// Fresh migrated database in a temp dir and a clock pinned to 2024-03-01T09:00:00Z.
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let url = format!("sqlite://{}", dir.path().join("govreg.db").display());
        let storage = Database::connect(&url).await.expect("database connects");
        storage.run_migrations().await.expect("migrations run");

        let metrics = telemetry::init_metrics().expect("metrics init");
        let fixed = Utc
            .with_ymd_and_hms(2024, 3, 1, 9, 0, 0)
            .single()
            .expect("valid timestamp");
        let state = AppState::new(metrics, storage).with_clock(Arc::new(move || fixed));

        Self { _dir: dir, state }
    }
}

pub async fn send(
    app: &TestApp,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let body = body.map(|value| value.to_string());
    let content_type = body.as_ref().map(|_| "application/json");
    let (status, _, value) = send_raw(app, method, uri, content_type, body).await;
    (status, value)
}

/// Sends an arbitrary body and reports the response content type as well.
pub async fn send_raw(
    app: &TestApp,
    method: Method,
    uri: &str,
    content_type: Option<&str>,
    body: Option<String>,
) -> (StatusCode, String, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(content_type) = content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    let request = builder
        .body(body.map(Body::from).unwrap_or_else(Body::empty))
        .expect("request builds");

    let response = app_router(app.state.clone())
        .oneshot(request)
        .await
        .expect("router responds");
    let status = response.status();
    let response_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body reads")
        .to_bytes();
    if bytes.is_empty() {
        return (status, response_type, Value::Null);
    }
    let value = serde_json::from_slice(&bytes).expect("response is json");
    (status, response_type, value)
}

pub fn id_of(value: &Value) -> String {
    value["id"].as_str().expect("record has an id").to_string()
}

async fn create(app: &TestApp, uri: &str, body: Value) -> Value {
    let (status, created) = send(app, Method::POST, uri, Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "POST {uri} failed: {created}");
    created
}

pub async fn create_company(app: &TestApp, inn: &str) -> Value {
    create(
        app,
        "/companies",
        json!({"name": format!("Company {inn}"), "inn": inn}),
    )
    .await
}

pub async fn create_participant(app: &TestApp, company_id: &str, name: &str) -> Value {
    create(
        app,
        &format!("/companies/{company_id}/participants"),
        json!({"full_name": name}),
    )
    .await
}

pub async fn create_meeting(app: &TestApp, company_id: &str) -> Value {
    create(
        app,
        &format!("/companies/{company_id}/meetings"),
        json!({"title": "Annual general meeting", "scheduled_at": "2024-05-01T10:00:00Z"}),
    )
    .await
}

pub async fn create_topic(app: &TestApp, company_id: &str, meeting_id: &str, title: &str) -> Value {
    create(
        app,
        &format!("/companies/{company_id}/meetings/{meeting_id}/topics"),
        json!({"title": title}),
    )
    .await
}

pub async fn register(
    app: &TestApp,
    company_id: &str,
    meeting_id: &str,
    participant_id: &str,
    present: bool,
) -> Value {
    create(
        app,
        &format!("/companies/{company_id}/meetings/{meeting_id}/participants"),
        json!({"participant_id": participant_id, "present": present}),
    )
    .await
}
