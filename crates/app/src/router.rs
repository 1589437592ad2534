use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, patch, post},
    Router,
};
use chrono::{DateTime, Utc};
use govreg_storage::Database;
use metrics_exporter_prometheus::PrometheusHandle;

use crate::{attendance, companies, meetings, participants, telemetry, topics, voting};

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Clone)]
pub struct AppState {
    metrics: PrometheusHandle,
    storage: Database,
    clock: Clock,
}

impl AppState {
    pub fn new(metrics: PrometheusHandle, storage: Database) -> Self {
        Self {
            metrics,
            storage,
            clock: Arc::new(Utc::now),
        }
    }

    #[cfg(test)]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn metrics(&self) -> &PrometheusHandle {
        &self.metrics
    }

    pub fn storage(&self) -> &Database {
        &self.storage
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .route("/companies", post(companies::create).get(companies::list))
        .route(
            "/companies/:company_id",
            get(companies::get)
                .patch(companies::update)
                .delete(companies::delete),
        )
        .route(
            "/companies/:company_id/participants",
            post(participants::create).get(participants::list),
        )
        .route(
            "/companies/:company_id/participants/:participant_id",
            get(participants::get)
                .patch(participants::update)
                .delete(participants::delete),
        )
        .route(
            "/companies/:company_id/meetings",
            post(meetings::create).get(meetings::list),
        )
        .route(
            "/companies/:company_id/meetings/:meeting_id",
            get(meetings::get)
                .patch(meetings::update)
                .delete(meetings::delete),
        )
        .route(
            "/companies/:company_id/meetings/:meeting_id/participants",
            post(attendance::register).get(attendance::list),
        )
        .route(
            "/companies/:company_id/meetings/:meeting_id/participants/:participant_id",
            patch(attendance::update).delete(attendance::delete),
        )
        .route(
            "/companies/:company_id/meetings/:meeting_id/topics",
            post(topics::create).get(topics::list),
        )
        .route(
            "/companies/:company_id/meetings/:meeting_id/topics/:topic_id",
            get(topics::get).patch(topics::update).delete(topics::delete),
        )
        .route(
            "/companies/:company_id/meetings/:meeting_id/topics/:topic_id/voting",
            post(voting::create).get(voting::get).delete(voting::delete),
        )
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let body = telemetry::render_metrics(state.metrics());
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
}
