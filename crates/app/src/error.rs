use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRequest, FromRequestParts,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use govreg_core::validation::ValidationErrors;
use govreg_storage::{Page, RepositoryError};
use metrics::counter;
use serde::Deserialize;
use thiserror::Error;
use tracing::error;

use crate::problem::ProblemResponse;

/// Error returned by every API handler, rendered as problem+json.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error("invalid request body: {detail}")]
    InvalidBody { status: StatusCode, detail: String },
    #[error("invalid query string: {0}")]
    InvalidQuery(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error("storage failure: {0}")]
    Storage(RepositoryError),
}

impl ApiError {
    fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::InvalidBody { .. } => "invalid_body",
            Self::InvalidQuery(_) => "invalid_query",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Storage(_) => "storage",
        }
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound("record"),
            RepositoryError::MissingReference => Self::NotFound("referenced record"),
            RepositoryError::Conflict => Self::Conflict("record already exists".to_string()),
            RepositoryError::Referenced => {
                Self::Conflict("record is still referenced".to_string())
            }
            other => Self::Storage(other),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidBody {
            status: rejection.status(),
            detail: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::InvalidQuery(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        counter!("api_errors_total", "kind" => self.kind()).increment(1);
        let problem = match self {
            Self::Validation(errors) => ProblemResponse::new(
                StatusCode::BAD_REQUEST,
                "validation_failed",
                "request failed validation",
            )
            .with_errors(errors.errors),
            Self::InvalidBody { status, detail } => {
                ProblemResponse::new(status, "invalid_body", detail)
            }
            Self::InvalidQuery(detail) => {
                ProblemResponse::new(StatusCode::BAD_REQUEST, "invalid_query", detail)
            }
            Self::NotFound(resource) => ProblemResponse::new(
                StatusCode::NOT_FOUND,
                "not_found",
                format!("{resource} not found"),
            ),
            Self::Conflict(detail) => ProblemResponse::new(StatusCode::CONFLICT, "conflict", detail),
            Self::Storage(err) => {
                error!(stage = "api", error = %err, "storage failure");
                ProblemResponse::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "the request could not be completed",
                )
            }
        };
        problem.into_response()
    }
}

/// JSON body extractor whose rejections are reported as problem+json.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Query string extractor with the same problem+json rejections.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// `?limit=&offset=` parameters accepted by list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl ListQuery {
    pub fn page(&self) -> Page {
        Page::new(self.limit, self.offset)
    }
}

/// Maps a repository miss to a 404 naming the resource.
pub fn missing(resource: &'static str) -> impl Fn(RepositoryError) -> ApiError {
    move |err| match err {
        RepositoryError::NotFound => ApiError::NotFound(resource),
        other => other.into(),
    }
}
