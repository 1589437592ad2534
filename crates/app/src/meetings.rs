use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use govreg_core::patch::ApplyPatch;
use govreg_core::types::{Meeting, MeetingPatch, NewMeeting};
use govreg_core::validation::Validate;
use metrics::counter;
use tracing::info;

use crate::error::{missing, ApiError, ApiJson, ApiQuery, ListQuery};
use crate::router::AppState;
use crate::scope;

pub async fn create(
    State(state): State<AppState>,
    Path(company_id): Path<String>,
    ApiJson(payload): ApiJson<NewMeeting>,
) -> Result<(StatusCode, Json<Meeting>), ApiError> {
    let payload = payload.normalized();
    payload.validate()?;
    scope::ensure_company(state.storage(), &company_id).await?;

    let meeting = state
        .storage()
        .meetings()
        .insert(&company_id, &payload, state.now())
        .await?;

    counter!("records_created_total", "resource" => "meeting").increment(1);
    info!(
        stage = "api",
        %company_id,
        meeting_id = %meeting.id,
        scheduled_at = %meeting.scheduled_at.to_rfc3339(),
        "meeting created"
    );
    Ok((StatusCode::CREATED, Json(meeting)))
}

pub async fn list(
    State(state): State<AppState>,
    Path(company_id): Path<String>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<Vec<Meeting>>, ApiError> {
    scope::ensure_company(state.storage(), &company_id).await?;
    let meetings = state
        .storage()
        .meetings()
        .list_by_company(&company_id, query.page())
        .await?;
    Ok(Json(meetings))
}

async fn load(state: &AppState, company_id: &str, meeting_id: &str) -> Result<Meeting, ApiError> {
    scope::ensure_company(state.storage(), company_id).await?;
    state
        .storage()
        .meetings()
        .find_in_company(meeting_id, company_id)
        .await?
        .ok_or(ApiError::NotFound("meeting"))
}

pub async fn get(
    State(state): State<AppState>,
    Path((company_id, meeting_id)): Path<(String, String)>,
) -> Result<Json<Meeting>, ApiError> {
    let meeting = load(&state, &company_id, &meeting_id).await?;
    Ok(Json(meeting))
}

pub async fn update(
    State(state): State<AppState>,
    Path((company_id, meeting_id)): Path<(String, String)>,
    ApiJson(patch): ApiJson<MeetingPatch>,
) -> Result<Json<Meeting>, ApiError> {
    let mut meeting = load(&state, &company_id, &meeting_id).await?;
    meeting.apply_patch(patch.normalized());
    meeting.validate()?;

    state
        .storage()
        .meetings()
        .update(&meeting)
        .await
        .map_err(missing("meeting"))?;

    info!(stage = "api", %company_id, %meeting_id, "meeting updated");
    Ok(Json(meeting))
}

/// Deletes the meeting with its attendance, agenda and votings.
pub async fn delete(
    State(state): State<AppState>,
    Path((company_id, meeting_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    scope::ensure_company(state.storage(), &company_id).await?;
    state
        .storage()
        .meetings()
        .delete(&meeting_id, &company_id)
        .await
        .map_err(missing("meeting"))?;

    info!(stage = "api", %company_id, %meeting_id, "meeting deleted");
    Ok(StatusCode::NO_CONTENT)
}
