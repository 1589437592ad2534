use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use govreg_core::patch::ApplyPatch;
use govreg_core::types::{NewParticipant, Participant, ParticipantPatch};
use govreg_core::validation::Validate;
use govreg_storage::RepositoryError;
use metrics::counter;
use tracing::info;

use crate::error::{missing, ApiError, ApiJson, ApiQuery, ListQuery};
use crate::router::AppState;
use crate::scope;

pub async fn create(
    State(state): State<AppState>,
    Path(company_id): Path<String>,
    ApiJson(payload): ApiJson<NewParticipant>,
) -> Result<(StatusCode, Json<Participant>), ApiError> {
    let payload = payload.normalized();
    payload.validate()?;
    scope::ensure_company(state.storage(), &company_id).await?;

    let participant = state
        .storage()
        .participants()
        .insert(&company_id, &payload, state.now())
        .await?;

    counter!("records_created_total", "resource" => "participant").increment(1);
    info!(stage = "api", %company_id, participant_id = %participant.id, "participant created");
    Ok((StatusCode::CREATED, Json(participant)))
}

pub async fn list(
    State(state): State<AppState>,
    Path(company_id): Path<String>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<Vec<Participant>>, ApiError> {
    scope::ensure_company(state.storage(), &company_id).await?;
    let participants = state
        .storage()
        .participants()
        .list_by_company(&company_id, query.page())
        .await?;
    Ok(Json(participants))
}

async fn load(
    state: &AppState,
    company_id: &str,
    participant_id: &str,
) -> Result<Participant, ApiError> {
    scope::ensure_company(state.storage(), company_id).await?;
    state
        .storage()
        .participants()
        .find_in_company(participant_id, company_id)
        .await?
        .ok_or(ApiError::NotFound("participant"))
}

pub async fn get(
    State(state): State<AppState>,
    Path((company_id, participant_id)): Path<(String, String)>,
) -> Result<Json<Participant>, ApiError> {
    let participant = load(&state, &company_id, &participant_id).await?;
    Ok(Json(participant))
}

pub async fn update(
    State(state): State<AppState>,
    Path((company_id, participant_id)): Path<(String, String)>,
    ApiJson(patch): ApiJson<ParticipantPatch>,
) -> Result<Json<Participant>, ApiError> {
    let mut participant = load(&state, &company_id, &participant_id).await?;
    participant.apply_patch(patch.normalized());
    participant.validate()?;

    state
        .storage()
        .participants()
        .update(&participant)
        .await
        .map_err(missing("participant"))?;

    info!(stage = "api", %company_id, %participant_id, "participant updated");
    Ok(Json(participant))
}

pub async fn delete(
    State(state): State<AppState>,
    Path((company_id, participant_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    scope::ensure_company(state.storage(), &company_id).await?;
    state
        .storage()
        .participants()
        .delete(&participant_id, &company_id)
        .await
        .map_err(|err| match err {
            RepositoryError::Referenced => ApiError::Conflict(format!(
                "participant {participant_id} has cast votes and cannot be deleted"
            )),
            other => missing("participant")(other),
        })?;

    info!(stage = "api", %company_id, %participant_id, "participant deleted");
    Ok(StatusCode::NO_CONTENT)
}
