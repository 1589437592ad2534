use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use govreg_core::patch::ApplyPatch;
use govreg_core::types::{AttendancePatch, MeetingParticipant, RegisterAttendee};
use govreg_core::validation::ValidationErrors;
use govreg_storage::RepositoryError;
use metrics::counter;
use tracing::info;

use crate::error::{missing, ApiError, ApiJson, ApiQuery, ListQuery};
use crate::router::AppState;
use crate::scope;

pub async fn register(
    State(state): State<AppState>,
    Path((company_id, meeting_id)): Path<(String, String)>,
    ApiJson(payload): ApiJson<RegisterAttendee>,
) -> Result<(StatusCode, Json<MeetingParticipant>), ApiError> {
    let participant_id = payload.participant_id.trim();
    if participant_id.is_empty() {
        return Err(ValidationErrors::single("participant_id", "must not be blank").into());
    }

    let db = state.storage();
    scope::ensure_meeting(db, &company_id, &meeting_id).await?;
    if !db
        .participants()
        .exists_in_company(participant_id, &company_id)
        .await?
    {
        return Err(ApiError::NotFound("participant"));
    }

    let record = db
        .attendance()
        .insert(&meeting_id, participant_id, payload.present, state.now())
        .await
        .map_err(|err| match err {
            RepositoryError::Conflict => ApiError::Conflict(format!(
                "participant {participant_id} is already registered for the meeting"
            )),
            other => other.into(),
        })?;

    counter!("records_created_total", "resource" => "meeting_participant").increment(1);
    info!(
        stage = "api",
        %meeting_id,
        participant_id = %record.participant_id,
        present = record.present,
        "participant registered for meeting"
    );
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn list(
    State(state): State<AppState>,
    Path((company_id, meeting_id)): Path<(String, String)>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<Vec<MeetingParticipant>>, ApiError> {
    scope::ensure_meeting(state.storage(), &company_id, &meeting_id).await?;
    let records = state
        .storage()
        .attendance()
        .list_by_meeting(&meeting_id, query.page())
        .await?;
    Ok(Json(records))
}

/// Marks a registered participant present or absent.
pub async fn update(
    State(state): State<AppState>,
    Path((company_id, meeting_id, participant_id)): Path<(String, String, String)>,
    ApiJson(patch): ApiJson<AttendancePatch>,
) -> Result<Json<MeetingParticipant>, ApiError> {
    let db = state.storage();
    scope::ensure_meeting(db, &company_id, &meeting_id).await?;
    let mut record = db
        .attendance()
        .find_for(&meeting_id, &participant_id)
        .await?
        .ok_or(ApiError::NotFound("meeting participant"))?;

    record.apply_patch(patch);
    db.attendance()
        .set_present(&meeting_id, &participant_id, record.present)
        .await
        .map_err(missing("meeting participant"))?;

    info!(stage = "api", %meeting_id, %participant_id, present = record.present, "attendance updated");
    Ok(Json(record))
}

pub async fn delete(
    State(state): State<AppState>,
    Path((company_id, meeting_id, participant_id)): Path<(String, String, String)>,
) -> Result<StatusCode, ApiError> {
    scope::ensure_meeting(state.storage(), &company_id, &meeting_id).await?;
    state
        .storage()
        .attendance()
        .delete(&meeting_id, &participant_id)
        .await
        .map_err(missing("meeting participant"))?;

    info!(stage = "api", %meeting_id, %participant_id, "participant unregistered from meeting");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::testing::{
        create_company, create_meeting, create_participant, id_of, send, TestApp,
    };

    #[tokio::test]
    async fn register_mark_absent_and_remove() {
        let app = TestApp::new().await;
        let company = id_of(&create_company(&app, "7707083893").await);
        let meeting = id_of(&create_meeting(&app, &company).await);
        let ivan = id_of(&create_participant(&app, &company, "Ivan Petrov").await);
        let base = format!("/companies/{company}/meetings/{meeting}/participants");

        let (status, record) =
            send(&app, Method::POST, &base, Some(json!({"participant_id": ivan}))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(record["present"], true);
        assert_eq!(record["meeting_id"], meeting.as_str());

        let uri = format!("{base}/{ivan}");
        let (status, updated) =
            send(&app, Method::PATCH, &uri, Some(json!({"present": false}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["present"], false);

        let (status, listed) = send(&app, Method::GET, &base, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed, json!([updated]));

        let (status, _) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn double_registration_conflicts() {
        let app = TestApp::new().await;
        let company = id_of(&create_company(&app, "7707083893").await);
        let meeting = id_of(&create_meeting(&app, &company).await);
        let ivan = id_of(&create_participant(&app, &company, "Ivan Petrov").await);
        let base = format!("/companies/{company}/meetings/{meeting}/participants");

        let (status, _) =
            send(&app, Method::POST, &base, Some(json!({"participant_id": ivan}))).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, body) =
            send(&app, Method::POST, &base, Some(json!({"participant_id": ivan}))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["type"], "conflict");
    }

    #[tokio::test]
    async fn participant_from_other_company_cannot_attend() {
        let app = TestApp::new().await;
        let acme = id_of(&create_company(&app, "1000000001").await);
        let globex = id_of(&create_company(&app, "1000000002").await);
        let meeting = id_of(&create_meeting(&app, &acme).await);
        let outsider = id_of(&create_participant(&app, &globex, "Hank Scorpio").await);

        let (status, body) = send(
            &app,
            Method::POST,
            &format!("/companies/{acme}/meetings/{meeting}/participants"),
            Some(json!({"participant_id": outsider})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "participant not found");
    }
}
