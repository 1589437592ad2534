use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use govreg_core::patch::ApplyPatch;
use govreg_core::types::{NewTopic, Topic, TopicPatch};
use govreg_core::validation::Validate;
use metrics::counter;
use tracing::info;

use crate::error::{missing, ApiError, ApiJson, ApiQuery, ListQuery};
use crate::router::AppState;
use crate::scope;

pub async fn create(
    State(state): State<AppState>,
    Path((company_id, meeting_id)): Path<(String, String)>,
    ApiJson(payload): ApiJson<NewTopic>,
) -> Result<(StatusCode, Json<Topic>), ApiError> {
    let payload = payload.normalized();
    payload.validate()?;
    scope::ensure_meeting(state.storage(), &company_id, &meeting_id).await?;

    let topic = state
        .storage()
        .topics()
        .insert(&meeting_id, &payload, state.now())
        .await?;

    counter!("records_created_total", "resource" => "topic").increment(1);
    info!(stage = "api", %meeting_id, topic_id = %topic.id, "topic created");
    Ok((StatusCode::CREATED, Json(topic)))
}

pub async fn list(
    State(state): State<AppState>,
    Path((company_id, meeting_id)): Path<(String, String)>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<Vec<Topic>>, ApiError> {
    scope::ensure_meeting(state.storage(), &company_id, &meeting_id).await?;
    let topics = state
        .storage()
        .topics()
        .list_by_meeting(&meeting_id, query.page())
        .await?;
    Ok(Json(topics))
}

async fn load(
    state: &AppState,
    company_id: &str,
    meeting_id: &str,
    topic_id: &str,
) -> Result<Topic, ApiError> {
    scope::ensure_meeting(state.storage(), company_id, meeting_id).await?;
    state
        .storage()
        .topics()
        .find_in_meeting(topic_id, meeting_id)
        .await?
        .ok_or(ApiError::NotFound("topic"))
}

pub async fn get(
    State(state): State<AppState>,
    Path((company_id, meeting_id, topic_id)): Path<(String, String, String)>,
) -> Result<Json<Topic>, ApiError> {
    let topic = load(&state, &company_id, &meeting_id, &topic_id).await?;
    Ok(Json(topic))
}

pub async fn update(
    State(state): State<AppState>,
    Path((company_id, meeting_id, topic_id)): Path<(String, String, String)>,
    ApiJson(patch): ApiJson<TopicPatch>,
) -> Result<Json<Topic>, ApiError> {
    let mut topic = load(&state, &company_id, &meeting_id, &topic_id).await?;
    topic.apply_patch(patch.normalized());
    topic.validate()?;

    state
        .storage()
        .topics()
        .update(&topic)
        .await
        .map_err(missing("topic"))?;

    info!(stage = "api", %meeting_id, %topic_id, "topic updated");
    Ok(Json(topic))
}

pub async fn delete(
    State(state): State<AppState>,
    Path((company_id, meeting_id, topic_id)): Path<(String, String, String)>,
) -> Result<StatusCode, ApiError> {
    scope::ensure_meeting(state.storage(), &company_id, &meeting_id).await?;
    state
        .storage()
        .topics()
        .delete(&topic_id, &meeting_id)
        .await
        .map_err(missing("topic"))?;

    info!(stage = "api", %meeting_id, %topic_id, "topic deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::testing::{create_company, create_meeting, create_topic, id_of, send, TestApp};

    #[tokio::test]
    async fn topic_lifecycle() {
        let app = TestApp::new().await;
        let company = id_of(&create_company(&app, "7707083893").await);
        let meeting = id_of(&create_meeting(&app, &company).await);
        let base = format!("/companies/{company}/meetings/{meeting}/topics");

        let (status, created) = send(
            &app,
            Method::POST,
            &base,
            Some(json!({"title": "Dividends for 2023"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(created["description"].is_null());
        assert!(created.as_object().expect("topic").contains_key("description"));
        let uri = format!("{base}/{}", id_of(&created));

        let (status, updated) = send(
            &app,
            Method::PATCH,
            &uri,
            Some(json!({"description": "Pay 10 roubles per share"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["title"], "Dividends for 2023");
        assert_eq!(updated["description"], "Pay 10 roubles per share");

        let (status, agenda) = send(&app, Method::GET, &base, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(agenda, json!([updated]));

        let (status, _) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, body) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "topic not found");
    }

    #[tokio::test]
    async fn topic_under_wrong_meeting_is_not_found() {
        let app = TestApp::new().await;
        let company = id_of(&create_company(&app, "7707083893").await);
        let agm = id_of(&create_meeting(&app, &company).await);
        let board = id_of(&create_meeting(&app, &company).await);
        let topic = id_of(&create_topic(&app, &company, &agm, "Auditor").await);

        let (status, body) = send(
            &app,
            Method::GET,
            &format!("/companies/{company}/meetings/{board}/topics/{topic}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "topic not found");

        let (status, body) = send(
            &app,
            Method::GET,
            &format!("/companies/{company}/meetings/missing/topics/{topic}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "meeting not found");
    }
}
