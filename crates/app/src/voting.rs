use std::collections::HashSet;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use govreg_core::tally::Tally;
use govreg_core::types::{NewVoting, VotingReport};
use govreg_core::validation::{Validate, ValidationErrors};
use govreg_storage::RepositoryError;
use metrics::counter;
use tracing::info;

use crate::error::{missing, ApiError, ApiJson};
use crate::router::AppState;
use crate::scope;

type TopicPath = Path<(String, String, String)>;

fn voting_exists(topic_id: &str) -> ApiError {
    ApiError::Conflict(format!("voting for topic {topic_id} already exists"))
}

/// Tallies the submitted ballots and records the outcome for the topic.
///
/// Only participants registered as present at the meeting may vote, and a
/// topic carries at most one voting.
pub async fn create(
    State(state): State<AppState>,
    Path((company_id, meeting_id, topic_id)): TopicPath,
    ApiJson(payload): ApiJson<NewVoting>,
) -> Result<(StatusCode, Json<VotingReport>), ApiError> {
    let payload = payload.normalized();
    payload.validate()?;

    let db = state.storage();
    scope::ensure_topic(db, &company_id, &meeting_id, &topic_id).await?;

    let votings = db.votings();
    if votings.find_by_topic(&topic_id).await?.is_some() {
        return Err(voting_exists(&topic_id));
    }

    let present: HashSet<String> = db
        .attendance()
        .list_present_participant_ids(&meeting_id)
        .await?
        .into_iter()
        .collect();
    let mut errors = ValidationErrors::default();
    for (index, ballot) in payload.ballots.iter().enumerate() {
        if !present.contains(&ballot.participant_id) {
            errors.push(
                format!("ballots[{index}].participant_id"),
                format!(
                    "participant {} is not present at the meeting",
                    ballot.participant_id
                ),
            );
        }
    }
    errors.into_result()?;

    let tally = Tally::count(&payload.ballots);
    let report = votings
        .insert_with_voters(&topic_id, &tally, &payload.ballots, state.now())
        .await
        .map_err(|err| match err {
            RepositoryError::Conflict => voting_exists(&topic_id),
            other => other.into(),
        })?;

    counter!("votings_tallied_total", "decision" => report.decision.as_str()).increment(1);
    info!(
        stage = "api",
        %topic_id,
        voting_id = %report.voting.id,
        ballots = tally.total(),
        votes_for = tally.votes_for,
        votes_against = tally.votes_against,
        votes_abstain = tally.votes_abstain,
        decision = report.decision.as_str(),
        "voting recorded"
    );
    Ok((StatusCode::CREATED, Json(report)))
}

pub async fn get(
    State(state): State<AppState>,
    Path((company_id, meeting_id, topic_id)): TopicPath,
) -> Result<Json<VotingReport>, ApiError> {
    let db = state.storage();
    scope::ensure_topic(db, &company_id, &meeting_id, &topic_id).await?;
    let report = db
        .votings()
        .report_for_topic(&topic_id)
        .await?
        .ok_or(ApiError::NotFound("voting"))?;
    Ok(Json(report))
}

pub async fn delete(
    State(state): State<AppState>,
    Path((company_id, meeting_id, topic_id)): TopicPath,
) -> Result<StatusCode, ApiError> {
    let db = state.storage();
    scope::ensure_topic(db, &company_id, &meeting_id, &topic_id).await?;
    db.votings()
        .delete_by_topic(&topic_id)
        .await
        .map_err(missing("voting"))?;

    info!(stage = "api", %topic_id, "voting deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::{json, Value};

    use crate::testing::{
        create_company, create_meeting, create_participant, create_topic, id_of, register,
        send, TestApp,
    };

    struct Agenda {
        app: TestApp,
        company: String,
        uri: String,
        meeting_base: String,
        voters: Vec<String>,
    }

    /// Company with one meeting, one topic and three participants present.
    async fn agenda() -> Agenda {
        let app = TestApp::new().await;
        let company = id_of(&create_company(&app, "7707083893").await);
        let meeting = id_of(&create_meeting(&app, &company).await);
        let topic = id_of(&create_topic(&app, &company, &meeting, "Dividends").await);

        let mut voters = Vec::new();
        for name in ["Ivan Petrov", "Olga Smirnova", "Pavel Orlov"] {
            let participant = id_of(&create_participant(&app, &company, name).await);
            register(&app, &company, &meeting, &participant, true).await;
            voters.push(participant);
        }

        Agenda {
            app,
            uri: format!("/companies/{company}/meetings/{meeting}/topics/{topic}/voting"),
            meeting_base: format!("/companies/{company}/meetings/{meeting}"),
            company,
            voters,
        }
    }

    fn ballots(voters: &[String], votes: &[&str]) -> Value {
        let ballots: Vec<Value> = voters
            .iter()
            .zip(votes)
            .map(|(participant, vote)| json!({"participant_id": participant, "vote": vote}))
            .collect();
        json!({ "ballots": ballots })
    }

    #[tokio::test]
    async fn majority_for_accepts_topic() {
        let agenda = agenda().await;
        let body = ballots(&agenda.voters, &["FOR", "FOR", "AGAINST"]);

        let (status, report) = send(&agenda.app, Method::POST, &agenda.uri, Some(body)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(report["votes_for"], 2);
        assert_eq!(report["votes_against"], 1);
        assert_eq!(report["votes_abstain"], 0);
        assert_eq!(report["accepted"], true);
        assert_eq!(report["decision"], "ACCEPTED");
        assert_eq!(report["voters"].as_array().expect("voters").len(), 3);

        let (status, fetched) = send(&agenda.app, Method::GET, &agenda.uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, report);
    }

    #[tokio::test]
    async fn tie_rejects_topic() {
        let agenda = agenda().await;
        let body = ballots(&agenda.voters, &["FOR", "AGAINST", "ABSTAIN"]);

        let (status, report) = send(&agenda.app, Method::POST, &agenda.uri, Some(body)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(report["decision"], "REJECTED");
        assert_eq!(report["accepted"], false);
    }

    #[tokio::test]
    async fn second_voting_conflicts() {
        let agenda = agenda().await;
        let body = ballots(&agenda.voters, &["FOR", "FOR", "FOR"]);

        let (status, _) = send(&agenda.app, Method::POST, &agenda.uri, Some(body.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, problem) = send(&agenda.app, Method::POST, &agenda.uri, Some(body)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(problem["type"], "conflict");
    }

    #[tokio::test]
    async fn absent_participant_cannot_vote() {
        let agenda = agenda().await;
        let absent = &agenda.voters[2];
        let (status, _) = send(
            &agenda.app,
            Method::PATCH,
            &format!("{}/participants/{absent}", agenda.meeting_base),
            Some(json!({"present": false})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let body = ballots(&agenda.voters, &["FOR", "FOR", "FOR"]);
        let (status, problem) = send(&agenda.app, Method::POST, &agenda.uri, Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(problem["errors"][0]["field"], "ballots[2].participant_id");

        let (status, _) = send(&agenda.app, Method::GET, &agenda.uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unregistered_participant_cannot_vote() {
        let agenda = agenda().await;
        let company = agenda.company.clone();
        let stranger = id_of(&create_participant(&agenda.app, &company, "Anna Volkova").await);

        let mut voters = agenda.voters.clone();
        voters.push(stranger.clone());
        let body = ballots(&voters, &["FOR", "FOR", "FOR", "AGAINST"]);
        let (status, problem) = send(&agenda.app, Method::POST, &agenda.uri, Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(problem["errors"][0]["field"], "ballots[3].participant_id");

        let (status, _) = send(&agenda.app, Method::GET, &agenda.uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn attendance_at_another_meeting_does_not_count() {
        let agenda = agenda().await;
        let company = agenda.company.clone();
        let board = id_of(&create_meeting(&agenda.app, &company).await);
        let guest = id_of(&create_participant(&agenda.app, &company, "Anna Volkova").await);
        register(&agenda.app, &company, &board, &guest, true).await;

        let body = ballots(&[guest], &["FOR"]);
        let (status, problem) = send(&agenda.app, Method::POST, &agenda.uri, Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(problem["type"], "validation_failed");
        assert_eq!(problem["errors"][0]["field"], "ballots[0].participant_id");
    }

    #[tokio::test]
    async fn duplicate_and_empty_ballots_are_rejected() {
        let agenda = agenda().await;
        let twice = vec![agenda.voters[0].clone(), agenda.voters[0].clone()];

        let (status, problem) = send(
            &agenda.app,
            Method::POST,
            &agenda.uri,
            Some(ballots(&twice, &["FOR", "AGAINST"])),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(problem["errors"][0]["field"], "ballots[1].participant_id");

        let (status, problem) = send(
            &agenda.app,
            Method::POST,
            &agenda.uri,
            Some(json!({"ballots": []})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(problem["errors"][0]["field"], "ballots");
    }

    #[tokio::test]
    async fn unknown_vote_type_is_invalid_body() {
        let agenda = agenda().await;
        let body = ballots(&agenda.voters[..1], &["MAYBE"]);

        let (status, problem) = send(&agenda.app, Method::POST, &agenda.uri, Some(body)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(problem["type"], "invalid_body");
    }

    #[tokio::test]
    async fn delete_allows_revote() {
        let agenda = agenda().await;
        let first = ballots(&agenda.voters, &["AGAINST", "AGAINST", "FOR"]);
        let (status, _) = send(&agenda.app, Method::POST, &agenda.uri, Some(first)).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, _) = send(&agenda.app, Method::DELETE, &agenda.uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, problem) = send(&agenda.app, Method::DELETE, &agenda.uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(problem["detail"], "voting not found");

        let second = ballots(&agenda.voters, &["FOR", "FOR", "AGAINST"]);
        let (status, report) = send(&agenda.app, Method::POST, &agenda.uri, Some(second)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(report["decision"], "ACCEPTED");
    }

    #[tokio::test]
    async fn voting_requires_owned_topic() {
        let agenda = agenda().await;
        let foreign = agenda.uri.replace("/topics/", "/topics/missing-");

        let (status, problem) = send(
            &agenda.app,
            Method::POST,
            &foreign,
            Some(ballots(&agenda.voters, &["FOR"])),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(problem["detail"], "topic not found");
    }
}
