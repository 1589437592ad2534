use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use govreg_core::tally::Tally;
use govreg_core::types::{Ballot, VoteType, Voter, Voting, VotingReport};

use crate::{new_id, to_rfc3339, RepositoryError};

const COLUMNS: &str =
    "id, topic_id, votes_for, votes_against, votes_abstain, accepted, created_at";

/// Repository for votings and the voter rows attached to them.
#[derive(Clone)]
pub struct VotingRepository {
    pool: SqlitePool,
}

#[derive(Debug, sqlx::FromRow)]
struct VotingRow {
    id: String,
    topic_id: String,
    votes_for: i64,
    votes_against: i64,
    votes_abstain: i64,
    accepted: bool,
    created_at: DateTime<Utc>,
}

fn count_column(voting_id: &str, column: &str, value: i64) -> Result<u32, RepositoryError> {
    u32::try_from(value).map_err(|_| {
        RepositoryError::InvalidRow(format!("voting {voting_id}: {column} out of range: {value}"))
    })
}

impl TryFrom<VotingRow> for Voting {
    type Error = RepositoryError;

    fn try_from(row: VotingRow) -> Result<Self, Self::Error> {
        Ok(Self {
            votes_for: count_column(&row.id, "votes_for", row.votes_for)?,
            votes_against: count_column(&row.id, "votes_against", row.votes_against)?,
            votes_abstain: count_column(&row.id, "votes_abstain", row.votes_abstain)?,
            id: row.id,
            topic_id: row.topic_id,
            accepted: row.accepted,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct VoterRow {
    id: String,
    voting_id: String,
    participant_id: String,
    vote: String,
}

impl TryFrom<VoterRow> for Voter {
    type Error = RepositoryError;

    fn try_from(row: VoterRow) -> Result<Self, Self::Error> {
        let vote = row
            .vote
            .parse::<VoteType>()
            .map_err(|err| RepositoryError::InvalidRow(format!("voter {}: {err}", row.id)))?;
        Ok(Self {
            id: row.id,
            voting_id: row.voting_id,
            participant_id: row.participant_id,
            vote,
        })
    }
}

impl VotingRepository {
    pub(crate) fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Stores the tallied voting and one voter row per ballot in a single
    /// transaction. A second voting on the same topic yields
    /// [`RepositoryError::Conflict`].
    pub async fn insert_with_voters(
        &self,
        topic_id: &str,
        tally: &Tally,
        ballots: &[Ballot],
        created_at: DateTime<Utc>,
    ) -> Result<VotingReport, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, VotingRow>(&format!(
            "INSERT INTO votings \
             (id, topic_id, votes_for, votes_against, votes_abstain, accepted, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING {COLUMNS}"
        ))
        .bind(new_id())
        .bind(topic_id)
        .bind(tally.votes_for)
        .bind(tally.votes_against)
        .bind(tally.votes_abstain)
        .bind(tally.decision().is_accepted())
        .bind(to_rfc3339(created_at))
        .fetch_one(&mut *tx)
        .await?;
        let voting = Voting::try_from(row)?;

        let mut voters = Vec::with_capacity(ballots.len());
        for ballot in ballots {
            let voter = Voter {
                id: new_id(),
                voting_id: voting.id.clone(),
                participant_id: ballot.participant_id.clone(),
                vote: ballot.vote,
            };
            sqlx::query(
                "INSERT INTO voters (id, voting_id, participant_id, vote) VALUES (?, ?, ?, ?)",
            )
            .bind(&voter.id)
            .bind(&voter.voting_id)
            .bind(&voter.participant_id)
            .bind(voter.vote.as_str())
            .execute(&mut *tx)
            .await?;
            voters.push(voter);
        }

        tx.commit().await?;
        Ok(VotingReport::new(voting, voters))
    }

    pub async fn find_by_topic(&self, topic_id: &str) -> Result<Option<Voting>, RepositoryError> {
        let row = sqlx::query_as::<_, VotingRow>(&format!(
            "SELECT {COLUMNS} FROM votings WHERE topic_id = ?"
        ))
        .bind(topic_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Voting::try_from).transpose()
    }

    pub async fn list_voters(&self, voting_id: &str) -> Result<Vec<Voter>, RepositoryError> {
        let rows = sqlx::query_as::<_, VoterRow>(
            "SELECT id, voting_id, participant_id, vote FROM voters \
             WHERE voting_id = ? ORDER BY rowid",
        )
        .bind(voting_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Voter::try_from).collect()
    }

    /// Loads the voting of a topic together with its voters.
    pub async fn report_for_topic(
        &self,
        topic_id: &str,
    ) -> Result<Option<VotingReport>, RepositoryError> {
        let Some(voting) = self.find_by_topic(topic_id).await? else {
            return Ok(None);
        };
        let voters = self.list_voters(&voting.id).await?;
        Ok(Some(VotingReport::new(voting, voters)))
    }

    /// Removes the voting of a topic; voter rows go with it.
    pub async fn delete_by_topic(&self, topic_id: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM votings WHERE topic_id = ?")
            .bind(topic_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
