use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use govreg_core::types::MeetingParticipant;

use crate::{new_id, to_rfc3339, Page, RepositoryError};

const COLUMNS: &str = "id, meeting_id, participant_id, present, registered_at";

/// Repository for the `meeting_participants` join table.
#[derive(Clone)]
pub struct AttendanceRepository {
    pool: SqlitePool,
}

#[derive(Debug, sqlx::FromRow)]
struct AttendanceRow {
    id: String,
    meeting_id: String,
    participant_id: String,
    present: bool,
    registered_at: DateTime<Utc>,
}

impl From<AttendanceRow> for MeetingParticipant {
    fn from(row: AttendanceRow) -> Self {
        Self {
            id: row.id,
            meeting_id: row.meeting_id,
            participant_id: row.participant_id,
            present: row.present,
            registered_at: row.registered_at,
        }
    }
}

impl AttendanceRepository {
    pub(crate) fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Registers a participant for a meeting. Registering the same participant
    /// twice yields [`RepositoryError::Conflict`].
    pub async fn insert(
        &self,
        meeting_id: &str,
        participant_id: &str,
        present: bool,
        registered_at: DateTime<Utc>,
    ) -> Result<MeetingParticipant, RepositoryError> {
        let row = sqlx::query_as::<_, AttendanceRow>(&format!(
            "INSERT INTO meeting_participants \
             (id, meeting_id, participant_id, present, registered_at) \
             VALUES (?, ?, ?, ?, ?) RETURNING {COLUMNS}"
        ))
        .bind(new_id())
        .bind(meeting_id)
        .bind(participant_id)
        .bind(present)
        .bind(to_rfc3339(registered_at))
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    pub async fn find_for(
        &self,
        meeting_id: &str,
        participant_id: &str,
    ) -> Result<Option<MeetingParticipant>, RepositoryError> {
        let row = sqlx::query_as::<_, AttendanceRow>(&format!(
            "SELECT {COLUMNS} FROM meeting_participants \
             WHERE meeting_id = ? AND participant_id = ?"
        ))
        .bind(meeting_id)
        .bind(participant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(MeetingParticipant::from))
    }

    pub async fn list_by_meeting(
        &self,
        meeting_id: &str,
        page: Page,
    ) -> Result<Vec<MeetingParticipant>, RepositoryError> {
        let rows = sqlx::query_as::<_, AttendanceRow>(&format!(
            "SELECT {COLUMNS} FROM meeting_participants WHERE meeting_id = ? \
             ORDER BY registered_at, rowid LIMIT ? OFFSET ?"
        ))
        .bind(meeting_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(MeetingParticipant::from).collect())
    }

    /// Participant ids marked present at the meeting; only they may vote.
    pub async fn list_present_participant_ids(
        &self,
        meeting_id: &str,
    ) -> Result<Vec<String>, RepositoryError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT participant_id FROM meeting_participants \
             WHERE meeting_id = ? AND present = 1",
        )
        .bind(meeting_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    pub async fn set_present(
        &self,
        meeting_id: &str,
        participant_id: &str,
        present: bool,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE meeting_participants SET present = ? \
             WHERE meeting_id = ? AND participant_id = ?",
        )
        .bind(present)
        .bind(meeting_id)
        .bind(participant_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    pub async fn delete(&self, meeting_id: &str, participant_id: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM meeting_participants WHERE meeting_id = ? AND participant_id = ?",
        )
        .bind(meeting_id)
        .bind(participant_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
