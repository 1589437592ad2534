use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use govreg_core::types::{NewParticipant, Participant};

use crate::{new_id, to_rfc3339, Page, RepositoryError};

const COLUMNS: &str = "id, company_id, full_name, email, position, created_at";

/// Repository for company participants.
#[derive(Clone)]
pub struct ParticipantRepository {
    pool: SqlitePool,
}

#[derive(Debug, sqlx::FromRow)]
struct ParticipantRow {
    id: String,
    company_id: String,
    full_name: String,
    email: Option<String>,
    position: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<ParticipantRow> for Participant {
    fn from(row: ParticipantRow) -> Self {
        Self {
            id: row.id,
            company_id: row.company_id,
            full_name: row.full_name,
            email: row.email,
            position: row.position,
            created_at: row.created_at,
        }
    }
}

impl ParticipantRepository {
    pub(crate) fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert(
        &self,
        company_id: &str,
        participant: &NewParticipant,
        created_at: DateTime<Utc>,
    ) -> Result<Participant, RepositoryError> {
        let row = sqlx::query_as::<_, ParticipantRow>(&format!(
            "INSERT INTO participants (id, company_id, full_name, email, position, created_at) \
             VALUES (?, ?, ?, ?, ?, ?) RETURNING {COLUMNS}"
        ))
        .bind(new_id())
        .bind(company_id)
        .bind(&participant.full_name)
        .bind(&participant.email)
        .bind(&participant.position)
        .bind(to_rfc3339(created_at))
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    #[cfg(test)]
    pub(crate) async fn find(&self, id: &str) -> Result<Option<Participant>, RepositoryError> {
        let row = sqlx::query_as::<_, ParticipantRow>(&format!(
            "SELECT {COLUMNS} FROM participants WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Participant::from))
    }

    /// Loads a participant only when it belongs to the given company.
    pub async fn find_in_company(
        &self,
        id: &str,
        company_id: &str,
    ) -> Result<Option<Participant>, RepositoryError> {
        let row = sqlx::query_as::<_, ParticipantRow>(&format!(
            "SELECT {COLUMNS} FROM participants WHERE id = ? AND company_id = ?"
        ))
        .bind(id)
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Participant::from))
    }

    pub async fn exists_in_company(
        &self,
        id: &str,
        company_id: &str,
    ) -> Result<bool, RepositoryError> {
        let found: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM participants WHERE id = ? AND company_id = ?")
                .bind(id)
                .bind(company_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(found.is_some())
    }

    pub async fn list_by_company(
        &self,
        company_id: &str,
        page: Page,
    ) -> Result<Vec<Participant>, RepositoryError> {
        let rows = sqlx::query_as::<_, ParticipantRow>(&format!(
            "SELECT {COLUMNS} FROM participants WHERE company_id = ? \
             ORDER BY created_at, rowid LIMIT ? OFFSET ?"
        ))
        .bind(company_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Participant::from).collect())
    }

    pub async fn update(&self, participant: &Participant) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE participants SET full_name = ?, email = ?, position = ? \
             WHERE id = ? AND company_id = ?",
        )
        .bind(&participant.full_name)
        .bind(&participant.email)
        .bind(&participant.position)
        .bind(&participant.id)
        .bind(&participant.company_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Removes the participant and their meeting registrations. A participant
    /// who has cast a vote is kept and [`RepositoryError::Referenced`] is
    /// returned, so stored tallies always match their voter rows.
    pub async fn delete(&self, id: &str, company_id: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM participants WHERE id = ? AND company_id = ?")
            .bind(id)
            .bind(company_id)
            .execute(&self.pool)
            .await
            .map_err(|err| match RepositoryError::from(err) {
                RepositoryError::MissingReference => RepositoryError::Referenced,
                other => other,
            })?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
