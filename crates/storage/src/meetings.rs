use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use govreg_core::types::{Meeting, NewMeeting};

use crate::{new_id, to_rfc3339, Page, RepositoryError};

const COLUMNS: &str = "id, company_id, title, description, scheduled_at, location, created_at";

/// Repository for company meetings.
#[derive(Clone)]
pub struct MeetingRepository {
    pool: SqlitePool,
}

#[derive(Debug, sqlx::FromRow)]
struct MeetingRow {
    id: String,
    company_id: String,
    title: String,
    description: Option<String>,
    scheduled_at: DateTime<Utc>,
    location: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<MeetingRow> for Meeting {
    fn from(row: MeetingRow) -> Self {
        Self {
            id: row.id,
            company_id: row.company_id,
            title: row.title,
            description: row.description,
            scheduled_at: row.scheduled_at,
            location: row.location,
            created_at: row.created_at,
        }
    }
}

impl MeetingRepository {
    pub(crate) fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert(
        &self,
        company_id: &str,
        meeting: &NewMeeting,
        created_at: DateTime<Utc>,
    ) -> Result<Meeting, RepositoryError> {
        let row = sqlx::query_as::<_, MeetingRow>(&format!(
            "INSERT INTO meetings \
             (id, company_id, title, description, scheduled_at, location, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING {COLUMNS}"
        ))
        .bind(new_id())
        .bind(company_id)
        .bind(&meeting.title)
        .bind(&meeting.description)
        .bind(to_rfc3339(meeting.scheduled_at))
        .bind(&meeting.location)
        .bind(to_rfc3339(created_at))
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    #[cfg(test)]
    pub(crate) async fn find(&self, id: &str) -> Result<Option<Meeting>, RepositoryError> {
        let row = sqlx::query_as::<_, MeetingRow>(&format!(
            "SELECT {COLUMNS} FROM meetings WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Meeting::from))
    }

    pub async fn find_in_company(
        &self,
        id: &str,
        company_id: &str,
    ) -> Result<Option<Meeting>, RepositoryError> {
        let row = sqlx::query_as::<_, MeetingRow>(&format!(
            "SELECT {COLUMNS} FROM meetings WHERE id = ? AND company_id = ?"
        ))
        .bind(id)
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Meeting::from))
    }

    pub async fn exists_in_company(
        &self,
        id: &str,
        company_id: &str,
    ) -> Result<bool, RepositoryError> {
        let found: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM meetings WHERE id = ? AND company_id = ?")
                .bind(id)
                .bind(company_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(found.is_some())
    }

    /// Lists the meetings of a company, earliest scheduled first.
    pub async fn list_by_company(
        &self,
        company_id: &str,
        page: Page,
    ) -> Result<Vec<Meeting>, RepositoryError> {
        let rows = sqlx::query_as::<_, MeetingRow>(&format!(
            "SELECT {COLUMNS} FROM meetings WHERE company_id = ? \
             ORDER BY scheduled_at, rowid LIMIT ? OFFSET ?"
        ))
        .bind(company_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Meeting::from).collect())
    }

    pub async fn update(&self, meeting: &Meeting) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE meetings SET title = ?, description = ?, scheduled_at = ?, location = ? \
             WHERE id = ? AND company_id = ?",
        )
        .bind(&meeting.title)
        .bind(&meeting.description)
        .bind(to_rfc3339(meeting.scheduled_at))
        .bind(&meeting.location)
        .bind(&meeting.id)
        .bind(&meeting.company_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    pub async fn delete(&self, id: &str, company_id: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM meetings WHERE id = ? AND company_id = ?")
            .bind(id)
            .bind(company_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{at, company, meeting, setup_db};

    #[tokio::test]
    async fn meetings_are_listed_by_schedule() {
        let (_dir, db) = setup_db().await;
        let acme = company(&db, "1000000001").await;
        let repo = db.meetings();

        let late = repo
            .insert(
                &acme.id,
                &NewMeeting {
                    title: "Board".into(),
                    description: Some("Quarterly".into()),
                    scheduled_at: at(18),
                    location: None,
                },
                at(7),
            )
            .await
            .expect("insert late");
        let early = meeting(&db, &acme.id).await;

        let listed = repo.list_by_company(&acme.id, Page::default()).await.expect("list");
        assert_eq!(listed, vec![early, late]);
    }

    #[tokio::test]
    async fn update_persists_reschedule() {
        let (_dir, db) = setup_db().await;
        let acme = company(&db, "1000000001").await;
        let mut agm = meeting(&db, &acme.id).await;

        agm.scheduled_at = at(20);
        agm.location = Some("Head office".into());
        db.meetings().update(&agm).await.expect("update");

        let loaded = db
            .meetings()
            .find_in_company(&agm.id, &acme.id)
            .await
            .expect("find")
            .expect("present");
        assert_eq!(loaded, agm);
    }

    #[tokio::test]
    async fn meeting_of_other_company_is_invisible() {
        let (_dir, db) = setup_db().await;
        let acme = company(&db, "1000000001").await;
        let globex = company(&db, "1000000002").await;
        let agm = meeting(&db, &acme.id).await;

        let repo = db.meetings();
        assert!(repo.exists_in_company(&agm.id, &acme.id).await.expect("exists"));
        assert!(!repo.exists_in_company(&agm.id, &globex.id).await.expect("exists"));
        let err = repo.delete(&agm.id, &globex.id).await.expect_err("foreign");
        assert!(matches!(err, RepositoryError::NotFound));
    }
}
