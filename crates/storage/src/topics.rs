use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use govreg_core::types::{NewTopic, Topic};

use crate::{new_id, to_rfc3339, Page, RepositoryError};

const COLUMNS: &str = "id, meeting_id, title, description, created_at";

/// Repository for meeting agenda topics.
#[derive(Clone)]
pub struct TopicRepository {
    pool: SqlitePool,
}

#[derive(Debug, sqlx::FromRow)]
struct TopicRow {
    id: String,
    meeting_id: String,
    title: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<TopicRow> for Topic {
    fn from(row: TopicRow) -> Self {
        Self {
            id: row.id,
            meeting_id: row.meeting_id,
            title: row.title,
            description: row.description,
            created_at: row.created_at,
        }
    }
}

impl TopicRepository {
    pub(crate) fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert(
        &self,
        meeting_id: &str,
        topic: &NewTopic,
        created_at: DateTime<Utc>,
    ) -> Result<Topic, RepositoryError> {
        let row = sqlx::query_as::<_, TopicRow>(&format!(
            "INSERT INTO topics (id, meeting_id, title, description, created_at) \
             VALUES (?, ?, ?, ?, ?) RETURNING {COLUMNS}"
        ))
        .bind(new_id())
        .bind(meeting_id)
        .bind(&topic.title)
        .bind(&topic.description)
        .bind(to_rfc3339(created_at))
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    pub async fn find_in_meeting(
        &self,
        id: &str,
        meeting_id: &str,
    ) -> Result<Option<Topic>, RepositoryError> {
        let row = sqlx::query_as::<_, TopicRow>(&format!(
            "SELECT {COLUMNS} FROM topics WHERE id = ? AND meeting_id = ?"
        ))
        .bind(id)
        .bind(meeting_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Topic::from))
    }

    pub async fn exists_in_meeting(
        &self,
        id: &str,
        meeting_id: &str,
    ) -> Result<bool, RepositoryError> {
        let found: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM topics WHERE id = ? AND meeting_id = ?")
                .bind(id)
                .bind(meeting_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(found.is_some())
    }

    /// Lists the agenda of a meeting in the order topics were added.
    pub async fn list_by_meeting(
        &self,
        meeting_id: &str,
        page: Page,
    ) -> Result<Vec<Topic>, RepositoryError> {
        let rows = sqlx::query_as::<_, TopicRow>(&format!(
            "SELECT {COLUMNS} FROM topics WHERE meeting_id = ? \
             ORDER BY created_at, rowid LIMIT ? OFFSET ?"
        ))
        .bind(meeting_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Topic::from).collect())
    }

    pub async fn update(&self, topic: &Topic) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE topics SET title = ?, description = ? WHERE id = ? AND meeting_id = ?",
        )
        .bind(&topic.title)
        .bind(&topic.description)
        .bind(&topic.id)
        .bind(&topic.meeting_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    pub async fn delete(&self, id: &str, meeting_id: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM topics WHERE id = ? AND meeting_id = ?")
            .bind(id)
            .bind(meeting_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
