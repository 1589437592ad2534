use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use govreg_core::types::{Company, NewCompany};

use crate::{new_id, to_rfc3339, Page, RepositoryError};

const COLUMNS: &str = "id, name, inn, address, created_at";

/// Repository for the `companies` table.
#[derive(Clone)]
pub struct CompanyRepository {
    pool: SqlitePool,
}

#[derive(Debug, sqlx::FromRow)]
struct CompanyRow {
    id: String,
    name: String,
    inn: String,
    address: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<CompanyRow> for Company {
    fn from(row: CompanyRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            inn: row.inn,
            address: row.address,
            created_at: row.created_at,
        }
    }
}

impl CompanyRepository {
    pub(crate) fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Inserts a new company. A duplicate INN surfaces as [`RepositoryError::Conflict`].
    pub async fn insert(
        &self,
        company: &NewCompany,
        created_at: DateTime<Utc>,
    ) -> Result<Company, RepositoryError> {
        let row = sqlx::query_as::<_, CompanyRow>(&format!(
            "INSERT INTO companies (id, name, inn, address, created_at) \
             VALUES (?, ?, ?, ?, ?) RETURNING {COLUMNS}"
        ))
        .bind(new_id())
        .bind(&company.name)
        .bind(&company.inn)
        .bind(&company.address)
        .bind(to_rfc3339(created_at))
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    pub async fn find(&self, id: &str) -> Result<Option<Company>, RepositoryError> {
        let row = sqlx::query_as::<_, CompanyRow>(&format!(
            "SELECT {COLUMNS} FROM companies WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Company::from))
    }

    /// Lists companies in insertion order.
    pub async fn list(&self, page: Page) -> Result<Vec<Company>, RepositoryError> {
        let rows = sqlx::query_as::<_, CompanyRow>(&format!(
            "SELECT {COLUMNS} FROM companies ORDER BY created_at, rowid LIMIT ? OFFSET ?"
        ))
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Company::from).collect())
    }

    pub async fn exists(&self, id: &str) -> Result<bool, RepositoryError> {
        let found: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM companies WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    pub async fn exists_by_inn(&self, inn: &str) -> Result<bool, RepositoryError> {
        let found: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM companies WHERE inn = ?")
            .bind(inn)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    /// Writes every mutable column of the company back to the table.
    pub async fn update(&self, company: &Company) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE companies SET name = ?, inn = ?, address = ? WHERE id = ?")
            .bind(&company.name)
            .bind(&company.inn)
            .bind(&company.address)
            .bind(&company.id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Deletes the company together with everything that belongs to it.
    pub async fn delete(&self, id: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM companies WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
