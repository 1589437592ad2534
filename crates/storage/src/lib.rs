mod attendance;
mod companies;
mod meetings;
mod participants;
mod topics;
mod votings;

use std::{str::FromStr, time::Duration};

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{
    migrate::MigrateError,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
    SqlitePool,
};
use thiserror::Error;
use uuid::Uuid;

pub use attendance::AttendanceRepository;
pub use companies::CompanyRepository;
pub use meetings::MeetingRepository;
pub use participants::ParticipantRepository;
pub use topics::TopicRepository;
pub use votings::VotingRepository;

pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Top-level database handle that owns the SQLite connection pool.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Establishes a new SQLite connection pool for the provided connection string.
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        Self::connect_with(database_url, DEFAULT_MAX_CONNECTIONS).await
    }

    /// Same as [`Database::connect`] with an explicit pool size.
    ///
    /// Every pooled connection enforces foreign keys and uses WAL journaling
    /// with a five second busy timeout.
    pub async fn connect_with(
        database_url: &str,
        max_connections: u32,
    ) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(StorageError::Connect)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(StorageError::Connect)?;

        Ok(Self { pool })
    }

    /// Applies migrations located under `migrations/`.
    pub async fn run_migrations(&self) -> Result<(), StorageError> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(StorageError::Migration)?;
        Ok(())
    }

    pub fn companies(&self) -> CompanyRepository {
        CompanyRepository::new(self.pool.clone())
    }

    pub fn participants(&self) -> ParticipantRepository {
        ParticipantRepository::new(self.pool.clone())
    }

    pub fn meetings(&self) -> MeetingRepository {
        MeetingRepository::new(self.pool.clone())
    }

    /// Returns a handle for the meeting attendance join table.
    pub fn attendance(&self) -> AttendanceRepository {
        AttendanceRepository::new(self.pool.clone())
    }

    pub fn topics(&self) -> TopicRepository {
        TopicRepository::new(self.pool.clone())
    }

    /// Returns a handle for votings and their voter rows.
    pub fn votings(&self) -> VotingRepository {
        VotingRepository::new(self.pool.clone())
    }

    /// Exposes the inner pool when lower level access is required.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// General storage level errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to connect to sqlite: {0}")]
    Connect(sqlx::Error),
    #[error("failed to run database migrations: {0}")]
    Migration(MigrateError),
}

/// Errors returned by every repository.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("record conflicts with an existing row")]
    Conflict,
    #[error("referenced record does not exist")]
    MissingReference,
    #[error("record is still referenced by other rows")]
    Referenced,
    #[error("stored row is invalid: {0}")]
    InvalidRow(String),
    #[error("database error: {0}")]
    Database(sqlx::Error),
}

const SQLITE_CONSTRAINT_FOREIGNKEY: &str = "787";
const SQLITE_CONSTRAINT_PRIMARYKEY: &str = "1555";
const SQLITE_CONSTRAINT_UNIQUE: &str = "2067";

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|code| code.into_owned());
                match code.as_deref() {
                    Some(SQLITE_CONSTRAINT_UNIQUE) | Some(SQLITE_CONSTRAINT_PRIMARYKEY) => {
                        Self::Conflict
                    }
                    Some(SQLITE_CONSTRAINT_FOREIGNKEY) => Self::MissingReference,
                    _ => Self::Database(sqlx::Error::Database(db_err)),
                }
            }
            other => Self::Database(other),
        }
    }
}

/// Window of a list query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: u32,
    pub offset: u32,
}

impl Page {
    pub const DEFAULT_LIMIT: u32 = 50;
    pub const MAX_LIMIT: u32 = 200;

    /// Builds a page, clamping the limit to `1..=MAX_LIMIT`.
    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        Self {
            limit: limit
                .unwrap_or(Self::DEFAULT_LIMIT)
                .clamp(1, Self::MAX_LIMIT),
            offset: offset.unwrap_or(0),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

fn to_rfc3339(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}
