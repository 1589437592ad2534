//! Ownership checks for nested resource paths.
//!
//! A child that exists under a different parent is reported exactly like a
//! child that does not exist at all.

use govreg_core::types::Company;
use govreg_storage::Database;

use crate::error::ApiError;

pub async fn company(db: &Database, company_id: &str) -> Result<Company, ApiError> {
    db.companies()
        .find(company_id)
        .await?
        .ok_or(ApiError::NotFound("company"))
}

pub async fn ensure_company(db: &Database, company_id: &str) -> Result<(), ApiError> {
    if !db.companies().exists(company_id).await? {
        return Err(ApiError::NotFound("company"));
    }
    Ok(())
}

/// Company exists and owns the meeting.
pub async fn ensure_meeting(
    db: &Database,
    company_id: &str,
    meeting_id: &str,
) -> Result<(), ApiError> {
    ensure_company(db, company_id).await?;
    if !db.meetings().exists_in_company(meeting_id, company_id).await? {
        return Err(ApiError::NotFound("meeting"));
    }
    Ok(())
}

pub async fn ensure_topic(
    db: &Database,
    company_id: &str,
    meeting_id: &str,
    topic_id: &str,
) -> Result<(), ApiError> {
    ensure_meeting(db, company_id, meeting_id).await?;
    if !db.topics().exists_in_meeting(topic_id, meeting_id).await? {
        return Err(ApiError::NotFound("topic"));
    }
    Ok(())
}
