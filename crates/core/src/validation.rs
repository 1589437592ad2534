//! Field-level validation of request shapes and merged records.

use std::collections::HashSet;

use serde::Serialize;
use thiserror::Error;

use crate::types::{
    Company, Meeting, NewCompany, NewMeeting, NewParticipant, NewTopic, NewVoting, Participant,
    Topic,
};

pub const INN_LENGTH: usize = 10;
pub const NAME_MAX_LEN: usize = 255;
pub const ADDRESS_MAX_LEN: usize = 512;
pub const DESCRIPTION_MAX_LEN: usize = 4000;

/// Single violated constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Every violation found in one request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("validation failed: {}", summarize(.errors))]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|err| format!("{} {}", err.field, err.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.push(field, message);
        errors
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

pub trait Validate {
    fn validate(&self) -> Result<(), ValidationErrors>;
}

/// INN format check: exactly ten ASCII digits. No checksum is verified.
pub fn is_valid_inn(value: &str) -> bool {
    value.len() == INN_LENGTH && value.bytes().all(|b| b.is_ascii_digit())
}

pub fn is_valid_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && !domain.contains('@')
        && !value.chars().any(char::is_whitespace)
}

pub fn clean(value: String) -> String {
    let trimmed = value.trim();
    if trimmed.len() == value.len() {
        value
    } else {
        trimmed.to_string()
    }
}

/// Trims the value and turns blank strings into `None`.
pub fn clean_optional(value: Option<String>) -> Option<String> {
    value.map(clean).filter(|value| !value.is_empty())
}

fn require_text(errors: &mut ValidationErrors, field: &str, value: &str, max: usize) {
    if value.trim().is_empty() {
        errors.push(field, "must not be blank");
    } else if value.chars().count() > max {
        errors.push(field, format!("must be at most {max} characters"));
    }
}

fn optional_text(errors: &mut ValidationErrors, field: &str, value: Option<&str>, max: usize) {
    if let Some(value) = value {
        if value.chars().count() > max {
            errors.push(field, format!("must be at most {max} characters"));
        }
    }
}

fn company_rules(name: &str, inn: &str, address: Option<&str>) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    require_text(&mut errors, "name", name, NAME_MAX_LEN);
    if !is_valid_inn(inn) {
        errors.push("inn", "must consist of exactly 10 digits");
    }
    optional_text(&mut errors, "address", address, ADDRESS_MAX_LEN);
    errors.into_result()
}

fn participant_rules(
    full_name: &str,
    email: Option<&str>,
    position: Option<&str>,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    require_text(&mut errors, "full_name", full_name, NAME_MAX_LEN);
    if let Some(email) = email {
        if !is_valid_email(email) {
            errors.push("email", "must be a valid email address");
        }
    }
    optional_text(&mut errors, "position", position, NAME_MAX_LEN);
    errors.into_result()
}

fn meeting_rules(
    title: &str,
    description: Option<&str>,
    location: Option<&str>,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    require_text(&mut errors, "title", title, NAME_MAX_LEN);
    optional_text(&mut errors, "description", description, DESCRIPTION_MAX_LEN);
    optional_text(&mut errors, "location", location, ADDRESS_MAX_LEN);
    errors.into_result()
}

fn topic_rules(title: &str, description: Option<&str>) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    require_text(&mut errors, "title", title, NAME_MAX_LEN);
    optional_text(&mut errors, "description", description, DESCRIPTION_MAX_LEN);
    errors.into_result()
}

impl Validate for NewCompany {
    fn validate(&self) -> Result<(), ValidationErrors> {
        company_rules(&self.name, &self.inn, self.address.as_deref())
    }
}

impl Validate for Company {
    fn validate(&self) -> Result<(), ValidationErrors> {
        company_rules(&self.name, &self.inn, self.address.as_deref())
    }
}

impl Validate for NewParticipant {
    fn validate(&self) -> Result<(), ValidationErrors> {
        participant_rules(
            &self.full_name,
            self.email.as_deref(),
            self.position.as_deref(),
        )
    }
}

impl Validate for Participant {
    fn validate(&self) -> Result<(), ValidationErrors> {
        participant_rules(
            &self.full_name,
            self.email.as_deref(),
            self.position.as_deref(),
        )
    }
}

impl Validate for NewMeeting {
    fn validate(&self) -> Result<(), ValidationErrors> {
        meeting_rules(
            &self.title,
            self.description.as_deref(),
            self.location.as_deref(),
        )
    }
}

impl Validate for Meeting {
    fn validate(&self) -> Result<(), ValidationErrors> {
        meeting_rules(
            &self.title,
            self.description.as_deref(),
            self.location.as_deref(),
        )
    }
}

impl Validate for NewTopic {
    fn validate(&self) -> Result<(), ValidationErrors> {
        topic_rules(&self.title, self.description.as_deref())
    }
}

impl Validate for Topic {
    fn validate(&self) -> Result<(), ValidationErrors> {
        topic_rules(&self.title, self.description.as_deref())
    }
}

impl Validate for NewVoting {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if self.ballots.is_empty() {
            errors.push("ballots", "must contain at least one ballot");
        }

        let mut seen = HashSet::new();
        for (index, ballot) in self.ballots.iter().enumerate() {
            let field = format!("ballots[{index}].participant_id");
            if ballot.participant_id.is_empty() {
                errors.push(field, "must not be blank");
            } else if !seen.insert(ballot.participant_id.as_str()) {
                errors.push(field, "participant has already cast a ballot");
            }
        }
        errors.into_result()
    }
}
