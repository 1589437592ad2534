use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::validation::{clean, clean_optional};

/// Company registered in the system. Every other record hangs off a company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub id: String,
    pub name: String,
    pub inn: String,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Person who may attend meetings of a company and vote on its topics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    pub company_id: String,
    pub full_name: String,
    pub email: Option<String>,
    pub position: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meeting {
    pub id: String,
    pub company_id: String,
    pub title: String,
    pub description: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Attendance record of a participant at a specific meeting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeetingParticipant {
    pub id: String,
    pub meeting_id: String,
    pub participant_id: String,
    pub present: bool,
    pub registered_at: DateTime<Utc>,
}

/// Agenda item of a meeting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub id: String,
    pub meeting_id: String,
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Aggregated outcome of the vote held on a topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voting {
    pub id: String,
    pub topic_id: String,
    pub votes_for: u32,
    pub votes_against: u32,
    pub votes_abstain: u32,
    pub accepted: bool,
    pub created_at: DateTime<Utc>,
}

/// Single ballot cast as part of a voting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voter {
    pub id: String,
    pub voting_id: String,
    pub participant_id: String,
    pub vote: VoteType,
}

/// Voting together with its ballots, as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VotingReport {
    #[serde(flatten)]
    pub voting: Voting,
    pub decision: Decision,
    pub voters: Vec<Voter>,
}

impl VotingReport {
    pub fn new(voting: Voting, voters: Vec<Voter>) -> Self {
        let decision = Decision::from_accepted(voting.accepted);
        Self {
            voting,
            decision,
            voters,
        }
    }
}

/// Kind of ballot a participant may cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VoteType {
    For,
    Against,
    Abstain,
}

impl VoteType {
    /// Returns the canonical database representation for the vote.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::For => "FOR",
            Self::Against => "AGAINST",
            Self::Abstain => "ABSTAIN",
        }
    }
}

impl FromStr for VoteType {
    type Err = UnknownVoteType;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "FOR" => Ok(Self::For),
            "AGAINST" => Ok(Self::Against),
            "ABSTAIN" => Ok(Self::Abstain),
            other => Err(UnknownVoteType(other.to_string())),
        }
    }
}

impl fmt::Display for VoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown vote type: {0}")]
pub struct UnknownVoteType(pub String);

/// Outcome of a voting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Accepted,
    Rejected,
}

impl Decision {
    pub fn from_accepted(accepted: bool) -> Self {
        if accepted {
            Self::Accepted
        } else {
            Self::Rejected
        }
    }

    pub fn is_accepted(self) -> bool {
        matches!(self, Self::Accepted)
    }

    /// Label used in logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewCompany {
    pub name: String,
    pub inn: String,
    pub address: Option<String>,
}

impl NewCompany {
    /// Trims every text field and drops blank optional values.
    pub fn normalized(self) -> Self {
        Self {
            name: clean(self.name),
            inn: clean(self.inn),
            address: clean_optional(self.address),
        }
    }
}

/// Partial update of a company; absent fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CompanyPatch {
    pub name: Option<String>,
    pub inn: Option<String>,
    pub address: Option<String>,
}

impl CompanyPatch {
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.map(clean),
            inn: self.inn.map(clean),
            address: clean_optional(self.address),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewParticipant {
    pub full_name: String,
    pub email: Option<String>,
    pub position: Option<String>,
}

impl NewParticipant {
    pub fn normalized(self) -> Self {
        Self {
            full_name: clean(self.full_name),
            email: clean_optional(self.email),
            position: clean_optional(self.position),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ParticipantPatch {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub position: Option<String>,
}

impl ParticipantPatch {
    pub fn normalized(self) -> Self {
        Self {
            full_name: self.full_name.map(clean),
            email: clean_optional(self.email),
            position: clean_optional(self.position),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewMeeting {
    pub title: String,
    pub description: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub location: Option<String>,
}

impl NewMeeting {
    pub fn normalized(self) -> Self {
        Self {
            title: clean(self.title),
            description: clean_optional(self.description),
            scheduled_at: self.scheduled_at,
            location: clean_optional(self.location),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MeetingPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub location: Option<String>,
}

impl MeetingPatch {
    pub fn normalized(self) -> Self {
        Self {
            title: self.title.map(clean),
            description: clean_optional(self.description),
            scheduled_at: self.scheduled_at,
            location: clean_optional(self.location),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewTopic {
    pub title: String,
    pub description: Option<String>,
}

impl NewTopic {
    pub fn normalized(self) -> Self {
        Self {
            title: clean(self.title),
            description: clean_optional(self.description),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TopicPatch {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl TopicPatch {
    pub fn normalized(self) -> Self {
        Self {
            title: self.title.map(clean),
            description: clean_optional(self.description),
        }
    }
}

/// Request to register a participant for a meeting.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RegisterAttendee {
    pub participant_id: String,
    #[serde(default = "default_present")]
    pub present: bool,
}

fn default_present() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct AttendancePatch {
    pub present: bool,
}

/// Ballot submitted when a voting is opened on a topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ballot {
    pub participant_id: String,
    pub vote: VoteType,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewVoting {
    pub ballots: Vec<Ballot>,
}

impl NewVoting {
    pub fn normalized(self) -> Self {
        Self {
            ballots: self
                .ballots
                .into_iter()
                .map(|ballot| Ballot {
                    participant_id: clean(ballot.participant_id),
                    vote: ballot.vote,
                })
                .collect(),
        }
    }
}
