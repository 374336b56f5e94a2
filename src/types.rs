//! Common types used throughout the rating service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Identifier of a judge domain (tenant)
pub type DomainId = String;

/// Unique identifier for contests
pub type ContestId = Uuid;

/// Numeric user id inside the judge
pub type UserId = i64;

/// Built-in domain every judge installation has
pub const SYSTEM_DOMAIN: &str = "system";

/// Rating given to users who have never received a rating change
pub const DEFAULT_RATING: i64 = 400;

/// A participant entering one rating computation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contestant {
    pub user_id: UserId,
    /// Final standing, 1-based. Duplicates are allowed.
    pub rank: u32,
    pub prior_rating: i64,
}

impl Contestant {
    pub fn new(user_id: UserId, rank: u32, prior_rating: i64) -> Self {
        Self {
            user_id,
            rank,
            prior_rating,
        }
    }
}

/// Per-contestant breakdown produced by the rating engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContestantOutcome {
    pub user_id: UserId,
    pub rank: u32,
    pub prior_rating: i64,
    /// Expected rank given the field, self-bias corrected
    pub seed: f64,
    /// Rating whose expected rank matches the blended rank
    pub need_rating: i64,
    pub delta: i64,
}

/// Persisted rating change for one user in one contest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingChangeRecord {
    pub domain_id: DomainId,
    pub contest_id: ContestId,
    pub contest_title: String,
    pub user_id: UserId,
    pub previous_rating: i64,
    pub new_rating: i64,
    pub delta: i64,
    pub rank: u32,
    pub attend_at: DateTime<Utc>,
    pub calculated_at: DateTime<Utc>,
}

/// A contest registered as rating-eligible in a domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatedContest {
    pub contest_id: ContestId,
    pub domain_id: DomainId,
    pub title: String,
    pub attend_at: DateTime<Utc>,
}

/// Contest information carried with final standings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContestMetadata {
    pub contest_id: ContestId,
    pub domain_id: DomainId,
    pub title: String,
    pub attend_at: DateTime<Utc>,
}

impl From<&ContestMetadata> for RatedContest {
    fn from(meta: &ContestMetadata) -> Self {
        Self {
            contest_id: meta.contest_id,
            domain_id: meta.domain_id.clone(),
            title: meta.title.clone(),
            attend_at: meta.attend_at,
        }
    }
}

/// A scoreboard row; the first row of a board is always the header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScoreboardRow {
    Header {
        columns: Vec<String>,
    },
    Entry {
        rank: Option<u32>,
        user_id: Option<UserId>,
    },
}

impl ScoreboardRow {
    pub fn entry(rank: u32, user_id: UserId) -> Self {
        ScoreboardRow::Entry {
            rank: Some(rank),
            user_id: Some(user_id),
        }
    }
}

/// Participant details attached to a scoreboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub user_id: UserId,
    pub uname: String,
}

/// Final scoreboard of a finished contest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalStandings {
    pub contest: ContestMetadata,
    pub rows: Vec<ScoreboardRow>,
    pub participants: HashMap<UserId, Participant>,
}
