//! Error types for the rating service
//!
//! This module defines all error types using anyhow for consistent error handling
//! throughout the application.

use crate::types::{ContestId, DomainId};

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific rating scenarios
#[derive(Debug, thiserror::Error)]
pub enum RatingError {
    #[error("Invalid standings for contest {contest_id}: {reason}")]
    InvalidStandings {
        contest_id: ContestId,
        reason: String,
    },

    #[error("Invalid contestants: {reason}")]
    InvalidContestants { reason: String },

    #[error(
        "Contest {contest_id} does not come after already rated contest {later}; \
         recompute the domain instead"
    )]
    OutOfOrder {
        contest_id: ContestId,
        later: ContestId,
    },

    #[error("Contest not found: {contest_id}")]
    ContestNotFound { contest_id: ContestId },

    #[error("Domain not found: {domain_id}")]
    DomainNotFound { domain_id: DomainId },

    #[error("Persisting rating changes failed: {message}")]
    PersistenceFailed { message: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Internal service error: {message}")]
    InternalError { message: String },
}

impl RatingError {
    /// Short label used for metrics and log fields
    pub fn kind(&self) -> &'static str {
        match self {
            RatingError::InvalidStandings { .. } => "invalid_standings",
            RatingError::InvalidContestants { .. } => "invalid_contestants",
            RatingError::OutOfOrder { .. } => "out_of_order",
            RatingError::ContestNotFound { .. } => "contest_not_found",
            RatingError::DomainNotFound { .. } => "domain_not_found",
            RatingError::PersistenceFailed { .. } => "persistence",
            RatingError::ConfigurationError { .. } => "configuration",
            RatingError::InternalError { .. } => "internal",
        }
    }
}

/// Classify an arbitrary error for metrics labelling
pub fn error_kind(error: &anyhow::Error) -> &'static str {
    error
        .downcast_ref::<RatingError>()
        .map(RatingError::kind)
        .unwrap_or("other")
}
