//! Scoreboard validation
//!
//! Malformed standings are rejected here so the rating engine only ever sees
//! well-formed (rank, user) pairs.

use crate::error::RatingError;
use crate::types::{Contestant, FinalStandings, ScoreboardRow, UserId};
use std::collections::HashSet;

/// A validated scoreboard entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankedEntry {
    pub user_id: UserId,
    pub rank: u32,
}

/// Extract the ranked entries of a scoreboard, in standings order
pub fn ranked_entries(standings: &FinalStandings) -> crate::error::Result<Vec<RankedEntry>> {
    let contest_id = standings.contest.contest_id;
    let invalid = |reason: String| -> anyhow::Error {
        RatingError::InvalidStandings { contest_id, reason }.into()
    };

    match standings.rows.first() {
        Some(ScoreboardRow::Header { .. }) => {}
        _ => return Err(invalid("scoreboard does not start with a header row".to_string())),
    }

    let mut seen = HashSet::new();
    let mut entries = Vec::with_capacity(standings.rows.len() - 1);
    for (index, row) in standings.rows.iter().enumerate().skip(1) {
        let (rank, user_id) = match row {
            ScoreboardRow::Header { .. } => {
                return Err(invalid(format!("unexpected header at row {index}")));
            }
            ScoreboardRow::Entry { rank, user_id } => (*rank, *user_id),
        };

        let user_id = user_id.ok_or_else(|| invalid(format!("row {index} has no participant id")))?;
        let rank = rank.ok_or_else(|| invalid(format!("row {index} has no rank")))?;
        if rank == 0 {
            return Err(invalid(format!("row {index} has rank 0, ranks start at 1")));
        }
        if !standings.participants.contains_key(&user_id) {
            return Err(invalid(format!(
                "user {user_id} at row {index} is not a participant"
            )));
        }
        if !seen.insert(user_id) {
            return Err(invalid(format!("user {user_id} appears more than once")));
        }

        entries.push(RankedEntry { user_id, rank });
    }

    Ok(entries)
}

/// Check a contestant list supplied directly to the rating engine
pub fn validate_contestants(contestants: &[Contestant]) -> crate::error::Result<()> {
    let invalid = |reason: String| -> anyhow::Error {
        RatingError::InvalidContestants { reason }.into()
    };

    let mut seen = HashSet::new();
    for (index, contestant) in contestants.iter().enumerate() {
        if contestant.rank == 0 {
            return Err(invalid(format!(
                "user {} at position {index} has rank 0, ranks start at 1",
                contestant.user_id
            )));
        }
        if !seen.insert(contestant.user_id) {
            return Err(invalid(format!(
                "user {} appears more than once",
                contestant.user_id
            )));
        }
    }

    Ok(())
}
