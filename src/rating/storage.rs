//! Rating storage interface and implementations
//!
//! This module defines the interface for persisting rating history and the
//! current rating of domain users, with an in-memory implementation that
//! applies each contest's batch under a single write lock.

use crate::error::RatingError;
use crate::types::{ContestId, DomainId, RatedContest, RatingChangeRecord, UserId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// Trait for rating storage operations
#[async_trait]
pub trait RatingStore: Send + Sync {
    /// Current rating of each user; users never rated are omitted
    async fn current_ratings(
        &self,
        domain_id: &str,
        user_ids: &[UserId],
    ) -> crate::error::Result<HashMap<UserId, i64>>;

    /// Current rating of one user
    async fn user_rating(&self, domain_id: &str, user_id: UserId)
        -> crate::error::Result<Option<i64>>;

    /// Store one contest's rating changes and update current ratings atomically.
    ///
    /// A record for an existing (contest, user) pair replaces it.
    async fn add_rating_changes(
        &self,
        domain_id: &str,
        records: Vec<RatingChangeRecord>,
    ) -> crate::error::Result<()>;

    /// Rating changes of one contest, best rank first
    async fn contest_rating_changes(
        &self,
        domain_id: &str,
        contest_id: ContestId,
    ) -> crate::error::Result<Vec<RatingChangeRecord>>;

    /// Rating history of one user, oldest contest first
    async fn user_rating_changes(
        &self,
        domain_id: &str,
        user_id: UserId,
    ) -> crate::error::Result<Vec<RatingChangeRecord>>;

    /// Register (or update) a rating-eligible contest
    async fn add_rated_contest(&self, contest: RatedContest) -> crate::error::Result<()>;

    /// Remove one rating-eligible contest, returning whether it existed
    async fn remove_rated_contest(
        &self,
        domain_id: &str,
        contest_id: ContestId,
    ) -> crate::error::Result<bool>;

    /// Rating-eligible contests in ascending attendance time
    async fn rated_contests_by_attend_time(
        &self,
        domain_id: &str,
    ) -> crate::error::Result<Vec<RatedContest>>;

    /// Attendance time and id of the chronologically latest contest that has
    /// rating changes, ordered by `(attend_at, contest_id)`
    async fn latest_computed_contest(
        &self,
        domain_id: &str,
    ) -> crate::error::Result<Option<(DateTime<Utc>, ContestId)>>;

    /// Whether the domain is known to the store
    async fn contains_domain(&self, domain_id: &str) -> crate::error::Result<bool>;

    /// Undo the chronologically latest contest that has rating changes.
    ///
    /// Its records are removed and each affected user gets their previous
    /// rating back. Returns the removed records, empty when there was nothing
    /// to undo.
    async fn rollback_latest_contest(
        &self,
        domain_id: &str,
    ) -> crate::error::Result<Vec<RatingChangeRecord>>;

    /// Remove all rating changes and unset every current rating
    async fn clear_all(&self, domain_id: &str) -> crate::error::Result<()>;

    /// Clear, and also remove every rating-eligible contest
    async fn purge_all(&self, domain_id: &str) -> crate::error::Result<()>;
}

/// Rating state of a single domain
#[derive(Debug, Clone, Default)]
pub struct DomainRatingState {
    pub rated_contests: HashMap<ContestId, RatedContest>,
    pub changes: HashMap<(ContestId, UserId), RatingChangeRecord>,
    pub ratings: HashMap<UserId, i64>,
}

impl DomainRatingState {
    fn latest_contest(&self) -> Option<(DateTime<Utc>, ContestId)> {
        self.changes
            .values()
            .map(|r| (r.attend_at, r.contest_id))
            .max()
    }

    fn sorted_changes<F>(&self, filter: F) -> Vec<RatingChangeRecord>
    where
        F: Fn(&RatingChangeRecord) -> bool,
    {
        let mut records: Vec<RatingChangeRecord> =
            self.changes.values().filter(|r| filter(r)).cloned().collect();
        records.sort_by(|a, b| {
            a.attend_at
                .cmp(&b.attend_at)
                .then(a.contest_id.cmp(&b.contest_id))
                .then(a.rank.cmp(&b.rank))
                .then(a.user_id.cmp(&b.user_id))
        });
        records
    }
}

/// In-memory rating store implementation
#[derive(Debug, Default)]
pub struct InMemoryRatingStore {
    domains: RwLock<HashMap<DomainId, DomainRatingState>>,
}

impl InMemoryRatingStore {
    /// Create a new, empty in-memory rating store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already knows the given domains
    pub fn with_domains<I, S>(domain_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<DomainId>,
    {
        let domains = domain_ids
            .into_iter()
            .map(|id| (id.into(), DomainRatingState::default()))
            .collect();
        Self {
            domains: RwLock::new(domains),
        }
    }

    /// Make a domain known to the store; existing state is kept
    pub fn register_domain(&self, domain_id: &str) -> crate::error::Result<()> {
        let mut domains = self.write()?;
        domains.entry(domain_id.to_string()).or_default();
        Ok(())
    }

    /// Replace a domain's whole state (used when loading snapshots)
    pub fn load_domain(&self, domain_id: &str, state: DomainRatingState) -> crate::error::Result<()> {
        let mut domains = self.write()?;
        domains.insert(domain_id.to_string(), state);
        Ok(())
    }

    /// Copy of a domain's state (used when writing snapshots)
    pub fn domain_state(&self, domain_id: &str) -> crate::error::Result<Option<DomainRatingState>> {
        let domains = self.read()?;
        Ok(domains.get(domain_id).cloned())
    }

    /// Ids of every known domain
    pub fn domain_ids(&self) -> crate::error::Result<Vec<DomainId>> {
        let domains = self.read()?;
        let mut ids: Vec<DomainId> = domains.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    fn read(&self) -> crate::error::Result<RwLockReadGuard<'_, HashMap<DomainId, DomainRatingState>>> {
        self.domains
            .read()
            .map_err(|_| {
                RatingError::InternalError {
                    message: "Failed to acquire ratings read lock".to_string(),
                }
                .into()
            })
    }

    fn write(
        &self,
    ) -> crate::error::Result<RwLockWriteGuard<'_, HashMap<DomainId, DomainRatingState>>> {
        self.domains
            .write()
            .map_err(|_| {
                RatingError::InternalError {
                    message: "Failed to acquire ratings write lock".to_string(),
                }
                .into()
            })
    }
}

fn domain_not_found(domain_id: &str) -> anyhow::Error {
    RatingError::DomainNotFound {
        domain_id: domain_id.to_string(),
    }
    .into()
}

#[async_trait]
impl RatingStore for InMemoryRatingStore {
    async fn current_ratings(
        &self,
        domain_id: &str,
        user_ids: &[UserId],
    ) -> crate::error::Result<HashMap<UserId, i64>> {
        let domains = self.read()?;
        let state = domains
            .get(domain_id)
            .ok_or_else(|| domain_not_found(domain_id))?;

        let mut result = HashMap::new();
        for user_id in user_ids {
            if let Some(&rating) = state.ratings.get(user_id) {
                result.insert(*user_id, rating);
            }
        }

        Ok(result)
    }

    async fn user_rating(
        &self,
        domain_id: &str,
        user_id: UserId,
    ) -> crate::error::Result<Option<i64>> {
        let domains = self.read()?;
        let state = domains
            .get(domain_id)
            .ok_or_else(|| domain_not_found(domain_id))?;

        Ok(state.ratings.get(&user_id).copied())
    }

    async fn add_rating_changes(
        &self,
        domain_id: &str,
        records: Vec<RatingChangeRecord>,
    ) -> crate::error::Result<()> {
        if let Some(stray) = records.iter().find(|r| r.domain_id != domain_id) {
            return Err(RatingError::PersistenceFailed {
                message: format!(
                    "Rating change for user {} belongs to domain '{}', not '{}'",
                    stray.user_id, stray.domain_id, domain_id
                ),
            }
            .into());
        }

        let mut domains = self.write()?;
        let state = domains
            .get_mut(domain_id)
            .ok_or_else(|| domain_not_found(domain_id))?;

        let count = records.len();
        for record in records {
            state.ratings.insert(record.user_id, record.new_rating);
            state
                .changes
                .insert((record.contest_id, record.user_id), record);
        }

        debug!("Stored {} rating changes in domain '{}'", count, domain_id);
        Ok(())
    }

    async fn contest_rating_changes(
        &self,
        domain_id: &str,
        contest_id: ContestId,
    ) -> crate::error::Result<Vec<RatingChangeRecord>> {
        let domains = self.read()?;
        let state = domains
            .get(domain_id)
            .ok_or_else(|| domain_not_found(domain_id))?;

        Ok(state.sorted_changes(|r| r.contest_id == contest_id))
    }

    async fn user_rating_changes(
        &self,
        domain_id: &str,
        user_id: UserId,
    ) -> crate::error::Result<Vec<RatingChangeRecord>> {
        let domains = self.read()?;
        let state = domains
            .get(domain_id)
            .ok_or_else(|| domain_not_found(domain_id))?;

        Ok(state.sorted_changes(|r| r.user_id == user_id))
    }

    async fn add_rated_contest(&self, contest: RatedContest) -> crate::error::Result<()> {
        let mut domains = self.write()?;
        let state = domains
            .get_mut(&contest.domain_id)
            .ok_or_else(|| domain_not_found(&contest.domain_id))?;

        state.rated_contests.insert(contest.contest_id, contest);
        Ok(())
    }

    async fn remove_rated_contest(
        &self,
        domain_id: &str,
        contest_id: ContestId,
    ) -> crate::error::Result<bool> {
        let mut domains = self.write()?;
        let state = domains
            .get_mut(domain_id)
            .ok_or_else(|| domain_not_found(domain_id))?;

        Ok(state.rated_contests.remove(&contest_id).is_some())
    }

    async fn rated_contests_by_attend_time(
        &self,
        domain_id: &str,
    ) -> crate::error::Result<Vec<RatedContest>> {
        let domains = self.read()?;
        let state = domains
            .get(domain_id)
            .ok_or_else(|| domain_not_found(domain_id))?;

        let mut contests: Vec<RatedContest> = state.rated_contests.values().cloned().collect();
        contests.sort_by(|a, b| {
            a.attend_at
                .cmp(&b.attend_at)
                .then(a.contest_id.cmp(&b.contest_id))
        });
        Ok(contests)
    }

    async fn latest_computed_contest(
        &self,
        domain_id: &str,
    ) -> crate::error::Result<Option<(DateTime<Utc>, ContestId)>> {
        let domains = self.read()?;
        let state = domains
            .get(domain_id)
            .ok_or_else(|| domain_not_found(domain_id))?;

        Ok(state.latest_contest())
    }

    async fn contains_domain(&self, domain_id: &str) -> crate::error::Result<bool> {
        Ok(self.read()?.contains_key(domain_id))
    }

    async fn rollback_latest_contest(
        &self,
        domain_id: &str,
    ) -> crate::error::Result<Vec<RatingChangeRecord>> {
        let mut domains = self.write()?;
        let state = domains
            .get_mut(domain_id)
            .ok_or_else(|| domain_not_found(domain_id))?;

        let Some((_, contest_id)) = state.latest_contest() else {
            return Ok(Vec::new());
        };

        let removed = state.sorted_changes(|r| r.contest_id == contest_id);
        state.changes.retain(|(cid, _), _| *cid != contest_id);

        for record in &removed {
            let still_rated = state.changes.keys().any(|(_, uid)| *uid == record.user_id);
            if still_rated {
                state.ratings.insert(record.user_id, record.previous_rating);
            } else {
                state.ratings.remove(&record.user_id);
            }
        }

        Ok(removed)
    }

    async fn clear_all(&self, domain_id: &str) -> crate::error::Result<()> {
        let mut domains = self.write()?;
        let state = domains
            .get_mut(domain_id)
            .ok_or_else(|| domain_not_found(domain_id))?;

        state.changes.clear();
        state.ratings.clear();
        Ok(())
    }

    async fn purge_all(&self, domain_id: &str) -> crate::error::Result<()> {
        let mut domains = self.write()?;
        let state = domains
            .get_mut(domain_id)
            .ok_or_else(|| domain_not_found(domain_id))?;

        state.rated_contests.clear();
        state.changes.clear();
        state.ratings.clear();
        Ok(())
    }
}
