//! Contest rating orchestration
//!
//! Wires the standings loader, the rating calculator and the rating store
//! together. Ratings are path-dependent, so every mutating operation holds
//! its domain's lock for its full duration; different domains proceed in
//! parallel.

use crate::error::{error_kind, RatingError, Result};
use crate::metrics::MetricsCollector;
use crate::rating::{RatingCalculator, RatingStore};
use crate::standings::{ranked_entries, StandingsLoader};
use crate::types::{
    ContestId, Contestant, DomainId, RatedContest, RatingChangeRecord, UserId,
};
use crate::utils::current_timestamp;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Outcome of replaying a domain's rated contests
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaySummary {
    pub contests_processed: usize,
    pub rating_changes: usize,
}

/// Rating service coordinating loader, calculator and store
pub struct RatingService {
    loader: Arc<dyn StandingsLoader>,
    store: Arc<dyn RatingStore>,
    calculator: Arc<dyn RatingCalculator>,
    metrics: Arc<MetricsCollector>,
    domain_locks: Mutex<HashMap<DomainId, Arc<Mutex<()>>>>,
}

impl RatingService {
    /// Create a new rating service
    pub fn new(
        loader: Arc<dyn StandingsLoader>,
        store: Arc<dyn RatingStore>,
        calculator: Arc<dyn RatingCalculator>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            loader,
            store,
            calculator,
            metrics,
            domain_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Get the metrics collector
    pub fn metrics(&self) -> Arc<MetricsCollector> {
        self.metrics.clone()
    }

    /// Lock serializing mutations of one domain.
    ///
    /// Only domains known to the store get an entry; domains are never
    /// forgotten by the store, so the map is bounded by the number of domains.
    async fn domain_lock(&self, domain_id: &str) -> Result<Arc<Mutex<()>>> {
        if !self.store.contains_domain(domain_id).await? {
            return Err(RatingError::DomainNotFound {
                domain_id: domain_id.to_string(),
            }
            .into());
        }

        let mut locks = self.domain_locks.lock().await;
        Ok(locks
            .entry(domain_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone())
    }

    /// Compute and persist the rating changes of one contest
    pub async fn process_contest_rating(
        &self,
        domain_id: &str,
        contest_id: ContestId,
    ) -> Result<Vec<RatingChangeRecord>> {
        let lock = self.domain_lock(domain_id).await?;
        let _guard = lock.lock().await;

        self.process_contest_locked(domain_id, contest_id).await
    }

    /// Process every rated contest of a domain in ascending attendance time.
    ///
    /// Stops at the first failing contest; later contests are not touched
    /// because their prior ratings would depend on the missing results.
    pub async fn process_all_contest_ratings(&self, domain_id: &str) -> Result<ReplaySummary> {
        let lock = self.domain_lock(domain_id).await?;
        let _guard = lock.lock().await;

        self.replay_locked(domain_id).await
    }

    /// Clear all computed ratings, then replay every rated contest from scratch
    pub async fn recompute_all_ratings(&self, domain_id: &str) -> Result<ReplaySummary> {
        let lock = self.domain_lock(domain_id).await?;
        let _guard = lock.lock().await;

        self.store.clear_all(domain_id).await?;
        self.metrics.record_domain_operation("recompute");
        info!("Cleared ratings of domain '{}' before full recomputation", domain_id);

        self.replay_locked(domain_id).await
    }

    /// Remove rating history and current ratings, keeping rated contests
    pub async fn clear_all_ratings(&self, domain_id: &str) -> Result<()> {
        let lock = self.domain_lock(domain_id).await?;
        let _guard = lock.lock().await;

        self.store.clear_all(domain_id).await?;
        self.metrics.record_domain_operation("clear");
        info!("Cleared all ratings of domain '{}'", domain_id);
        Ok(())
    }

    /// Remove rating history, current ratings and rated contests
    pub async fn purge_all_ratings(&self, domain_id: &str) -> Result<()> {
        let lock = self.domain_lock(domain_id).await?;
        let _guard = lock.lock().await;

        self.store.purge_all(domain_id).await?;
        self.metrics.record_domain_operation("purge");
        info!("Purged all ratings of domain '{}'", domain_id);
        Ok(())
    }

    /// Mark a contest as rating-eligible
    pub async fn add_contest_to_rating(
        &self,
        domain_id: &str,
        contest_id: ContestId,
    ) -> Result<RatedContest> {
        let lock = self.domain_lock(domain_id).await?;
        let _guard = lock.lock().await;

        let standings = self.loader.final_standings(domain_id, contest_id).await?;
        let rated = RatedContest::from(&standings.contest);
        self.store.add_rated_contest(rated.clone()).await?;

        info!(
            "Contest '{}' ({}) of domain '{}' is now rated",
            rated.title, contest_id, domain_id
        );
        Ok(rated)
    }

    /// Remove a contest's rating eligibility; its rating history is kept
    pub async fn delete_rating(&self, domain_id: &str, contest_id: ContestId) -> Result<bool> {
        let lock = self.domain_lock(domain_id).await?;
        let _guard = lock.lock().await;

        let removed = self.store.remove_rated_contest(domain_id, contest_id).await?;
        if !removed {
            warn!(
                "Contest {} was not rated in domain '{}'",
                contest_id, domain_id
            );
        }
        Ok(removed)
    }

    /// Undo the chronologically latest processed contest
    pub async fn rollback_last_contest(&self, domain_id: &str) -> Result<Option<ContestId>> {
        let lock = self.domain_lock(domain_id).await?;
        let _guard = lock.lock().await;

        let removed = self.store.rollback_latest_contest(domain_id).await?;
        let Some(first) = removed.first() else {
            info!("Nothing to roll back in domain '{}'", domain_id);
            return Ok(None);
        };

        self.metrics.record_domain_operation("rollback");
        info!(
            "Rolled back contest '{}' ({}) in domain '{}': {} rating changes removed",
            first.contest_title,
            first.contest_id,
            domain_id,
            removed.len()
        );
        Ok(Some(first.contest_id))
    }

    /// Rating history of one user, oldest contest first
    pub async fn user_rating_history(
        &self,
        domain_id: &str,
        user_id: UserId,
    ) -> Result<Vec<RatingChangeRecord>> {
        self.store.user_rating_changes(domain_id, user_id).await
    }

    /// Current rating of one user, `None` if never rated
    pub async fn user_rating(&self, domain_id: &str, user_id: UserId) -> Result<Option<i64>> {
        self.store.user_rating(domain_id, user_id).await
    }

    /// Rating changes recorded for one contest, best rank first
    pub async fn contest_rating_changes(
        &self,
        domain_id: &str,
        contest_id: ContestId,
    ) -> Result<Vec<RatingChangeRecord>> {
        self.store.contest_rating_changes(domain_id, contest_id).await
    }

    /// Rating-eligible contests of a domain, oldest first
    pub async fn rated_contests(&self, domain_id: &str) -> Result<Vec<RatedContest>> {
        self.store.rated_contests_by_attend_time(domain_id).await
    }

    async fn replay_locked(&self, domain_id: &str) -> Result<ReplaySummary> {
        let timer = self.metrics.start_timer();
        let contests = self.store.rated_contests_by_attend_time(domain_id).await?;
        info!(
            "Replaying {} rated contests of domain '{}'",
            contests.len(),
            domain_id
        );

        let mut summary = ReplaySummary::default();
        for contest in &contests {
            let records = self
                .process_contest_locked(domain_id, contest.contest_id)
                .await
                .with_context(|| {
                    format!(
                        "replay of domain '{}' stopped at contest '{}' ({})",
                        domain_id, contest.title, contest.contest_id
                    )
                })?;

            summary.contests_processed += 1;
            summary.rating_changes += records.len();
        }

        self.metrics.record_replay(timer.stop());
        info!(
            "Replayed domain '{}': {} contests, {} rating changes",
            domain_id, summary.contests_processed, summary.rating_changes
        );
        Ok(summary)
    }

    async fn process_contest_locked(
        &self,
        domain_id: &str,
        contest_id: ContestId,
    ) -> Result<Vec<RatingChangeRecord>> {
        let result = self.compute_and_store(domain_id, contest_id).await;

        if let Err(e) = &result {
            let kind = error_kind(e);
            self.metrics.record_contest_failed(kind);
            error!(
                "Rating contest {} in domain '{}' failed ({}): {:#}",
                contest_id, domain_id, kind, e
            );
        }

        result
    }

    async fn compute_and_store(
        &self,
        domain_id: &str,
        contest_id: ContestId,
    ) -> Result<Vec<RatingChangeRecord>> {
        let standings = self.loader.final_standings(domain_id, contest_id).await?;
        if standings.contest.contest_id != contest_id || standings.contest.domain_id != domain_id {
            return Err(RatingError::InvalidStandings {
                contest_id,
                reason: format!(
                    "loader returned contest {} of domain '{}'",
                    standings.contest.contest_id, standings.contest.domain_id
                ),
            }
            .into());
        }

        // Priors come from the current rating field, which is only valid for a
        // contest after every contest already rated
        let attend_key = (standings.contest.attend_at, contest_id);
        if let Some(latest) = self.store.latest_computed_contest(domain_id).await? {
            if latest >= attend_key {
                return Err(RatingError::OutOfOrder {
                    contest_id,
                    later: latest.1,
                }
                .into());
            }
        }

        let entries = ranked_entries(&standings)?;
        if entries.is_empty() {
            warn!(
                "Contest '{}' ({}) has no ranked participants",
                standings.contest.title, contest_id
            );
        }

        let user_ids: Vec<UserId> = entries.iter().map(|e| e.user_id).collect();
        let prior = self.store.current_ratings(domain_id, &user_ids).await?;
        let initial_rating = self.calculator.initial_rating();
        let contestants: Vec<Contestant> = entries
            .iter()
            .map(|e| {
                let rating = prior.get(&e.user_id).copied().unwrap_or(initial_rating);
                Contestant::new(e.user_id, e.rank, rating)
            })
            .collect();

        let timer = self.metrics.start_timer();
        let outcomes = self.calculator.compute_outcomes(&contestants);
        self.metrics.record_rating_calculation(timer.stop());

        let calculated_at = current_timestamp();
        let contest = &standings.contest;
        let records: Vec<RatingChangeRecord> = outcomes
            .iter()
            .map(|o| RatingChangeRecord {
                domain_id: domain_id.to_string(),
                contest_id,
                contest_title: contest.title.clone(),
                user_id: o.user_id,
                previous_rating: o.prior_rating,
                new_rating: o.prior_rating + o.delta,
                delta: o.delta,
                rank: o.rank,
                attend_at: contest.attend_at,
                calculated_at,
            })
            .collect();

        let timer = self.metrics.start_timer();
        self.store
            .add_rating_changes(domain_id, records.clone())
            .await
            .with_context(|| {
                format!(
                    "persisting {} rating changes of contest {}",
                    records.len(),
                    contest_id
                )
            })?;
        self.metrics.record_persistence(timer.stop());
        self.metrics
            .record_contest_processed(contestants.len(), records.len());

        debug!(
            "Contest {} in domain '{}' rated at {}",
            contest_id, domain_id, calculated_at
        );
        info!(
            "Rated contest '{}' ({}) in domain '{}': {} contestants",
            contest.title,
            contest_id,
            domain_id,
            records.len()
        );

        Ok(records)
    }
}
