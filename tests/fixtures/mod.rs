//! Test fixtures and store wrappers for integration testing

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use contest_rating::error::{RatingError, Result};
use contest_rating::metrics::MetricsCollector;
use contest_rating::rating::{InMemoryRatingStore, RatingStore, SeedRatingCalculator};
use contest_rating::service::RatingService;
use contest_rating::standings::InMemoryStandingsLoader;
use contest_rating::types::{
    ContestId, ContestMetadata, FinalStandings, Participant, RatedContest, RatingChangeRecord,
    ScoreboardRow, UserId,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub const DOMAIN: &str = "system";

/// Noon of the given day of March 2024
pub fn day(n: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap() + Duration::days(n)
}

/// Final scoreboard with a header row and one entry per `(rank, user)` placing
pub fn scoreboard(
    domain_id: &str,
    title: &str,
    attend_at: DateTime<Utc>,
    placings: &[(u32, UserId)],
) -> FinalStandings {
    let mut rows = vec![ScoreboardRow::Header {
        columns: vec!["rank".to_string(), "user".to_string(), "score".to_string()],
    }];
    rows.extend(
        placings
            .iter()
            .map(|&(rank, user_id)| ScoreboardRow::entry(rank, user_id)),
    );

    let participants = placings
        .iter()
        .map(|&(_, user_id)| {
            (
                user_id,
                Participant {
                    user_id,
                    uname: format!("user{user_id}"),
                },
            )
        })
        .collect();

    FinalStandings {
        contest: ContestMetadata {
            contest_id: Uuid::new_v4(),
            domain_id: domain_id.to_string(),
            title: title.to_string(),
            attend_at,
        },
        rows,
        participants,
    }
}

/// Rating store that can be told to reject the rating changes of one contest
#[derive(Debug, Default)]
pub struct FailingRatingStore {
    inner: InMemoryRatingStore,
    failing_contest: Mutex<Option<ContestId>>,
}

impl FailingRatingStore {
    pub fn with_domains(domain_ids: &[&str]) -> Self {
        Self {
            inner: InMemoryRatingStore::with_domains(domain_ids.iter().copied()),
            failing_contest: Mutex::new(None),
        }
    }

    /// Reject every write of rating changes for `contest_id`
    pub fn fail_writes_for(&self, contest_id: ContestId) {
        if let Ok(mut failing) = self.failing_contest.lock() {
            *failing = Some(contest_id);
        }
    }

    pub fn heal(&self) {
        if let Ok(mut failing) = self.failing_contest.lock() {
            *failing = None;
        }
    }

    fn rejects(&self, records: &[RatingChangeRecord]) -> bool {
        let failing = self.failing_contest.lock().map(|f| *f).unwrap_or(None);
        match (failing, records.first()) {
            (Some(contest_id), Some(first)) => first.contest_id == contest_id,
            _ => false,
        }
    }
}

#[async_trait]
impl RatingStore for FailingRatingStore {
    async fn current_ratings(
        &self,
        domain_id: &str,
        user_ids: &[UserId],
    ) -> Result<HashMap<UserId, i64>> {
        self.inner.current_ratings(domain_id, user_ids).await
    }

    async fn user_rating(&self, domain_id: &str, user_id: UserId) -> Result<Option<i64>> {
        self.inner.user_rating(domain_id, user_id).await
    }

    async fn add_rating_changes(
        &self,
        domain_id: &str,
        records: Vec<RatingChangeRecord>,
    ) -> Result<()> {
        if self.rejects(&records) {
            return Err(RatingError::PersistenceFailed {
                message: "injected write failure".to_string(),
            }
            .into());
        }
        self.inner.add_rating_changes(domain_id, records).await
    }

    async fn contest_rating_changes(
        &self,
        domain_id: &str,
        contest_id: ContestId,
    ) -> Result<Vec<RatingChangeRecord>> {
        self.inner.contest_rating_changes(domain_id, contest_id).await
    }

    async fn user_rating_changes(
        &self,
        domain_id: &str,
        user_id: UserId,
    ) -> Result<Vec<RatingChangeRecord>> {
        self.inner.user_rating_changes(domain_id, user_id).await
    }

    async fn add_rated_contest(&self, contest: RatedContest) -> Result<()> {
        self.inner.add_rated_contest(contest).await
    }

    async fn remove_rated_contest(&self, domain_id: &str, contest_id: ContestId) -> Result<bool> {
        self.inner.remove_rated_contest(domain_id, contest_id).await
    }

    async fn rated_contests_by_attend_time(&self, domain_id: &str) -> Result<Vec<RatedContest>> {
        self.inner.rated_contests_by_attend_time(domain_id).await
    }

    async fn latest_computed_contest(
        &self,
        domain_id: &str,
    ) -> Result<Option<(DateTime<Utc>, ContestId)>> {
        self.inner.latest_computed_contest(domain_id).await
    }

    async fn contains_domain(&self, domain_id: &str) -> Result<bool> {
        self.inner.contains_domain(domain_id).await
    }

    async fn rollback_latest_contest(&self, domain_id: &str) -> Result<Vec<RatingChangeRecord>> {
        self.inner.rollback_latest_contest(domain_id).await
    }

    async fn clear_all(&self, domain_id: &str) -> Result<()> {
        self.inner.clear_all(domain_id).await
    }

    async fn purge_all(&self, domain_id: &str) -> Result<()> {
        self.inner.purge_all(domain_id).await
    }
}

/// A complete rating system backed by in-memory storage
pub struct TestSystem {
    pub service: Arc<RatingService>,
    pub loader: Arc<InMemoryStandingsLoader>,
    pub store: Arc<FailingRatingStore>,
}

impl TestSystem {
    pub fn new(domain_ids: &[&str]) -> Self {
        let loader = Arc::new(InMemoryStandingsLoader::new());
        let store = Arc::new(FailingRatingStore::with_domains(domain_ids));
        let service = Arc::new(RatingService::new(
            loader.clone(),
            store.clone(),
            Arc::new(SeedRatingCalculator::default()),
            Arc::new(MetricsCollector::new().unwrap()),
        ));

        Self {
            service,
            loader,
            store,
        }
    }

    /// Publish a scoreboard and mark its contest as rated
    pub async fn publish(&self, board: FinalStandings) -> ContestId {
        let contest_id = board.contest.contest_id;
        let domain_id = board.contest.domain_id.clone();
        self.loader.insert(board).unwrap();
        self.service
            .add_contest_to_rating(&domain_id, contest_id)
            .await
            .unwrap();
        contest_id
    }

    /// Three rounds among users 10..=13, registered out of chronological order
    pub async fn publish_three_rounds(&self, domain_id: &str) -> [ContestId; 3] {
        let round3 = self
            .publish(scoreboard(
                domain_id,
                "Round 3",
                day(3),
                &[(1, 13), (2, 11), (3, 10), (4, 12)],
            ))
            .await;
        let round1 = self
            .publish(scoreboard(
                domain_id,
                "Round 1",
                day(1),
                &[(1, 10), (2, 11), (3, 12), (4, 13)],
            ))
            .await;
        let round2 = self
            .publish(scoreboard(
                domain_id,
                "Round 2",
                day(2),
                &[(1, 12), (2, 10), (3, 13)],
            ))
            .await;

        [round1, round2, round3]
    }

    /// Current ratings of the given users, `None` for unrated users
    pub async fn ratings(&self, domain_id: &str, user_ids: &[UserId]) -> Vec<Option<i64>> {
        let mut ratings = Vec::with_capacity(user_ids.len());
        for &user_id in user_ids {
            ratings.push(self.service.user_rating(domain_id, user_id).await.unwrap());
        }
        ratings
    }
}

/// Users taking part in the three-round fixture
pub const ROUND_USERS: [UserId; 4] = [10, 11, 12, 13];

/// Ratings after rounds 1, 2 and 3 of the three-round fixture
pub const AFTER_ROUND_1: [i64; 4] = [494, 410, 363, 326];
pub const AFTER_ROUND_2: [i64; 4] = [458, 410, 453, 267];
pub const AFTER_ROUND_3: [i64; 4] = [406, 417, 365, 396];

pub fn expected(ratings: [i64; 4]) -> Vec<Option<i64>> {
    ratings.into_iter().map(Some).collect()
}
