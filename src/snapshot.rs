//! JSON snapshots of rating data
//!
//! A snapshot holds, per domain, the final scoreboards, the rated contests,
//! the rating history and the current user ratings. It seeds the in-memory
//! loader and store and is written back after a run.

use crate::error::RatingError;
use crate::rating::storage::{DomainRatingState, InMemoryRatingStore};
use crate::standings::InMemoryStandingsLoader;
use crate::types::{DomainId, FinalStandings, RatedContest, RatingChangeRecord, UserId};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

/// Current rating of one domain user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRating {
    pub user_id: UserId,
    pub rating: i64,
}

/// Rating data of one domain
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DomainSnapshot {
    pub domain_id: DomainId,
    #[serde(default)]
    pub scoreboards: Vec<FinalStandings>,
    #[serde(default)]
    pub rated_contests: Vec<RatedContest>,
    #[serde(default)]
    pub rating_changes: Vec<RatingChangeRecord>,
    #[serde(default)]
    pub user_ratings: Vec<UserRating>,
}

impl DomainSnapshot {
    fn check_ownership(&self) -> Result<()> {
        let misfiled = |what: String, owner: &str| -> Result<()> {
            if owner == self.domain_id {
                return Ok(());
            }
            Err(RatingError::ConfigurationError {
                message: format!(
                    "Snapshot lists {} under domain '{}' but it belongs to '{}'",
                    what, self.domain_id, owner
                ),
            }
            .into())
        };

        for board in &self.scoreboards {
            misfiled(
                format!("contest {}", board.contest.contest_id),
                &board.contest.domain_id,
            )?;
        }
        for contest in &self.rated_contests {
            misfiled(
                format!("rated contest {}", contest.contest_id),
                &contest.domain_id,
            )?;
        }
        for record in &self.rating_changes {
            misfiled(
                format!(
                    "the change of user {} in contest {}",
                    record.user_id, record.contest_id
                ),
                &record.domain_id,
            )?;
        }
        Ok(())
    }
}

/// Rating data of every domain
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub domains: Vec<DomainSnapshot>,
}

impl Snapshot {
    /// Read a snapshot from a JSON file
    pub fn read_from(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
        let snapshot: Snapshot = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse snapshot {}", path.display()))?;
        Ok(snapshot)
    }

    /// Write the snapshot as JSON
    pub fn write_to(&self, path: &Path, pretty: bool) -> Result<()> {
        let raw = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        fs::write(path, raw)
            .with_context(|| format!("Failed to write snapshot {}", path.display()))?;
        info!("Wrote snapshot with {} domains to {}", self.domains.len(), path.display());
        Ok(())
    }

    /// Load every domain into the given loader and store
    ///
    /// A domain is written only once everything filed under it belongs to it.
    pub fn install(
        &self,
        loader: &InMemoryStandingsLoader,
        store: &InMemoryRatingStore,
    ) -> Result<()> {
        for domain in &self.domains {
            domain.check_ownership()?;

            let mut state = DomainRatingState::default();
            for board in &domain.scoreboards {
                loader.insert(board.clone())?;
            }
            for contest in &domain.rated_contests {
                state
                    .rated_contests
                    .insert(contest.contest_id, contest.clone());
            }
            for record in &domain.rating_changes {
                state
                    .changes
                    .insert((record.contest_id, record.user_id), record.clone());
            }
            for user in &domain.user_ratings {
                state.ratings.insert(user.user_id, user.rating);
            }

            store.load_domain(&domain.domain_id, state)?;
        }

        Ok(())
    }

    /// Capture the current contents of a loader and store
    pub fn capture(loader: &InMemoryStandingsLoader, store: &InMemoryRatingStore) -> Result<Self> {
        let mut domains = Vec::new();
        for domain_id in store.domain_ids()? {
            let state = store.domain_state(&domain_id)?.unwrap_or_default();

            let mut rated_contests: Vec<RatedContest> =
                state.rated_contests.into_values().collect();
            rated_contests.sort_by(|a, b| {
                a.attend_at
                    .cmp(&b.attend_at)
                    .then(a.contest_id.cmp(&b.contest_id))
            });

            let mut rating_changes: Vec<RatingChangeRecord> = state.changes.into_values().collect();
            rating_changes.sort_by(|a, b| {
                a.attend_at
                    .cmp(&b.attend_at)
                    .then(a.contest_id.cmp(&b.contest_id))
                    .then(a.rank.cmp(&b.rank))
                    .then(a.user_id.cmp(&b.user_id))
            });

            let mut user_ratings: Vec<UserRating> = state
                .ratings
                .into_iter()
                .map(|(user_id, rating)| UserRating { user_id, rating })
                .collect();
            user_ratings.sort_by_key(|u| u.user_id);

            domains.push(DomainSnapshot {
                scoreboards: loader.domain_standings(&domain_id)?,
                domain_id,
                rated_contests,
                rating_changes,
                user_ratings,
            });
        }

        Ok(Self { domains })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rating::RatingStore;
    use crate::types::{ContestMetadata, Participant, ScoreboardRow};
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;
    use uuid::Uuid;

    fn sample() -> Snapshot {
        let contest_id = Uuid::new_v4();
        let attend_at = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        let contest = ContestMetadata {
            contest_id,
            domain_id: "system".to_string(),
            title: "Spring Cup".to_string(),
            attend_at,
        };

        Snapshot {
            domains: vec![DomainSnapshot {
                domain_id: "system".to_string(),
                scoreboards: vec![FinalStandings {
                    contest: contest.clone(),
                    rows: vec![
                        ScoreboardRow::Header {
                            columns: vec!["rank".to_string(), "user".to_string()],
                        },
                        ScoreboardRow::entry(1, 10),
                    ],
                    participants: HashMap::from([(
                        10,
                        Participant {
                            user_id: 10,
                            uname: "alice".to_string(),
                        },
                    )]),
                }],
                rated_contests: vec![RatedContest::from(&contest)],
                rating_changes: Vec::new(),
                user_ratings: vec![UserRating {
                    user_id: 10,
                    rating: 1234,
                }],
            }],
        }
    }

    #[tokio::test]
    async fn test_install_and_capture() {
        let loader = InMemoryStandingsLoader::new();
        let store = InMemoryRatingStore::new();
        let snapshot = sample();

        snapshot.install(&loader, &store).unwrap();
        assert_eq!(store.user_rating("system", 10).await.unwrap(), Some(1234));
        assert_eq!(
            store.rated_contests_by_attend_time("system").await.unwrap().len(),
            1
        );

        let captured = Snapshot::capture(&loader, &store).unwrap();
        assert_eq!(captured.domains.len(), 1);
        assert_eq!(captured.domains[0].scoreboards.len(), 1);
        assert_eq!(captured.domains[0].user_ratings, snapshot.domains[0].user_ratings);
    }

    #[test]
    fn test_misfiled_scoreboard_is_rejected() {
        let mut snapshot = sample();
        snapshot.domains[0].domain_id = "other".to_string();

        let result = snapshot.install(&InMemoryStandingsLoader::new(), &InMemoryRatingStore::new());
        assert!(result.is_err());
    }

    fn sample_change(domain_id: &str) -> RatingChangeRecord {
        let attend_at = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        RatingChangeRecord {
            domain_id: domain_id.to_string(),
            contest_id: Uuid::new_v4(),
            contest_title: "Spring Cup".to_string(),
            user_id: 10,
            previous_rating: 1200,
            new_rating: 1234,
            delta: 34,
            rank: 1,
            attend_at,
            calculated_at: attend_at,
        }
    }

    #[test]
    fn test_misfiled_rated_contest_is_rejected() {
        let mut snapshot = sample();
        snapshot.domains[0].scoreboards.clear();
        snapshot.domains[0].rated_contests[0].domain_id = "other".to_string();

        let loader = InMemoryStandingsLoader::new();
        let store = InMemoryRatingStore::new();
        let err = snapshot.install(&loader, &store).unwrap_err();

        assert!(err.to_string().contains("rated contest"));
        assert!(store.domain_ids().unwrap().is_empty());
    }

    #[test]
    fn test_misfiled_rating_change_is_rejected() {
        let mut snapshot = sample();
        snapshot.domains[0].rating_changes = vec![sample_change("system"), sample_change("other")];

        let loader = InMemoryStandingsLoader::new();
        let store = InMemoryRatingStore::new();
        let err = snapshot.install(&loader, &store).unwrap_err();

        assert!(err.to_string().contains("belongs to 'other'"));
        assert!(store.domain_ids().unwrap().is_empty());
        assert!(Snapshot::capture(&loader, &store).unwrap().domains.is_empty());
    }

    #[tokio::test]
    async fn test_rating_changes_filed_correctly_are_installed() {
        let mut snapshot = sample();
        snapshot.domains[0].rating_changes = vec![sample_change("system")];

        let store = InMemoryRatingStore::new();
        snapshot
            .install(&InMemoryStandingsLoader::new(), &store)
            .unwrap();

        let history = store.user_rating_changes("system", 10).await.unwrap();
        assert_eq!(history, snapshot.domains[0].rating_changes);
    }

    #[test]
    fn test_json_round_trip_through_file() {
        let path = std::env::temp_dir().join(format!("contest-rating-{}.json", Uuid::new_v4()));
        let snapshot = sample();

        snapshot.write_to(&path, true).unwrap();
        let loaded = Snapshot::read_from(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.domains[0].domain_id, "system");
        assert_eq!(loaded.domains[0].scoreboards[0].rows.len(), 2);
    }
}
