//! Standings loader interface and implementations
//!
//! The loader supplies the final scoreboard of a finished contest. Ranking
//! policy (including ties) belongs to the loader; the rating service only
//! consumes the resolved ranks.

use crate::error::RatingError;
use crate::types::{ContestId, FinalStandings};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// Trait for reading final contest standings
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StandingsLoader: Send + Sync {
    /// Final standings of a contest, header row first
    async fn final_standings(
        &self,
        domain_id: &str,
        contest_id: ContestId,
    ) -> crate::error::Result<FinalStandings>;
}

/// In-memory standings loader
#[derive(Debug, Default)]
pub struct InMemoryStandingsLoader {
    standings: RwLock<HashMap<(String, ContestId), FinalStandings>>,
}

impl InMemoryStandingsLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the final standings of a contest, replacing earlier ones
    pub fn insert(&self, standings: FinalStandings) -> crate::error::Result<()> {
        let mut all = self
            .standings
            .write()
            .map_err(|_| RatingError::InternalError {
                message: "Failed to acquire standings write lock".to_string(),
            })?;

        let key = (
            standings.contest.domain_id.clone(),
            standings.contest.contest_id,
        );
        all.insert(key, standings);
        Ok(())
    }

    /// Every registered scoreboard of a domain
    pub fn domain_standings(&self, domain_id: &str) -> crate::error::Result<Vec<FinalStandings>> {
        let all = self
            .standings
            .read()
            .map_err(|_| RatingError::InternalError {
                message: "Failed to acquire standings read lock".to_string(),
            })?;

        let mut boards: Vec<FinalStandings> = all
            .iter()
            .filter(|((domain, _), _)| domain == domain_id)
            .map(|(_, standings)| standings.clone())
            .collect();
        boards.sort_by(|a, b| {
            a.contest
                .attend_at
                .cmp(&b.contest.attend_at)
                .then(a.contest.contest_id.cmp(&b.contest.contest_id))
        });
        Ok(boards)
    }
}

#[async_trait]
impl StandingsLoader for InMemoryStandingsLoader {
    async fn final_standings(
        &self,
        domain_id: &str,
        contest_id: ContestId,
    ) -> crate::error::Result<FinalStandings> {
        let all = self
            .standings
            .read()
            .map_err(|_| RatingError::InternalError {
                message: "Failed to acquire standings read lock".to_string(),
            })?;

        all.get(&(domain_id.to_string(), contest_id))
            .cloned()
            .ok_or_else(|| RatingError::ContestNotFound { contest_id }.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContestMetadata, ScoreboardRow};
    use chrono::Utc;
    use uuid::Uuid;

    fn standings(domain_id: &str, contest_id: ContestId) -> FinalStandings {
        FinalStandings {
            contest: ContestMetadata {
                contest_id,
                domain_id: domain_id.to_string(),
                title: "Weekly".to_string(),
                attend_at: Utc::now(),
            },
            rows: vec![
                ScoreboardRow::Header {
                    columns: vec!["rank".to_string(), "user".to_string()],
                },
                ScoreboardRow::entry(1, 10),
            ],
            participants: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn test_loader_round_trip() {
        let loader = InMemoryStandingsLoader::new();
        let contest_id = Uuid::new_v4();
        loader.insert(standings("system", contest_id)).unwrap();

        let loaded = loader.final_standings("system", contest_id).await.unwrap();
        assert_eq!(loaded.contest.contest_id, contest_id);
        assert_eq!(loaded.rows.len(), 2);
    }

    #[tokio::test]
    async fn test_loader_is_domain_scoped() {
        let loader = InMemoryStandingsLoader::new();
        let contest_id = Uuid::new_v4();
        loader.insert(standings("system", contest_id)).unwrap();

        let err = loader
            .final_standings("other", contest_id)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RatingError>(),
            Some(RatingError::ContestNotFound { .. })
        ));
        assert!(loader.domain_standings("other").unwrap().is_empty());
        assert_eq!(loader.domain_standings("system").unwrap().len(), 1);
    }
}
