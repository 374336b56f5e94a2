//! Rating calculator trait and implementations
//!
//! This module defines the interface for turning a contest's standings into
//! rating deltas, plus a recording mock for exercising callers in tests.

use crate::types::{Contestant, ContestantOutcome, UserId};
use std::collections::HashMap;

/// Trait for calculating rating changes after a contest
pub trait RatingCalculator: Send + Sync {
    /// Compute the per-contestant breakdown, in input order
    ///
    /// Implementations are pure: the same input always yields the same output
    /// and the caller's slice is never modified.
    fn compute_outcomes(&self, contestants: &[Contestant]) -> Vec<ContestantOutcome>;

    /// Compute the rating delta of every contestant, keyed by user id
    fn compute_deltas(&self, contestants: &[Contestant]) -> HashMap<UserId, i64> {
        self.compute_outcomes(contestants)
            .into_iter()
            .map(|outcome| (outcome.user_id, outcome.delta))
            .collect()
    }

    /// Rating assumed for users without history
    fn initial_rating(&self) -> i64;

    /// Get current configuration as JSON
    fn config(&self) -> serde_json::Value;
}

/// Mock rating calculator for testing
#[derive(Debug, Default)]
pub struct MockRatingCalculator {
    calculation_calls: std::sync::Mutex<Vec<Vec<Contestant>>>,
    fixed_deltas: std::sync::RwLock<Option<HashMap<UserId, i64>>>,
    initial_rating: i64,
}

impl MockRatingCalculator {
    pub fn new() -> Self {
        Self {
            calculation_calls: std::sync::Mutex::new(Vec::new()),
            fixed_deltas: std::sync::RwLock::new(None),
            initial_rating: crate::types::DEFAULT_RATING,
        }
    }

    /// Set fixed deltas to return; users missing from the map get zero
    pub fn set_fixed_deltas(&self, deltas: HashMap<UserId, i64>) {
        if let Ok(mut fixed) = self.fixed_deltas.write() {
            *fixed = Some(deltas);
        }
    }

    /// Get all calculation calls made (for testing)
    pub fn get_calculation_calls(&self) -> Vec<Vec<Contestant>> {
        self.calculation_calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    /// Clear recorded calls
    pub fn clear_calls(&self) {
        if let Ok(mut calls) = self.calculation_calls.lock() {
            calls.clear();
        }
    }
}

impl RatingCalculator for MockRatingCalculator {
    fn compute_outcomes(&self, contestants: &[Contestant]) -> Vec<ContestantOutcome> {
        if let Ok(mut calls) = self.calculation_calls.lock() {
            calls.push(contestants.to_vec());
        }

        let fixed = self
            .fixed_deltas
            .read()
            .ok()
            .and_then(|fixed| fixed.clone())
            .unwrap_or_default();

        contestants
            .iter()
            .map(|c| {
                let delta = fixed.get(&c.user_id).copied().unwrap_or(0);
                ContestantOutcome {
                    user_id: c.user_id,
                    rank: c.rank,
                    prior_rating: c.prior_rating,
                    seed: 0.0,
                    need_rating: c.prior_rating + delta * 2,
                    delta,
                }
            })
            .collect()
    }

    fn initial_rating(&self) -> i64 {
        self.initial_rating
    }

    fn config(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "mock",
            "initial_rating": self.initial_rating
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_calculator_defaults_to_no_change() {
        let calculator = MockRatingCalculator::new();
        let field = vec![Contestant::new(1, 1, 1500), Contestant::new(2, 2, 1600)];

        let deltas = calculator.compute_deltas(&field);
        assert_eq!(deltas.len(), 2);
        assert!(deltas.values().all(|&d| d == 0));

        let calls = calculator.get_calculation_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], field);
    }

    #[test]
    fn test_mock_calculator_fixed_deltas() {
        let calculator = MockRatingCalculator::new();
        calculator.set_fixed_deltas([(1, 25)].into_iter().collect());

        let outcomes =
            calculator.compute_outcomes(&[Contestant::new(1, 1, 1500), Contestant::new(2, 2, 1600)]);
        assert_eq!(outcomes[0].delta, 25);
        assert_eq!(outcomes[0].need_rating, 1550);
        assert_eq!(outcomes[1].delta, 0);

        calculator.clear_calls();
        assert!(calculator.get_calculation_calls().is_empty());
    }

    #[test]
    fn test_mock_calculator_config() {
        let calculator = MockRatingCalculator::new();
        assert_eq!(calculator.initial_rating(), 400);
        assert_eq!(calculator.config()["type"], "mock");
    }
}
