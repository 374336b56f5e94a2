//! Seed-based contest rating calculator
//!
//! Each contestant's new rating is derived from the geometric mean of their
//! finishing rank and their expected rank, inverted back into a rating, then
//! the whole field is shifted by two normalization passes.

use crate::rating::calculator::RatingCalculator;
use crate::rating::elo::{SeedEstimator, MAX_RATING, MIN_RATING};
use crate::types::{Contestant, ContestantOutcome, DEFAULT_RATING};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Half a win a contestant scores against themself inside their own seed
const SELF_BIAS: f64 = 0.5;

/// Largest per-contestant penalty applied by the top-bracket pass
const TOP_BRACKET_MAX_PENALTY: i64 = 10;

/// Configuration for the seed rating calculator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedRatingConfig {
    /// Rating assumed for users without any rating history
    pub initial_rating: i64,
}

impl Default for SeedRatingConfig {
    fn default() -> Self {
        Self {
            initial_rating: DEFAULT_RATING,
        }
    }
}

impl SeedRatingConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> crate::error::Result<()> {
        if !(MIN_RATING..=MAX_RATING).contains(&self.initial_rating) {
            return Err(crate::error::RatingError::ConfigurationError {
                message: format!(
                    "Initial rating {} must be within [{}, {}]",
                    self.initial_rating, MIN_RATING, MAX_RATING
                ),
            }
            .into());
        }

        Ok(())
    }
}

/// Seed-based rating calculator
#[derive(Debug, Clone)]
pub struct SeedRatingCalculator {
    config: SeedRatingConfig,
}

impl SeedRatingCalculator {
    /// Create a new seed rating calculator
    pub fn new(config: SeedRatingConfig) -> crate::error::Result<Self> {
        config.validate()?;

        Ok(Self { config })
    }
}

impl Default for SeedRatingCalculator {
    fn default() -> Self {
        Self {
            config: SeedRatingConfig::default(),
        }
    }
}

/// Size of the highest-rated bracket anchored by the second pass
fn top_bracket_size(n: usize) -> usize {
    let k = (4.0 * (n as f64).sqrt()).round() as usize;
    k.min(n)
}

/// Shift every delta so the field total lands just below zero
fn apply_zero_sum_correction(outcomes: &mut [ContestantOutcome]) {
    let n = outcomes.len() as i64;
    assert!(n > 0, "zero-sum correction reached with an empty field");

    let total: i64 = outcomes.iter().map(|o| o.delta).sum();
    let inc = (-total).div_euclid(n) - 1;
    for outcome in outcomes.iter_mut() {
        outcome.delta += inc;
    }
}

/// Pull the top bracket's total delta towards zero, never upwards and by at
/// most `TOP_BRACKET_MAX_PENALTY` per contestant. `by_rating` lists indices
/// into `outcomes` ordered by prior rating, highest first.
fn apply_top_bracket_correction(outcomes: &mut [ContestantOutcome], by_rating: &[usize]) {
    let k = top_bracket_size(outcomes.len());
    assert!(k > 0, "top-bracket correction reached with an empty field");

    let top_sum: i64 = by_rating[..k].iter().map(|&i| outcomes[i].delta).sum();
    let inc = (-top_sum)
        .div_euclid(k as i64)
        .max(-TOP_BRACKET_MAX_PENALTY)
        .min(0);
    for outcome in outcomes.iter_mut() {
        outcome.delta += inc;
    }
}

impl RatingCalculator for SeedRatingCalculator {
    fn compute_outcomes(&self, contestants: &[Contestant]) -> Vec<ContestantOutcome> {
        if contestants.is_empty() {
            return Vec::new();
        }

        let mut estimator = SeedEstimator::new(contestants);
        let mut outcomes: Vec<ContestantOutcome> = contestants
            .iter()
            .map(|c| {
                let seed = estimator.seed(c.prior_rating) - SELF_BIAS;
                let mid_rank = (c.rank as f64 * seed).sqrt();
                let need_rating = estimator.rating_for_rank(mid_rank);

                ContestantOutcome {
                    user_id: c.user_id,
                    rank: c.rank,
                    prior_rating: c.prior_rating,
                    seed,
                    need_rating,
                    delta: (need_rating - c.prior_rating).div_euclid(2),
                }
            })
            .collect();

        // Equal ratings fall back to standings order, then user id
        let mut by_rating: Vec<usize> = (0..outcomes.len()).collect();
        by_rating.sort_by(|&a, &b| {
            let (a, b) = (&outcomes[a], &outcomes[b]);
            b.prior_rating
                .cmp(&a.prior_rating)
                .then(a.rank.cmp(&b.rank))
                .then(a.user_id.cmp(&b.user_id))
        });

        apply_zero_sum_correction(&mut outcomes);
        apply_top_bracket_correction(&mut outcomes, &by_rating);

        debug!(
            "Computed rating deltas for {} contestants ({} distinct seeds evaluated)",
            outcomes.len(),
            estimator.cached_ratings()
        );

        outcomes
    }

    fn initial_rating(&self) -> i64 {
        self.config.initial_rating
    }

    fn config(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "seed",
            "initial_rating": self.config.initial_rating,
            "min_rating": MIN_RATING,
            "max_rating": MAX_RATING,
            "top_bracket_max_penalty": TOP_BRACKET_MAX_PENALTY
        })
    }
}
