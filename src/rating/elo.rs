//! Elo win probability and expected-rank ("seed") estimation
//!
//! The seed of a rating is the rank a player with that rating is expected to
//! finish at against a fixed field. Seeds are memoized per integer rating for
//! the lifetime of one estimator, which in turn lives for one computation.

use crate::types::Contestant;
use std::collections::HashMap;

/// Lowest rating the rank-to-rating search can produce
pub const MIN_RATING: i64 = 1;

/// Upper bound of the rank-to-rating search
pub const MAX_RATING: i64 = 8000;

/// Rating difference that makes one player ten times more likely to win
pub const ELO_SCALE: f64 = 400.0;

/// Probability that a player rated `ra` beats a player rated `rb`
pub fn win_probability(ra: i64, rb: i64) -> f64 {
    1.0 / (1.0 + 10f64.powf((rb - ra) as f64 / ELO_SCALE))
}

/// Expected-rank estimator over a fixed field of contestants
#[derive(Debug)]
pub struct SeedEstimator {
    /// Prior ratings of the field, ascending, so sums do not depend on input order
    field: Vec<i64>,
    cache: HashMap<i64, f64>,
}

impl SeedEstimator {
    pub fn new(contestants: &[Contestant]) -> Self {
        let mut field: Vec<i64> = contestants.iter().map(|c| c.prior_rating).collect();
        field.sort_unstable();

        Self {
            field,
            cache: HashMap::new(),
        }
    }

    /// Expected rank of a hypothetical player rated `rating`.
    ///
    /// One plus the probability of every contestant in the field beating that
    /// player. The field includes the player being estimated, so a contestant's
    /// own seed counts a half-win against themself.
    pub fn seed(&mut self, rating: i64) -> f64 {
        if let Some(&seed) = self.cache.get(&rating) {
            return seed;
        }

        let seed = self
            .field
            .iter()
            .fold(1.0, |acc, &other| acc + win_probability(other, rating));
        self.cache.insert(rating, seed);
        seed
    }

    /// Invert `seed` over integer ratings in `[MIN_RATING, MAX_RATING]`.
    ///
    /// Returns the last rating whose seed does not drop below `rank` at the
    /// point where the search window collapses to width one. `seed` is
    /// non-increasing in the rating, plateaus are fine.
    pub fn rating_for_rank(&mut self, rank: f64) -> i64 {
        assert!(
            rank.is_finite(),
            "rank-to-rating search needs a finite target rank, got {rank}"
        );

        let mut left = MIN_RATING;
        let mut right = MAX_RATING;
        while right - left > 1 {
            let mid = (left + right) / 2;
            if self.seed(mid) < rank {
                right = mid;
            } else {
                left = mid;
            }
        }

        assert!(
            (MIN_RATING..MAX_RATING).contains(&left),
            "rank-to-rating search left its bounds: {left}"
        );
        left
    }

    /// Number of distinct ratings evaluated so far
    pub fn cached_ratings(&self) -> usize {
        self.cache.len()
    }
}
