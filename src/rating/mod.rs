//! Contest rating engine
//!
//! This module provides the Elo win-probability model, the seed-based rating
//! calculator and the storage interface for rating history.

pub mod calculator;
pub mod elo;
pub mod seed;
pub mod storage;

// Re-export commonly used types
pub use calculator::{MockRatingCalculator, RatingCalculator};
pub use elo::{win_probability, SeedEstimator, MAX_RATING, MIN_RATING};
pub use seed::{SeedRatingCalculator, SeedRatingConfig};
pub use storage::{InMemoryRatingStore, RatingStore};
