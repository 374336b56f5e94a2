//! Contest Rating - seed-based rating recalculation for online-judge contests
//!
//! This crate computes rating changes from the final standings of finished
//! contests, persists them as an append-only history, and replays a domain's
//! rated contests in chronological order.

pub mod config;
pub mod error;
pub mod metrics;
pub mod rating;
pub mod service;
pub mod snapshot;
pub mod standings;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{RatingError, Result};
pub use types::*;

// Re-export key components
pub use rating::{RatingCalculator, RatingStore, SeedRatingCalculator};
pub use service::RatingService;
pub use standings::StandingsLoader;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
