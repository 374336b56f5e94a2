//! Contest standings: loading final scoreboards and validating them

pub mod loader;
pub mod validation;

pub use loader::{InMemoryStandingsLoader, StandingsLoader};
pub use validation::{ranked_entries, validate_contestants, RankedEntry};
