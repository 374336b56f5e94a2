//! Service layer for the contest rating service
//!
//! The rating service orchestrates contest processing; the application state
//! wires it to snapshot-backed storage for the command line.

pub mod app;
pub mod rating;

pub use app::AppState;
pub use rating::{RatingService, ReplaySummary};
