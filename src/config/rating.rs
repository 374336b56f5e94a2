//! Rating engine configuration

use crate::rating::SeedRatingConfig;
use crate::types::DEFAULT_RATING;
use serde::{Deserialize, Serialize};

/// Rating engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingSettings {
    /// Rating assumed for users who were never rated
    pub initial_rating: i64,
}

impl Default for RatingSettings {
    fn default() -> Self {
        Self {
            initial_rating: DEFAULT_RATING,
        }
    }
}

impl From<&RatingSettings> for SeedRatingConfig {
    fn from(settings: &RatingSettings) -> Self {
        Self {
            initial_rating: settings.initial_rating,
        }
    }
}
