//! Utility functions for the rating service

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Generate a new unique contest ID
pub fn generate_contest_id() -> Uuid {
    Uuid::new_v4()
}

/// Get the current UTC timestamp
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Render a rating delta with an explicit sign
pub fn format_delta(delta: i64) -> String {
    if delta > 0 {
        format!("+{delta}")
    } else {
        delta.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_unique_ids() {
        let id1 = generate_contest_id();
        let id2 = generate_contest_id();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_format_delta() {
        assert_eq!(format_delta(83), "+83");
        assert_eq!(format_delta(0), "0");
        assert_eq!(format_delta(-94), "-94");
    }
}
