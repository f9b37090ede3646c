use serde::{Deserialize, Serialize};

/// Acceptance thresholds for one source
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Criteria {
    /// Minimum number of rooms
    pub min_rooms: f64,
    /// Minimum size in square meters
    pub min_sqm: f64,
    /// Maximum rent (EUR); `None` never rejects on rent
    pub max_rent: Option<f64>,
}

impl Default for Criteria {
    fn default() -> Self {
        Self {
            min_rooms: 2.5,
            min_sqm: 62.0,
            max_rent: None,
        }
    }
}
