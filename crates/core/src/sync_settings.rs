//! Per-user automatic timer synchronization settings.
//!
//! A user without a stored row gets [`AutoSyncSettings::default`].

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

/// Default drift tolerance for synchronization, in minutes.
pub const DEFAULT_MAX_DIFFERENCE_MINUTES: i32 = 60;

/// Largest tolerance a user may configure (one day).
pub const MAX_DIFFERENCE_MINUTES_LIMIT: i32 = 1440;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoSyncSettings {
    /// Synchronize a card's folder right after each review.
    pub enabled: bool,
    /// Drift tolerance used for this user's automatic syncs and sweeps.
    pub max_difference_minutes: i32,
    /// Subfolders that automatic syncs and sweeps leave alone.
    pub excluded_folder_ids: Vec<DbId>,
}

impl Default for AutoSyncSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_difference_minutes: DEFAULT_MAX_DIFFERENCE_MINUTES,
            excluded_folder_ids: Vec::new(),
        }
    }
}

impl AutoSyncSettings {
    pub fn tolerance(&self) -> Duration {
        Duration::minutes(i64::from(self.max_difference_minutes))
    }

    pub fn excludes(&self, folder_id: DbId) -> bool {
        self.excluded_folder_ids.contains(&folder_id)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        validate_max_difference_minutes(self.max_difference_minutes)
    }
}

/// Validate a tolerance in minutes: `1..=MAX_DIFFERENCE_MINUTES_LIMIT`.
pub fn validate_max_difference_minutes(minutes: i32) -> Result<(), CoreError> {
    if (1..=MAX_DIFFERENCE_MINUTES_LIMIT).contains(&minutes) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "max_difference_minutes must be between 1 and {MAX_DIFFERENCE_MINUTES_LIMIT}, got {minutes}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_hourly_tolerance() {
        let settings = AutoSyncSettings::default();
        assert!(settings.enabled);
        assert_eq!(settings.tolerance(), Duration::minutes(60));
        assert!(!settings.excludes(3));
    }

    #[test]
    fn tolerance_bounds() {
        assert!(validate_max_difference_minutes(1).is_ok());
        assert!(validate_max_difference_minutes(1440).is_ok());
        assert!(validate_max_difference_minutes(0).is_err());
        assert!(validate_max_difference_minutes(1441).is_err());
    }
}
