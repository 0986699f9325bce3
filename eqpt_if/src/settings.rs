//! # User Settings
//!
//! The settings record is produced by the settings reader and is read-only to the automation
//! core.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// User settings for a greenhouse run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Settings {
    /// Name of the plant being cared for
    pub plant_name: String,

    /// Time between water cycles.
    ///
    /// Units: milliseconds
    pub water_interval_ms: u64,

    /// Time between bed rotations.
    ///
    /// Units: milliseconds
    pub rotation_interval_ms: u64,

    /// Local date and time at which the run started
    pub start: NaiveDateTime,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Settings {
    pub fn water_interval(&self) -> Duration {
        Duration::from_millis(self.water_interval_ms)
    }

    pub fn rotation_interval(&self) -> Duration {
        Duration::from_millis(self.rotation_interval_ms)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
