//! # Plant Care Parameters
//!
//! Calibration constants for the greenhouse mechanisms. All values were found empirically on the
//! assembled greenhouse; the defaults are the last calibrated set.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters for the plant care cycles.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {

    // ---- FAIL-SAFE TIMES ----

    /// Maximum time the pump may run during one water cycle.
    ///
    /// Units: milliseconds
    pub max_pump_time_ms: u64,

    /// Maximum time for one sweep (or return) of the primary scan axis.
    ///
    /// Units: milliseconds
    pub max_x_axis_time_ms: u64,

    /// Maximum time for one shuttle segment of the secondary scan axis.
    ///
    /// Units: milliseconds
    pub max_y_axis_time_ms: u64,

    /// Maximum time for one bed rotation.
    ///
    /// Units: milliseconds
    pub max_rotation_time_ms: u64,

    // ---- ROTATION ----

    /// Distance travelled by the rotation wheel for a 90 degree turn of the bed.
    ///
    /// Units: centimeters
    pub rotation_distance_cm: f64,

    /// Rotation motor velocity magnitude.
    pub rotation_speed: f64,

    /// Number of turns made in one direction before reversing.
    pub max_rotations: u32,

    // ---- WHEEL GEOMETRY ----

    /// Units: centimeters
    pub rotation_wheel_radius_cm: f64,

    /// Units: centimeters
    pub y_axis_wheel_radius_cm: f64,

    /// Units: centimeters
    pub x_axis_wheel_radius_cm: f64,

    // ---- WATER CYCLE ----

    /// Pump motor velocity.
    pub pump_speed: f64,

    /// Usable length of the primary scan axis rail.
    ///
    /// Units: centimeters
    pub x_axis_length_cm: f64,

    /// Usable length of the secondary scan axis rail.
    ///
    /// Units: centimeters
    pub y_axis_length_cm: f64,

    /// Extra distance driven when returning the primary axis home, so that it always clears the
    /// limit after a change of direction.
    ///
    /// Units: centimeters
    pub buffer_length_cm: f64,

    /// Primary scan axis velocity magnitude.
    pub x_axis_speed: f64,

    /// Secondary scan axis velocity magnitude.
    pub y_axis_speed: f64,

    // ---- USER INPUT ----

    /// Settle time after a button is released.
    ///
    /// Units: milliseconds
    pub debounce_ms: u64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Reasons a parameter set is rejected.
#[derive(Debug, Error, PartialEq)]
pub enum ParamsError {
    #[error("Parameter `{0}` must be strictly positive, found {1}")]
    NotPositive(&'static str, f64),

    #[error("Parameter `{0}` must be non-zero")]
    Zero(&'static str),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            max_pump_time_ms: 19_500,
            max_x_axis_time_ms: 18_500,
            max_y_axis_time_ms: 10_500,
            max_rotation_time_ms: 20_000,
            rotation_distance_cm: 31.5,
            rotation_speed: 20.0,
            max_rotations: 2,
            rotation_wheel_radius_cm: 2.5,
            y_axis_wheel_radius_cm: 1.9,
            x_axis_wheel_radius_cm: 0.6,
            pump_speed: 100.0,
            x_axis_length_cm: 5.0,
            y_axis_length_cm: 8.5,
            buffer_length_cm: 3.5,
            x_axis_speed: 5.0,
            y_axis_speed: 3.0,
            debounce_ms: 50,
        }
    }
}

impl Params {
    /// Check that the parameters describe a usable machine.
    pub fn are_valid(&self) -> Result<(), ParamsError> {
        let positive = [
            ("max_pump_time_ms", self.max_pump_time_ms as f64),
            ("max_x_axis_time_ms", self.max_x_axis_time_ms as f64),
            ("max_y_axis_time_ms", self.max_y_axis_time_ms as f64),
            ("max_rotation_time_ms", self.max_rotation_time_ms as f64),
            ("rotation_distance_cm", self.rotation_distance_cm),
            ("rotation_wheel_radius_cm", self.rotation_wheel_radius_cm),
            ("y_axis_wheel_radius_cm", self.y_axis_wheel_radius_cm),
            ("x_axis_wheel_radius_cm", self.x_axis_wheel_radius_cm),
            ("x_axis_length_cm", self.x_axis_length_cm),
            ("y_axis_length_cm", self.y_axis_length_cm),
        ];

        for (name, value) in positive.iter() {
            // Written so that NaN is rejected too
            if !(*value > 0.0) {
                return Err(ParamsError::NotPositive(*name, *value));
            }
        }

        if self.buffer_length_cm < 0.0 {
            return Err(ParamsError::NotPositive("buffer_length_cm", self.buffer_length_cm));
        }

        let speeds = [
            ("rotation_speed", self.rotation_speed),
            ("pump_speed", self.pump_speed),
            ("x_axis_speed", self.x_axis_speed),
            ("y_axis_speed", self.y_axis_speed),
        ];

        for (name, value) in speeds.iter() {
            if *value == 0.0 {
                return Err(ParamsError::Zero(*name));
            }
        }

        if self.max_rotations == 0 {
            return Err(ParamsError::Zero("max_rotations"));
        }

        Ok(())
    }

    pub fn max_pump_time(&self) -> Duration {
        Duration::from_millis(self.max_pump_time_ms)
    }

    pub fn max_x_axis_time(&self) -> Duration {
        Duration::from_millis(self.max_x_axis_time_ms)
    }

    pub fn max_y_axis_time(&self) -> Duration {
        Duration::from_millis(self.max_y_axis_time_ms)
    }

    pub fn max_rotation_time(&self) -> Duration {
        Duration::from_millis(self.max_rotation_time_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Distance covered by the rotation wheel per encoder degree.
    ///
    /// Units: centimeters/degree
    pub fn rotation_conversion_factor(&self) -> f64 {
        wheel_conversion_factor(self.rotation_wheel_radius_cm)
    }

    /// Units: centimeters/degree
    pub fn y_axis_conversion_factor(&self) -> f64 {
        wheel_conversion_factor(self.y_axis_wheel_radius_cm)
    }

    /// Units: centimeters/degree
    pub fn x_axis_conversion_factor(&self) -> f64 {
        wheel_conversion_factor(self.x_axis_wheel_radius_cm)
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Arc length travelled by a wheel of the given radius for one degree of rotation.
fn wheel_conversion_factor(radius_cm: f64) -> f64 {
    2.0 * std::f64::consts::PI * radius_cm / 360.0
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert_eq!(Params::default().are_valid(), Ok(()));
    }

    #[test]
    fn test_conversion_factors() {
        let p = Params::default();

        // 360 degrees of the rotation wheel is one circumference
        let circumference = 2.0 * std::f64::consts::PI * 2.5;
        assert!((p.rotation_conversion_factor() * 360.0 - circumference).abs() < 1e-9);
        assert!(p.x_axis_conversion_factor() < p.y_axis_conversion_factor());
    }

    #[test]
    fn test_invalid_params() {
        let mut p = Params::default();
        p.x_axis_length_cm = 0.0;
        assert_eq!(
            p.are_valid(),
            Err(ParamsError::NotPositive("x_axis_length_cm", 0.0))
        );

        let mut p = Params::default();
        p.max_rotations = 0;
        assert_eq!(p.are_valid(), Err(ParamsError::Zero("max_rotations")));

        let mut p = Params::default();
        p.y_axis_speed = 0.0;
        assert_eq!(p.are_valid(), Err(ParamsError::Zero("y_axis_speed")));
    }

    #[test]
    fn test_load_from_toml() {
        let p: Params = util::params::parse(
            r#"
            max_pump_time_ms = 19500
            max_x_axis_time_ms = 18500
            max_y_axis_time_ms = 10500
            max_rotation_time_ms = 20000
            rotation_distance_cm = 31.5
            rotation_speed = 20.0
            max_rotations = 2
            rotation_wheel_radius_cm = 2.5
            y_axis_wheel_radius_cm = 1.9
            x_axis_wheel_radius_cm = 0.6
            pump_speed = 100.0
            x_axis_length_cm = 5.0
            y_axis_length_cm = 8.5
            buffer_length_cm = 3.5
            x_axis_speed = 5.0
            y_axis_speed = 3.0
            debounce_ms = 50
            "#,
        )
        .unwrap();

        assert_eq!(p.max_rotation_time(), Duration::from_secs(20));
        assert_eq!(p.max_rotations, 2);
        assert!(p.are_valid().is_ok());
    }
}
