//! Experiment profile and axis-range configuration
//!
//! Both types are the validated forms of user input. The input form itself
//! lives outside the core; everything downstream assumes these constructors
//! are the only way the values get in.

use std::time::Duration;

use crate::{ThermoError, ThermoResult};

/// Lowest temperature the rig can be asked to hold, in °C.
pub const TEMP_MIN: f64 = 0.0;
/// Highest temperature the rig can be asked to hold, in °C.
pub const TEMP_MAX: f64 = 35.0;

/// Bounds on the visible window duration, in hours.
pub const WINDOW_HOURS_MIN: f64 = 1.0;
pub const WINDOW_HOURS_MAX: f64 = 168.0;

/// The committed parameters of one heating/cooling experiment.
///
/// Immutable once the clock has accepted it; replaced wholesale when the
/// experiment is cleared.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExperimentProfile {
    initial_temp: f64,
    final_temp: f64,
    cycle_minutes: f64,
    start_offset_minutes: f64,
}

impl ExperimentProfile {
    /// Validate and build a profile.
    ///
    /// Temperatures must lie in [`TEMP_MIN`, `TEMP_MAX`], the cycle duration
    /// must be positive and the start offset non-negative. NaN fails every
    /// comparison and is rejected with the rest.
    pub fn new(
        initial_temp: f64,
        final_temp: f64,
        cycle_minutes: f64,
        start_offset_minutes: f64,
    ) -> ThermoResult<Self> {
        if !(TEMP_MIN..=TEMP_MAX).contains(&initial_temp) {
            return Err(ThermoError::InvalidProfile(format!(
                "initial temperature {initial_temp} outside [{TEMP_MIN}, {TEMP_MAX}] °C"
            )));
        }
        if !(TEMP_MIN..=TEMP_MAX).contains(&final_temp) {
            return Err(ThermoError::InvalidProfile(format!(
                "final temperature {final_temp} outside [{TEMP_MIN}, {TEMP_MAX}] °C"
            )));
        }
        if !(cycle_minutes > 0.0) {
            return Err(ThermoError::InvalidProfile(format!(
                "cycle duration {cycle_minutes} min must be positive"
            )));
        }
        if !(start_offset_minutes >= 0.0) {
            return Err(ThermoError::InvalidProfile(format!(
                "start offset {start_offset_minutes} min must be non-negative"
            )));
        }

        Ok(ExperimentProfile {
            initial_temp,
            final_temp,
            cycle_minutes,
            start_offset_minutes,
        })
    }

    #[inline]
    pub fn initial_temp(&self) -> f64 {
        self.initial_temp
    }

    #[inline]
    pub fn final_temp(&self) -> f64 {
        self.final_temp
    }

    #[inline]
    pub fn cycle_minutes(&self) -> f64 {
        self.cycle_minutes
    }

    #[inline]
    pub fn start_offset_minutes(&self) -> f64 {
        self.start_offset_minutes
    }

    /// Delay between prediction and the scheduled start.
    pub fn start_offset(&self) -> Duration {
        Duration::from_secs_f64(self.start_offset_minutes * 60.0)
    }
}

/// Validated axis-range configuration supplied by the input collaborator.
///
/// The window duration drives trimming and theoretical regeneration; the
/// y-bounds are carried through to snapshots untouched (only renderers
/// interpret them).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WindowConfig {
    window_hours: f64,
    y_min: f64,
    y_max: f64,
}

impl WindowConfig {
    pub fn new(window_hours: f64, y_min: f64, y_max: f64) -> ThermoResult<Self> {
        if !(WINDOW_HOURS_MIN..=WINDOW_HOURS_MAX).contains(&window_hours) {
            return Err(ThermoError::InvalidWindow(format!(
                "window duration {window_hours} h outside [{WINDOW_HOURS_MIN}, {WINDOW_HOURS_MAX}]"
            )));
        }
        if !(TEMP_MIN..=TEMP_MAX).contains(&y_min) || !(TEMP_MIN..=TEMP_MAX).contains(&y_max) {
            return Err(ThermoError::InvalidWindow(format!(
                "y bounds [{y_min}, {y_max}] outside [{TEMP_MIN}, {TEMP_MAX}] °C"
            )));
        }
        if !(y_min < y_max) {
            return Err(ThermoError::InvalidWindow(format!(
                "y min {y_min} must be below y max {y_max}"
            )));
        }

        Ok(WindowConfig {
            window_hours,
            y_min,
            y_max,
        })
    }

    #[inline]
    pub fn window_hours(&self) -> f64 {
        self.window_hours
    }

    #[inline]
    pub fn y_min(&self) -> f64 {
        self.y_min
    }

    #[inline]
    pub fn y_max(&self) -> f64 {
        self.y_max
    }

    /// Duration of the visible window.
    pub fn span(&self) -> Duration {
        Duration::from_secs_f64(self.window_hours * 3600.0)
    }
}

impl Default for WindowConfig {
    /// One hour of display, full temperature range.
    fn default() -> Self {
        WindowConfig {
            window_hours: 1.0,
            y_min: TEMP_MIN,
            y_max: TEMP_MAX,
        }
    }
}
