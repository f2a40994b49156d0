//! Error types for the thermocycle workspace

use thiserror::Error;

use crate::Timestamp;

/// Core experiment errors
#[derive(Error, Debug)]
pub enum ThermoError {
    // Input domain errors
    #[error("Invalid profile: {0}")]
    InvalidProfile(String),

    #[error("Invalid window: {0}")]
    InvalidWindow(String),

    // Clock errors
    #[error("An experiment is already running")]
    AlreadyRunning,

    #[error("No experiment is predicted or running")]
    NotStarted,

    // Store errors
    #[error("Out-of-order sample: last appended {last:?}, attempted {attempted:?}")]
    OutOfOrderSample {
        last: Timestamp,
        attempted: Timestamp,
    },
}

/// Result type for thermocycle operations
pub type ThermoResult<T> = Result<T, ThermoError>;
