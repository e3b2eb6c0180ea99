//! # Core Error Module
//!
//! This module defines the central `LogError` type used throughout the library.
//! It leverages `thiserror` for error message formatting and `serde` for serialization.

use serde::Serialize;
use thiserror::Error;

/// Central error type for the `rs_daylog` library.
///
/// Producers never see this type: only initialization, explicit rotation
/// requests and shutdown report failures to their caller.
#[derive(Debug, Error, Serialize)]
pub enum LogError {
    /// Error related to configuration loading or merging.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The live log file could not be opened or created at initialization.
    #[error("Cannot open log file {path}: {reason}")]
    OpenFailed {
        /// Full path of the live file.
        path: String,
        /// Underlying I/O error text.
        reason: String,
    },

    /// A rotation step failed. The live file is left in place and the
    /// rotation is retried on the next monitor tick.
    #[error("Rotation of {path} failed during {stage}: {reason}")]
    RotateFailed {
        /// Full path of the live file.
        path: String,
        /// Which step failed (`rename` or `create`).
        stage: String,
        /// Underlying I/O error text.
        reason: String,
    },

    /// Shutdown gave up waiting for queued entries to reach the file.
    #[error("Shutdown drain timed out after {waited_ms} ms")]
    DrainTimeout {
        /// How long shutdown waited before closing the file.
        waited_ms: u64,
    },

    /// Error related to internal logic or state.
    #[error("Internal error: {0}")]
    InternalError(String),
}
