//! Error types for kaudit core operations.
//!
//! This module defines the error types used throughout the `kaudit-core` crate.

use thiserror::Error;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in kaudit core operations.
#[derive(Error, Debug)]
pub enum Error {
    /// An audit level string did not name a known level.
    #[error("Unknown audit level: {value}")]
    UnknownLevel {
        /// The rejected input.
        value: String,
    },

    /// Policy document could not be parsed.
    #[error("Failed to parse policy: {reason}")]
    PolicyParseError {
        /// Reason for the parse failure.
        reason: String,
    },

    /// Policy document failed validation.
    #[error("Policy validation failed: {reason}")]
    PolicyValidationError {
        /// Reason for the validation failure.
        reason: String,
    },
}
