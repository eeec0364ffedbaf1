//! Error types for the conversion engine facade.

use thiserror::Error;

/// Main error type for the office-convert library.
#[derive(Error, Debug)]
pub enum ConvertError {
    /// A conversion was attempted before the engine reached readiness.
    #[error("Conversion engine is not initialized. Call initialize() first")]
    NotInitialized,

    /// The engine failed to start during initialization.
    #[error("Engine bootstrap failed: {0}")]
    Bootstrap(String),

    /// The engine rejected or failed a conversion request.
    #[error("Conversion failed for '{source_name}': {message}")]
    Conversion { source_name: String, message: String },

    /// A conversion did not finish within the configured deadline.
    #[error("Conversion timed out after {timeout_secs} seconds for '{source_name}'")]
    Timeout { source_name: String, timeout_secs: u64 },

    /// The engine reported a failure while shutting down.
    #[error("Engine teardown failed: {0}")]
    Teardown(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for convenience.
pub type Result<T> = std::result::Result<T, ConvertError>;
