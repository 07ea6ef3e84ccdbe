//! Error types for the trading decision engine

use thiserror::Error;

/// Result type alias using our custom Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the trading decision engine
///
/// Nothing in the decision core is fatal: unknown proposal ids come back as `false`
/// and policy blocks come back as [`crate::strategy::TradingBlock`] values. These
/// variants cover the boundary only (configuration, snapshot files, I/O).
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown risk profile: {0} (expected conservative, moderate or aggressive)")]
    UnknownRiskProfile(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(String),
}

impl Error {
    /// Check if this error was raised while validating configuration
    pub fn is_config_error(&self) -> bool {
        matches!(self, Error::Config(_) | Error::UnknownRiskProfile(_))
    }
}

// Conversion from serde_json errors
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

// Conversion from I/O errors
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}
