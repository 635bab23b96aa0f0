//! Error types for the radio map server

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Server error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Configuration value is invalid
    #[error("Configuration error: {0}")]
    InvalidConfig(String),

    /// Error from the localization library
    #[error(transparent)]
    Locate(#[from] disha_locate::Error),

    /// Anything else (signal handler setup, thread spawn)
    #[error("{0}")]
    Other(String),
}
