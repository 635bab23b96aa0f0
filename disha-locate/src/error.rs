//! Error types for DishaLocate

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// DishaLocate error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// RSS log file violates the expected format. The whole file is
    /// rejected; aggregation treats this as a soft failure and skips it.
    #[error("{path}: line {line}: {reason}")]
    LogFormat {
        /// Offending file
        path: String,
        /// 1-based line number
        line: usize,
        /// What was wrong with the line
        reason: String,
    },

    /// Radio map file is malformed or inconsistent
    #[error("invalid radio map: {0}")]
    RadioMap(String),

    /// No samples were collected, nothing to write
    #[error("radio map is empty")]
    EmptyRadioMap,

    /// Parameters file is malformed
    #[error("invalid parameters file: {0}")]
    Parameters(String),

    /// Estimation produced no result
    #[error("estimation failed: {0}")]
    Computation(String),

    /// Invalid algorithm parameter
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Calibration run failed
    #[error("calibration failed: {0}")]
    Calibration(String),
}
