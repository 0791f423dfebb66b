//! Error types for Sourcing Insights
//!
//! Derivations fail soft: absent values, unparseable timestamps, and names that
//! match no pattern are handled as "no data". The variants here cover the few
//! conditions that must reach the caller.

use thiserror::Error;

/// Result type alias for Sourcing Insights operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Sourcing Insights
#[derive(Debug, Error)]
pub enum Error {
    // ==========================================================================
    // Data Errors
    // ==========================================================================
    /// A metric entry without a usable `metric_name` cannot be indexed.
    #[error("Metric entry {id} has no metric_name")]
    MissingMetricName { id: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // ==========================================================================
    // Configuration Errors
    // ==========================================================================
    #[error("Invalid threshold table: {0}")]
    InvalidThresholds(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // ==========================================================================
    // I/O Errors
    // ==========================================================================
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Returns the error type string (for JSON output)
    #[must_use]
    pub const fn error_type(&self) -> &'static str {
        match self {
            Self::MissingMetricName { .. } => "INVALID_ENTRY",
            Self::InvalidArgument(_) => "INVALID_ARGUMENT",
            Self::InvalidThresholds(_) | Self::Config(_) => "INVALID_CONFIG",
            Self::Io(_) => "OS_ERROR",
            Self::Serialization(_) => "TYPE_ERROR",
        }
    }

    /// Returns whether the caller can fix the input and try again.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::MissingMetricName { .. }
                | Self::InvalidArgument(_)
                | Self::InvalidThresholds(_)
                | Self::Config(_)
                | Self::Serialization(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_type_mapping_exhaustive() {
        let cases: Vec<(Error, &str)> = vec![
            (
                Error::MissingMetricName { id: "7".into() },
                "INVALID_ENTRY",
            ),
            (Error::InvalidArgument("x".into()), "INVALID_ARGUMENT"),
            (Error::InvalidThresholds("x".into()), "INVALID_CONFIG"),
            (Error::Config("x".into()), "INVALID_CONFIG"),
            (Error::Io(std::io::Error::other("x")), "OS_ERROR"),
            (
                Error::Serialization(serde_json::from_str::<u8>("x").unwrap_err()),
                "TYPE_ERROR",
            ),
        ];

        for (err, expected_type) in &cases {
            assert_eq!(
                err.error_type(),
                *expected_type,
                "Error {err:?} should map to {expected_type}"
            );
        }
    }

    #[test]
    fn test_recoverable_classification() {
        let recoverable = vec![
            Error::MissingMetricName { id: "a".into() },
            Error::InvalidArgument("x".into()),
            Error::InvalidThresholds("x".into()),
            Error::Config("x".into()),
        ];
        for err in &recoverable {
            assert!(err.is_recoverable(), "Error {err:?} should be recoverable");
        }

        let err = Error::Io(std::io::Error::other("x"));
        assert!(!err.is_recoverable(), "Error {err:?} should NOT be recoverable");
    }

    #[test]
    fn missing_name_message_includes_id() {
        let err = Error::MissingMetricName { id: "m-42".into() };
        assert_eq!(err.to_string(), "Metric entry m-42 has no metric_name");
    }
}
