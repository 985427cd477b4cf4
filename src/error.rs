//! Unified error hierarchy for fitassess
//!
//! Extraction and classification only fail for structurally unknown input
//! (an unsupported test type). Missing or corrupt metric values degrade to
//! defaults instead of raising, so `InvalidMetric` is reserved for callers
//! that opt into strict validation.

use thiserror::Error;

/// Top-level error type for all fitassess operations
#[derive(Debug, Error)]
pub enum FitAssessError {
    /// Test type outside the fixed enumeration
    #[error("Unsupported test type: {0}")]
    UnsupportedTestType(String),

    /// Metric present but not usable as a number
    #[error("Invalid metric {field}: {reason}")]
    InvalidMetric { field: String, reason: String },

    /// Threshold table errors
    #[error("Threshold error: {0}")]
    Threshold(#[from] ThresholdError),

    /// Attempt/session/profile store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Data validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Threshold table errors
#[derive(Debug, Error)]
pub enum ThresholdError {
    /// Wrong number of cut-points for a test type
    #[error("{test_type} needs exactly 4 cut-points, got {count}")]
    WrongCutPointCount { test_type: String, count: usize },

    /// Cut-points not strictly ordered in the declared direction
    #[error("{test_type} cut-points must be strictly {direction}")]
    NotMonotonic { test_type: String, direction: String },

    /// Healthy BMI range is empty or inverted
    #[error("Invalid BMI range: min {min} must be below max {max}")]
    InvalidBmiRange { min: String, max: String },

    /// Threshold file could not be parsed
    #[error("Invalid threshold file: {0}")]
    Parse(String),
}

/// Store (persistence collaborator) errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite failure
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Stored row could not be decoded
    #[error("Corrupt record in {table}: {reason}")]
    Corrupt { table: String, reason: String },

    /// Lock poisoned by a panicking writer
    #[error("Store lock poisoned")]
    Poisoned,
}

/// Result type alias for fitassess operations
pub type Result<T> = std::result::Result<T, FitAssessError>;

impl FitAssessError {
    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            FitAssessError::UnsupportedTestType(_) => ErrorSeverity::Warning,
            FitAssessError::InvalidMetric { .. } => ErrorSeverity::Warning,
            FitAssessError::Validation(_) => ErrorSeverity::Warning,
            FitAssessError::Threshold(_) | FitAssessError::Configuration(_) => ErrorSeverity::Error,
            FitAssessError::Store(StoreError::Poisoned) => ErrorSeverity::Critical,
            FitAssessError::Store(_) => ErrorSeverity::Error,
            _ => ErrorSeverity::Error,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            FitAssessError::UnsupportedTestType(test_type) => {
                format!(
                    "'{}' is not a supported fitness test. Try one of: {}",
                    test_type,
                    crate::models::TestType::ALL
                        .iter()
                        .map(|t| t.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            }
            FitAssessError::Threshold(err) => {
                format!("The tier threshold configuration is invalid: {}", err)
            }
            FitAssessError::Store(StoreError::Sqlite(_)) => {
                "Unable to access the results database. Please check your configuration.".to_string()
            }
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Critical system error requiring immediate attention
    Critical,
    /// Error that prevents operation but system can continue
    Error,
    /// Rejected input; the user can correct it and retry
    Warning,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_severity() {
        let err = FitAssessError::UnsupportedTestType("curling".to_string());
        assert_eq!(err.severity(), ErrorSeverity::Warning);

        let err = FitAssessError::Store(StoreError::Poisoned);
        assert_eq!(err.severity(), ErrorSeverity::Critical);

        let err = FitAssessError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk full"));
        assert_eq!(err.severity(), ErrorSeverity::Error);
    }

    #[test]
    fn test_user_messages() {
        let err = FitAssessError::UnsupportedTestType("curling".to_string());
        let message = err.user_message();
        assert!(message.contains("curling"));
        assert!(message.contains("pushUps"));
    }
}
