//! Error types for TL graph processing.

use thiserror::Error;

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum TlError {
    #[error("The {role} variable '{column}' is not in the dataset")]
    MissingColumn { role: &'static str, column: String },

    #[error("Invalid graph type '{0}': expected c (mean), m (median) or p (proportion)")]
    InvalidStatisticKind(String),

    #[error("Invalid plot type '{0}': expected 1 (above), 2 (below) or 3 (both)")]
    InvalidPlotSide(String),

    #[error("Invalid filter operator '{0}': expected one of ==, !=, >, >=, <, <=")]
    InvalidOperator(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Non-numeric value '{value}' in column '{column}' at row {row}")]
    NonNumericValue {
        column: String,
        row: usize,
        value: String,
    },

    #[error("Outcome column '{column}' holds {value}; proportions need a 0/1 outcome")]
    NonBinaryOutcome { column: String, value: f64 },

    #[error("Failed to load dataset '{path}': {message}")]
    DatasetLoad { path: String, message: String },

    #[error("Dataset is empty after applying filters")]
    EmptyAfterFiltering,

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// What the batch loop does with a graph whose processing returned an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Recoverable: report the reason and move on to the next graph.
    Skip,
    /// A defect: report loudly, still move on to the next graph.
    Fail,
}

impl TlError {
    /// Classify this error for per-graph reporting.
    pub fn disposition(&self) -> Disposition {
        match self {
            TlError::MissingColumn { .. }
            | TlError::InvalidStatisticKind(_)
            | TlError::InvalidPlotSide(_)
            | TlError::InvalidOperator(_)
            | TlError::InvalidParameter(_)
            | TlError::NonNumericValue { .. }
            | TlError::NonBinaryOutcome { .. }
            | TlError::DatasetLoad { .. }
            | TlError::EmptyAfterFiltering => Disposition::Skip,
            TlError::InsufficientData(_)
            | TlError::Io(_)
            | TlError::Csv(_)
            | TlError::Json(_) => Disposition::Fail,
        }
    }
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, TlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_errors_skip() {
        let err = TlError::MissingColumn {
            role: "outcome",
            column: "died".into(),
        };
        assert_eq!(err.disposition(), Disposition::Skip);
        assert_eq!(err.to_string(), "The outcome variable 'died' is not in the dataset");
        assert_eq!(TlError::EmptyAfterFiltering.disposition(), Disposition::Skip);
    }

    #[test]
    fn test_insufficient_data_fails() {
        let err = TlError::InsufficientData("empty sample".into());
        assert_eq!(err.disposition(), Disposition::Fail);
    }
}
