//! Error types for evidence construction.

/// Raised when raw evaluator output cannot become evidence.
///
/// Construction is all-or-nothing: a container or evidence either validates
/// fully or does not exist.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// The raw input is not the kind of value the container accepts.
    #[error("wrong shape: {0}")]
    WrongShape(String),

    /// Required columns, index keys or attributes are absent.
    #[error("{container} data is missing required {}: {}", .what, .missing.join(", "))]
    MissingFields {
        container: &'static str,
        what: &'static str,
        missing: Vec<String>,
    },

    /// Columns outside the container's fixed field list.
    #[error("{container} data has unexpected columns: {}", .unexpected.join(", "))]
    UnexpectedFields {
        container: &'static str,
        unexpected: Vec<String>,
    },

    /// A field is present but holds a value of the wrong type.
    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    /// A metric carries a confidence interval without a confidence level.
    #[error("metric {metric_type}: confidence interval requires a confidence level")]
    MissingConfidenceLevel { metric_type: String },

    /// Table rows or index disagree with the declared columns.
    #[error("malformed table: {0}")]
    MalformedTable(String),
}

impl ValidationError {
    pub(crate) fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}
