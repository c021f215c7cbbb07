//! Error types for the query algebra.
//!
//! Every failure is a programming-contract violation detected synchronously
//! at the call that sees it. Nothing is retried or recovered internally.

/// Result type for query transformations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Error raised by a query transformation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    /// The active dialect cannot express the requested clause or operator.
    #[error("{feature} is not supported by the {dialect} dialect")]
    Unsupported { feature: String, dialect: String },

    /// Malformed argument, or an operation that needs state the query lacks.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl QueryError {
    pub(crate) fn unsupported(feature: &str, dialect: &str) -> Self {
        QueryError::Unsupported {
            feature: feature.into(),
            dialect: dialect.into(),
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        QueryError::InvalidArgument(message.into())
    }
}
