//! Error types for count-matrix construction and the kappa engine.

use thiserror::Error;

/// Errors reported by the builder, the engine and the procedure layer.
///
/// None of these are retryable: the computation is pure, so the same input
/// always fails the same way.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KappaError {
    /// Fewer usable subjects than `max(categories, raters)`.
    #[error("too few complete cases: {cases} < {required}")]
    InsufficientCases { cases: u64, required: u64 },

    /// Fewer than two distinct categories were observed.
    #[error("all ratings are the same ({categories} distinct category observed)")]
    InsufficientCategories { categories: usize },

    /// Count matrix violates the row-sum or column invariants.
    #[error("invalid count matrix: {0}")]
    InvalidMatrix(String),

    /// Confidence level outside [50, 99.999] percent, or not a number.
    #[error("confidence level {0} is outside [50, 99.999]")]
    InvalidConfidenceLevel(f64),

    /// A subject carries a different number of ratings than there are raters.
    #[error("row {row} has {found} ratings, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    /// At least two rater columns are required.
    #[error("at least two raters must be specified, got {raters}")]
    TooFewRaters { raters: usize },

    /// Case weight is negative or not finite.
    #[error("row {row} has invalid case weight {weight}")]
    InvalidWeight { row: usize, weight: f64 },

    /// Configuration could not be read or is out of range.
    #[error("configuration error: {0}")]
    Config(String),
}

impl KappaError {
    pub(crate) fn invalid_matrix(message: impl Into<String>) -> Self {
        Self::InvalidMatrix(message.into())
    }
}
