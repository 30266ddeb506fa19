use thiserror::Error;

/// Errors returned by the clustering and alignment stages.
///
/// Messages name the stage that rejected the input, or the offending
/// value for input errors.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MisclassError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("linkage builder: degenerate distance matrix: {0}")]
    DegenerateInput(String),

    #[error("tree cutter: cannot cut {n} observations into {k} clusters (need 1 <= k <= n)")]
    InvalidClusterCount { k: usize, n: usize },

    #[error("tree cutter: height cut requires a monotone tree, merge {merge} drops below its predecessor")]
    NonMonotoneCut { merge: usize },

    #[error("label aligner: too many categories: {found} exceeds the ceiling of {max}")]
    TooManyCategories { found: usize, max: usize },

    #[error("input: {what} length mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, MisclassError>;
