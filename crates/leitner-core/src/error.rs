//! Error types for the scheduling engine.

use thiserror::Error;

/// Input-domain violations rejected at the crate boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("invalid rating value: {0} (expected 0, 1 or 2)")]
    InvalidRating(i64),

    #[error("a card needs at least one section")]
    EmptySections,
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
