//! Structured error types for L-shaped datasets.

use thiserror::Error;

/// Unified error type for all ldata operations.
///
/// The container-level variants mirror the ways a dataset can be rejected:
/// a broken cross-table invariant, a violated per-method format, an option
/// that no dispatch point recognises, an operation a container type does not
/// support, or a reference (column, file, gene) that cannot be found.
#[derive(Debug, Error)]
pub enum LDataError {
    /// I/O error (file not found, permission denied, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error (malformed input data)
    #[error("parse error: {0}")]
    Parse(String),

    /// Structural invariant violated: label mismatch between the matrix and
    /// a metadata table, duplicate labels, or a wrongly sized name vector.
    #[error("validation error: {0}")]
    Validation(String),

    /// Per-method format violated: row-name pattern or required column.
    #[error("format error: {0}")]
    Format(String),

    /// Unknown scaling, method, reduction kind, filter or normalisation.
    #[error("unsupported option: {0}")]
    UnsupportedOption(String),

    /// Structural operation that a container type does not define.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Referenced column, file or gene is absent.
    #[error("missing reference: {0}")]
    MissingReference(String),

    /// Invalid input (bad arguments, out-of-range values)
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Convenience alias used throughout the ldata crates.
pub type Result<T> = std::result::Result<T, LDataError>;
