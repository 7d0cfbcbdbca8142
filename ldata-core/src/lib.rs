//! Shared primitives for the ldata workspace.
//!
//! `ldata-core` provides the foundation the other crates build on:
//!
//! - **Error types** — [`LDataError`] and [`Result`] for structured error handling
//! - **Traits** — [`Summarizable`] for one-line summaries

pub mod error;
pub mod traits;

pub use error::{LDataError, Result};
pub use traits::*;
