//! Statistics for ldata count matrices.
//!
//! - **Descriptive statistics** — sum, mean, min, median, quantiles
//! - **Count normalisation** — CPM, TPM, FPKM, upper quartile, TMM and
//!   median-of-ratios, with a [`Normalisation`] enum for name-based dispatch

pub mod descriptive;
pub mod normalization;

pub use normalization::{Normalisation, TmmConfig};
