//! Feature scaling applied before dimension reduction.

use std::fmt;
use std::str::FromStr;

use ldata_core::{LDataError, Result};

/// Per-feature scaling strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Scaling {
    /// Leave values untouched.
    None,
    /// Centre each feature and divide by its population standard deviation.
    #[default]
    ZScore,
}

impl Scaling {
    /// Apply this scaling to a flat row-major `n_rows × n_cols` matrix in place.
    pub fn apply(self, data: &mut [f64], n_cols: usize) -> Result<()> {
        match self {
            Scaling::None => Ok(()),
            Scaling::ZScore => z_score_columns(data, n_cols),
        }
    }
}

impl FromStr for Scaling {
    type Err = LDataError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Scaling::None),
            "zscore" | "z-score" => Ok(Scaling::ZScore),
            _ => Err(LDataError::UnsupportedOption(format!(
                "{s} scaling not implemented"
            ))),
        }
    }
}

impl fmt::Display for Scaling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scaling::None => f.write_str("none"),
            Scaling::ZScore => f.write_str("zscore"),
        }
    }
}

/// Z-score each column of a flat row-major matrix in place.
///
/// Uses the population standard deviation. Constant columns become 0.0.
pub fn z_score_columns(data: &mut [f64], n_cols: usize) -> Result<()> {
    if n_cols == 0 {
        return Err(LDataError::InvalidInput("n_cols must be > 0".into()));
    }
    if data.is_empty() {
        return Err(LDataError::InvalidInput("empty data".into()));
    }
    if data.len() % n_cols != 0 {
        return Err(LDataError::InvalidInput(format!(
            "data length {} not divisible by n_cols {}",
            data.len(),
            n_cols
        )));
    }
    let n_rows = (data.len() / n_cols) as f64;

    let mut mean = vec![0.0; n_cols];
    for row in data.chunks_exact(n_cols) {
        for (m, x) in mean.iter_mut().zip(row) {
            *m += x / n_rows;
        }
    }
    let mut var = vec![0.0; n_cols];
    for row in data.chunks_exact(n_cols) {
        for ((v, x), m) in var.iter_mut().zip(row).zip(&mean) {
            *v += (x - m).powi(2) / n_rows;
        }
    }
    let std: Vec<f64> = var.into_iter().map(f64::sqrt).collect();

    for row in data.chunks_exact_mut(n_cols) {
        for ((x, m), s) in row.iter_mut().zip(&mean).zip(&std) {
            *x = if *s > 0.0 { (*x - m) / s } else { 0.0 };
        }
    }
    Ok(())
}
