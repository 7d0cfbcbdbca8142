//! Descriptive statistics over numeric slices.
//!
//! Used for per-feature count summaries ([`sum`], [`mean`], [`min`]) and for
//! the quantile-based normalisation factors.

use ldata_core::{LDataError, Result};

fn non_empty(data: &[f64], what: &str) -> Result<()> {
    if data.is_empty() {
        return Err(LDataError::InvalidInput(format!(
            "{what}: data must not be empty"
        )));
    }
    Ok(())
}

/// Sum of all values.
pub fn sum(data: &[f64]) -> f64 {
    data.iter().sum()
}

/// Arithmetic mean.
pub fn mean(data: &[f64]) -> Result<f64> {
    non_empty(data, "mean")?;
    Ok(sum(data) / data.len() as f64)
}

/// Smallest value.
pub fn min(data: &[f64]) -> Result<f64> {
    non_empty(data, "min")?;
    Ok(data.iter().copied().fold(f64::INFINITY, f64::min))
}

/// Median (50th percentile).
pub fn median(data: &[f64]) -> Result<f64> {
    quantile(data, 0.5)
}

/// Quantile by linear interpolation between closest ranks.
pub fn quantile(data: &[f64], q: f64) -> Result<f64> {
    non_empty(data, "quantile")?;
    if !(0.0..=1.0).contains(&q) {
        return Err(LDataError::InvalidInput(format!(
            "quantile: q={q} must be in [0, 1]"
        )));
    }
    let mut sorted = data.to_vec();
    sorted.sort_by(f64::total_cmp);
    Ok(quantile_sorted(&sorted, q))
}

/// Geometric mean of strictly positive values.
pub fn geometric_mean(data: &[f64]) -> Result<f64> {
    non_empty(data, "geometric_mean")?;
    if data.iter().any(|&v| v <= 0.0) {
        return Err(LDataError::InvalidInput(
            "geometric_mean: values must be positive".into(),
        ));
    }
    Ok((data.iter().map(|v| v.ln()).sum::<f64>() / data.len() as f64).exp())
}

pub(crate) fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let pos = q * (n - 1) as f64;
    let lo = pos.floor() as usize;
    let frac = pos - lo as f64;
    match sorted.get(lo + 1) {
        Some(&hi) => sorted[lo] + (hi - sorted[lo]) * frac,
        None => sorted[n - 1],
    }
}
