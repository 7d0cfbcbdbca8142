//! Linear Discriminant Analysis as a supervised projection.
//!
//! Solves `S_b v = λ S_w v` by whitening the within-class scatter and
//! diagonalising the whitened between-class scatter. A small ridge on `S_w`
//! keeps collinear features (common after scaling) from blowing up.

use itertools::Itertools;
use log::debug;

use ldata_core::{LDataError, Result, Summarizable};

use crate::linalg::{check_shape, column_means, symmetric_eigen};

/// Configuration for LDA.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LdaConfig {
    /// Number of discriminant axes; at most `n_classes - 1`.
    pub n_components: usize,
    /// Ridge added to the within-class scatter, relative to its mean diagonal.
    pub shrinkage: f64,
}

impl Default for LdaConfig {
    fn default() -> Self {
        Self {
            n_components: 2,
            shrinkage: 1e-8,
        }
    }
}

/// Result of an LDA fit-and-transform.
#[derive(Debug, Clone)]
pub struct LdaResult {
    /// Projected data, row-major `n_samples × n_components`.
    pub transformed: Vec<f64>,
    /// Discriminant directions, row-major `n_components × n_features`.
    pub scalings: Vec<f64>,
    /// Share of the between-class variance carried by each axis.
    pub explained_variance_ratio: Vec<f64>,
    /// Sorted distinct class labels.
    pub classes: Vec<String>,
    pub n_samples: usize,
    pub n_components: usize,
}

impl Summarizable for LdaResult {
    fn summary(&self) -> String {
        format!(
            "LDA: {} classes, {} discriminant axes",
            self.classes.len(),
            self.n_components
        )
    }
}

/// Fit LDA on a flat row-major `n_samples × n_features` matrix with one
/// class label per row, and project the same rows.
pub fn lda<S: AsRef<str>>(
    data: &[f64],
    n_features: usize,
    labels: &[S],
    config: &LdaConfig,
) -> Result<LdaResult> {
    let n = check_shape(data, n_features, 2)?;
    if labels.len() != n {
        return Err(LDataError::InvalidInput(format!(
            "{} labels for {n} samples",
            labels.len()
        )));
    }

    let classes: Vec<String> = labels
        .iter()
        .map(|l| l.as_ref().to_string())
        .sorted()
        .dedup()
        .collect();
    let n_classes = classes.len();
    if n_classes < 2 {
        return Err(LDataError::InvalidInput(
            "LDA requires at least 2 classes".into(),
        ));
    }
    let max_components = (n_classes - 1).min(n_features);
    let k = config.n_components;
    if k == 0 || k > max_components {
        return Err(LDataError::InvalidInput(format!(
            "n_components={k} must be between 1 and min(n_classes - 1, n_features)={max_components}"
        )));
    }

    let class_of: Vec<usize> = labels
        .iter()
        .map(|l| classes.binary_search_by(|c| c.as_str().cmp(l.as_ref())))
        .collect::<std::result::Result<_, _>>()
        .map_err(|_| LDataError::InvalidInput("label lookup failed".into()))?;

    let overall = column_means(data, n_features);
    let mut means = vec![0.0; n_classes * n_features];
    let mut counts = vec![0usize; n_classes];
    for (row, &c) in data.chunks_exact(n_features).zip(&class_of) {
        counts[c] += 1;
        for (m, x) in means[c * n_features..(c + 1) * n_features].iter_mut().zip(row) {
            *m += x;
        }
    }
    for c in 0..n_classes {
        let cnt = counts[c] as f64;
        means[c * n_features..(c + 1) * n_features]
            .iter_mut()
            .for_each(|m| *m /= cnt);
    }

    let p = n_features;
    let mut sw = vec![0.0; p * p];
    for (row, &c) in data.chunks_exact(p).zip(&class_of) {
        let mu = &means[c * p..(c + 1) * p];
        let diff: Vec<f64> = row.iter().zip(mu).map(|(x, m)| x - m).collect();
        add_outer(&mut sw, &diff, 1.0);
    }
    let mut sb = vec![0.0; p * p];
    for c in 0..n_classes {
        let diff: Vec<f64> = means[c * p..(c + 1) * p]
            .iter()
            .zip(&overall)
            .map(|(m, o)| m - o)
            .collect();
        add_outer(&mut sb, &diff, counts[c] as f64);
    }

    let mean_diag = (0..p).map(|i| sw[i * p + i]).sum::<f64>() / p as f64;
    let ridge = config.shrinkage * mean_diag.max(1e-12);
    for i in 0..p {
        sw[i * p + i] += ridge;
    }

    // W = V Λ^{-1/2}, so Wᵀ S_w W = I.
    let sw_eig = symmetric_eigen(&sw, p)?;
    let mut whiten = vec![0.0; p * p];
    for c in 0..p {
        let lambda = sw_eig.values[c].max(ridge.max(1e-12));
        let inv = 1.0 / lambda.sqrt();
        for (r, v) in sw_eig.vector(c).iter().enumerate() {
            whiten[r * p + c] = v * inv;
        }
    }
    // M = Wᵀ S_b W
    let mut tmp = vec![0.0; p * p];
    for i in 0..p {
        for j in 0..p {
            tmp[i * p + j] = (0..p).map(|l| sb[i * p + l] * whiten[l * p + j]).sum();
        }
    }
    let mut m = vec![0.0; p * p];
    for i in 0..p {
        for j in i..p {
            let v: f64 = (0..p).map(|l| whiten[l * p + i] * tmp[l * p + j]).sum();
            m[i * p + j] = v;
            m[j * p + i] = v;
        }
    }
    let m_eig = symmetric_eigen(&m, p)?;

    let mut scalings = vec![0.0; k * p];
    for c in 0..k {
        let u = m_eig.vector(c);
        for r in 0..p {
            scalings[c * p + r] = (0..p).map(|l| whiten[r * p + l] * u[l]).sum();
        }
    }

    let mut transformed = vec![0.0; n * k];
    for (i, row) in data.chunks_exact(p).enumerate() {
        for c in 0..k {
            transformed[i * k + c] = row
                .iter()
                .zip(&overall)
                .zip(&scalings[c * p..(c + 1) * p])
                .map(|((x, o), s)| (x - o) * s)
                .sum();
        }
    }

    let positive: Vec<f64> = m_eig.values.iter().map(|v| v.max(0.0)).collect();
    let total: f64 = positive.iter().take(n_classes - 1).sum();
    let explained_variance_ratio = positive[..k]
        .iter()
        .map(|v| if total > 0.0 { v / total } else { 0.0 })
        .collect();

    debug!("LDA fit: {n} samples, {n_classes} classes, {k} axes");

    Ok(LdaResult {
        transformed,
        scalings,
        explained_variance_ratio,
        classes,
        n_samples: n,
        n_components: k,
    })
}

fn add_outer(acc: &mut [f64], v: &[f64], weight: f64) {
    let p = v.len();
    for i in 0..p {
        for j in 0..p {
            acc[i * p + j] += weight * v[i] * v[j];
        }
    }
}
