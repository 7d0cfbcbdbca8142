//! Principal Component Analysis, linear and kernel.
//!
//! Linear PCA diagonalises whichever of the covariance matrix (`p × p`) or
//! the Gram matrix (`n × n`) is smaller, so wide expression matrices with a
//! handful of samples stay cheap. Both routes give the same scores as a thin
//! SVD of the centred data, up to sign; signs are fixed by [`symmetric_eigen`].
//!
//! Kernel PCA centres the kernel matrix in feature space and projects onto
//! its leading eigenvectors.

use std::fmt;
use std::str::FromStr;

use ldata_core::{LDataError, Result, Summarizable};
use log::warn;

use crate::linalg::{center_columns, check_shape, cross_product, symmetric_eigen};

// ---------------------------------------------------------------------------
// Linear PCA
// ---------------------------------------------------------------------------

/// Configuration for linear PCA.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PcaConfig {
    /// Number of principal components to keep.
    pub n_components: usize,
}

impl Default for PcaConfig {
    fn default() -> Self {
        Self { n_components: 2 }
    }
}

/// Result of linear PCA.
#[derive(Debug, Clone)]
pub struct PcaResult {
    /// Projected data, row-major `n_samples × n_components`.
    pub transformed: Vec<f64>,
    /// Loadings, row-major `n_components × n_features`.
    pub components: Vec<f64>,
    /// Variance captured by each component.
    pub explained_variance: Vec<f64>,
    /// Fraction of the total variance captured by each component.
    pub explained_variance_ratio: Vec<f64>,
    /// Per-feature mean removed before projection.
    pub mean: Vec<f64>,
    pub n_samples: usize,
    pub n_components: usize,
}

impl Summarizable for PcaResult {
    fn summary(&self) -> String {
        let total: f64 = self.explained_variance_ratio.iter().sum();
        format!(
            "PCA: {} components, {:.1}% variance explained",
            self.n_components,
            total * 100.0,
        )
    }
}

/// Run linear PCA on a flat row-major `n_samples × n_features` matrix.
///
/// # Errors
///
/// Fails on empty or ragged input, on fewer than two samples, and when
/// `n_components` is zero or exceeds `min(n_samples, n_features)`.
pub fn pca(data: &[f64], n_features: usize, config: &PcaConfig) -> Result<PcaResult> {
    let n = check_shape(data, n_features, 2)?;
    let k = config.n_components;
    if k == 0 || k > n.min(n_features) {
        return Err(LDataError::InvalidInput(format!(
            "n_components={k} must be between 1 and min(n_samples, n_features)={}",
            n.min(n_features)
        )));
    }

    let mut x = data.to_vec();
    let mean = center_columns(&mut x, n_features);
    let dof = (n - 1) as f64;
    let total_variance: f64 = x.iter().map(|v| v * v).sum::<f64>() / dof;

    let mut transformed = vec![0.0; n * k];
    let mut components = vec![0.0; k * n_features];
    let mut explained_variance = Vec::with_capacity(k);

    if n_features <= n {
        let cov = cross_product(&x, n_features, dof);
        let eig = symmetric_eigen(&cov, n_features)?;
        for c in 0..k {
            let v = eig.vector(c);
            components[c * n_features..(c + 1) * n_features].copy_from_slice(v);
            explained_variance.push(eig.values[c].max(0.0));
            for (i, row) in x.chunks_exact(n_features).enumerate() {
                transformed[i * k + c] = row.iter().zip(v).map(|(a, b)| a * b).sum();
            }
        }
    } else {
        // Gram route: XXᵀ = U Λ Uᵀ, scores = U √Λ, loadings = Xᵀ U / √Λ.
        let xt = transpose(&x, n, n_features);
        let gram = cross_product(&xt, n, 1.0);
        let eig = symmetric_eigen(&gram, n)?;
        for c in 0..k {
            let lambda = eig.values[c].max(0.0);
            let s = lambda.sqrt();
            let u = eig.vector(c);
            explained_variance.push(lambda / dof);
            for i in 0..n {
                transformed[i * k + c] = u[i] * s;
            }
            if s > 0.0 {
                for j in 0..n_features {
                    let dot: f64 = (0..n).map(|i| x[i * n_features + j] * u[i]).sum();
                    components[c * n_features + j] = dot / s;
                }
            }
        }
    }

    let explained_variance_ratio = explained_variance
        .iter()
        .map(|ev| if total_variance > 0.0 { ev / total_variance } else { 0.0 })
        .collect();

    Ok(PcaResult {
        transformed,
        components,
        explained_variance,
        explained_variance_ratio,
        mean,
        n_samples: n,
        n_components: k,
    })
}

fn transpose(data: &[f64], rows: usize, cols: usize) -> Vec<f64> {
    let mut out = vec![0.0; rows * cols];
    for r in 0..rows {
        for c in 0..cols {
            out[c * rows + r] = data[r * cols + c];
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Kernel PCA
// ---------------------------------------------------------------------------

/// Kernel function for kernel PCA.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Kernel {
    /// `⟨x, y⟩`
    #[default]
    Linear,
    /// `exp(-γ‖x − y‖²)`; `γ` defaults to `1 / n_features`.
    Rbf { gamma: Option<f64> },
    /// `(γ⟨x, y⟩ + coef0)^degree`
    Polynomial {
        degree: u32,
        gamma: Option<f64>,
        coef0: f64,
    },
    /// `⟨x, y⟩ / (‖x‖‖y‖)`
    Cosine,
}

impl FromStr for Kernel {
    type Err = LDataError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "linear" => Ok(Kernel::Linear),
            "rbf" => Ok(Kernel::Rbf { gamma: None }),
            "poly" | "polynomial" => Ok(Kernel::Polynomial {
                degree: 3,
                gamma: None,
                coef0: 1.0,
            }),
            "cosine" => Ok(Kernel::Cosine),
            _ => Err(LDataError::UnsupportedOption(format!(
                "{s} kernel not implemented"
            ))),
        }
    }
}

impl fmt::Display for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kernel::Linear => f.write_str("linear"),
            Kernel::Rbf { .. } => f.write_str("rbf"),
            Kernel::Polynomial { .. } => f.write_str("poly"),
            Kernel::Cosine => f.write_str("cosine"),
        }
    }
}

impl Kernel {
    fn eval(self, a: &[f64], b: &[f64], n_features: usize) -> f64 {
        let dot = || a.iter().zip(b).map(|(x, y)| x * y).sum::<f64>();
        let default_gamma = 1.0 / n_features as f64;
        match self {
            Kernel::Linear => dot(),
            Kernel::Rbf { gamma } => {
                let d2: f64 = a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum();
                (-gamma.unwrap_or(default_gamma) * d2).exp()
            }
            Kernel::Polynomial {
                degree,
                gamma,
                coef0,
            } => (gamma.unwrap_or(default_gamma) * dot() + coef0).powi(degree as i32),
            Kernel::Cosine => {
                let na = a.iter().map(|x| x * x).sum::<f64>().sqrt();
                let nb = b.iter().map(|x| x * x).sum::<f64>().sqrt();
                if na == 0.0 || nb == 0.0 {
                    0.0
                } else {
                    dot() / (na * nb)
                }
            }
        }
    }
}

/// Configuration for kernel PCA.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KernelPcaConfig {
    pub kernel: Kernel,
}

/// Result of kernel PCA.
#[derive(Debug, Clone)]
pub struct KernelPcaResult {
    /// Projected data, row-major `n_samples × n_components`.
    pub transformed: Vec<f64>,
    /// Eigenvalues of the centred kernel matrix for the kept components.
    pub eigenvalues: Vec<f64>,
    /// Variance of each projected column over the summed variance of all
    /// kept columns.
    pub explained_variance_ratio: Vec<f64>,
    pub n_samples: usize,
    pub n_components: usize,
}

impl Summarizable for KernelPcaResult {
    fn summary(&self) -> String {
        format!(
            "Kernel PCA: {} samples, {} components",
            self.n_samples, self.n_components
        )
    }
}

/// Run kernel PCA on a flat row-major `n_samples × n_features` matrix.
///
/// Components whose eigenvalue is not positive are dropped, so the result
/// may hold fewer than `n_components` columns for rank-deficient kernels.
pub fn kernel_pca(
    data: &[f64],
    n_features: usize,
    n_components: usize,
    config: &KernelPcaConfig,
) -> Result<KernelPcaResult> {
    let n = check_shape(data, n_features, 2)?;
    if n_components == 0 || n_components > n {
        return Err(LDataError::InvalidInput(format!(
            "n_components={n_components} must be between 1 and n_samples={n}"
        )));
    }

    let rows: Vec<&[f64]> = data.chunks_exact(n_features).collect();
    let mut k = vec![0.0; n * n];
    for i in 0..n {
        for j in i..n {
            let v = config.kernel.eval(rows[i], rows[j], n_features);
            k[i * n + j] = v;
            k[j * n + i] = v;
        }
    }
    double_center(&mut k, n);

    let eig = symmetric_eigen(&k, n)?;
    let kept: Vec<usize> = (0..n_components)
        .filter(|&c| eig.values[c] > 1e-12 * eig.values[0].abs().max(1.0))
        .collect();
    let m = kept.len();
    if m == 0 {
        return Err(LDataError::InvalidInput(
            "kernel matrix has no positive eigenvalues".into(),
        ));
    }
    if m < n_components {
        warn!("kernel PCA: {n_components} components requested, only {m} have positive eigenvalues");
    }

    let mut transformed = vec![0.0; n * m];
    let mut eigenvalues = Vec::with_capacity(m);
    for (col, &c) in kept.iter().enumerate() {
        let s = eig.values[c].sqrt();
        eigenvalues.push(eig.values[c]);
        for (i, u) in eig.vector(c).iter().enumerate() {
            transformed[i * m + col] = u * s;
        }
    }

    let variances: Vec<f64> = (0..m)
        .map(|c| {
            let col: Vec<f64> = (0..n).map(|i| transformed[i * m + c]).collect();
            let mu = col.iter().sum::<f64>() / n as f64;
            col.iter().map(|v| (v - mu).powi(2)).sum::<f64>() / n as f64
        })
        .collect();
    let total: f64 = variances.iter().sum();
    let explained_variance_ratio = variances
        .iter()
        .map(|v| if total > 0.0 { v / total } else { 0.0 })
        .collect();

    Ok(KernelPcaResult {
        transformed,
        eigenvalues,
        explained_variance_ratio,
        n_samples: n,
        n_components: m,
    })
}

/// Centre a square kernel matrix in feature space: `K − 1K − K1 + 1K1`.
fn double_center(k: &mut [f64], n: usize) {
    let nf = n as f64;
    let row_means: Vec<f64> = k.chunks_exact(n).map(|r| r.iter().sum::<f64>() / nf).collect();
    let col_means: Vec<f64> = (0..n)
        .map(|j| (0..n).map(|i| k[i * n + j]).sum::<f64>() / nf)
        .collect();
    let grand = row_means.iter().sum::<f64>() / nf;
    for i in 0..n {
        for j in 0..n {
            k[i * n + j] += grand - row_means[i] - col_means[j];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_with_noise() -> Vec<f64> {
        vec![
            0.0, 0.0, 0.1, //
            1.0, 0.1, 0.0, //
            2.0, 0.2, 0.1, //
            3.0, 0.3, 0.0, //
            4.0, 0.4, 0.1,
        ]
    }

    #[test]
    fn pca_first_component_dominates() {
        let result = pca(&line_with_noise(), 3, &PcaConfig::default()).unwrap();
        assert_eq!(result.n_components, 2);
        assert_eq!(result.transformed.len(), 10);
        assert!(result.explained_variance_ratio[0] > 0.95);
        assert!(result.explained_variance[0] >= result.explained_variance[1]);
    }

    #[test]
    fn pca_ratios_sum_to_one_at_full_rank() {
        let config = PcaConfig { n_components: 3 };
        let result = pca(&line_with_noise(), 3, &config).unwrap();
        let total: f64 = result.explained_variance_ratio.iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn pca_scores_are_centred() {
        let result = pca(&line_with_noise(), 3, &PcaConfig::default()).unwrap();
        for c in 0..2 {
            let mean: f64 = (0..5).map(|i| result.transformed[i * 2 + c]).sum::<f64>() / 5.0;
            assert!(mean.abs() < 1e-10);
        }
    }

    #[test]
    fn pca_wide_uses_gram_route() {
        let wide: Vec<f64> = line_with_noise()[..6].to_vec();
        let via_gram = pca(&wide, 3, &PcaConfig { n_components: 1 }).unwrap();
        assert_eq!(via_gram.transformed.len(), 2);
        assert!((via_gram.explained_variance_ratio[0] - 1.0).abs() < 1e-9);

        let d: f64 = (0..3).map(|j| (wide[j] - wide[3 + j]).powi(2)).sum::<f64>().sqrt();
        let span = (via_gram.transformed[0] - via_gram.transformed[1]).abs();
        assert!((span - d).abs() < 1e-9);
    }

    #[test]
    fn pca_rejects_too_many_components() {
        let config = PcaConfig { n_components: 4 };
        assert!(pca(&line_with_noise(), 3, &config).is_err());
        assert!(pca(&[], 3, &PcaConfig::default()).is_err());
        assert!(pca(&[1.0, 2.0, 3.0], 3, &PcaConfig::default()).is_err());
    }

    #[test]
    fn pca_summary() {
        let result = pca(&line_with_noise(), 3, &PcaConfig::default()).unwrap();
        assert!(result.summary().starts_with("PCA: 2 components"));
    }

    #[test]
    fn linear_kernel_matches_linear_pca_up_to_sign() {
        let data = line_with_noise();
        let linear = pca(&data, 3, &PcaConfig::default()).unwrap();
        let kernel = kernel_pca(&data, 3, 2, &KernelPcaConfig::default()).unwrap();
        assert_eq!(kernel.n_components, 2);
        for i in 0..5 {
            let a = linear.transformed[i * 2].abs();
            let b = kernel.transformed[i * 2].abs();
            assert!((a - b).abs() < 1e-8, "row {i}: {a} vs {b}");
        }
    }

    #[test]
    fn kernel_pca_rbf_and_ratios() {
        let data = line_with_noise();
        let config = KernelPcaConfig {
            kernel: Kernel::Rbf { gamma: Some(0.5) },
        };
        let result = kernel_pca(&data, 3, 2, &config).unwrap();
        assert_eq!(result.transformed.len(), 5 * result.n_components);
        let total: f64 = result.explained_variance_ratio.iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!(result.transformed.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn kernel_pca_keeps_only_positive_eigenvalues() {
        // Collinear samples: the centred kernel has rank 1.
        let data = vec![0.0, 0.0, 1.0, 1.0, 2.0, 2.0, 3.0, 3.0];
        let result = kernel_pca(&data, 2, 2, &KernelPcaConfig::default()).unwrap();
        assert_eq!(result.n_components, 1);
        assert_eq!(result.transformed.len(), 4);
        assert_eq!(result.eigenvalues.len(), 1);
    }

    #[test]
    fn kernel_from_str() {
        assert_eq!("RBF".parse::<Kernel>().unwrap(), Kernel::Rbf { gamma: None });
        assert_eq!("cosine".parse::<Kernel>().unwrap(), Kernel::Cosine);
        let err = "sigmoidal".parse::<Kernel>().unwrap_err();
        assert!(err.to_string().contains("sigmoidal"));
    }
}
