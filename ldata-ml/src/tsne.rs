//! t-distributed Stochastic Neighbor Embedding.
//!
//! Exact O(n²) gradient with early exaggeration, momentum and per-coordinate
//! gains. Suitable for the few-hundred-sample matrices typical of bulk
//! experiments.

use log::debug;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

use ldata_core::{LDataError, Result, Summarizable};

use crate::distance::squared_euclidean;
use crate::linalg::check_shape;

/// Configuration for t-SNE.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TsneConfig {
    /// Output dimensionality.
    pub n_components: usize,
    /// Effective number of neighbours; must be below the sample count.
    pub perplexity: f64,
    pub learning_rate: f64,
    /// Gradient descent iterations.
    pub n_iter: usize,
    /// Factor applied to P during the first `exaggeration_iter` iterations.
    pub early_exaggeration: f64,
    pub exaggeration_iter: usize,
    pub seed: u64,
}

impl Default for TsneConfig {
    fn default() -> Self {
        Self {
            n_components: 2,
            perplexity: 30.0,
            learning_rate: 200.0,
            n_iter: 1000,
            early_exaggeration: 12.0,
            exaggeration_iter: 250,
            seed: 42,
        }
    }
}

/// Result of t-SNE.
#[derive(Debug, Clone)]
pub struct TsneResult {
    /// Embedding, row-major `n_samples × n_components`.
    pub embedding: Vec<f64>,
    pub n_samples: usize,
    pub n_components: usize,
    /// KL(P‖Q) at the last iteration.
    pub kl_divergence: f64,
}

impl Summarizable for TsneResult {
    fn summary(&self) -> String {
        format!(
            "t-SNE: {} samples in {}D, KL={:.4}",
            self.n_samples, self.n_components, self.kl_divergence,
        )
    }
}

/// Embed the rows of a flat row-major `n_samples × n_features` matrix.
pub fn tsne(data: &[f64], n_features: usize, config: &TsneConfig) -> Result<TsneResult> {
    let n = check_shape(data, n_features, 2)?;
    if config.n_components == 0 {
        return Err(LDataError::InvalidInput("n_components must be > 0".into()));
    }
    if !(config.perplexity > 0.0 && config.perplexity < n as f64) {
        return Err(LDataError::InvalidInput(format!(
            "perplexity ({}) must be in (0, n_samples={n})",
            config.perplexity
        )));
    }
    let dim = config.n_components;

    let rows: Vec<&[f64]> = data.chunks_exact(n_features).collect();
    let mut d2 = vec![0.0_f64; n * n];
    for i in 0..n {
        for j in (i + 1)..n {
            let d = squared_euclidean(rows[i], rows[j]);
            d2[i * n + j] = d;
            d2[j * n + i] = d;
        }
    }
    let p = joint_probabilities(&d2, n, config.perplexity);

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let normal = Normal::new(0.0, 1e-4)
        .map_err(|e| LDataError::InvalidInput(format!("initial spread: {e}")))?;
    let mut y: Vec<f64> = (0..n * dim).map(|_| normal.sample(&mut rng)).collect();
    let mut velocity = vec![0.0_f64; n * dim];
    let mut gains = vec![1.0_f64; n * dim];
    let mut kl = 0.0_f64;

    for iter in 0..config.n_iter {
        let exaggerating = iter < config.exaggeration_iter;
        let exaggeration = if exaggerating { config.early_exaggeration } else { 1.0 };
        let momentum = if exaggerating { 0.5 } else { 0.8 };

        // Student-t kernel in the embedding.
        let mut w = vec![0.0_f64; n * n];
        let mut z = 0.0_f64;
        for i in 0..n {
            for j in (i + 1)..n {
                let dij = squared_euclidean(&y[i * dim..(i + 1) * dim], &y[j * dim..(j + 1) * dim]);
                let v = 1.0 / (1.0 + dij);
                w[i * n + j] = v;
                w[j * n + i] = v;
                z += 2.0 * v;
            }
        }
        let z = z.max(f64::MIN_POSITIVE);

        let mut grad = vec![0.0_f64; n * dim];
        kl = 0.0;
        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                let pij = p[i * n + j];
                let qij = (w[i * n + j] / z).max(1e-12);
                let coeff = 4.0 * (exaggeration * pij - qij) * w[i * n + j];
                for d in 0..dim {
                    grad[i * dim + d] += coeff * (y[i * dim + d] - y[j * dim + d]);
                }
                kl += pij * (pij / qij).ln();
            }
        }

        for idx in 0..n * dim {
            gains[idx] = if (grad[idx] > 0.0) != (velocity[idx] > 0.0) {
                gains[idx] + 0.2
            } else {
                (gains[idx] * 0.8).max(0.01)
            };
            velocity[idx] = momentum * velocity[idx] - config.learning_rate * gains[idx] * grad[idx];
            y[idx] += velocity[idx];
        }

        for d in 0..dim {
            let mean = (0..n).map(|i| y[i * dim + d]).sum::<f64>() / n as f64;
            (0..n).for_each(|i| y[i * dim + d] -= mean);
        }

        if iter % 250 == 0 {
            debug!("t-SNE iteration {iter}: KL={kl:.4}");
        }
    }

    Ok(TsneResult {
        embedding: y,
        n_samples: n,
        n_components: dim,
        kl_divergence: kl,
    })
}

/// Symmetrised affinities `P_ij = (p_j|i + p_i|j) / 2n`, each row's
/// precision found by bisection so that its entropy equals `ln(perplexity)`.
fn joint_probabilities(d2: &[f64], n: usize, perplexity: f64) -> Vec<f64> {
    let target = perplexity.ln();
    let mut cond = vec![0.0_f64; n * n];

    for i in 0..n {
        let row = &d2[i * n..(i + 1) * n];
        let (mut lo, mut hi) = (0.0_f64, f64::INFINITY);
        let mut beta = 1.0;

        for _ in 0..100 {
            let (entropy, probs) = row_entropy(row, i, beta);
            if (entropy - target).abs() < 1e-5 {
                cond[i * n..(i + 1) * n].copy_from_slice(&probs);
                break;
            }
            if entropy > target {
                lo = beta;
                beta = if hi.is_infinite() { beta * 2.0 } else { (beta + hi) / 2.0 };
            } else {
                hi = beta;
                beta = (beta + lo) / 2.0;
            }
            cond[i * n..(i + 1) * n].copy_from_slice(&probs);
        }
    }

    let mut p = vec![0.0_f64; n * n];
    let scale = 2.0 * n as f64;
    for i in 0..n {
        for j in (i + 1)..n {
            let v = ((cond[i * n + j] + cond[j * n + i]) / scale).max(1e-12);
            p[i * n + j] = v;
            p[j * n + i] = v;
        }
    }
    p
}

/// Shannon entropy of the Gaussian conditional distribution around point
/// `i` at precision `beta`, and the distribution itself.
fn row_entropy(row: &[f64], i: usize, beta: f64) -> (f64, Vec<f64>) {
    // Shift by the nearest neighbour so exp() cannot underflow to all zeros.
    let min = row
        .iter()
        .enumerate()
        .filter(|&(j, _)| j != i)
        .map(|(_, &d)| d)
        .fold(f64::INFINITY, f64::min);
    let mut probs: Vec<f64> = row
        .iter()
        .enumerate()
        .map(|(j, &d)| if j == i { 0.0 } else { (-(d - min) * beta).exp() })
        .collect();
    let sum: f64 = probs.iter().sum();
    probs.iter_mut().for_each(|p| *p /= sum);
    let entropy = -probs
        .iter()
        .filter(|&&p| p > 1e-300)
        .map(|&p| p * p.ln())
        .sum::<f64>();
    (entropy, probs)
}
