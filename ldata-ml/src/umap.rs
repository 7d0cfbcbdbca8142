//! UMAP (Uniform Manifold Approximation and Projection).
//!
//! Builds a fuzzy k-nearest-neighbour graph in input space and lays it out
//! with negative-sampling SGD. Every random draw comes from a single seeded
//! ChaCha stream, so a fixed `seed` gives a bit-identical embedding.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use log::{debug, warn};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use ldata_core::{LDataError, Result, Summarizable};

use crate::distance::DistanceMetric;
use crate::linalg::check_shape;
use crate::pca::{pca, PcaConfig};

/// Initial layout of the embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UmapInit {
    /// Uniform in `[-10, 10]`.
    Random,
    /// Leading principal components rescaled to `[-10, 10]`.
    #[default]
    Pca,
}

impl FromStr for UmapInit {
    type Err = LDataError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "random" => Ok(Self::Random),
            "pca" => Ok(Self::Pca),
            _ => Err(LDataError::UnsupportedOption(format!(
                "{s} initialisation not implemented"
            ))),
        }
    }
}

impl fmt::Display for UmapInit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Random => f.write_str("random"),
            Self::Pca => f.write_str("pca"),
        }
    }
}

/// Configuration for UMAP.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UmapConfig {
    pub n_components: usize,
    /// Neighbourhood size of the kNN graph.
    pub n_neighbors: usize,
    /// Minimum distance between embedded points.
    pub min_dist: f64,
    pub spread: f64,
    pub learning_rate: f64,
    pub n_epochs: usize,
    /// Negative samples drawn per positive edge update.
    pub negative_sample_rate: usize,
    pub metric: DistanceMetric,
    pub init: UmapInit,
    pub seed: u64,
}

impl Default for UmapConfig {
    fn default() -> Self {
        Self {
            n_components: 2,
            n_neighbors: 15,
            min_dist: 0.1,
            spread: 1.0,
            learning_rate: 1.0,
            n_epochs: 200,
            negative_sample_rate: 5,
            metric: DistanceMetric::Euclidean,
            init: UmapInit::Pca,
            seed: 42,
        }
    }
}

/// Result of UMAP.
#[derive(Debug, Clone)]
pub struct UmapResult {
    /// Embedding, row-major `n_samples × n_components`.
    pub embedding: Vec<f64>,
    pub n_samples: usize,
    pub n_components: usize,
    pub n_epochs: usize,
}

impl Summarizable for UmapResult {
    fn summary(&self) -> String {
        format!(
            "UMAP: {} samples in {}D, {} epochs",
            self.n_samples, self.n_components, self.n_epochs,
        )
    }
}

#[derive(Debug, Clone, Copy)]
struct Edge {
    head: usize,
    tail: usize,
    weight: f64,
}

/// Embed the rows of a flat row-major `n_samples × n_features` matrix.
pub fn umap(data: &[f64], n_features: usize, config: &UmapConfig) -> Result<UmapResult> {
    let n = check_shape(data, n_features, 2)?;
    if config.n_neighbors < 2 {
        return Err(LDataError::InvalidInput(format!(
            "n_neighbors ({}) must be at least 2",
            config.n_neighbors
        )));
    }
    let n_neighbors = if config.n_neighbors >= n {
        warn!(
            "n_neighbors ({}) is not below n_samples={n}; using {}",
            config.n_neighbors,
            n - 1
        );
        n - 1
    } else {
        config.n_neighbors
    };
    if config.n_components == 0 {
        return Err(LDataError::InvalidInput("n_components must be > 0".into()));
    }
    if config.spread <= 0.0 || config.min_dist < 0.0 || config.min_dist > config.spread {
        return Err(LDataError::InvalidInput(format!(
            "min_dist ({}) must be in [0, spread={}]",
            config.min_dist, config.spread
        )));
    }

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let (knn_idx, knn_dist) = nearest_neighbors(data, n_features, n_neighbors, config.metric);
    let edges = fuzzy_union(&knn_idx, &knn_dist);
    let (a, b) = fit_ab(config.min_dist, config.spread);
    debug!(
        "UMAP graph: {n} samples, {} edges, a={a:.4}, b={b:.4}",
        edges.len()
    );

    let mut embedding = initial_layout(data, n_features, n, config, &mut rng)?;
    optimize_layout(&mut embedding, &edges, n, config, a, b, &mut rng);

    Ok(UmapResult {
        embedding,
        n_samples: n,
        n_components: config.n_components,
        n_epochs: config.n_epochs,
    })
}

/// Exact kNN by brute force; each sample's own row is excluded.
fn nearest_neighbors(
    data: &[f64],
    n_features: usize,
    k: usize,
    metric: DistanceMetric,
) -> (Vec<Vec<usize>>, Vec<Vec<f64>>) {
    let rows: Vec<&[f64]> = data.chunks_exact(n_features).collect();
    rows.iter()
        .enumerate()
        .map(|(i, ri)| {
            let mut cand: Vec<(usize, f64)> = rows
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .map(|(j, rj)| (j, metric.between(ri, rj)))
                .collect();
            cand.sort_by(|x, y| x.1.total_cmp(&y.1).then(x.0.cmp(&y.0)));
            cand.truncate(k);
            let (idx, dist): (Vec<usize>, Vec<f64>) = cand.into_iter().unzip();
            (idx, dist)
        })
        .unzip()
}

/// Local connectivity `ρ_i` and bandwidth `σ_i` such that
/// `Σ_j exp(-(d_ij - ρ_i)/σ_i) = log2(k)`.
fn smooth_distances(dists: &[f64]) -> (f64, f64) {
    let target = (dists.len() as f64).log2();
    let rho = dists.iter().copied().find(|&d| d > 0.0).unwrap_or(0.0);
    let (mut lo, mut hi, mut sigma) = (0.0_f64, f64::INFINITY, 1.0_f64);
    for _ in 0..64 {
        let psum: f64 = dists.iter().map(|&d| (-((d - rho).max(0.0)) / sigma).exp()).sum();
        if (psum - target).abs() < 1e-5 {
            break;
        }
        if psum > target {
            hi = sigma;
            sigma = (lo + hi) / 2.0;
        } else {
            lo = sigma;
            sigma = if hi.is_infinite() { sigma * 2.0 } else { (lo + hi) / 2.0 };
        }
    }
    let mean = dists.iter().sum::<f64>() / dists.len() as f64;
    (rho, sigma.max(1e-3 * mean))
}

/// Directed membership strengths combined by probabilistic t-conorm
/// `w_ij + w_ji - w_ij·w_ji`; edges are keyed `head < tail`.
fn fuzzy_union(knn_idx: &[Vec<usize>], knn_dist: &[Vec<f64>]) -> Vec<Edge> {
    let mut pairs: BTreeMap<(usize, usize), (f64, f64)> = BTreeMap::new();
    for (i, (idx, dist)) in knn_idx.iter().zip(knn_dist).enumerate() {
        let (rho, sigma) = smooth_distances(dist);
        for (&j, &d) in idx.iter().zip(dist) {
            let w = if sigma > 0.0 { (-((d - rho).max(0.0)) / sigma).exp() } else { 1.0 };
            let entry = pairs.entry((i.min(j), i.max(j))).or_insert((0.0, 0.0));
            if i < j {
                entry.0 = w;
            } else {
                entry.1 = w;
            }
        }
    }
    pairs
        .into_iter()
        .map(|((head, tail), (w1, w2))| Edge {
            head,
            tail,
            weight: w1 + w2 - w1 * w2,
        })
        .filter(|e| e.weight > 0.0)
        .collect()
}

/// Fit the low-dimensional similarity `1 / (1 + a·d^{2b})` to the offset
/// exponential defined by `min_dist` and `spread`, by Gauss-Newton.
fn fit_ab(min_dist: f64, spread: f64) -> (f64, f64) {
    let samples: Vec<(f64, f64)> = (1..=300)
        .map(|i| {
            let d = i as f64 * 3.0 * spread / 300.0;
            let y = if d < min_dist { 1.0 } else { (-(d - min_dist) / spread).exp() };
            (d, y)
        })
        .collect();

    let (mut a, mut b) = (1.0_f64, 1.0_f64);
    for _ in 0..200 {
        let (mut h00, mut h01, mut h11, mut g0, mut g1) = (0.0, 0.0, 0.0, 0.0, 0.0);
        for &(d, y) in &samples {
            let d2b = d.powf(2.0 * b);
            let den = 1.0 + a * d2b;
            let r = 1.0 / den - y;
            let ja = -d2b / (den * den);
            let jb = -2.0 * a * d2b * d.ln() / (den * den);
            h00 += ja * ja;
            h01 += ja * jb;
            h11 += jb * jb;
            g0 += ja * r;
            g1 += jb * r;
        }
        let det = h00 * h11 - h01 * h01;
        if det.abs() < 1e-300 {
            break;
        }
        let da = (h11 * g0 - h01 * g1) / det;
        let db = (h00 * g1 - h01 * g0) / det;
        a = (a - da).max(1e-3);
        b = (b - db).max(1e-3);
        if da.abs() < 1e-10 && db.abs() < 1e-10 {
            break;
        }
    }
    (a, b)
}

fn initial_layout(
    data: &[f64],
    n_features: usize,
    n: usize,
    config: &UmapConfig,
    rng: &mut ChaCha8Rng,
) -> Result<Vec<f64>> {
    let dim = config.n_components;
    let mut y: Vec<f64> = (0..n * dim).map(|_| rng.gen_range(-10.0..10.0)).collect();
    if config.init == UmapInit::Random {
        return Ok(y);
    }

    let k = dim.min(n_features).min(n);
    let projected = pca(data, n_features, &PcaConfig { n_components: k })?;
    let max_abs = projected
        .transformed
        .iter()
        .fold(0.0_f64, |m, v| m.max(v.abs()));
    let scale = if max_abs > 0.0 { 10.0 / max_abs } else { 1.0 };
    for i in 0..n {
        for d in 0..k {
            // Jitter breaks ties between identical samples.
            let jitter = rng.gen_range(-1e-4..1e-4);
            y[i * dim + d] = projected.transformed[i * k + d] * scale + jitter;
        }
    }
    Ok(y)
}

fn optimize_layout(
    y: &mut [f64],
    edges: &[Edge],
    n: usize,
    config: &UmapConfig,
    a: f64,
    b: f64,
    rng: &mut ChaCha8Rng,
) {
    let dim = config.n_components;
    let max_w = edges.iter().fold(0.0_f64, |m, e| m.max(e.weight));
    if edges.is_empty() || config.n_epochs == 0 || max_w <= 0.0 {
        return;
    }
    let period: Vec<f64> = edges.iter().map(|e| max_w / e.weight).collect();
    let mut due = period.clone();
    let clip = |g: f64| g.clamp(-4.0, 4.0);

    for epoch in 0..config.n_epochs {
        let alpha = config.learning_rate * (1.0 - epoch as f64 / config.n_epochs as f64);
        for (e, edge) in edges.iter().enumerate() {
            if due[e] > (epoch + 1) as f64 {
                continue;
            }
            let (h, t) = (edge.head, edge.tail);

            let d2: f64 = (0..dim).map(|d| (y[h * dim + d] - y[t * dim + d]).powi(2)).sum();
            if d2 > 0.0 {
                let coeff = -2.0 * a * b * d2.powf(b - 1.0) / (1.0 + a * d2.powf(b));
                for d in 0..dim {
                    let g = clip(coeff * (y[h * dim + d] - y[t * dim + d]));
                    y[h * dim + d] += alpha * g;
                    y[t * dim + d] -= alpha * g;
                }
            }

            for _ in 0..config.negative_sample_rate {
                let other = rng.gen_range(0..n);
                if other == h {
                    continue;
                }
                let d2: f64 = (0..dim)
                    .map(|d| (y[h * dim + d] - y[other * dim + d]).powi(2))
                    .sum();
                let coeff = 2.0 * b / ((0.001 + d2) * (1.0 + a * d2.powf(b)));
                for d in 0..dim {
                    let g = if coeff > 0.0 {
                        clip(coeff * (y[h * dim + d] - y[other * dim + d]))
                    } else {
                        4.0
                    };
                    y[h * dim + d] += alpha * g;
                }
            }
            due[e] += period[e];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_clusters() -> Vec<f64> {
        let mut data = Vec::new();
        for i in 0..8 {
            data.extend_from_slice(&[i as f64 * 0.1, i as f64 * 0.05, 0.0]);
        }
        for i in 0..8 {
            data.extend_from_slice(&[50.0 + i as f64 * 0.1, 50.0 + i as f64 * 0.05, 50.0]);
        }
        data
    }

    #[test]
    fn umap_keeps_clusters_apart() {
        let config = UmapConfig {
            n_neighbors: 5,
            n_epochs: 100,
            ..Default::default()
        };
        let result = umap(&two_clusters(), 3, &config).unwrap();
        assert_eq!(result.embedding.len(), 32);
        assert!(result.embedding.iter().all(|v| v.is_finite()));

        let centroid = |range: std::ops::Range<usize>| {
            let mut c = [0.0; 2];
            for i in range {
                c[0] += result.embedding[i * 2] / 8.0;
                c[1] += result.embedding[i * 2 + 1] / 8.0;
            }
            c
        };
        let (ca, cb) = (centroid(0..8), centroid(8..16));
        let dist = ((ca[0] - cb[0]).powi(2) + (ca[1] - cb[1]).powi(2)).sqrt();
        assert!(dist > 1.0, "centroid distance {dist}");
    }

    #[test]
    fn umap_same_seed_same_embedding() {
        let config = UmapConfig {
            n_neighbors: 4,
            n_epochs: 50,
            ..Default::default()
        };
        let a = umap(&two_clusters(), 3, &config).unwrap();
        let b = umap(&two_clusters(), 3, &config).unwrap();
        assert_eq!(a.embedding, b.embedding);

        let other = UmapConfig { seed: 7, ..config };
        let c = umap(&two_clusters(), 3, &other).unwrap();
        assert_ne!(a.embedding, c.embedding);
    }

    #[test]
    fn umap_random_init_and_metrics() {
        for metric in [DistanceMetric::Manhattan, DistanceMetric::Cosine] {
            let config = UmapConfig {
                n_neighbors: 3,
                n_epochs: 30,
                n_components: 3,
                init: UmapInit::Random,
                metric,
                ..Default::default()
            };
            let r = umap(&two_clusters(), 3, &config).unwrap();
            assert_eq!(r.embedding.len(), 16 * 3);
            assert!(r.embedding.iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn umap_rejects_bad_neighbours() {
        let data = vec![0.0, 0.0, 1.0, 1.0, 2.0, 2.0];
        let small = UmapConfig {
            n_neighbors: 1,
            ..Default::default()
        };
        assert!(umap(&data, 2, &small).is_err());
        assert!(umap(&[], 2, &UmapConfig::default()).is_err());
    }

    #[test]
    fn umap_caps_neighbours_at_sample_count() {
        // 16 samples, so at most 15 neighbours.
        let config = UmapConfig {
            n_neighbors: 40,
            n_epochs: 20,
            init: UmapInit::Random,
            ..Default::default()
        };
        let capped = umap(&two_clusters(), 3, &config).unwrap();
        assert!(capped.embedding.iter().all(|v| v.is_finite()));
        let explicit = UmapConfig {
            n_neighbors: 15,
            ..config
        };
        assert_eq!(capped.embedding, umap(&two_clusters(), 3, &explicit).unwrap().embedding);
    }

    #[test]
    fn smooth_distances_hits_target() {
        let dists = [0.5, 1.0, 1.5, 2.0, 3.0];
        let (rho, sigma) = smooth_distances(&dists);
        assert_eq!(rho, 0.5);
        let psum: f64 = dists.iter().map(|&d| (-((d - rho).max(0.0)) / sigma).exp()).sum();
        assert!((psum - 5f64.log2()).abs() < 1e-4);
    }

    #[test]
    fn fit_ab_matches_reference_curve() {
        let (a, b) = fit_ab(0.1, 1.0);
        assert!((a - 1.58).abs() < 0.1, "a={a}");
        assert!((b - 0.90).abs() < 0.05, "b={b}");
    }

    #[test]
    fn fuzzy_union_weights_in_unit_interval() {
        let idx = vec![vec![1, 2], vec![0, 2], vec![0, 1]];
        let dist = vec![vec![1.0, 2.0], vec![1.0, 1.5], vec![2.0, 1.5]];
        let edges = fuzzy_union(&idx, &dist);
        assert_eq!(edges.len(), 3);
        for e in &edges {
            assert!(e.head < e.tail);
            assert!(e.weight > 0.0 && e.weight <= 1.0);
        }
    }

    #[test]
    fn init_from_str() {
        assert_eq!("PCA".parse::<UmapInit>().unwrap(), UmapInit::Pca);
        assert!("spectral".parse::<UmapInit>().is_err());
    }
}
