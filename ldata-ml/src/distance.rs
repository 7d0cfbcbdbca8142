//! Distance metrics used by the neighbour-graph embeddings.

use std::fmt;
use std::str::FromStr;

use ldata_core::{LDataError, Result};

/// Distance metric between two samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DistanceMetric {
    #[default]
    Euclidean,
    Manhattan,
    Cosine,
}

impl FromStr for DistanceMetric {
    type Err = LDataError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "euclidean" => Ok(Self::Euclidean),
            "manhattan" => Ok(Self::Manhattan),
            "cosine" => Ok(Self::Cosine),
            _ => Err(LDataError::UnsupportedOption(format!(
                "{s} metric not implemented"
            ))),
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Euclidean => f.write_str("euclidean"),
            Self::Manhattan => f.write_str("manhattan"),
            Self::Cosine => f.write_str("cosine"),
        }
    }
}

impl DistanceMetric {
    /// Distance between two equal-length vectors.
    pub fn between(self, a: &[f64], b: &[f64]) -> f64 {
        match self {
            Self::Euclidean => squared_euclidean(a, b).sqrt(),
            Self::Manhattan => a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum(),
            Self::Cosine => {
                let (mut dot, mut na, mut nb) = (0.0, 0.0, 0.0);
                for (x, y) in a.iter().zip(b) {
                    dot += x * y;
                    na += x * x;
                    nb += y * y;
                }
                let denom = (na * nb).sqrt();
                if denom == 0.0 {
                    1.0
                } else {
                    1.0 - dot / denom
                }
            }
        }
    }
}

/// Squared L2 distance.
pub fn squared_euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

/// Dense symmetric `n × n` matrix of distances between the rows of `data`.
pub fn pairwise(data: &[f64], n_features: usize, metric: DistanceMetric) -> Vec<f64> {
    let n = data.len() / n_features;
    let rows: Vec<&[f64]> = data.chunks_exact(n_features).collect();
    let mut out = vec![0.0; n * n];
    for i in 0..n {
        for j in (i + 1)..n {
            let d = metric.between(rows[i], rows[j]);
            out[i * n + j] = d;
            out[j * n + i] = d;
        }
    }
    out
}
