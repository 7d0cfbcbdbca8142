//! Small example datasets for demos and tests.
//!
//! - [`ExampleKind::Iris`]: a seeded iris-like draw, 4 measurements × 150
//!   flowers with a `Species` description column.
//! - [`ExampleKind::Simulate`]: uniform random integers with `Feature<n>` rows
//!   and `Sample<n>` columns.

use ldata_core::{LDataError, Result};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

use crate::ldata::LData;
use crate::matrix::{numbered, LabeledMatrix};
use crate::table::{ColumnData, MetadataTable};

const IRIS_SEED: u64 = 1936;
const IRIS_PER_SPECIES: usize = 50;
const IRIS_FEATURES: [&str; 4] = ["Sepal.Length", "Sepal.Width", "Petal.Length", "Petal.Width"];

/// Per-species (name, means, standard deviations) of the four measurements.
const IRIS_SPECIES: [(&str, [f64; 4], [f64; 4]); 3] = [
    ("setosa", [5.006, 3.428, 1.462, 0.246], [0.352, 0.379, 0.174, 0.105]),
    ("versicolor", [5.936, 2.770, 4.260, 1.326], [0.516, 0.314, 0.470, 0.198]),
    ("virginica", [6.588, 2.974, 5.552, 2.026], [0.636, 0.322, 0.552, 0.275]),
];

/// Parameters of the uniform simulation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimulateConfig {
    pub n_features: usize,
    pub n_samples: usize,
    /// Inclusive lower bound.
    pub min: i64,
    /// Exclusive upper bound.
    pub max: i64,
    pub seed: u64,
}

impl Default for SimulateConfig {
    fn default() -> Self {
        Self {
            n_features: 20,
            n_samples: 5,
            min: 0,
            max: 10,
            seed: 38,
        }
    }
}

/// Which example to generate.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ExampleKind {
    #[default]
    Iris,
    Simulate(SimulateConfig),
}

/// Generate an example container.
pub fn example_ldata(kind: &ExampleKind) -> Result<LData> {
    match kind {
        ExampleKind::Iris => iris(),
        ExampleKind::Simulate(config) => simulate(config),
    }
}

fn iris() -> Result<LData> {
    let mut rng = ChaCha8Rng::seed_from_u64(IRIS_SEED);
    let n_samples = IRIS_SPECIES.len() * IRIS_PER_SPECIES;

    // Draw samples × features, then lay out features × samples.
    let mut by_sample = Vec::with_capacity(n_samples * IRIS_FEATURES.len());
    let mut species = Vec::with_capacity(n_samples);
    for (name, means, sds) in IRIS_SPECIES {
        let dists = means
            .iter()
            .zip(sds)
            .map(|(&m, s)| Normal::new(m, s))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| LDataError::InvalidInput(format!("iris distribution: {e}")))?;
        for _ in 0..IRIS_PER_SPECIES {
            for d in &dists {
                let v: f64 = d.sample(&mut rng);
                by_sample.push((v.max(0.1) * 10.0).round() / 10.0);
            }
            species.push(name);
        }
    }

    let sample_ids = numbered("Sample", n_samples);
    let feature_ids: Vec<String> = IRIS_FEATURES.iter().map(|s| s.to_string()).collect();
    let data = LabeledMatrix::from_flat(by_sample, sample_ids.clone(), feature_ids.clone())?.transpose();
    let description = MetadataTable::new(sample_ids)
        .with_column("Species", ColumnData::categorical(species))?;
    LData::new(data, description, MetadataTable::new(feature_ids))
}

fn simulate(config: &SimulateConfig) -> Result<LData> {
    if config.min >= config.max {
        return Err(LDataError::InvalidInput(format!(
            "simulate: min ({}) must be below max ({})",
            config.min, config.max
        )));
    }
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let values = (0..config.n_features * config.n_samples)
        .map(|_| rng.gen_range(config.min..config.max) as f64)
        .collect();
    let feature_ids = numbered("Feature", config.n_features);
    let sample_ids = numbered("Sample", config.n_samples);
    let data = LabeledMatrix::from_flat(values, feature_ids.clone(), sample_ids.clone())?;
    LData::new(data, MetadataTable::new(sample_ids), MetadataTable::new(feature_ids))
}
