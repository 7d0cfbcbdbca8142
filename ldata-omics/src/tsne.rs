//! t-SNE embedding results.

use ldata_core::Result;
use ldata_ml::{tsne, Scaling, TsneConfig};
use log::info;

use crate::drdata::{scale, DrData, ReductionPolicy};
use crate::ldata::LShaped;
use crate::matrix::numbered;
use crate::table::MetadataTable;

/// t-SNE result policy: rows `TSNE1, TSNE2, ...`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Tsne;

impl ReductionPolicy for Tsne {
    const PREFIX: &'static str = "TSNE";
    const TYPE_NAME: &'static str = "tsne";
}

/// t-SNE components × samples.
pub type TsneData = DrData<Tsne>;

/// Options for [`analyse`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TsneOptions {
    pub n_components: usize,
    pub scaling: Scaling,
    /// Effective neighbourhood size; must be below the number of samples.
    pub perplexity: f64,
    pub learning_rate: f64,
    pub n_iter: usize,
    pub seed: u64,
}

impl Default for TsneOptions {
    fn default() -> Self {
        Self {
            n_components: 2,
            scaling: Scaling::ZScore,
            perplexity: 30.0,
            learning_rate: 200.0,
            n_iter: 1000,
            seed: 42,
        }
    }
}

impl TsneOptions {
    fn config(&self) -> TsneConfig {
        TsneConfig {
            n_components: self.n_components,
            perplexity: self.perplexity,
            learning_rate: self.learning_rate,
            n_iter: self.n_iter,
            seed: self.seed,
            ..Default::default()
        }
    }
}

/// Embed the samples of `dataset` with t-SNE.
pub fn analyse<D: LShaped + ?Sized>(dataset: &D, options: &TsneOptions) -> Result<TsneData> {
    info!(
        "t-SNE: {} components, perplexity {}, scaling {}, seed {}",
        options.n_components, options.perplexity, options.scaling, options.seed
    );
    let samples = scale(dataset, options.scaling)?;
    let fit = tsne(&samples.to_row_major(), samples.n_cols(), &options.config())?;
    DrData::from_embedding(
        dataset,
        fit.embedding,
        fit.n_components,
        MetadataTable::new(numbered(Tsne::PREFIX, fit.n_components)),
        options.scaling,
        Tsne,
    )
}
