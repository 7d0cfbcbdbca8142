//! UMAP embedding results.

use ldata_core::Result;
use ldata_ml::{umap, DistanceMetric, Scaling, UmapConfig, UmapInit};
use log::info;

use crate::drdata::{scale, DrData, ReductionPolicy};
use crate::ldata::LShaped;
use crate::matrix::numbered;
use crate::table::MetadataTable;

/// UMAP result policy: rows `UMAP1, UMAP2, ...`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Umap;

impl ReductionPolicy for Umap {
    const PREFIX: &'static str = "UMAP";
    const TYPE_NAME: &'static str = "umap";
}

/// UMAP components × samples.
pub type UmapData = DrData<Umap>;

/// Options for [`analyse`]. The seed is fixed by default so repeated runs
/// give the same embedding.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UmapOptions {
    pub n_components: usize,
    pub scaling: Scaling,
    /// Must be below the number of samples.
    pub n_neighbors: usize,
    pub min_dist: f64,
    pub spread: f64,
    pub n_epochs: usize,
    pub negative_sample_rate: usize,
    pub metric: DistanceMetric,
    pub init: UmapInit,
    pub seed: u64,
}

impl Default for UmapOptions {
    fn default() -> Self {
        Self {
            n_components: 2,
            scaling: Scaling::ZScore,
            n_neighbors: 15,
            min_dist: 0.1,
            spread: 1.0,
            n_epochs: 200,
            negative_sample_rate: 5,
            metric: DistanceMetric::Euclidean,
            init: UmapInit::Pca,
            seed: 42,
        }
    }
}

impl UmapOptions {
    fn config(&self) -> UmapConfig {
        UmapConfig {
            n_components: self.n_components,
            n_neighbors: self.n_neighbors,
            min_dist: self.min_dist,
            spread: self.spread,
            n_epochs: self.n_epochs,
            negative_sample_rate: self.negative_sample_rate,
            metric: self.metric,
            init: self.init,
            seed: self.seed,
            ..Default::default()
        }
    }
}

/// Embed the samples of `dataset` with UMAP.
pub fn analyse<D: LShaped + ?Sized>(dataset: &D, options: &UmapOptions) -> Result<UmapData> {
    info!(
        "UMAP: {} components, {} neighbours, metric {}, scaling {}, seed {}",
        options.n_components, options.n_neighbors, options.metric, options.scaling, options.seed
    );
    let samples = scale(dataset, options.scaling)?;
    let fit = umap(&samples.to_row_major(), samples.n_cols(), &options.config())?;
    DrData::from_embedding(
        dataset,
        fit.embedding,
        fit.n_components,
        MetadataTable::new(numbered(Umap::PREFIX, fit.n_components)),
        options.scaling,
        Umap,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasets::{example_ldata, ExampleKind};
    use crate::ldata::tests::fixture;
    use crate::ldata::Structural;
    use crate::matrix::LabeledMatrix;
    use ldata_core::LDataError;

    #[test]
    fn analyse_iris() {
        let x = example_ldata(&ExampleKind::Iris).unwrap();
        let r = analyse(&x, &UmapOptions::default()).unwrap();
        assert_eq!(r.shape(), (2, 150));
        assert_eq!(r.row_names(), ["UMAP1", "UMAP2"]);
        assert_eq!(r.annotation().n_columns(), 0);
        assert!(r.data().values().iter().all(|v| v.is_finite()));
        assert_eq!(r.scaling(), Some(Scaling::ZScore));
    }

    #[test]
    fn fixed_seed_is_reproducible() {
        let x = fixture();
        let options = UmapOptions {
            n_neighbors: 3,
            n_epochs: 50,
            ..Default::default()
        };
        assert_eq!(analyse(&x, &options).unwrap(), analyse(&x, &options).unwrap());
    }

    fn small_options() -> UmapOptions {
        UmapOptions {
            n_neighbors: 3,
            n_epochs: 10,
            ..Default::default()
        }
    }

    #[test]
    fn neighbours_capped_to_sample_count() {
        let r = analyse(&fixture(), &UmapOptions::default()).unwrap();
        assert_eq!(r.shape(), (2, 5));
        assert!(r.data().values().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn rejects_wrong_row_names() {
        let data = LabeledMatrix::from_flat(vec![0.0; 10], vec!["a".into(), "b".into()], numbered("Sample", 5)).unwrap();
        let err = UmapData::new(data, MetadataTable::new(numbered("Sample", 5)), MetadataTable::new(["a", "b"]), None, Umap)
            .unwrap_err();
        assert!(matches!(err, LDataError::Format(_)));
        assert!(err.to_string().contains("rownames must be in format UMAP1, UMAP2, etc"));
    }

    #[test]
    fn rejects_truncated_tables() {
        let r = analyse(&fixture(), &small_options()).unwrap();
        let (data, desc, annot) = r.ldata().clone().into_parts();

        let err = UmapData::new(data.clone(), desc.select(&[0, 1]), annot.clone(), None, Umap).unwrap_err();
        assert!(err.to_string().contains("data colnames do not match description ID"));
        let err = UmapData::new(data.clone(), desc.clone(), annot.select(&[0]), None, Umap).unwrap_err();
        assert!(err.to_string().contains("data rownames do not match annotation ID"));
        let err = UmapData::new(data.select_rows(&[0]), desc, annot, None, Umap).unwrap_err();
        assert!(err.to_string().contains("data rownames do not match annotation ID"));
    }

    #[test]
    fn structural_ops_fail() {
        let r = analyse(&fixture(), &small_options()).unwrap();
        let err = r.subset(Some(&["Sample1"]), None).unwrap_err();
        assert!(err.to_string().contains("Cannot subset umap object"));
        assert!(r.transpose().unwrap_err().to_string().contains("Cannot transpose umap object"));
        assert!(r.concat(&[&r]).unwrap_err().to_string().contains("Cannot concat umap object"));
    }
}
