//! L-shaped omics containers.
//!
//! An L-shaped dataset is a numeric matrix (features × samples) flanked by a
//! description table with one row per sample and an annotation table with
//! one row per feature. The crate provides:
//!
//! - **Containers** — [`LabeledMatrix`], [`MetadataTable`] and [`LData`],
//!   with the [`LShaped`] accessors and [`Structural`] operations (subset,
//!   transpose, concatenate)
//! - **Reduction results** — [`PcaData`], [`LdaData`], [`TsneData`] and
//!   [`UmapData`], all instances of [`DrData`]
//! - **Analysis datasets** — [`Dataset`] holds the container plus the
//!   results computed from it, and drops them whenever the data changes
//! - **RNA-seq** — [`RnaData`] with count filtering and normalisation
//! - **Examples** — seeded iris-like and simulated data via [`example_ldata`]
//!
//! # Quick start
//!
//! ```
//! use ldata_omics::{Dataset, ExampleKind, LShaped, PcaOptions};
//! use ldata_core::Summarizable;
//!
//! let mut x = Dataset::example(&ExampleKind::Iris).unwrap();
//! x.perform_dimension_reduction(PcaOptions::default()).unwrap();
//!
//! let pca = x.pca().unwrap();
//! assert_eq!(pca.row_names(), ["PC1", "PC2"]);
//! assert_eq!(x.summary(), "ldata object:\n - Dimensions: 150 (samples) x 4 (features)");
//! ```

pub mod dataset;
pub mod datasets;
pub mod drdata;
pub mod gtf;
pub mod lda;
pub mod ldata;
pub mod matrix;
pub mod pca;
pub mod rnadata;
pub mod table;
pub mod tsne;
pub mod umap;

pub use dataset::{Dataset, ReductionKind, ReductionOptions};
pub use datasets::{example_ldata, ExampleKind, SimulateConfig};
pub use drdata::{scale, DrData, ReductionPolicy};
pub use gtf::gene_lengths;
pub use lda::{Lda, LdaData, LdaOptions};
pub use ldata::{LData, LShaped, Structural};
pub use matrix::LabeledMatrix;
pub use pca::{Pca, PcaData, PcaMethod, PcaOptions, VARIANCE_EXPLAINED};
pub use rnadata::{FilterMethod, RnaData, DEFAULT_COUNT_THRESHOLD};
pub use table::{ColumnData, MetadataTable, ID};
pub use tsne::{Tsne, TsneData, TsneOptions};
pub use umap::{Umap, UmapData, UmapOptions};

pub use ldata_ml::{DistanceMetric, Kernel, Scaling, UmapInit};
pub use ldata_stats::Normalisation;
