//! Bulk RNA-seq count data.
//!
//! [`RnaData`] is a [`Dataset`] of raw counts (genes × samples) that also
//! remembers the GTF annotation the counts were produced against and the
//! last filtering and normalisation applied.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use ldata_core::{LDataError, Result, Summarizable};
use ldata_stats::{descriptive, Normalisation};
use log::info;
use ndarray::Array2;

use crate::dataset::{Dataset, ReductionOptions};
use crate::datasets::{example_ldata, ExampleKind, SimulateConfig};
use crate::gtf::gene_lengths;
use crate::ldata::{LData, LShaped, Structural};
use crate::matrix::LabeledMatrix;
use crate::table::MetadataTable;

/// Minimum statistic a gene needs to survive [`RnaData::filter_counts`] by default.
pub const DEFAULT_COUNT_THRESHOLD: f64 = 10.0;

/// Per-gene statistic used to filter low counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FilterMethod {
    #[default]
    Sum,
    Mean,
    Min,
}

impl FilterMethod {
    fn statistic(self, counts: &[f64]) -> Result<f64> {
        match self {
            Self::Sum => Ok(descriptive::sum(counts)),
            Self::Mean => descriptive::mean(counts),
            Self::Min => descriptive::min(counts),
        }
    }
}

impl FromStr for FilterMethod {
    type Err = LDataError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sum" => Ok(Self::Sum),
            "mean" => Ok(Self::Mean),
            "min" => Ok(Self::Min),
            _ => Err(LDataError::UnsupportedOption(format!(
                "{s} filtering not implemented"
            ))),
        }
    }
}

impl fmt::Display for FilterMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sum => f.write_str("sum"),
            Self::Mean => f.write_str("mean"),
            Self::Min => f.write_str("min"),
        }
    }
}

/// RNA-seq counts with their annotation file and processing history.
#[derive(Debug, Clone, PartialEq)]
pub struct RnaData {
    dataset: Dataset,
    gtf_path: Option<PathBuf>,
    filtering_method: Option<FilterMethod>,
    normalisation_method: Option<Normalisation>,
}

impl RnaData {
    pub fn new(
        data: LabeledMatrix,
        description: MetadataTable,
        annotation: MetadataTable,
        gtf_path: Option<PathBuf>,
    ) -> Result<Self> {
        Ok(Self::from_dataset(
            Dataset::new(data, description, annotation)?,
            gtf_path,
        ))
    }

    pub fn from_dataset(dataset: Dataset, gtf_path: Option<PathBuf>) -> Self {
        Self {
            dataset,
            gtf_path,
            filtering_method: None,
            normalisation_method: None,
        }
    }

    /// Simulated counts for 20 genes across 5 samples, with no GTF file.
    pub fn example() -> Result<Self> {
        let config = SimulateConfig {
            min: 5,
            max: 500,
            ..Default::default()
        };
        let ldata = example_ldata(&ExampleKind::Simulate(config))?;
        Ok(Self::from_dataset(Dataset::from_ldata(ldata), None))
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn dataset_mut(&mut self) -> &mut Dataset {
        &mut self.dataset
    }

    pub fn gtf_path(&self) -> Option<&Path> {
        self.gtf_path.as_deref()
    }

    pub fn set_gtf_path(&mut self, path: Option<PathBuf>) {
        self.gtf_path = path;
    }

    pub fn filtering_method(&self) -> Option<FilterMethod> {
        self.filtering_method
    }

    pub fn normalisation_method(&self) -> Option<Normalisation> {
        self.normalisation_method
    }

    pub fn perform_dimension_reduction(&mut self, options: impl Into<ReductionOptions>) -> Result<()> {
        self.dataset.perform_dimension_reduction(options)
    }

    /// Keep genes whose statistic across samples is at least `threshold`.
    pub fn filter_counts(&self, method: FilterMethod, threshold: f64) -> Result<Self> {
        let data = self.data();
        let mut keep = Vec::new();
        for (name, row) in data.row_names().iter().zip(data.values().rows()) {
            if method.statistic(&row.to_vec())? >= threshold {
                keep.push(name.as_str());
            }
        }
        info!(
            "filter_counts: {} of {} genes pass {method} >= {threshold}",
            keep.len(),
            data.n_rows()
        );

        let dataset = self.dataset.subset(None, Some(keep.as_slice()))?;
        Ok(Self {
            dataset,
            gtf_path: self.gtf_path.clone(),
            filtering_method: Some(method),
            normalisation_method: self.normalisation_method,
        })
    }

    /// Normalise the counts.
    ///
    /// TPM and FPKM read gene lengths from the GTF file; every gene must be
    /// present there. Attached results are dropped since they describe the
    /// raw counts.
    ///
    /// # Errors
    ///
    /// [`LDataError::MissingReference`] if a length-aware method is asked for
    /// without an existing GTF file, or a gene is missing from it.
    pub fn normalise(&self, method: Normalisation) -> Result<Self> {
        let lengths = if method.needs_gene_lengths() {
            Some(self.gene_lengths()?)
        } else {
            None
        };
        let (n_genes, n_samples) = self.shape();
        info!("normalise: {method} on {n_genes} genes x {n_samples} samples");

        let values = method.apply(
            &self.data().to_row_major(),
            n_genes,
            n_samples,
            lengths.as_deref(),
        )?;
        let values = Array2::from_shape_vec((n_genes, n_samples), values)
            .map_err(|e| LDataError::InvalidInput(format!("normalised counts: {e}")))?;
        let matrix = self.data().with_values(values)?;
        let ldata = self.ldata().clone().with_data(matrix)?;

        Ok(Self {
            dataset: self.dataset.derived(ldata, "normalise"),
            gtf_path: self.gtf_path.clone(),
            filtering_method: self.filtering_method,
            normalisation_method: Some(method),
        })
    }

    /// Lengths of the genes in row order.
    fn gene_lengths(&self) -> Result<Vec<f64>> {
        let path = self
            .gtf_path
            .as_deref()
            .filter(|p| p.is_file())
            .ok_or_else(|| LDataError::MissingReference("Does GTF file exist?".into()))?;
        let lengths = gene_lengths(path)?;
        self.row_names()
            .iter()
            .map(|gene| {
                lengths.get(gene).copied().ok_or_else(|| {
                    LDataError::MissingReference(format!(
                        "{gene} is not in {}",
                        path.display()
                    ))
                })
            })
            .collect()
    }

    fn with_dataset(&self, dataset: Dataset) -> Self {
        Self {
            dataset,
            gtf_path: self.gtf_path.clone(),
            filtering_method: self.filtering_method,
            normalisation_method: self.normalisation_method,
        }
    }
}

impl LShaped for RnaData {
    fn ldata(&self) -> &LData {
        self.dataset.ldata()
    }
}

impl Structural for RnaData {
    fn subset(&self, samples: Option<&[&str]>, features: Option<&[&str]>) -> Result<Self> {
        Ok(self.with_dataset(self.dataset.subset(samples, features)?))
    }

    fn transpose(&self) -> Result<Self> {
        Ok(self.with_dataset(self.dataset.transpose()?))
    }

    fn concat(&self, others: &[&Self]) -> Result<Self> {
        let others: Vec<&Dataset> = others.iter().map(|o| &o.dataset).collect();
        Ok(self.with_dataset(self.dataset.concat(&others)?))
    }
}

impl fmt::Display for RnaData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.dataset, f)?;
        match &self.gtf_path {
            Some(p) => write!(f, "\n - gtf file: {}", p.display()),
            None => f.write_str("\n - gtf file: None"),
        }
    }
}

impl Summarizable for RnaData {
    fn summary(&self) -> String {
        self.to_string()
    }
}
