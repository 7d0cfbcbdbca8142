//! Linear discriminant analysis results.

use std::fmt;

use ldata_core::{LDataError, Result};
use ldata_ml::{lda, LdaConfig, Scaling};
use log::info;

use crate::drdata::{or_none, scale, DrData, ReductionPolicy};
use crate::ldata::LShaped;
use crate::matrix::numbered;
use crate::pca::VARIANCE_EXPLAINED;
use crate::table::{ColumnData, MetadataTable};

/// LDA result policy: rows `LD1, LD2, ...`, plus the description column the
/// projection separates.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Lda {
    pub target: Option<String>,
}

impl ReductionPolicy for Lda {
    const PREFIX: &'static str = "LD";
    const TYPE_NAME: &'static str = "lda";
    const COMPONENT_LABEL: &'static str = "LDA components";

    fn fmt_details(&self, _scaling: Option<Scaling>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\n - Target: {}", or_none(self.target.as_ref()))
    }
}

/// Discriminant components × samples.
pub type LdaData = DrData<Lda>;

impl LdaData {
    pub fn target(&self) -> Option<&str> {
        self.policy().target.as_deref()
    }
}

/// Options for [`analyse`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LdaOptions {
    /// Description column holding the class labels.
    pub target: String,
    pub n_components: usize,
    pub scaling: Scaling,
}

impl LdaOptions {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            n_components: 2,
            scaling: Scaling::ZScore,
        }
    }
}

/// Fit a discriminant projection separating the classes in `target` and
/// project the samples of `dataset` onto it.
///
/// # Errors
///
/// [`LDataError::MissingReference`] if `target` is not a description
/// column. Asking for more than `n_classes - 1` components fails in the
/// backend with [`LDataError::InvalidInput`].
pub fn analyse<D: LShaped + ?Sized>(dataset: &D, options: &LdaOptions) -> Result<LdaData> {
    let target = &options.target;
    let labels = dataset.description().labels(target).ok_or_else(|| {
        LDataError::MissingReference(format!("{target} is not in description"))
    })?;
    info!(
        "LDA: {} components, target {target}, scaling {}",
        options.n_components, options.scaling
    );

    let samples = scale(dataset, options.scaling)?;
    let config = LdaConfig {
        n_components: options.n_components,
        ..Default::default()
    };
    let fit = lda(&samples.to_row_major(), samples.n_cols(), &labels, &config)?;

    let percentages = fit.explained_variance_ratio.iter().map(|r| r * 100.0).collect();
    let annotation = MetadataTable::new(numbered(Lda::PREFIX, fit.n_components))
        .with_column(VARIANCE_EXPLAINED, ColumnData::Numeric(percentages))?;
    DrData::from_embedding(
        dataset,
        fit.transformed,
        fit.n_components,
        annotation,
        options.scaling,
        Lda {
            target: Some(target.clone()),
        },
    )
}
