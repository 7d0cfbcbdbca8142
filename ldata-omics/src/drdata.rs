//! Dimension-reduction results.
//!
//! A [`DrData`] is an L-shaped container whose rows are components rather
//! than features. The [`ReductionPolicy`] type parameter fixes the component
//! naming convention, the type tag used in messages and any extra
//! annotation requirements. Reduction results cannot be subset, transposed
//! or concatenated: their rows only make sense as a whole.

use std::fmt;

use ldata_core::{LDataError, Result, Summarizable};
use ldata_ml::Scaling;

use crate::ldata::{LData, LShaped, Structural};
use crate::matrix::{numbered, LabeledMatrix};
use crate::table::MetadataTable;

/// Per-method behaviour of a reduction result.
pub trait ReductionPolicy: Clone + fmt::Debug + PartialEq {
    /// Row-name prefix; rows must be named `PREFIX1, PREFIX2, ...`.
    const PREFIX: &'static str;
    /// Lower-case name used in error messages.
    const TYPE_NAME: &'static str;
    /// What the rows are called in the display text.
    const COMPONENT_LABEL: &'static str = "features";

    /// Extra checks on a candidate annotation table.
    fn validate_annotation(&self, _annotation: &MetadataTable) -> Result<()> {
        Ok(())
    }

    /// Trailing display lines.
    fn fmt_details(&self, _scaling: Option<Scaling>, _f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Ok(())
    }
}

/// Whether `name` is `prefix` followed by at least one digit.
pub(crate) fn has_component_format(name: &str, prefix: &str) -> bool {
    name.strip_prefix(prefix)
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| c.is_ascii_digit())
}

fn check_row_format<R: ReductionPolicy>(names: &[String]) -> Result<()> {
    if names.iter().all(|n| has_component_format(n, R::PREFIX)) {
        Ok(())
    } else {
        let p = R::PREFIX;
        Err(LDataError::Format(format!(
            "rownames must be in format {p}1, {p}2, etc"
        )))
    }
}

/// The result of a dimension reduction: components × samples.
#[derive(Debug, Clone, PartialEq)]
pub struct DrData<R> {
    ldata: LData,
    scaling: Option<Scaling>,
    policy: R,
}

impl<R: ReductionPolicy> DrData<R> {
    /// Build a result from its three tables.
    ///
    /// # Errors
    ///
    /// Structural checks fail with [`LDataError::Validation`]; row names not
    /// in `PREFIX<n>` format and policy-specific annotation problems fail
    /// with [`LDataError::Format`].
    pub fn new(
        data: LabeledMatrix,
        description: MetadataTable,
        annotation: MetadataTable,
        scaling: Option<Scaling>,
        policy: R,
    ) -> Result<Self> {
        let ldata = LData::new(data, description, annotation)?;
        let out = Self {
            ldata,
            scaling,
            policy,
        };
        out.validate()?;
        Ok(out)
    }

    /// Re-run every check this result type enforces.
    pub fn validate(&self) -> Result<()> {
        self.ldata.validate()?;
        check_row_format::<R>(self.ldata.row_names())?;
        self.policy.validate_annotation(self.ldata.annotation())
    }

    /// Scaling applied to the samples before the reduction.
    pub fn scaling(&self) -> Option<Scaling> {
        self.scaling
    }

    pub fn set_scaling(&mut self, scaling: Option<Scaling>) {
        self.scaling = scaling;
    }

    pub fn policy(&self) -> &R {
        &self.policy
    }

    pub fn set_data(&mut self, value: LabeledMatrix) -> Result<()> {
        check_row_format::<R>(value.row_names())?;
        self.ldata.set_data(value)
    }

    pub fn set_description(&mut self, value: MetadataTable) -> Result<()> {
        self.ldata.set_description(value)
    }

    pub fn set_annotation(&mut self, value: MetadataTable) -> Result<()> {
        self.policy.validate_annotation(&value)?;
        self.ldata.set_annotation(value)
    }

    pub fn set_row_names(&mut self, value: Vec<String>) -> Result<()> {
        check_row_format::<R>(&value)?;
        self.ldata.set_row_names(value)
    }

    pub fn set_col_names(&mut self, value: Vec<String>) -> Result<()> {
        self.ldata.set_col_names(value)
    }

    /// Rename rows, then columns. A row name in the wrong format is rejected
    /// before any column is touched.
    pub fn set_dim_names(&mut self, row_names: Vec<String>, col_names: Vec<String>) -> Result<()> {
        check_row_format::<R>(&row_names)?;
        self.ldata.set_dim_names(row_names, col_names)
    }

    pub fn with_annotation(mut self, value: MetadataTable) -> Result<Self> {
        self.set_annotation(value)?;
        Ok(self)
    }

    pub fn with_row_names(mut self, value: Vec<String>) -> Result<Self> {
        self.set_row_names(value)?;
        Ok(self)
    }

    pub fn with_col_names(mut self, value: Vec<String>) -> Result<Self> {
        self.set_col_names(value)?;
        Ok(self)
    }

    /// Package a samples × components embedding as a result aligned with
    /// the samples of `source`.
    pub(crate) fn from_embedding<D: LShaped + ?Sized>(
        source: &D,
        embedding: Vec<f64>,
        n_components: usize,
        annotation: MetadataTable,
        scaling: Scaling,
        policy: R,
    ) -> Result<Self> {
        let by_sample = LabeledMatrix::from_flat(
            embedding,
            source.col_names().to_vec(),
            numbered(R::PREFIX, n_components),
        )?;
        Self::new(
            by_sample.transpose(),
            source.description().clone(),
            annotation,
            Some(scaling),
            policy,
        )
    }

    fn unsupported(op: &str) -> LDataError {
        LDataError::UnsupportedOperation(format!("Cannot {op} {} object", R::TYPE_NAME))
    }
}

impl<R: ReductionPolicy> LShaped for DrData<R> {
    fn ldata(&self) -> &LData {
        &self.ldata
    }
}

impl<R: ReductionPolicy> Structural for DrData<R> {
    fn subset(&self, _samples: Option<&[&str]>, _features: Option<&[&str]>) -> Result<Self> {
        Err(Self::unsupported("subset"))
    }

    fn transpose(&self) -> Result<Self> {
        Err(Self::unsupported("transpose"))
    }

    fn concat(&self, _others: &[&Self]) -> Result<Self> {
        Err(Self::unsupported("concat"))
    }
}

impl<R: ReductionPolicy> fmt::Display for DrData<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.ldata.fmt_dimensions(f, R::COMPONENT_LABEL)?;
        self.policy.fmt_details(self.scaling, f)
    }
}

impl<R: ReductionPolicy> Summarizable for DrData<R> {
    fn summary(&self) -> String {
        self.to_string()
    }
}

/// Samples-as-rows copy of a container's matrix, scaled per feature.
pub fn scale<D: LShaped + ?Sized>(dataset: &D, scaling: Scaling) -> Result<LabeledMatrix> {
    let by_sample = dataset.data().transpose();
    let mut values = by_sample.to_row_major();
    scaling.apply(&mut values, by_sample.n_cols())?;
    LabeledMatrix::from_flat(
        values,
        by_sample.row_names().to_vec(),
        by_sample.col_names().to_vec(),
    )
}

/// Display text for an optional tag, `None` when absent.
pub(crate) fn or_none<T: fmt::Display>(value: Option<&T>) -> String {
    value.map_or_else(|| "None".to_string(), ToString::to_string)
}
