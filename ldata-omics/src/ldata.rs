//! The base L-shaped container.
//!
//! [`LData`] owns a [`LabeledMatrix`] (features × samples) together with a
//! sample description and a feature annotation table. The matrix row labels
//! always equal the annotation `ID` column and the column labels always equal
//! the description `ID` column, order included. Every setter validates the
//! candidate state before committing it, so a failed update leaves the
//! container untouched.

use std::fmt;

use ldata_core::{LDataError, Result, Summarizable};

use crate::matrix::LabeledMatrix;
use crate::table::{all_unique, MetadataTable};

/// Read access shared by every L-shaped container.
pub trait LShaped {
    /// The underlying base container.
    fn ldata(&self) -> &LData;

    /// Numeric matrix, features as rows and samples as columns.
    fn data(&self) -> &LabeledMatrix {
        &self.ldata().data
    }

    /// Sample metadata, one row per matrix column.
    fn description(&self) -> &MetadataTable {
        &self.ldata().description
    }

    /// Feature metadata, one row per matrix row.
    fn annotation(&self) -> &MetadataTable {
        &self.ldata().annotation
    }

    fn row_names(&self) -> &[String] {
        self.data().row_names()
    }

    fn col_names(&self) -> &[String] {
        self.data().col_names()
    }

    /// `(row_names, col_names)`.
    fn dim_names(&self) -> (&[String], &[String]) {
        (self.row_names(), self.col_names())
    }

    /// (n_features, n_samples).
    fn shape(&self) -> (usize, usize) {
        self.data().shape()
    }
}

/// Operations that change which rows or columns a container holds.
///
/// All three return a new value and leave `self` untouched.
pub trait Structural: Sized {
    /// Keep the named samples and features, in the requested order.
    /// `None` keeps every sample (or feature).
    fn subset(&self, samples: Option<&[&str]>, features: Option<&[&str]>) -> Result<Self>;

    /// Swap features and samples together with their metadata.
    fn transpose(&self) -> Result<Self>;

    /// Append the samples of `others` after those of `self`.
    fn concat(&self, others: &[&Self]) -> Result<Self>;
}

/// A numeric matrix with sample description and feature annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct LData {
    data: LabeledMatrix,
    description: MetadataTable,
    annotation: MetadataTable,
}

/// Cross-check the three tables of an L-shaped container.
pub(crate) fn check_dimnames(
    data: &LabeledMatrix,
    description: &MetadataTable,
    annotation: &MetadataTable,
) -> Result<()> {
    if !all_unique(data.row_names()) {
        return Err(LDataError::Validation("rownames must contain unique IDs".into()));
    }
    if !all_unique(data.col_names()) {
        return Err(LDataError::Validation("colnames must contain unique IDs".into()));
    }
    if data.row_names() != annotation.ids() {
        return Err(LDataError::Validation(
            "data rownames do not match annotation ID".into(),
        ));
    }
    if data.col_names() != description.ids() {
        return Err(LDataError::Validation(
            "data colnames do not match description ID".into(),
        ));
    }
    Ok(())
}

fn check_names(value: &[String], expected: usize) -> Result<()> {
    if value.len() != expected {
        return Err(LDataError::Validation(format!(
            "value does not match data dims ({} names for {expected} entries)",
            value.len()
        )));
    }
    if !all_unique(value) {
        return Err(LDataError::Validation("value must contain unique IDs".into()));
    }
    Ok(())
}

/// Positions of `wanted` in `index`, or `None` if any label is missing.
fn positions(index: &std::collections::HashMap<&str, usize>, wanted: &[&str]) -> Option<Vec<usize>> {
    wanted.iter().map(|w| index.get(w).copied()).collect()
}

impl LData {
    /// Build a container from its three tables.
    ///
    /// # Errors
    ///
    /// Returns [`LDataError::Validation`] naming the first failed check:
    /// duplicate row labels, duplicate column labels, row labels differing
    /// from the annotation `ID`s, then column labels differing from the
    /// description `ID`s.
    pub fn new(data: LabeledMatrix, description: MetadataTable, annotation: MetadataTable) -> Result<Self> {
        check_dimnames(&data, &description, &annotation)?;
        Ok(Self {
            data,
            description,
            annotation,
        })
    }

    /// Re-run the cross-table checks.
    pub fn validate(&self) -> Result<()> {
        check_dimnames(&self.data, &self.description, &self.annotation)
    }

    /// Decompose into `(data, description, annotation)`.
    pub fn into_parts(self) -> (LabeledMatrix, MetadataTable, MetadataTable) {
        (self.data, self.description, self.annotation)
    }

    pub fn set_data(&mut self, value: LabeledMatrix) -> Result<()> {
        check_dimnames(&value, &self.description, &self.annotation)?;
        self.data = value;
        Ok(())
    }

    pub fn set_description(&mut self, value: MetadataTable) -> Result<()> {
        check_dimnames(&self.data, &value, &self.annotation)?;
        self.description = value;
        Ok(())
    }

    pub fn set_annotation(&mut self, value: MetadataTable) -> Result<()> {
        check_dimnames(&self.data, &self.description, &value)?;
        self.annotation = value;
        Ok(())
    }

    /// Rename the features; updates the matrix and the annotation `ID`s together.
    pub fn set_row_names(&mut self, value: Vec<String>) -> Result<()> {
        check_names(&value, self.data.n_rows())?;
        self.annotation.set_ids(value.clone());
        self.data.set_row_names(value);
        Ok(())
    }

    /// Rename the samples; updates the matrix and the description `ID`s together.
    pub fn set_col_names(&mut self, value: Vec<String>) -> Result<()> {
        check_names(&value, self.data.n_cols())?;
        self.description.set_ids(value.clone());
        self.data.set_col_names(value);
        Ok(())
    }

    /// Rename rows, then columns. Nothing changes unless both succeed.
    pub fn set_dim_names(&mut self, row_names: Vec<String>, col_names: Vec<String>) -> Result<()> {
        check_names(&row_names, self.data.n_rows())?;
        check_names(&col_names, self.data.n_cols())?;
        self.set_row_names(row_names)?;
        self.set_col_names(col_names)
    }

    pub fn with_data(mut self, value: LabeledMatrix) -> Result<Self> {
        self.set_data(value)?;
        Ok(self)
    }

    pub fn with_description(mut self, value: MetadataTable) -> Result<Self> {
        self.set_description(value)?;
        Ok(self)
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

    /// Shared display text; `features` names what the rows hold.
    pub(crate) fn fmt_dimensions(&self, f: &mut fmt::Formatter<'_>, features: &str) -> fmt::Result {
        let (n_rows, n_cols) = self.data.shape();
        write!(
            f,
            "ldata object:\n - Dimensions: {n_cols} (samples) x {n_rows} ({features})"
        )
    }
}

impl LShaped for LData {
    fn ldata(&self) -> &LData {
        self
    }
}

impl Structural for LData {
    fn subset(&self, samples: Option<&[&str]>, features: Option<&[&str]>) -> Result<Self> {
        let cols = match samples {
            Some(wanted) => Some(
                positions(&self.data.col_index(), wanted)
                    .ok_or_else(|| LDataError::Validation("samples are not in data".into()))?,
            ),
            None => None,
        };
        let rows = match features {
            Some(wanted) => Some(
                positions(&self.data.row_index(), wanted)
                    .ok_or_else(|| LDataError::Validation("features are not in data".into()))?,
            ),
            None => None,
        };

        let mut data = self.data.clone();
        let mut description = self.description.clone();
        let mut annotation = self.annotation.clone();
        if let Some(cols) = &cols {
            data = data.select_cols(cols);
            description = description.select(cols);
        }
        if let Some(rows) = &rows {
            data = data.select_rows(rows);
            annotation = annotation.select(rows);
        }
        Self::new(data, description, annotation)
    }

    fn transpose(&self) -> Result<Self> {
        Self::new(
            self.data.transpose(),
            self.annotation.clone(),
            self.description.clone(),
        )
    }

    fn concat(&self, others: &[&Self]) -> Result<Self> {
        if others.iter().any(|o| o.data.row_names() != self.data.row_names()) {
            return Err(LDataError::Validation(
                "objects must have same feature IDs".into(),
            ));
        }
        let all: Vec<&LData> = std::iter::once(self).chain(others.iter().copied()).collect();
        let col_names: Vec<&String> = all.iter().flat_map(|o| o.data.col_names()).collect();
        if !all_unique(&col_names) {
            return Err(LDataError::Validation("colnames must contain unique IDs".into()));
        }

        let matrices: Vec<&LabeledMatrix> = all.iter().map(|o| &o.data).collect();
        let descriptions: Vec<&MetadataTable> = all.iter().map(|o| &o.description).collect();
        Self::new(
            LabeledMatrix::hconcat(&matrices)?,
            MetadataTable::concat(&descriptions)?,
            self.annotation.clone(),
        )
    }
}

impl fmt::Display for LData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_dimensions(f, "features")
    }
}

impl Summarizable for LData {
    fn summary(&self) -> String {
        self.to_string()
    }
}
