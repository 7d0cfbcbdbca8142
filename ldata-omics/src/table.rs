//! Metadata tables keyed by a unique `ID` column.
//!
//! A [`MetadataTable`] describes either the samples (columns) or the features
//! (rows) of an L-shaped dataset. The `ID` column is always present and is
//! stored separately from the ordered, typed data columns.

use std::borrow::Cow;
use std::collections::HashSet;

use indexmap::{IndexMap, IndexSet};
use ldata_core::{LDataError, Result};

/// Name of the key column every metadata table carries.
pub const ID: &str = "ID";

/// A single metadata column.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    /// Free-text string values.
    Strings(Vec<String>),
    /// Numeric (f64) values.
    Numeric(Vec<f64>),
    /// Categorical data stored as integer codes indexing into a category list.
    Categorical {
        codes: Vec<u32>,
        categories: Vec<String>,
    },
}

impl ColumnData {
    /// Encode string values as a categorical column, categories in order of
    /// first appearance.
    pub fn categorical<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut categories: IndexSet<String> = IndexSet::new();
        let codes = values
            .into_iter()
            .map(|v| categories.insert_full(v.into()).0 as u32)
            .collect();
        ColumnData::Categorical {
            codes,
            categories: categories.into_iter().collect(),
        }
    }

    /// Number of elements in this column.
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Strings(v) => v.len(),
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Categorical { codes, .. } => codes.len(),
        }
    }

    /// Whether the column is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Try to get as string slice. Returns `None` if not `Strings` variant.
    pub fn as_strings(&self) -> Option<&[String]> {
        match self {
            ColumnData::Strings(v) => Some(v),
            _ => None,
        }
    }

    /// Try to get as numeric slice. Returns `None` if not `Numeric` variant.
    pub fn as_numeric(&self) -> Option<&[f64]> {
        match self {
            ColumnData::Numeric(v) => Some(v),
            _ => None,
        }
    }

    /// Every value rendered as a string label.
    pub fn labels(&self) -> Vec<String> {
        match self {
            ColumnData::Strings(v) => v.clone(),
            ColumnData::Numeric(v) => v.iter().map(|x| x.to_string()).collect(),
            ColumnData::Categorical { codes, categories } => codes
                .iter()
                .map(|&c| categories[c as usize].clone())
                .collect(),
        }
    }

    /// A column of `len` missing values of the same kind: `NaN`, an empty
    /// string, or an empty-string category.
    fn missing_like(&self, len: usize) -> Self {
        match self {
            ColumnData::Strings(_) => ColumnData::Strings(vec![String::new(); len]),
            ColumnData::Numeric(_) => ColumnData::Numeric(vec![f64::NAN; len]),
            ColumnData::Categorical { .. } => ColumnData::Categorical {
                codes: vec![0; len],
                categories: vec![String::new()],
            },
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ColumnData::Strings(_) => "string",
            ColumnData::Numeric(_) => "numeric",
            ColumnData::Categorical { .. } => "categorical",
        }
    }

    fn select(&self, indices: &[usize]) -> Self {
        match self {
            ColumnData::Strings(v) => {
                ColumnData::Strings(indices.iter().map(|&i| v[i].clone()).collect())
            }
            ColumnData::Numeric(v) => {
                ColumnData::Numeric(indices.iter().map(|&i| v[i]).collect())
            }
            ColumnData::Categorical { codes, categories } => ColumnData::Categorical {
                codes: indices.iter().map(|&i| codes[i]).collect(),
                categories: categories.clone(),
            },
        }
    }

    /// Stack columns of the same kind end to end. Categorical columns are
    /// re-encoded against the union of their categories.
    fn stack(name: &str, parts: &[&ColumnData]) -> Result<Self> {
        let Some(first) = parts.first() else {
            return Ok(ColumnData::Strings(Vec::new()));
        };
        if let Some(other) = parts.iter().find(|p| p.kind() != first.kind()) {
            return Err(LDataError::Validation(format!(
                "column '{name}' is {} in one table and {} in another",
                first.kind(),
                other.kind()
            )));
        }
        Ok(match first {
            ColumnData::Strings(_) => ColumnData::Strings(
                parts
                    .iter()
                    .flat_map(|p| p.as_strings().unwrap_or_default().iter().cloned())
                    .collect(),
            ),
            ColumnData::Numeric(_) => ColumnData::Numeric(
                parts
                    .iter()
                    .flat_map(|p| p.as_numeric().unwrap_or_default().iter().copied())
                    .collect(),
            ),
            ColumnData::Categorical { .. } => {
                ColumnData::categorical(parts.iter().flat_map(|p| p.labels()))
            }
        })
    }
}

/// Sample or feature metadata: an `ID` key plus ordered named columns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetadataTable {
    ids: Vec<String>,
    columns: IndexMap<String, ColumnData>,
}

impl MetadataTable {
    /// A table holding only the `ID` column.
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
            columns: IndexMap::new(),
        }
    }

    /// Builder form of [`insert_column`](Self::insert_column).
    pub fn with_column(mut self, name: impl Into<String>, data: ColumnData) -> Result<Self> {
        self.insert_column(name, data)?;
        Ok(self)
    }

    /// Add a column, or replace an existing one with the same name.
    ///
    /// # Errors
    ///
    /// Fails if `name` is `ID`, the column length differs from the table's,
    /// or a categorical code has no category.
    pub fn insert_column(&mut self, name: impl Into<String>, data: ColumnData) -> Result<()> {
        let name = name.into();
        if name == ID {
            return Err(LDataError::Validation(
                "the ID column can only be changed through the container's names".into(),
            ));
        }
        if data.len() != self.ids.len() {
            return Err(LDataError::Validation(format!(
                "column '{name}' has {} values, expected {}",
                data.len(),
                self.ids.len()
            )));
        }
        if let ColumnData::Categorical { codes, categories } = &data {
            if let Some(&code) = codes.iter().find(|&&c| c as usize >= categories.len()) {
                return Err(LDataError::Validation(format!(
                    "column '{name}' has code {code} but only {} categories",
                    categories.len()
                )));
            }
        }
        self.columns.insert(name, data);
        Ok(())
    }

    /// Remove a column, returning it if present.
    pub fn remove_column(&mut self, name: &str) -> Option<ColumnData> {
        self.columns.shift_remove(name)
    }

    /// Values of the `ID` column.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Look up a data column. `ID` is not a data column.
    pub fn column(&self, name: &str) -> Option<&ColumnData> {
        self.columns.get(name)
    }

    /// Whether `name` is `ID` or one of the data columns.
    pub fn has_column(&self, name: &str) -> bool {
        name == ID || self.columns.contains_key(name)
    }

    /// Names of the data columns, in insertion order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Number of data columns (excluding `ID`).
    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// String labels of any column, `ID` included.
    pub fn labels(&self, name: &str) -> Option<Vec<String>> {
        if name == ID {
            Some(self.ids.clone())
        } else {
            self.column(name).map(ColumnData::labels)
        }
    }

    /// Rows at `indices`, in that order.
    pub(crate) fn select(&self, indices: &[usize]) -> Self {
        Self {
            ids: indices.iter().map(|&i| self.ids[i].clone()).collect(),
            columns: self
                .columns
                .iter()
                .map(|(name, col)| (name.clone(), col.select(indices)))
                .collect(),
        }
    }

    pub(crate) fn set_ids(&mut self, ids: Vec<String>) {
        self.ids = ids;
    }

    /// Stack tables row-wise.
    ///
    /// The output has the union of the data columns, in order of first
    /// appearance. A table lacking a column contributes missing values
    /// (see [`ColumnData`] kinds); a column whose kind differs between
    /// tables is an error.
    pub fn concat(tables: &[&MetadataTable]) -> Result<Self> {
        let mut names: IndexSet<&str> = IndexSet::new();
        for table in tables {
            names.extend(table.column_names());
        }

        let ids = tables.iter().flat_map(|t| t.ids.iter().cloned()).collect();
        let mut columns = IndexMap::with_capacity(names.len());
        for name in names {
            let Some(template) = tables.iter().find_map(|t| t.column(name)) else {
                continue;
            };
            let parts: Vec<Cow<'_, ColumnData>> = tables
                .iter()
                .map(|t| match t.column(name) {
                    Some(col) => Cow::Borrowed(col),
                    None => Cow::Owned(template.missing_like(t.len())),
                })
                .collect();
            let parts: Vec<&ColumnData> = parts.iter().map(|c| &**c).collect();
            columns.insert(name.to_string(), ColumnData::stack(name, &parts)?);
        }
        Ok(Self { ids, columns })
    }
}

/// Whether every value in `values` is distinct.
pub(crate) fn all_unique<S: AsRef<str>>(values: &[S]) -> bool {
    let mut seen = HashSet::with_capacity(values.len());
    values.iter().all(|v| seen.insert(v.as_ref()))
}
