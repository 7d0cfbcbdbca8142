//! Dense numeric matrix with row and column labels.
//!
//! Rows are features and columns are samples for raw data; reduction
//! results store components as rows.

use std::collections::HashMap;

use ldata_core::{LDataError, Result};
use ndarray::{concatenate, Array2, ArrayView1, ArrayView2, Axis};

/// A dense `f64` matrix with one label per row and per column.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledMatrix {
    values: Array2<f64>,
    row_names: Vec<String>,
    col_names: Vec<String>,
}

impl LabeledMatrix {
    /// Wrap an existing array.
    ///
    /// # Errors
    ///
    /// Returns an error if the label counts don't match the array shape.
    pub fn new(values: Array2<f64>, row_names: Vec<String>, col_names: Vec<String>) -> Result<Self> {
        let (n_rows, n_cols) = values.dim();
        if row_names.len() != n_rows {
            return Err(LDataError::Validation(format!(
                "{} row names for {n_rows} rows",
                row_names.len()
            )));
        }
        if col_names.len() != n_cols {
            return Err(LDataError::Validation(format!(
                "{} column names for {n_cols} columns",
                col_names.len()
            )));
        }
        Ok(Self {
            values,
            row_names,
            col_names,
        })
    }

    /// Create a matrix from row-major nested rows.
    pub fn from_rows(rows: Vec<Vec<f64>>, row_names: Vec<String>, col_names: Vec<String>) -> Result<Self> {
        let n_cols = col_names.len();
        let mut flat = Vec::with_capacity(rows.len() * n_cols);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != n_cols {
                return Err(LDataError::Validation(format!(
                    "row {i} has {} columns, expected {n_cols}",
                    row.len()
                )));
            }
            flat.extend_from_slice(row);
        }
        Self::from_flat(flat, row_names, col_names)
    }

    /// Create a matrix from a flat row-major buffer.
    pub fn from_flat(data: Vec<f64>, row_names: Vec<String>, col_names: Vec<String>) -> Result<Self> {
        let shape = (row_names.len(), col_names.len());
        let values = Array2::from_shape_vec(shape, data).map_err(|e| {
            LDataError::Validation(format!(
                "cannot shape data into {} x {}: {e}",
                shape.0, shape.1
            ))
        })?;
        Self::new(values, row_names, col_names)
    }

    /// (n_rows, n_cols).
    pub fn shape(&self) -> (usize, usize) {
        self.values.dim()
    }

    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn n_cols(&self) -> usize {
        self.values.ncols()
    }

    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    pub fn row_names(&self) -> &[String] {
        &self.row_names
    }

    pub fn col_names(&self) -> &[String] {
        &self.col_names
    }

    /// A single value by row and column index.
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.values.get((row, col)).copied()
    }

    /// One row of values.
    pub fn row(&self, row: usize) -> Option<ArrayView1<'_, f64>> {
        (row < self.n_rows()).then(|| self.values.row(row))
    }

    /// A single value by row and column label.
    pub fn get_by_name(&self, row: &str, col: &str) -> Option<f64> {
        let r = self.row_names.iter().position(|n| n == row)?;
        let c = self.col_names.iter().position(|n| n == col)?;
        self.get(r, c)
    }

    /// Copy of the values in row-major order.
    pub fn to_row_major(&self) -> Vec<f64> {
        self.values.iter().copied().collect()
    }

    /// Replace the values, keeping the labels.
    pub fn with_values(&self, values: Array2<f64>) -> Result<Self> {
        Self::new(values, self.row_names.clone(), self.col_names.clone())
    }

    /// Swap rows and columns.
    pub fn transpose(&self) -> Self {
        Self {
            values: self.values.t().as_standard_layout().into_owned(),
            row_names: self.col_names.clone(),
            col_names: self.row_names.clone(),
        }
    }

    /// Rows at `indices`, in that order.
    pub(crate) fn select_rows(&self, indices: &[usize]) -> Self {
        Self {
            values: self.values.select(Axis(0), indices),
            row_names: indices.iter().map(|&i| self.row_names[i].clone()).collect(),
            col_names: self.col_names.clone(),
        }
    }

    /// Columns at `indices`, in that order.
    pub(crate) fn select_cols(&self, indices: &[usize]) -> Self {
        Self {
            values: self.values.select(Axis(1), indices),
            row_names: self.row_names.clone(),
            col_names: indices.iter().map(|&i| self.col_names[i].clone()).collect(),
        }
    }

    /// Join matrices side by side. All inputs must have the same row count.
    pub(crate) fn hconcat(parts: &[&LabeledMatrix]) -> Result<Self> {
        let Some(first) = parts.first() else {
            return Err(LDataError::InvalidInput("nothing to concatenate".into()));
        };
        let views: Vec<ArrayView2<'_, f64>> = parts.iter().map(|m| m.values.view()).collect();
        let values = concatenate(Axis(1), &views)
            .map_err(|e| LDataError::Validation(format!("cannot concatenate matrices: {e}")))?;
        Ok(Self {
            values,
            row_names: first.row_names.clone(),
            col_names: parts.iter().flat_map(|m| m.col_names.iter().cloned()).collect(),
        })
    }

    pub(crate) fn set_row_names(&mut self, names: Vec<String>) {
        self.row_names = names;
    }

    pub(crate) fn set_col_names(&mut self, names: Vec<String>) {
        self.col_names = names;
    }

    /// Map each row label to its position.
    pub(crate) fn row_index(&self) -> HashMap<&str, usize> {
        index_of(&self.row_names)
    }

    /// Map each column label to its position.
    pub(crate) fn col_index(&self) -> HashMap<&str, usize> {
        index_of(&self.col_names)
    }
}

fn index_of(names: &[String]) -> HashMap<&str, usize> {
    names.iter().enumerate().map(|(i, n)| (n.as_str(), i)).collect()
}

/// `PREFIX1, PREFIX2, ...` labels.
pub(crate) fn numbered(prefix: &str, n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("{prefix}{i}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn names(prefix: &str, n: usize) -> Vec<String> {
        numbered(prefix, n)
    }

    fn small() -> LabeledMatrix {
        LabeledMatrix::from_rows(
            vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]],
            names("F", 2),
            names("S", 3),
        )
        .unwrap()
    }

    #[test]
    fn shape_and_lookup() {
        let m = small();
        assert_eq!(m.shape(), (2, 3));
        assert_eq!(m.get(1, 2), Some(6.0));
        assert_eq!(m.get(2, 0), None);
        assert_eq!(m.get_by_name("F1", "S2"), Some(2.0));
        assert_eq!(m.row(0).unwrap().to_vec(), vec![1.0, 2.0, 3.0]);
        assert!(m.row(5).is_none());
    }

    #[test]
    fn label_count_must_match() {
        assert!(LabeledMatrix::new(array![[1.0, 2.0]], names("F", 2), names("S", 2)).is_err());
        assert!(LabeledMatrix::new(array![[1.0, 2.0]], names("F", 1), names("S", 3)).is_err());
        assert!(LabeledMatrix::from_rows(vec![vec![1.0]], names("F", 1), names("S", 2)).is_err());
        assert!(LabeledMatrix::from_flat(vec![1.0; 5], names("F", 2), names("S", 3)).is_err());
    }

    #[test]
    fn transpose_is_involution() {
        let m = small();
        let t = m.transpose();
        assert_eq!(t.shape(), (3, 2));
        assert_eq!(t.row_names(), m.col_names());
        assert_eq!(t.to_row_major(), vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
        assert_eq!(t.transpose(), m);
    }

    #[test]
    fn select_follows_requested_order() {
        let m = small();
        let r = m.select_rows(&[1, 0]);
        assert_eq!(r.row_names(), ["F2", "F1"]);
        assert_eq!(r.get(0, 0), Some(4.0));
        let c = m.select_cols(&[2, 0]);
        assert_eq!(c.col_names(), ["S3", "S1"]);
        assert_eq!(c.to_row_major(), vec![3.0, 1.0, 6.0, 4.0]);
    }

    #[test]
    fn hconcat_appends_columns() {
        let m = small();
        let other = LabeledMatrix::from_rows(
            vec![vec![7.0], vec![8.0]],
            names("F", 2),
            vec!["S4".into()],
        )
        .unwrap();
        let joined = LabeledMatrix::hconcat(&[&m, &other]).unwrap();
        assert_eq!(joined.shape(), (2, 4));
        assert_eq!(joined.col_names(), ["S1", "S2", "S3", "S4"]);
        assert_eq!(joined.get(1, 3), Some(8.0));

        let tall = m.transpose();
        assert!(LabeledMatrix::hconcat(&[&m, &tall]).is_err());
    }
}
