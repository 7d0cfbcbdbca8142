//! Dense linear algebra helpers on flat row-major matrices.
//!
//! Only what the reduction backends need: a Jacobi eigensolver for real
//! symmetric matrices, covariance, and centring. No LAPACK dependency.

use ldata_core::{LDataError, Result};

/// Eigen-decomposition of a real symmetric matrix.
#[derive(Debug, Clone)]
pub struct SymmetricEigen {
    /// Eigenvalues, sorted descending.
    pub values: Vec<f64>,
    /// Eigenvectors as rows, row-major `n × n`, in the order of `values`.
    pub vectors: Vec<f64>,
    /// Matrix order.
    pub n: usize,
}

impl SymmetricEigen {
    /// The `k`-th eigenvector.
    pub fn vector(&self, k: usize) -> &[f64] {
        &self.vectors[k * self.n..(k + 1) * self.n]
    }
}

/// Decompose a symmetric `n × n` matrix with cyclic Jacobi rotations.
///
/// Each eigenvector is sign-normalised so that its entry of largest
/// magnitude is positive, which makes projections reproducible.
pub fn symmetric_eigen(matrix: &[f64], n: usize) -> Result<SymmetricEigen> {
    if n == 0 || matrix.len() != n * n {
        return Err(LDataError::InvalidInput(format!(
            "expected a {n}x{n} matrix, got {} values",
            matrix.len()
        )));
    }
    if matrix.iter().any(|v| !v.is_finite()) {
        return Err(LDataError::InvalidInput(
            "matrix contains non-finite values".into(),
        ));
    }

    let mut a = matrix.to_vec();
    let mut v = vec![0.0; n * n];
    for i in 0..n {
        v[i * n + i] = 1.0;
    }

    let scale: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt().max(1e-300);

    for _sweep in 0..100 {
        let off: f64 = (0..n)
            .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
            .map(|(i, j)| a[i * n + j] * a[i * n + j])
            .sum::<f64>()
            .sqrt();
        if off <= 1e-14 * scale {
            break;
        }

        for p in 0..n {
            for q in (p + 1)..n {
                let apq = a[p * n + q];
                if apq.abs() <= 1e-300 {
                    continue;
                }
                let app = a[p * n + p];
                let aqq = a[q * n + q];
                let theta = (aqq - app) / (2.0 * apq);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let t = if theta == 0.0 { 1.0 } else { t };
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                for k in 0..n {
                    let akp = a[k * n + p];
                    let akq = a[k * n + q];
                    a[k * n + p] = c * akp - s * akq;
                    a[k * n + q] = s * akp + c * akq;
                }
                for k in 0..n {
                    let apk = a[p * n + k];
                    let aqk = a[q * n + k];
                    a[p * n + k] = c * apk - s * aqk;
                    a[q * n + k] = s * apk + c * aqk;
                }
                for k in 0..n {
                    let vkp = v[k * n + p];
                    let vkq = v[k * n + q];
                    v[k * n + p] = c * vkp - s * vkq;
                    v[k * n + q] = s * vkp + c * vkq;
                }
            }
        }
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&x, &y| {
        a[y * n + y]
            .partial_cmp(&a[x * n + x])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut values = Vec::with_capacity(n);
    let mut vectors = Vec::with_capacity(n * n);
    for &col in &order {
        values.push(a[col * n + col]);
        let mut vec: Vec<f64> = (0..n).map(|row| v[row * n + col]).collect();
        let pivot = vec
            .iter()
            .copied()
            .fold(0.0_f64, |acc, x| if x.abs() > acc.abs() { x } else { acc });
        if pivot < 0.0 {
            vec.iter_mut().for_each(|x| *x = -*x);
        }
        vectors.extend(vec);
    }

    Ok(SymmetricEigen { values, vectors, n })
}

/// Column means of a row-major `n_rows × n_cols` matrix.
pub fn column_means(data: &[f64], n_cols: usize) -> Vec<f64> {
    let n_rows = data.len() / n_cols;
    let mut mean = vec![0.0; n_cols];
    for row in data.chunks_exact(n_cols) {
        for (m, x) in mean.iter_mut().zip(row) {
            *m += x;
        }
    }
    if n_rows > 0 {
        mean.iter_mut().for_each(|m| *m /= n_rows as f64);
    }
    mean
}

/// Subtract column means in place, returning the means.
pub fn center_columns(data: &mut [f64], n_cols: usize) -> Vec<f64> {
    let mean = column_means(data, n_cols);
    for row in data.chunks_exact_mut(n_cols) {
        for (x, m) in row.iter_mut().zip(&mean) {
            *x -= m;
        }
    }
    mean
}

/// `XᵀX / denom` for a row-major `n_rows × n_cols` matrix.
pub fn cross_product(data: &[f64], n_cols: usize, denom: f64) -> Vec<f64> {
    let mut out = vec![0.0; n_cols * n_cols];
    for row in data.chunks_exact(n_cols) {
        for i in 0..n_cols {
            if row[i] == 0.0 {
                continue;
            }
            for j in i..n_cols {
                out[i * n_cols + j] += row[i] * row[j];
            }
        }
    }
    for i in 0..n_cols {
        for j in i..n_cols {
            let v = out[i * n_cols + j] / denom;
            out[i * n_cols + j] = v;
            out[j * n_cols + i] = v;
        }
    }
    out
}

/// Shared shape check for flat row-major inputs; returns the row count.
pub(crate) fn check_shape(data: &[f64], n_features: usize, min_rows: usize) -> Result<usize> {
    if data.is_empty() {
        return Err(LDataError::InvalidInput("empty data".into()));
    }
    if n_features == 0 {
        return Err(LDataError::InvalidInput("n_features must be > 0".into()));
    }
    if data.len() % n_features != 0 {
        return Err(LDataError::InvalidInput(format!(
            "data length {} not divisible by n_features {}",
            data.len(),
            n_features
        )));
    }
    let n = data.len() / n_features;
    if n < min_rows {
        return Err(LDataError::InvalidInput(format!(
            "need at least {min_rows} samples, got {n}"
        )));
    }
    if data.iter().any(|v| !v.is_finite()) {
        return Err(LDataError::InvalidInput(
            "data contains non-finite values".into(),
        ));
    }
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eigen_diagonal() {
        let m = vec![1.0, 0.0, 0.0, 0.0, 3.0, 0.0, 0.0, 0.0, 2.0];
        let e = symmetric_eigen(&m, 3).unwrap();
        assert!((e.values[0] - 3.0).abs() < 1e-12);
        assert!((e.values[1] - 2.0).abs() < 1e-12);
        assert!((e.values[2] - 1.0).abs() < 1e-12);
        assert!((e.vector(0)[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn eigen_reconstructs() {
        let m = vec![4.0, 1.0, 2.0, 1.0, 3.0, 0.5, 2.0, 0.5, 5.0];
        let e = symmetric_eigen(&m, 3).unwrap();
        for i in 0..3 {
            for j in 0..3 {
                let rebuilt: f64 = (0..3)
                    .map(|k| e.values[k] * e.vector(k)[i] * e.vector(k)[j])
                    .sum();
                assert!((rebuilt - m[i * 3 + j]).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn eigenvectors_orthonormal() {
        let m = vec![2.0, -1.0, 0.0, -1.0, 2.0, -1.0, 0.0, -1.0, 2.0];
        let e = symmetric_eigen(&m, 3).unwrap();
        for a in 0..3 {
            for b in 0..3 {
                let dot: f64 = e.vector(a).iter().zip(e.vector(b)).map(|(x, y)| x * y).sum();
                let want = if a == b { 1.0 } else { 0.0 };
                assert!((dot - want).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn eigen_rejects_bad_shape() {
        assert!(symmetric_eigen(&[1.0, 2.0, 3.0], 2).is_err());
        assert!(symmetric_eigen(&[], 0).is_err());
    }

    #[test]
    fn centring_and_cross_product() {
        let mut x = vec![1.0, 2.0, 3.0, 6.0];
        let mean = center_columns(&mut x, 2);
        assert_eq!(mean, vec![2.0, 4.0]);
        assert_eq!(x, vec![-1.0, -2.0, 1.0, 2.0]);
        let c = cross_product(&x, 2, 1.0);
        assert_eq!(c, vec![2.0, 4.0, 4.0, 8.0]);
    }
}
