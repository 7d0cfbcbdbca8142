//! Count normalisation for RNA-seq.
//!
//! All functions operate on row-major `&[f64]` slices with dimensions
//! `(n_genes, n_samples)`, the layout of an ldata matrix (features as rows).
//!
//! - [`cpm`] — counts per million
//! - [`tpm`] / [`fpkm`] — length-aware, need one length per gene
//! - [`upper_quartile_factors`] / [`tmm_factors`] — between-sample scaling
//!   factors, rescaled to a geometric mean of one
//! - [`uq`] / [`tmm`] — CPM over the factor-adjusted library size
//! - [`cuf`] / [`ctf`] — raw counts divided by the UQ / TMM factor
//! - [`size_factors`] / [`normalize_by_size_factors`] — median-of-ratios

use std::fmt;
use std::str::FromStr;

use ldata_core::{LDataError, Result};

use crate::descriptive;

// ── Helpers ──────────────────────────────────────────────────────────────────

fn validate_matrix(counts: &[f64], n_genes: usize, n_samples: usize) -> Result<()> {
    if n_genes == 0 || n_samples == 0 {
        return Err(LDataError::InvalidInput(
            "normalisation: matrix must have at least 1 gene and 1 sample".into(),
        ));
    }
    if counts.len() != n_genes * n_samples {
        return Err(LDataError::InvalidInput(format!(
            "normalisation: counts length ({}) != n_genes ({n_genes}) * n_samples ({n_samples})",
            counts.len(),
        )));
    }
    if counts.iter().any(|&v| v < 0.0 || !v.is_finite()) {
        return Err(LDataError::InvalidInput(
            "normalisation: counts must be finite and non-negative".into(),
        ));
    }
    Ok(())
}

fn validate_lengths(gene_lengths: &[f64], n_genes: usize, what: &str) -> Result<()> {
    if gene_lengths.len() != n_genes {
        return Err(LDataError::InvalidInput(format!(
            "{what}: gene_lengths length ({}) != n_genes ({n_genes})",
            gene_lengths.len(),
        )));
    }
    if let Some(i) = gene_lengths.iter().position(|&l| l <= 0.0) {
        return Err(LDataError::InvalidInput(format!(
            "{what}: gene_lengths[{i}] must be positive"
        )));
    }
    Ok(())
}

fn library_sizes(counts: &[f64], n_samples: usize) -> Vec<f64> {
    let mut sums = vec![0.0; n_samples];
    for row in counts.chunks_exact(n_samples) {
        for (s, v) in sums.iter_mut().zip(row) {
            *s += v;
        }
    }
    sums
}

fn column(counts: &[f64], n_samples: usize, j: usize) -> impl Iterator<Item = f64> + '_ {
    counts.chunks_exact(n_samples).map(move |row| row[j])
}

/// Divide every cell of column `j` by `denom[j]`, mapping a zero denominator to zero.
fn scale_columns(counts: &[f64], n_samples: usize, denom: &[f64], times: f64) -> Vec<f64> {
    counts
        .chunks_exact(n_samples)
        .flat_map(|row| {
            row.iter()
                .zip(denom)
                .map(move |(&c, &d)| if d > 0.0 { c / d * times } else { 0.0 })
        })
        .collect()
}

/// Rescale positive factors so that their geometric mean is one.
fn center_geometric(factors: &mut [f64]) -> Result<()> {
    let g = descriptive::geometric_mean(factors)?;
    factors.iter_mut().for_each(|f| *f /= g);
    Ok(())
}

// ── Library-size and length methods ──────────────────────────────────────────

/// Counts per million: `count_ij / library_size_j * 1e6`.
pub fn cpm(counts: &[f64], n_genes: usize, n_samples: usize) -> Result<Vec<f64>> {
    validate_matrix(counts, n_genes, n_samples)?;
    let lib = library_sizes(counts, n_samples);
    Ok(scale_columns(counts, n_samples, &lib, 1e6))
}

/// Transcripts per million: length-normalise to reads per kilobase, then
/// scale each sample to sum to one million.
pub fn tpm(
    counts: &[f64],
    n_genes: usize,
    n_samples: usize,
    gene_lengths: &[f64],
) -> Result<Vec<f64>> {
    validate_matrix(counts, n_genes, n_samples)?;
    validate_lengths(gene_lengths, n_genes, "tpm")?;
    let rpk: Vec<f64> = counts
        .chunks_exact(n_samples)
        .zip(gene_lengths)
        .flat_map(|(row, &len)| row.iter().map(move |c| c / (len / 1e3)))
        .collect();
    let totals = library_sizes(&rpk, n_samples);
    Ok(scale_columns(&rpk, n_samples, &totals, 1e6))
}

/// Fragments per kilobase per million: `count_ij * 1e9 / (library_size_j * length_i)`.
pub fn fpkm(
    counts: &[f64],
    n_genes: usize,
    n_samples: usize,
    gene_lengths: &[f64],
) -> Result<Vec<f64>> {
    validate_matrix(counts, n_genes, n_samples)?;
    validate_lengths(gene_lengths, n_genes, "fpkm")?;
    let per_million = cpm(counts, n_genes, n_samples)?;
    Ok(per_million
        .chunks_exact(n_samples)
        .zip(gene_lengths)
        .flat_map(|(row, &len)| row.iter().map(move |v| v * 1e3 / len))
        .collect())
}

// ── Upper quartile ───────────────────────────────────────────────────────────

/// Upper-quartile factors: the 75th percentile of each sample's count
/// proportions over genes expressed in at least one sample.
pub fn upper_quartile_factors(counts: &[f64], n_genes: usize, n_samples: usize) -> Result<Vec<f64>> {
    validate_matrix(counts, n_genes, n_samples)?;
    let lib = library_sizes(counts, n_samples);
    if let Some(j) = lib.iter().position(|&l| l <= 0.0) {
        return Err(LDataError::InvalidInput(format!(
            "upper quartile: sample {j} has zero total counts"
        )));
    }
    let expressed: Vec<&[f64]> = counts
        .chunks_exact(n_samples)
        .filter(|row| row.iter().any(|&v| v > 0.0))
        .collect();

    let mut factors = Vec::with_capacity(n_samples);
    for j in 0..n_samples {
        let props: Vec<f64> = expressed.iter().map(|row| row[j] / lib[j]).collect();
        let q = descriptive::quantile(&props, 0.75)?;
        if q <= 0.0 {
            return Err(LDataError::InvalidInput(format!(
                "upper quartile: sample {j} has a zero upper quartile"
            )));
        }
        factors.push(q);
    }
    center_geometric(&mut factors)?;
    Ok(factors)
}

/// Upper-quartile normalised CPM: `count / (library_size * factor) * 1e6`.
pub fn uq(counts: &[f64], n_genes: usize, n_samples: usize) -> Result<Vec<f64>> {
    let factors = upper_quartile_factors(counts, n_genes, n_samples)?;
    let effective = effective_library_sizes(counts, n_samples, &factors);
    Ok(scale_columns(counts, n_samples, &effective, 1e6))
}

/// Counts adjusted by upper-quartile factors: `count / factor`.
pub fn cuf(counts: &[f64], n_genes: usize, n_samples: usize) -> Result<Vec<f64>> {
    let factors = upper_quartile_factors(counts, n_genes, n_samples)?;
    Ok(scale_columns(counts, n_samples, &factors, 1.0))
}

fn effective_library_sizes(counts: &[f64], n_samples: usize, factors: &[f64]) -> Vec<f64> {
    library_sizes(counts, n_samples)
        .into_iter()
        .zip(factors)
        .map(|(l, f)| l * f)
        .collect()
}

// ── TMM ──────────────────────────────────────────────────────────────────────

/// Trimming configuration for TMM.
#[derive(Debug, Clone)]
pub struct TmmConfig {
    /// Fraction of M-values trimmed from each tail.
    pub trim_m: f64,
    /// Fraction of A-values trimmed from each tail.
    pub trim_a: f64,
    /// Reference sample; `None` picks the sample whose upper quartile is
    /// closest to the mean upper quartile.
    pub reference: Option<usize>,
}

impl Default for TmmConfig {
    fn default() -> Self {
        Self {
            trim_m: 0.3,
            trim_a: 0.05,
            reference: None,
        }
    }
}

/// Trimmed-mean-of-M-values factors (Robinson & Oshlack 2010).
pub fn tmm_factors(
    counts: &[f64],
    n_genes: usize,
    n_samples: usize,
    config: &TmmConfig,
) -> Result<Vec<f64>> {
    validate_matrix(counts, n_genes, n_samples)?;
    if !(0.0..0.5).contains(&config.trim_m) || !(0.0..0.5).contains(&config.trim_a) {
        return Err(LDataError::InvalidInput(
            "tmm: trim fractions must be in [0, 0.5)".into(),
        ));
    }
    let lib = library_sizes(counts, n_samples);
    if let Some(j) = lib.iter().position(|&l| l <= 0.0) {
        return Err(LDataError::InvalidInput(format!(
            "tmm: sample {j} has zero total counts"
        )));
    }

    let reference = match config.reference {
        Some(r) if r >= n_samples => {
            return Err(LDataError::InvalidInput(format!(
                "tmm: reference sample {r} out of range (n_samples = {n_samples})"
            )))
        }
        Some(r) => r,
        None => {
            let uqs = (0..n_samples)
                .map(|j| {
                    let props: Vec<f64> = column(counts, n_samples, j).map(|c| c / lib[j]).collect();
                    descriptive::quantile(&props, 0.75)
                })
                .collect::<Result<Vec<f64>>>()?;
            let mean_uq = descriptive::mean(&uqs)?;
            uqs.iter()
                .enumerate()
                .min_by(|a, b| (a.1 - mean_uq).abs().total_cmp(&(b.1 - mean_uq).abs()))
                .map(|(j, _)| j)
                .unwrap_or(0)
        }
    };

    let mut factors: Vec<f64> = (0..n_samples)
        .map(|j| {
            if j == reference {
                1.0
            } else {
                tmm_factor(counts, n_samples, j, reference, &lib, config)
            }
        })
        .collect();
    center_geometric(&mut factors)?;
    Ok(factors)
}

fn tmm_factor(
    counts: &[f64],
    n_samples: usize,
    obs: usize,
    reference: usize,
    lib: &[f64],
    config: &TmmConfig,
) -> f64 {
    let (n_o, n_r) = (lib[obs], lib[reference]);
    // (M, A, inverse variance) for genes expressed in both samples.
    let genes: Vec<(f64, f64, f64)> = counts
        .chunks_exact(n_samples)
        .filter(|row| row[obs] > 0.0 && row[reference] > 0.0)
        .map(|row| {
            let (y_o, y_r) = (row[obs], row[reference]);
            let (p_o, p_r) = (y_o / n_o, y_r / n_r);
            let m = (p_o / p_r).log2();
            let a = 0.5 * (p_o.log2() + p_r.log2());
            let var = (n_o - y_o) / (n_o * y_o) + (n_r - y_r) / (n_r * y_r);
            (m, a, var)
        })
        .filter(|&(m, a, var)| m.is_finite() && a.is_finite() && var > 0.0)
        .collect();
    let n = genes.len();
    if n == 0 {
        return 1.0;
    }

    let keep_band = |trim: f64, key: fn(&(f64, f64, f64)) -> f64| -> Vec<bool> {
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&x, &y| key(&genes[x]).total_cmp(&key(&genes[y])));
        let lo = (n as f64 * trim).floor() as usize;
        let hi = n - lo;
        let mut keep = vec![false; n];
        for &g in &order[lo.min(hi)..hi] {
            keep[g] = true;
        }
        keep
    };
    let keep_m = keep_band(config.trim_m, |g| g.0);
    let keep_a = keep_band(config.trim_a, |g| g.1);

    let (mut num, mut den) = (0.0, 0.0);
    for (g, &(m, _, var)) in genes.iter().enumerate() {
        if keep_m[g] && keep_a[g] {
            num += m / var;
            den += 1.0 / var;
        }
    }
    if den > 0.0 {
        2f64.powf(num / den)
    } else {
        1.0
    }
}

/// TMM-normalised CPM: `count / (library_size * factor) * 1e6`.
pub fn tmm(counts: &[f64], n_genes: usize, n_samples: usize) -> Result<Vec<f64>> {
    let factors = tmm_factors(counts, n_genes, n_samples, &TmmConfig::default())?;
    let effective = effective_library_sizes(counts, n_samples, &factors);
    Ok(scale_columns(counts, n_samples, &effective, 1e6))
}

/// Counts adjusted by TMM factors: `count / factor`.
pub fn ctf(counts: &[f64], n_genes: usize, n_samples: usize) -> Result<Vec<f64>> {
    let factors = tmm_factors(counts, n_genes, n_samples, &TmmConfig::default())?;
    Ok(scale_columns(counts, n_samples, &factors, 1.0))
}

// ── Size factors (median-of-ratios) ──────────────────────────────────────────

/// Median-of-ratios size factors (Anders & Huber 2010).
///
/// Genes with a zero in any sample do not contribute to the reference
/// geometric means.
pub fn size_factors(counts: &[f64], n_genes: usize, n_samples: usize) -> Result<Vec<f64>> {
    validate_matrix(counts, n_genes, n_samples)?;

    let usable: Vec<(&[f64], f64)> = counts
        .chunks_exact(n_samples)
        .filter(|row| row.iter().all(|&v| v > 0.0))
        .map(|row| {
            let log_mean = row.iter().map(|v| v.ln()).sum::<f64>() / n_samples as f64;
            (row, log_mean.exp())
        })
        .collect();
    if usable.is_empty() {
        return Err(LDataError::InvalidInput(
            "size_factors: no genes with all non-zero counts".into(),
        ));
    }

    (0..n_samples)
        .map(|j| {
            let ratios: Vec<f64> = usable.iter().map(|(row, gm)| row[j] / gm).collect();
            descriptive::median(&ratios)
        })
        .collect()
}

/// Divide each count by its sample's size factor.
pub fn normalize_by_size_factors(
    counts: &[f64],
    n_genes: usize,
    n_samples: usize,
    factors: &[f64],
) -> Result<Vec<f64>> {
    validate_matrix(counts, n_genes, n_samples)?;
    if factors.len() != n_samples {
        return Err(LDataError::InvalidInput(format!(
            "normalize_by_size_factors: factors length ({}) != n_samples ({n_samples})",
            factors.len(),
        )));
    }
    Ok(scale_columns(counts, n_samples, factors, 1.0))
}

// ── Dispatch ─────────────────────────────────────────────────────────────────

/// A named count-normalisation method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Normalisation {
    Cpm,
    Tpm,
    Fpkm,
    Uq,
    Cuf,
    #[default]
    Tmm,
    Ctf,
    Deseq2,
}

impl Normalisation {
    /// Every supported method, in display order.
    pub const ALL: [Normalisation; 8] = [
        Self::Cpm,
        Self::Tpm,
        Self::Fpkm,
        Self::Uq,
        Self::Cuf,
        Self::Tmm,
        Self::Ctf,
        Self::Deseq2,
    ];

    /// Whether the method needs per-gene lengths.
    pub fn needs_gene_lengths(self) -> bool {
        matches!(self, Self::Tpm | Self::Fpkm)
    }

    /// Normalise a `(n_genes, n_samples)` count matrix.
    ///
    /// `gene_lengths` is required by TPM and FPKM and ignored otherwise.
    pub fn apply(
        self,
        counts: &[f64],
        n_genes: usize,
        n_samples: usize,
        gene_lengths: Option<&[f64]>,
    ) -> Result<Vec<f64>> {
        let lengths = || {
            gene_lengths.ok_or_else(|| {
                LDataError::MissingReference(format!("{self} normalisation needs gene lengths"))
            })
        };
        match self {
            Self::Cpm => cpm(counts, n_genes, n_samples),
            Self::Tpm => tpm(counts, n_genes, n_samples, lengths()?),
            Self::Fpkm => fpkm(counts, n_genes, n_samples, lengths()?),
            Self::Uq => uq(counts, n_genes, n_samples),
            Self::Cuf => cuf(counts, n_genes, n_samples),
            Self::Tmm => tmm(counts, n_genes, n_samples),
            Self::Ctf => ctf(counts, n_genes, n_samples),
            Self::Deseq2 => {
                let sf = size_factors(counts, n_genes, n_samples)?;
                normalize_by_size_factors(counts, n_genes, n_samples, &sf)
            }
        }
    }
}

impl FromStr for Normalisation {
    type Err = LDataError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.to_string().eq_ignore_ascii_case(s))
            .ok_or_else(|| LDataError::UnsupportedOption(format!("{s} normalisation not implemented")))
    }
}

impl fmt::Display for Normalisation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cpm => "CPM",
            Self::Tpm => "TPM",
            Self::Fpkm => "FPKM",
            Self::Uq => "UQ",
            Self::Cuf => "CUF",
            Self::Tmm => "TMM",
            Self::Ctf => "CTF",
            Self::Deseq2 => "DESeq2",
        })
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-6;

    fn col_sum(v: &[f64], n_genes: usize, n_samples: usize, j: usize) -> f64 {
        (0..n_genes).map(|i| v[i * n_samples + j]).sum()
    }

    /// 6 genes x 3 samples; sample 2 is sample 0 at twice the depth, sample 1
    /// has one gene strongly up.
    fn toy() -> Vec<f64> {
        vec![
            10.0, 10.0, 20.0, //
            20.0, 20.0, 40.0, //
            30.0, 30.0, 60.0, //
            40.0, 400.0, 80.0, //
            50.0, 50.0, 100.0, //
            60.0, 60.0, 120.0,
        ]
    }

    #[test]
    fn cpm_columns_sum_to_a_million() {
        let out = cpm(&toy(), 6, 3).unwrap();
        for j in 0..3 {
            assert!((col_sum(&out, 6, 3, j) - 1e6).abs() < 1e-3);
        }
    }

    #[test]
    fn tpm_and_fpkm_agree_after_rescaling() {
        let lengths = [1000.0, 2000.0, 500.0, 1500.0, 800.0, 1200.0];
        let t = tpm(&toy(), 6, 3, &lengths).unwrap();
        let f = fpkm(&toy(), 6, 3, &lengths).unwrap();
        for j in 0..3 {
            assert!((col_sum(&t, 6, 3, j) - 1e6).abs() < 1e-3);
            let fsum = col_sum(&f, 6, 3, j);
            for i in 0..6 {
                assert!((f[i * 3 + j] / fsum * 1e6 - t[i * 3 + j]).abs() < 1e-3);
            }
        }
    }

    #[test]
    fn fpkm_known_value() {
        // count 100 of library 100, length 1 kb
        let out = fpkm(&[100.0], 1, 1, &[1000.0]).unwrap();
        assert!((out[0] - 1e6).abs() < TOL);
    }

    #[test]
    fn length_methods_reject_bad_lengths() {
        assert!(tpm(&toy(), 6, 3, &[1.0; 5]).is_err());
        assert!(fpkm(&toy(), 6, 3, &[0.0; 6]).is_err());
    }

    #[test]
    fn uq_factors_have_unit_geometric_mean() {
        let f = upper_quartile_factors(&toy(), 6, 3).unwrap();
        let g: f64 = (f.iter().map(|v| v.ln()).sum::<f64>() / 3.0).exp();
        assert!((g - 1.0).abs() < 1e-12);
        // Samples 0 and 2 have identical composition.
        assert!((f[0] - f[2]).abs() < 1e-12);
    }

    #[test]
    fn tmm_identical_composition_gives_equal_factors() {
        let f = tmm_factors(&toy(), 6, 3, &TmmConfig::default()).unwrap();
        assert!((f[0] - f[2]).abs() < 1e-9);
        // The up-regulated gene inflates sample 1's library; TMM shrinks its factor.
        assert!(f[1] < f[0]);
    }

    #[test]
    fn tmm_reference_out_of_range() {
        let config = TmmConfig {
            reference: Some(5),
            ..Default::default()
        };
        assert!(tmm_factors(&toy(), 6, 3, &config).is_err());
    }

    #[test]
    fn cuf_and_ctf_divide_by_factor() {
        let f = upper_quartile_factors(&toy(), 6, 3).unwrap();
        let out = cuf(&toy(), 6, 3).unwrap();
        assert!((out[0] - 10.0 / f[0]).abs() < 1e-9);
        let f = tmm_factors(&toy(), 6, 3, &TmmConfig::default()).unwrap();
        let out = ctf(&toy(), 6, 3).unwrap();
        assert!((out[1] - 10.0 / f[1]).abs() < 1e-9);
    }

    #[test]
    fn size_factors_doubled_library() {
        let counts = [10.0, 20.0, 20.0, 40.0, 30.0, 60.0];
        let sf = size_factors(&counts, 3, 2).unwrap();
        assert!((sf[1] / sf[0] - 2.0).abs() < TOL);
    }

    #[test]
    fn size_factors_skip_genes_with_zeros() {
        let counts = [0.0, 10.0, 20.0, 20.0, 30.0, 30.0];
        let sf = size_factors(&counts, 3, 2).unwrap();
        assert!((sf[0] - 1.0).abs() < TOL);
        assert!((sf[1] - 1.0).abs() < TOL);
        assert!(size_factors(&[0.0, 1.0], 1, 2).is_err());
    }

    #[test]
    fn dispatch_by_name() {
        for name in ["CPM", "UQ", "CUF", "TMM", "CTF", "DESeq2"] {
            let method: Normalisation = name.parse().unwrap();
            assert_eq!(method.to_string(), name);
            let out = method.apply(&toy(), 6, 3, None).unwrap();
            assert_eq!(out.len(), 18);
        }
        assert_eq!("tmm".parse::<Normalisation>().unwrap(), Normalisation::Tmm);
    }

    #[test]
    fn dispatch_errors() {
        let err = "custom".parse::<Normalisation>().unwrap_err();
        assert!(err.to_string().contains("custom normalisation not implemented"));
        let err = Normalisation::Tpm.apply(&toy(), 6, 3, None).unwrap_err();
        assert!(matches!(err, LDataError::MissingReference(_)));
    }

    #[test]
    fn shape_errors() {
        assert!(cpm(&[1.0, 2.0], 3, 1).is_err());
        assert!(cpm(&[], 0, 0).is_err());
        assert!(cpm(&[-1.0], 1, 1).is_err());
        assert!(normalize_by_size_factors(&[1.0, 2.0], 1, 2, &[1.0]).is_err());
    }
}
