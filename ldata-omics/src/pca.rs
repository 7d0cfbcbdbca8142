//! Principal component analysis results.

use std::fmt;
use std::str::FromStr;

use ldata_core::{LDataError, Result};
use ldata_ml::{kernel_pca, pca, Kernel, KernelPcaConfig, PcaConfig, Scaling};
use log::info;

use crate::drdata::{has_component_format, or_none, scale, DrData, ReductionPolicy};
use crate::ldata::LShaped;
use crate::matrix::numbered;
use crate::table::{ColumnData, MetadataTable};

/// Annotation column holding the variance captured by each component.
pub const VARIANCE_EXPLAINED: &str = "Percentage variance explained";

/// How the principal components are computed.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PcaMethod {
    /// Linear PCA.
    #[default]
    Svd,
    /// Kernel PCA with the given kernel.
    Kernel(Kernel),
}

impl FromStr for PcaMethod {
    type Err = LDataError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "svd" => Ok(Self::Svd),
            "kernel" => Ok(Self::Kernel(Kernel::default())),
            _ => Err(LDataError::UnsupportedOption(format!(
                "{s} method not implemented"
            ))),
        }
    }
}

impl fmt::Display for PcaMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Svd => f.write_str("SVD"),
            Self::Kernel(_) => f.write_str("Kernel"),
        }
    }
}

/// PCA result policy: rows `PC1, PC2, ...` and a variance column in the
/// annotation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Pca {
    pub method: Option<PcaMethod>,
}

impl ReductionPolicy for Pca {
    const PREFIX: &'static str = "PC";
    const TYPE_NAME: &'static str = "pca";
    const COMPONENT_LABEL: &'static str = "principal components";

    fn validate_annotation(&self, annotation: &MetadataTable) -> Result<()> {
        if !annotation.ids().iter().all(|id| has_component_format(id, Self::PREFIX)) {
            return Err(LDataError::Format(
                "ID column must be in format PC1, PC2, etc".into(),
            ));
        }
        match annotation.column(VARIANCE_EXPLAINED) {
            None => Err(LDataError::Format(format!(
                "annotation must contain '{VARIANCE_EXPLAINED}' column"
            ))),
            Some(ColumnData::Numeric(_)) => Ok(()),
            Some(_) => Err(LDataError::Format(format!(
                "'{VARIANCE_EXPLAINED}' column must be numeric"
            ))),
        }
    }

    fn fmt_details(&self, scaling: Option<Scaling>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "\n - Scaling: {}\n - Method: {}",
            or_none(scaling.as_ref()),
            or_none(self.method.as_ref())
        )
    }
}

/// Principal components × samples.
pub type PcaData = DrData<Pca>;

impl PcaData {
    pub fn method(&self) -> Option<PcaMethod> {
        self.policy().method
    }

    /// Percentage of variance captured by each component.
    pub fn variance_explained(&self) -> &[f64] {
        self.annotation()
            .column(VARIANCE_EXPLAINED)
            .and_then(ColumnData::as_numeric)
            .unwrap_or_default()
    }
}

/// Options for [`analyse`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PcaOptions {
    pub n_components: usize,
    pub scaling: Scaling,
    pub method: PcaMethod,
}

impl Default for PcaOptions {
    fn default() -> Self {
        Self {
            n_components: 2,
            scaling: Scaling::ZScore,
            method: PcaMethod::Svd,
        }
    }
}

/// Run PCA on the samples of `dataset`.
///
/// Kernel PCA drops components with a non-positive eigenvalue, so the
/// result may hold fewer than `n_components` rows.
pub fn analyse<D: LShaped + ?Sized>(dataset: &D, options: &PcaOptions) -> Result<PcaData> {
    info!(
        "PCA: {} components, scaling {}, method {}",
        options.n_components, options.scaling, options.method
    );
    let samples = scale(dataset, options.scaling)?;
    let flat = samples.to_row_major();
    let n_features = samples.n_cols();

    let (embedding, n_components, ratios) = match options.method {
        PcaMethod::Svd => {
            let config = PcaConfig {
                n_components: options.n_components,
            };
            let fit = pca(&flat, n_features, &config)?;
            (fit.transformed, fit.n_components, fit.explained_variance_ratio)
        }
        PcaMethod::Kernel(kernel) => {
            let config = KernelPcaConfig { kernel };
            let fit = kernel_pca(&flat, n_features, options.n_components, &config)?;
            (fit.transformed, fit.n_components, fit.explained_variance_ratio)
        }
    };

    let percentages = ratios.iter().map(|r| r * 100.0).collect();
    let annotation = MetadataTable::new(numbered(Pca::PREFIX, n_components))
        .with_column(VARIANCE_EXPLAINED, ColumnData::Numeric(percentages))?;
    DrData::from_embedding(
        dataset,
        embedding,
        n_components,
        annotation,
        options.scaling,
        Pca {
            method: Some(options.method),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ldata::tests::fixture;
    use crate::ldata::Structural;
    use crate::matrix::LabeledMatrix;

    fn pcs() -> PcaData {
        let values: Vec<f64> = (0..25).map(|i| ((i * 13) % 7) as f64 - 3.0).collect();
        let data = LabeledMatrix::from_flat(values, numbered("PC", 5), numbered("Sample", 5)).unwrap();
        let annot = MetadataTable::new(numbered("PC", 5))
            .with_column(
                VARIANCE_EXPLAINED,
                ColumnData::Numeric(vec![52.5, 32.5, 8.1, 5.2, 1.7]),
            )
            .unwrap();
        PcaData::new(data, MetadataTable::new(numbered("Sample", 5)), annot, None, Pca::default()).unwrap()
    }

    #[test]
    fn construction_requires_variance_column() {
        let x = pcs();
        let (data, desc, _) = x.ldata().clone().into_parts();
        let err = PcaData::new(data, desc, MetadataTable::new(numbered("PC", 5)), None, Pca::default())
            .unwrap_err();
        assert!(err
            .to_string()
            .contains("annotation must contain 'Percentage variance explained' column"));
    }

    #[test]
    fn rejects_non_pc_rows() {
        let data = LabeledMatrix::from_flat(vec![0.0; 10], vec!["a".into(), "b".into()], numbered("Sample", 5)).unwrap();
        let annot = MetadataTable::new(["a", "b"])
            .with_column(VARIANCE_EXPLAINED, ColumnData::Numeric(vec![60.0, 40.0]))
            .unwrap();
        let err = PcaData::new(data, MetadataTable::new(numbered("Sample", 5)), annot, None, Pca::default())
            .unwrap_err();
        assert!(matches!(err, LDataError::Format(_)));
        assert!(err.to_string().contains("rownames must be in format PC1, PC2, etc"));
    }

    #[test]
    fn annotation_setter_checks() {
        let mut x = pcs();
        let good = x.annotation().clone();

        let mut renamed = good.clone();
        renamed.set_ids(["a", "b", "c", "d", "e"].iter().map(|s| s.to_string()).collect());
        let err = x.set_annotation(renamed).unwrap_err();
        assert!(err.to_string().contains("ID column must be in format PC1, PC2, etc"));

        let mut dropped = good.clone();
        dropped.remove_column(VARIANCE_EXPLAINED);
        let err = x.set_annotation(dropped).unwrap_err();
        assert!(err
            .to_string()
            .contains("annotation must contain 'Percentage variance explained' column"));

        let err = x.set_annotation(good.select(&[0, 1])).unwrap_err();
        assert!(err.to_string().contains("data rownames do not match annotation ID"));

        let extended = good
            .with_column("col", ColumnData::categorical(["a", "b", "c", "d", "e"]))
            .unwrap();
        x.set_annotation(extended.clone()).unwrap();
        assert_eq!(x.annotation(), &extended);
    }

    #[test]
    fn dim_names_check_rows_first() {
        let mut x = pcs();
        let cols: Vec<String> = ["A", "B", "C", "D", "E"].iter().map(|s| s.to_string()).collect();
        let err = x.set_dim_names(cols.clone(), x.col_names().to_vec()).unwrap_err();
        assert!(err.to_string().contains("rownames must be in format PC1, PC2, etc"));

        let mut reversed = cols.clone();
        reversed.reverse();
        x.set_dim_names(x.row_names().to_vec(), reversed.clone()).unwrap();
        assert_eq!(x.col_names(), reversed.as_slice());
    }

    #[test]
    fn structural_ops_fail() {
        let x = pcs();
        assert!(x.subset(None, None).unwrap_err().to_string().contains("Cannot subset pca object"));
        assert!(x.transpose().unwrap_err().to_string().contains("Cannot transpose pca object"));
        let err = x.concat(&[&pcs()]).unwrap_err();
        assert!(matches!(err, LDataError::UnsupportedOperation(_)));
        assert!(err.to_string().contains("Cannot concat pca object"));
    }

    #[test]
    fn display_names_components() {
        let mut x = pcs();
        assert_eq!(
            x.to_string(),
            "ldata object:\n - Dimensions: 5 (samples) x 5 (principal components)\n - Scaling: None\n - Method: None"
        );
        x.set_scaling(Some(Scaling::ZScore));
        assert!(x.to_string().ends_with(" - Scaling: zscore\n - Method: None"));
    }

    #[test]
    fn method_parsing() {
        assert_eq!("SVD".parse::<PcaMethod>().unwrap(), PcaMethod::Svd);
        assert_eq!(
            "kernel".parse::<PcaMethod>().unwrap(),
            PcaMethod::Kernel(Kernel::Linear)
        );
        let err = "bogus".parse::<PcaMethod>().unwrap_err();
        assert!(matches!(err, LDataError::UnsupportedOption(_)));
        assert!(err.to_string().contains("bogus"));
    }

    #[test]
    fn analyse_svd() {
        let x = fixture();
        let r = analyse(&x, &PcaOptions::default()).unwrap();
        assert_eq!(r.shape(), (2, 5));
        assert_eq!(r.row_names(), ["PC1", "PC2"]);
        assert_eq!(r.col_names(), x.col_names());
        assert_eq!(r.description(), x.description());
        assert_eq!(r.method(), Some(PcaMethod::Svd));
        assert_eq!(r.scaling(), Some(Scaling::ZScore));

        let pve = r.variance_explained();
        assert_eq!(pve.len(), 2);
        assert!(pve[0] >= pve[1]);
        assert!(pve.iter().all(|&p| (0.0..=100.0).contains(&p)));
        assert!(r.to_string().contains(" - Method: SVD"));
    }

    #[test]
    fn analyse_kernel() {
        let x = fixture();
        let options = PcaOptions {
            method: PcaMethod::Kernel(Kernel::Rbf { gamma: None }),
            ..Default::default()
        };
        let r = analyse(&x, &options).unwrap();
        assert!(r.shape().0 >= 1 && r.shape().0 <= 2);
        let total: f64 = r.variance_explained().iter().sum();
        assert!(total > 0.0 && total <= 100.0 + 1e-9);
        assert!(r.to_string().contains(" - Method: Kernel"));
    }

    #[test]
    fn analyse_rejects_too_many_components() {
        let x = fixture();
        let options = PcaOptions {
            n_components: 6,
            ..Default::default()
        };
        assert!(matches!(
            analyse(&x, &options).unwrap_err(),
            LDataError::InvalidInput(_)
        ));
    }
}
