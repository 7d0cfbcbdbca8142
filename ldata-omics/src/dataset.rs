//! A container with attached dimension-reduction results.
//!
//! [`Dataset`] wraps an [`LData`] and holds at most one result of each
//! reduction kind. Results are computed from the current samples, so any
//! operation that changes which samples or features the dataset holds
//! returns a dataset with every result slot cleared.

use std::fmt;
use std::str::FromStr;

use ldata_core::{LDataError, Result, Summarizable};
use log::{debug, info};

use crate::datasets::{example_ldata, ExampleKind};
use crate::lda::{LdaData, LdaOptions};
use crate::ldata::{LData, LShaped, Structural};
use crate::matrix::LabeledMatrix;
use crate::pca::{PcaData, PcaOptions};
use crate::table::MetadataTable;
use crate::tsne::{TsneData, TsneOptions};
use crate::umap::{UmapData, UmapOptions};
use crate::{lda, pca, tsne, umap};

/// The dimension reductions a [`Dataset`] can run and hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ReductionKind {
    Pca,
    Lda,
    Tsne,
    Umap,
}

impl ReductionKind {
    pub const ALL: [ReductionKind; 4] = [Self::Pca, Self::Lda, Self::Tsne, Self::Umap];

    /// Default options for this kind. LDA has no default target, so it
    /// needs one spelled out.
    pub fn default_options(self) -> Result<ReductionOptions> {
        match self {
            Self::Pca => Ok(ReductionOptions::Pca(PcaOptions::default())),
            Self::Lda => Err(LDataError::MissingReference(
                "lda dimension reduction needs a target column".into(),
            )),
            Self::Tsne => Ok(ReductionOptions::Tsne(TsneOptions::default())),
            Self::Umap => Ok(ReductionOptions::Umap(UmapOptions::default())),
        }
    }
}

impl FromStr for ReductionKind {
    type Err = LDataError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.to_string().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                LDataError::UnsupportedOption(format!("{s} dimension reduction not implemented"))
            })
    }
}

impl fmt::Display for ReductionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pca => f.write_str("pca"),
            Self::Lda => f.write_str("lda"),
            Self::Tsne => f.write_str("tsne"),
            Self::Umap => f.write_str("umap"),
        }
    }
}

/// A reduction request: the kind plus its options.
#[derive(Debug, Clone, PartialEq)]
pub enum ReductionOptions {
    Pca(PcaOptions),
    Lda(LdaOptions),
    Tsne(TsneOptions),
    Umap(UmapOptions),
}

impl ReductionOptions {
    pub fn kind(&self) -> ReductionKind {
        match self {
            Self::Pca(_) => ReductionKind::Pca,
            Self::Lda(_) => ReductionKind::Lda,
            Self::Tsne(_) => ReductionKind::Tsne,
            Self::Umap(_) => ReductionKind::Umap,
        }
    }
}

impl From<PcaOptions> for ReductionOptions {
    fn from(o: PcaOptions) -> Self {
        Self::Pca(o)
    }
}

impl From<LdaOptions> for ReductionOptions {
    fn from(o: LdaOptions) -> Self {
        Self::Lda(o)
    }
}

impl From<TsneOptions> for ReductionOptions {
    fn from(o: TsneOptions) -> Self {
        Self::Tsne(o)
    }
}

impl From<UmapOptions> for ReductionOptions {
    fn from(o: UmapOptions) -> Self {
        Self::Umap(o)
    }
}

/// An L-shaped dataset with optional PCA, LDA, t-SNE and UMAP results.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    ldata: LData,
    pca: Option<PcaData>,
    lda: Option<LdaData>,
    tsne: Option<TsneData>,
    umap: Option<UmapData>,
}

impl Dataset {
    pub fn new(data: LabeledMatrix, description: MetadataTable, annotation: MetadataTable) -> Result<Self> {
        Ok(Self::from_ldata(LData::new(data, description, annotation)?))
    }

    /// Wrap a base container with no results attached.
    pub fn from_ldata(ldata: LData) -> Self {
        Self {
            ldata,
            pca: None,
            lda: None,
            tsne: None,
            umap: None,
        }
    }

    pub fn example(kind: &ExampleKind) -> Result<Self> {
        example_ldata(kind).map(Self::from_ldata)
    }

    /// Validated setters of the base container.
    pub fn ldata_mut(&mut self) -> &mut LData {
        &mut self.ldata
    }

    pub fn into_ldata(self) -> LData {
        self.ldata
    }

    pub fn pca(&self) -> Option<&PcaData> {
        self.pca.as_ref()
    }

    pub fn lda(&self) -> Option<&LdaData> {
        self.lda.as_ref()
    }

    pub fn tsne(&self) -> Option<&TsneData> {
        self.tsne.as_ref()
    }

    pub fn umap(&self) -> Option<&UmapData> {
        self.umap.as_ref()
    }

    pub fn set_pca(&mut self, value: Option<PcaData>) -> Result<()> {
        if let Some(v) = &value {
            v.validate()?;
        }
        self.pca = value;
        Ok(())
    }

    pub fn set_lda(&mut self, value: Option<LdaData>) -> Result<()> {
        if let Some(v) = &value {
            v.validate()?;
        }
        self.lda = value;
        Ok(())
    }

    pub fn set_tsne(&mut self, value: Option<TsneData>) -> Result<()> {
        if let Some(v) = &value {
            v.validate()?;
        }
        self.tsne = value;
        Ok(())
    }

    pub fn set_umap(&mut self, value: Option<UmapData>) -> Result<()> {
        if let Some(v) = &value {
            v.validate()?;
        }
        self.umap = value;
        Ok(())
    }

    /// Kinds that currently have a result attached.
    pub fn attached(&self) -> Vec<ReductionKind> {
        let slots = [
            self.pca.is_some(),
            self.lda.is_some(),
            self.tsne.is_some(),
            self.umap.is_some(),
        ];
        ReductionKind::ALL
            .into_iter()
            .zip(slots)
            .filter_map(|(k, set)| set.then_some(k))
            .collect()
    }

    /// Run a reduction on the current samples and attach its result,
    /// replacing any earlier result of the same kind.
    pub fn perform_dimension_reduction(&mut self, options: impl Into<ReductionOptions>) -> Result<()> {
        self.ldata.validate()?;
        let options = options.into();
        info!("performing {} dimension reduction", options.kind());
        match &options {
            ReductionOptions::Pca(o) => self.pca = Some(pca::analyse(&*self, o)?),
            ReductionOptions::Lda(o) => self.lda = Some(lda::analyse(&*self, o)?),
            ReductionOptions::Tsne(o) => self.tsne = Some(tsne::analyse(&*self, o)?),
            ReductionOptions::Umap(o) => self.umap = Some(umap::analyse(&*self, o)?),
        }
        Ok(())
    }

    /// Wrap the result of a structural operation. Attached results are not
    /// carried over.
    pub(crate) fn derived(&self, ldata: LData, op: &str) -> Self {
        let dropped = self.attached();
        if !dropped.is_empty() {
            debug!("{op}: dropping attached results {dropped:?}");
        }
        Self::from_ldata(ldata)
    }
}

impl LShaped for Dataset {
    fn ldata(&self) -> &LData {
        &self.ldata
    }
}

impl Structural for Dataset {
    fn subset(&self, samples: Option<&[&str]>, features: Option<&[&str]>) -> Result<Self> {
        let out = self.ldata.subset(samples, features)?;
        Ok(self.derived(out, "subset"))
    }

    fn transpose(&self) -> Result<Self> {
        let out = self.ldata.transpose()?;
        Ok(self.derived(out, "transpose"))
    }

    fn concat(&self, others: &[&Self]) -> Result<Self> {
        let others: Vec<&LData> = others.iter().map(|o| &o.ldata).collect();
        let out = self.ldata.concat(&others)?;
        Ok(self.derived(out, "concat"))
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.ldata, f)
    }
}

impl Summarizable for Dataset {
    fn summary(&self) -> String {
        self.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasets::SimulateConfig;
    use crate::ldata::tests::fixture;
    use crate::pca::PcaMethod;
    use crate::table::ColumnData;

    fn small_tsne() -> TsneOptions {
        TsneOptions {
            perplexity: 2.0,
            n_iter: 250,
            ..Default::default()
        }
    }

    fn small_umap() -> UmapOptions {
        UmapOptions {
            n_neighbors: 3,
            n_epochs: 20,
            ..Default::default()
        }
    }

    fn grouped() -> Dataset {
        let mut ldata = fixture();
        let desc = ldata
            .description()
            .clone()
            .with_column(
                "Group",
                ColumnData::categorical(["a", "a", "b", "b", "c"]),
            )
            .unwrap();
        ldata.set_description(desc).unwrap();
        Dataset::from_ldata(ldata)
    }

    fn fully_attached() -> Dataset {
        let mut x = grouped();
        x.perform_dimension_reduction(PcaOptions::default()).unwrap();
        x.perform_dimension_reduction(LdaOptions::new("Group")).unwrap();
        x.perform_dimension_reduction(small_tsne()).unwrap();
        x.perform_dimension_reduction(small_umap()).unwrap();
        x
    }

    #[test]
    fn kind_parsing() {
        assert_eq!("PCA".parse::<ReductionKind>().unwrap(), ReductionKind::Pca);
        assert_eq!("umap".parse::<ReductionKind>().unwrap(), ReductionKind::Umap);
        let err = "bogus".parse::<ReductionKind>().unwrap_err();
        assert!(matches!(err, LDataError::UnsupportedOption(_)));
        assert!(err.to_string().contains("bogus dimension reduction not implemented"));
    }

    #[test]
    fn default_options_by_kind() {
        let o = ReductionKind::Tsne.default_options().unwrap();
        assert_eq!(o.kind(), ReductionKind::Tsne);
        assert!(ReductionKind::Lda.default_options().is_err());
    }

    #[test]
    fn perform_attaches_each_kind() {
        let x = fully_attached();
        assert_eq!(x.attached(), ReductionKind::ALL.to_vec());
        assert_eq!(x.pca().unwrap().row_names(), ["PC1", "PC2"]);
        assert_eq!(x.lda().unwrap().target(), Some("Group"));
        assert_eq!(x.tsne().unwrap().col_names(), x.col_names());
        assert_eq!(x.umap().unwrap().shape(), (2, 5));
    }

    #[test]
    fn failed_reduction_keeps_previous_result() {
        let mut x = grouped();
        x.perform_dimension_reduction(PcaOptions::default()).unwrap();
        let before = x.pca().cloned();
        let bad = PcaOptions {
            n_components: 50,
            method: PcaMethod::Svd,
            ..Default::default()
        };
        assert!(x.perform_dimension_reduction(bad).is_err());
        assert_eq!(x.pca().cloned(), before);

        let err = x.perform_dimension_reduction(LdaOptions::new("group")).unwrap_err();
        assert!(err.to_string().contains("group is not in description"));
        assert!(x.lda().is_none());
    }

    #[test]
    fn structural_ops_invalidate_results() {
        let x = fully_attached();

        let s = x.subset(Some(&["Sample1", "Sample3"]), None).unwrap();
        assert!(s.attached().is_empty());
        assert_eq!(s.col_names(), ["Sample1", "Sample3"]);

        let t = x.transpose().unwrap();
        assert!(t.attached().is_empty());
        assert_eq!(t.shape(), (5, 20));

        let mut other = grouped();
        let renamed: Vec<String> = (1..=5).map(|i| format!("Extra{i}")).collect();
        other.ldata_mut().set_col_names(renamed).unwrap();
        let c = x.concat(&[&other]).unwrap();
        assert!(c.attached().is_empty());
        assert_eq!(c.shape(), (20, 10));
        assert_eq!(c.description().labels("Group").unwrap()[9], "c");

        // The source keeps its results.
        assert_eq!(x.attached().len(), 4);
    }

    #[test]
    fn setters_accept_none_and_valid_results() {
        let source = fully_attached();
        let mut x = grouped();
        x.set_pca(source.pca().cloned()).unwrap();
        x.set_umap(source.umap().cloned()).unwrap();
        assert_eq!(x.attached(), vec![ReductionKind::Pca, ReductionKind::Umap]);
        x.set_pca(None).unwrap();
        assert_eq!(x.attached(), vec![ReductionKind::Umap]);
    }

    #[test]
    fn example_datasets() {
        let x = Dataset::example(&ExampleKind::Simulate(SimulateConfig::default())).unwrap();
        assert_eq!(x.shape(), (20, 5));
        assert!(x.attached().is_empty());
        assert_eq!(
            x.summary(),
            "ldata object:\n - Dimensions: 5 (samples) x 20 (features)"
        );
    }
}
