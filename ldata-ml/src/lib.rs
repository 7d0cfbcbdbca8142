//! Numerical backends for ldata dimension reduction.
//!
//! All entry points take a flat row-major `n_samples × n_features` slice,
//! a `Config` with sensible defaults, and return a `Result` struct.
//!
//! - **PCA** — linear (eigen-decomposition of covariance or Gram matrix) and kernel PCA
//! - **LDA** — supervised discriminant projection
//! - **t-SNE** / **UMAP** — seeded neighbour embeddings
//! - **Scaling** — per-feature z-score applied before any of the above

pub mod distance;
pub mod lda;
pub mod linalg;
pub mod normalize;
pub mod pca;
pub mod tsne;
pub mod umap;

pub use distance::DistanceMetric;
pub use lda::{lda, LdaConfig, LdaResult};
pub use normalize::Scaling;
pub use pca::{kernel_pca, pca, Kernel, KernelPcaConfig, KernelPcaResult, PcaConfig, PcaResult};
pub use tsne::{tsne, TsneConfig, TsneResult};
pub use umap::{umap, UmapConfig, UmapInit, UmapResult};
