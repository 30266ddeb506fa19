//! Mislabel detection by comparing hierarchical clusters with prior labels.
//!
//! The pipeline runs five pure stages:
//!
//! 1. [`distance::pairwise`]: feature matrix -> [`DistanceMatrix`]
//! 2. [`linkage::ward`]: distances -> Ward.D2 [`MergeTree`]
//! 3. [`cut::cut_tree`]: tree + k -> flat cluster IDs `1..=k`
//! 4. [`LabelAligner::align`]: cluster IDs + prior labels -> optimal renaming
//! 5. [`MisclassificationReport::build`]: per-sample agreement and mismatch list
//!
//! [`Analysis`] chains them behind one call.
//!
//! # Usage
//!
//! ```
//! use misclass_cluster::{Analysis, AnalysisInput, Dataset, FeatureMatrix};
//!
//! let features = FeatureMatrix::from_rows(vec![
//!     vec![0.0, 0.0], vec![0.1, 0.2], vec![0.2, 0.1],
//!     vec![8.0, 8.0], vec![8.1, 8.2], vec![8.2, 8.1],
//! ]).unwrap();
//! let labels = ["A", "A", "A", "B", "B", "A"].map(String::from).to_vec();
//!
//! let result = Analysis::default()
//!     .run(AnalysisInput::Raw(Dataset::new(features).with_labels(labels)))
//!     .unwrap();
//!
//! assert_eq!(result.report.mismatched, 1);
//! assert_eq!(result.report.mismatches[0].id, "6");
//! ```
//!
//! # Determinism
//!
//! Every stage is a deterministic function of its input. Linkage ties are
//! broken by cluster creation order, tree cuts number clusters by first
//! occurrence, and the aligner's tie-break is fixed, so identical input
//! yields identical trees, assignments and mappings.

pub mod align;
pub mod cut;
pub mod distance;
mod error;
pub mod linkage;
mod matrix;
pub mod pipeline;
pub mod report;

pub use align::{align, Aligned, AlignerConfig, Alignment, ContingencyTable, LabelAligner, Solver};
pub use cut::{cut_height, cut_tree};
pub use distance::{pairwise, DistanceMatrix, Metric};
pub use error::{MisclassError, Result};
pub use linkage::{build, ward, Linkage, Merge, MergeTree, Node};
pub use matrix::FeatureMatrix;
pub use pipeline::{
    Analysis, AnalysisInput, AnalysisOptions, AnalysisResult, Dataset, ProjectionResult, Projector,
};
pub use report::{adjusted_rand_index, MisclassificationReport, Mismatch};
