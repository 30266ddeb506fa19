//! Single entry point chaining every stage: distances, merge tree, cut,
//! alignment and report.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, warn};

use crate::align::{AlignerConfig, Alignment, ContingencyTable, LabelAligner};
use crate::cut::cut_tree;
use crate::distance::{pairwise, DistanceMatrix, Metric};
use crate::error::{MisclassError, Result};
use crate::linkage::{build, Linkage, MergeTree};
use crate::matrix::FeatureMatrix;
use crate::report::MisclassificationReport;

/// Label given to every observation when no prior labels are supplied.
pub const DEFAULT_LABEL: &str = "1";

/// Raw observations with optional prior labels and sample identifiers,
/// all in row order.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub features: FeatureMatrix,
    pub labels: Option<Vec<String>>,
    pub ids: Option<Vec<String>>,
}

impl Dataset {
    pub fn new(features: FeatureMatrix) -> Self {
        Self {
            features,
            labels: None,
            ids: None,
        }
    }

    pub fn with_labels(mut self, labels: Vec<String>) -> Self {
        self.labels = Some(labels);
        self
    }

    pub fn with_ids(mut self, ids: Vec<String>) -> Self {
        self.ids = Some(ids);
        self
    }
}

/// Low-dimensional coordinates produced by a [`Projector`].
///
/// Projectors may drop duplicate rows; `labels` and `ids` must then be
/// filtered the same way so that row i of every field describes the same
/// sample.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionResult {
    pub coords: FeatureMatrix,
    pub labels: Option<Vec<String>>,
    pub ids: Option<Vec<String>>,
}

/// Dimensionality reduction collaborator (UMAP, PCA, ...), supplied by the
/// caller. Must return at least two columns.
pub trait Projector {
    fn project(&self, dataset: &Dataset) -> Result<ProjectionResult>;
}

/// What the analysis clusters: raw features or an earlier projection.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisInput {
    Raw(Dataset),
    Projected(ProjectionResult),
}

impl AnalysisInput {
    /// Runs `projector` over `dataset` and wraps its output.
    ///
    /// Labels and identifiers supplied with the dataset must survive the
    /// projection; a projector that drops them is rejected.
    pub fn project(dataset: &Dataset, projector: &dyn Projector) -> Result<Self> {
        let projection = projector.project(dataset)?;
        if dataset.labels.is_some() && projection.labels.is_none() {
            return Err(MisclassError::InvalidInput(
                "projector dropped the prior labels".into(),
            ));
        }
        if dataset.ids.is_some() && projection.ids.is_none() {
            return Err(MisclassError::InvalidInput(
                "projector dropped the sample identifiers".into(),
            ));
        }
        Ok(AnalysisInput::Projected(projection))
    }

    /// Boundary checks shared by every consumer of the input: a projection
    /// has at least two columns, labels and identifiers match the row count.
    pub fn check(&self) -> Result<()> {
        let (coords, labels, ids) = match self {
            AnalysisInput::Raw(d) => (&d.features, &d.labels, &d.ids),
            AnalysisInput::Projected(p) => {
                if p.coords.cols() < 2 {
                    return Err(MisclassError::InvalidInput(format!(
                        "projection returned {} column(s), need at least 2",
                        p.coords.cols()
                    )));
                }
                (&p.coords, &p.labels, &p.ids)
            }
        };
        let n = coords.rows();
        if let Some(l) = labels.as_ref().filter(|l| l.len() != n) {
            return Err(MisclassError::DimensionMismatch {
                what: "label vector",
                expected: n,
                got: l.len(),
            });
        }
        if let Some(i) = ids.as_ref().filter(|i| i.len() != n) {
            return Err(MisclassError::DimensionMismatch {
                what: "identifier vector",
                expected: n,
                got: i.len(),
            });
        }
        Ok(())
    }

    /// The matrix that will be clustered.
    pub fn matrix(&self) -> &FeatureMatrix {
        match self {
            AnalysisInput::Raw(d) => &d.features,
            AnalysisInput::Projected(p) => &p.coords,
        }
    }
}

/// Knobs for [`Analysis`].
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOptions {
    pub metric: Metric,
    pub linkage: Linkage,
    /// Explicit cluster count. When `None` it is the number of distinct
    /// labels, capped at `max_clusters` and raised to at least 2.
    pub n_clusters: Option<usize>,
    /// Cap for the derived cluster count. Default: 12.
    pub max_clusters: usize,
    pub aligner: AlignerConfig,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            metric: Metric::Euclidean,
            linkage: Linkage::WardD2,
            n_clusters: None,
            max_clusters: 12,
            aligner: AlignerConfig::default(),
        }
    }
}

/// Everything computed by one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub n_clusters: usize,
    pub ids: Vec<String>,
    pub labels: Vec<String>,
    /// The matrix that was clustered (raw features or projection).
    pub coords: FeatureMatrix,
    pub distances: DistanceMatrix,
    pub tree: MergeTree,
    /// Flat assignment before alignment, IDs 1..=n_clusters.
    pub clusters: Vec<usize>,
    pub alignment: Alignment<String>,
    pub report: MisclassificationReport<String>,
}

impl AnalysisResult {
    pub fn contingency(&self) -> &ContingencyTable<String> {
        &self.alignment.contingency
    }
}

/// The clustering-and-alignment pipeline.
#[derive(Debug, Clone, Default)]
pub struct Analysis {
    options: AnalysisOptions,
}

/// Input after the boundary checks: one matrix, labels and ids of equal
/// length.
struct Resolved {
    coords: FeatureMatrix,
    labels: Vec<String>,
    ids: Vec<String>,
}

impl Analysis {
    pub fn new(options: AnalysisOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &AnalysisOptions {
        &self.options
    }

    /// Projects `dataset` with `projector`, then runs the analysis.
    pub fn run_projected(
        &self,
        dataset: &Dataset,
        projector: &dyn Projector,
    ) -> Result<AnalysisResult> {
        self.run(AnalysisInput::project(dataset, projector)?)
    }

    /// Runs every stage. Fails at the first stage that rejects its input.
    pub fn run(&self, input: AnalysisInput) -> Result<AnalysisResult> {
        let Resolved {
            coords,
            labels,
            ids,
        } = resolve(input)?;
        let n = coords.rows();

        let k = self.cluster_count(&labels, n)?;
        let distances = pairwise(&coords, self.options.metric)?;
        let tree = build(&distances, self.options.linkage)?;
        let clusters = cut_tree(&tree, k)?;
        debug!(n, k, "cut merge tree");

        let alignment = LabelAligner::new(self.options.aligner.clone()).align(&clusters, &labels)?;
        let report = MisclassificationReport::build(&ids, &labels, &alignment.aligned)?;
        debug!(
            mismatched = report.mismatched,
            rate_percent = report.rate_percent,
            "analysis complete"
        );

        Ok(AnalysisResult {
            n_clusters: k,
            ids,
            labels,
            coords,
            distances,
            tree,
            clusters,
            alignment,
            report,
        })
    }

    fn cluster_count(&self, labels: &[String], n: usize) -> Result<usize> {
        match self.options.n_clusters {
            Some(k) if k < 1 || k > n => Err(MisclassError::InvalidClusterCount { k, n }),
            Some(k) => Ok(k),
            None => {
                let distinct = labels.iter().collect::<BTreeSet<_>>().len();
                Ok(distinct.min(self.options.max_clusters).max(2).min(n))
            }
        }
    }
}

fn resolve(input: AnalysisInput) -> Result<Resolved> {
    input.check()?;
    let (coords, labels, ids) = match input {
        AnalysisInput::Raw(d) => (d.features, d.labels, d.ids),
        AnalysisInput::Projected(p) => (p.coords, p.labels, p.ids),
    };
    let n = coords.rows();

    let labels = labels.unwrap_or_else(|| {
        warn!("no prior labels supplied, every observation gets label {DEFAULT_LABEL:?}");
        vec![DEFAULT_LABEL.to_string(); n]
    });
    let ids = ids.unwrap_or_else(|| (1..=n).map(|i| i.to_string()).collect());

    Ok(Resolved {
        coords,
        labels,
        ids,
    })
}
