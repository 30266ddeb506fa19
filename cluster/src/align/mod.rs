//! Optimal renaming of cluster IDs onto prior class labels.
//!
//! Cluster IDs carry no meaning of their own, so agreement with the prior
//! labels is measured under the renaming that matches the most
//! observations. That renaming is a maximum-weight bipartite assignment on
//! the cluster × label contingency table.

mod hungarian;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use tracing::{debug, warn};

use crate::error::{MisclassError, Result};

pub use hungarian::BRUTE_FORCE_LIMIT;

/// Assignment algorithm used by the aligner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Solver {
    /// Kuhn–Munkres, O(s³) for an s × s table.
    #[default]
    Hungarian,
    /// Enumerates every permutation. Refused above [`BRUTE_FORCE_LIMIT`].
    BruteForce,
}

impl fmt::Display for Solver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Solver::Hungarian => f.write_str("hungarian"),
            Solver::BruteForce => f.write_str("brute-force"),
        }
    }
}

impl FromStr for Solver {
    type Err = MisclassError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hungarian" | "munkres" => Ok(Solver::Hungarian),
            "brute-force" | "brute_force" | "bruteforce" => Ok(Solver::BruteForce),
            other => Err(MisclassError::InvalidInput(format!(
                "unknown assignment solver {other:?}"
            ))),
        }
    }
}

/// Controls aligner behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlignerConfig {
    /// Clusters beyond this count are merged smallest-first before
    /// alignment. Default: 12.
    pub reduce_to: usize,

    /// Maximum number of distinct prior labels. Default: 9.
    pub max_labels: usize,

    pub solver: Solver,
}

impl Default for AlignerConfig {
    fn default() -> Self {
        Self {
            reduce_to: 12,
            max_labels: 9,
            solver: Solver::Hungarian,
        }
    }
}

/// A cluster's value in label space.
///
/// Serializes as the bare label, or as the string `"extra:<code>"` for a
/// sentinel so it cannot be mistaken for a numeric label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Aligned<L> {
    /// Matched to a real prior label.
    Label(L),
    /// Matched to a padding column. The code continues the label codes
    /// (label count, label count + 1, ...) so it never equals a real label.
    Extra(usize),
}

impl<L> Aligned<L> {
    pub fn label(&self) -> Option<&L> {
        match self {
            Aligned::Label(l) => Some(l),
            Aligned::Extra(_) => None,
        }
    }

    pub fn is_extra(&self) -> bool {
        matches!(self, Aligned::Extra(_))
    }
}

impl<L: fmt::Display> fmt::Display for Aligned<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Aligned::Label(l) => l.fmt(f),
            Aligned::Extra(code) => write!(f, "extra:{code}"),
        }
    }
}

impl<L: Serialize> Serialize for Aligned<L> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Aligned::Label(l) => l.serialize(serializer),
            Aligned::Extra(code) => serializer.collect_str(&format_args!("extra:{code}")),
        }
    }
}

/// Co-occurrence counts of cluster IDs (rows) and prior labels (columns).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContingencyTable<L> {
    clusters: Vec<usize>,
    labels: Vec<L>,
    counts: Vec<Vec<usize>>,
}

impl<L: Clone + Ord> ContingencyTable<L> {
    /// Cross-tabulates `clusters` against `truth`. Rows follow ascending
    /// cluster ID, columns ascending label order.
    pub fn new(clusters: &[usize], truth: &[L]) -> Result<Self> {
        if clusters.len() != truth.len() {
            return Err(MisclassError::DimensionMismatch {
                what: "label vector",
                expected: clusters.len(),
                got: truth.len(),
            });
        }
        let row_of = dense_codes(clusters.iter().copied());
        let col_of = dense_codes(truth.iter().cloned());

        let mut counts = vec![vec![0usize; col_of.len()]; row_of.len()];
        for (c, l) in clusters.iter().zip(truth) {
            counts[row_of[c]][col_of[l]] += 1;
        }
        Ok(Self {
            clusters: row_of.into_keys().collect(),
            labels: col_of.into_keys().collect(),
            counts,
        })
    }
}

impl<L> ContingencyTable<L> {
    /// Distinct cluster IDs in row order.
    pub fn clusters(&self) -> &[usize] {
        &self.clusters
    }

    /// Distinct labels in column order.
    pub fn labels(&self) -> &[L] {
        &self.labels
    }

    pub fn count(&self, row: usize, col: usize) -> usize {
        self.counts[row][col]
    }

    pub fn rows(&self) -> &[Vec<usize>] {
        &self.counts
    }

    /// Number of observations tabulated.
    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }
}

/// Maps each value to its rank among the distinct values.
fn dense_codes<T: Ord>(values: impl Iterator<Item = T>) -> BTreeMap<T, usize> {
    let mut codes: BTreeMap<T, usize> = values.map(|v| (v, 0)).collect();
    for (i, code) in codes.values_mut().enumerate() {
        *code = i;
    }
    codes
}

/// Where one cluster ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterMapping<L> {
    pub cluster: usize,
    pub value: Aligned<L>,
    /// Observations of this cluster whose prior label equals `value`.
    pub matched: usize,
    pub size: usize,
}

/// Outcome of aligning a flat clustering to prior labels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alignment<L> {
    /// The clustering that was aligned; differs from the input only when
    /// the cluster count was reduced.
    pub clusters: Vec<usize>,
    pub reduced: bool,
    pub contingency: ContingencyTable<L>,
    /// One entry per cluster, ascending cluster ID.
    pub mapping: Vec<ClusterMapping<L>>,
    /// Per-observation aligned value.
    pub aligned: Vec<Aligned<L>>,
    /// Observations whose aligned value equals their prior label.
    pub matched: usize,
}

impl<L> Alignment<L> {
    /// Share of observations in agreement, in `[0, 1]`.
    pub fn accuracy(&self) -> f64 {
        if self.aligned.is_empty() {
            return 0.0;
        }
        self.matched as f64 / self.aligned.len() as f64
    }

    /// Aligned value of a cluster ID.
    pub fn value_of(&self, cluster: usize) -> Option<&Aligned<L>> {
        self.mapping
            .iter()
            .find(|m| m.cluster == cluster)
            .map(|m| &m.value)
    }
}

/// Finds the cluster renaming that agrees best with the prior labels.
#[derive(Debug, Clone, Default)]
pub struct LabelAligner {
    config: AlignerConfig,
}

impl LabelAligner {
    pub fn new(config: AlignerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AlignerConfig {
        &self.config
    }

    /// Aligns `clusters` (one ID per observation) to `truth`.
    ///
    /// The returned mapping is optimal: no other renaming of cluster IDs
    /// matches more observations. Among equally good renamings, clusters
    /// whose ID is one past a label's column index keep that label, which
    /// makes aligning an already aligned clustering a no-op.
    pub fn align<L: Clone + Ord>(&self, clusters: &[usize], truth: &[L]) -> Result<Alignment<L>> {
        if clusters.is_empty() {
            return Err(MisclassError::InvalidInput("nothing to align".into()));
        }
        if clusters.len() != truth.len() {
            return Err(MisclassError::DimensionMismatch {
                what: "label vector",
                expected: clusters.len(),
                got: truth.len(),
            });
        }
        if self.config.reduce_to == 0 {
            return Err(MisclassError::InvalidInput(
                "cluster reduction ceiling must be at least 1".into(),
            ));
        }

        let distinct = dense_codes(clusters.iter().copied()).len();
        let (clusters, reduced) = if distinct > self.config.reduce_to {
            warn!(
                clusters = distinct,
                ceiling = self.config.reduce_to,
                "merging smallest clusters before alignment"
            );
            (reduce_clusters(clusters, self.config.reduce_to), true)
        } else {
            (clusters.to_vec(), false)
        };

        let table = ContingencyTable::new(&clusters, truth)?;
        let (k, m) = (table.clusters().len(), table.labels().len());
        if m > self.config.max_labels {
            return Err(MisclassError::TooManyCategories {
                found: m,
                max: self.config.max_labels,
            });
        }

        let size = k.max(m);
        if self.config.solver == Solver::BruteForce && size > BRUTE_FORCE_LIMIT {
            return Err(MisclassError::TooManyCategories {
                found: size,
                max: BRUTE_FORCE_LIMIT,
            });
        }

        // Primary weight is the match count; the +1 for a cluster sitting on
        // "its own" column only separates otherwise equal optima.
        let scale = size as i64 + 1;
        let weights: Vec<Vec<i64>> = (0..size)
            .map(|row| {
                (0..size)
                    .map(|col| {
                        if row >= k {
                            return 0;
                        }
                        let count = if col < m { table.count(row, col) } else { 0 };
                        let own = table.clusters()[row].checked_sub(1) == Some(col);
                        count as i64 * scale + i64::from(own)
                    })
                    .collect()
            })
            .collect();

        let assignment = match self.config.solver {
            Solver::Hungarian => hungarian::max_weight(&weights),
            Solver::BruteForce => hungarian::brute_force(&weights),
        };
        debug!(
            clusters = k,
            labels = m,
            solver = %self.config.solver,
            score = hungarian::score(&weights, &assignment),
            "solved label assignment"
        );

        let mut extra = m;
        let mapping: Vec<ClusterMapping<L>> = (0..k)
            .map(|row| {
                let col = assignment[row];
                let value = if col < m {
                    Aligned::Label(table.labels()[col].clone())
                } else {
                    extra += 1;
                    Aligned::Extra(extra - 1)
                };
                ClusterMapping {
                    cluster: table.clusters()[row],
                    value,
                    matched: if col < m { table.count(row, col) } else { 0 },
                    size: table.rows()[row].iter().sum(),
                }
            })
            .collect();

        let value_of: BTreeMap<usize, &Aligned<L>> =
            mapping.iter().map(|m| (m.cluster, &m.value)).collect();
        let aligned: Vec<Aligned<L>> = clusters
            .iter()
            .map(|c| value_of[c].clone())
            .collect();
        let matched = mapping.iter().map(|m| m.matched).sum();

        Ok(Alignment {
            clusters,
            reduced,
            contingency: table,
            mapping,
            aligned,
            matched,
        })
    }
}

/// Aligns with the default configuration.
pub fn align<L: Clone + Ord>(clusters: &[usize], truth: &[L]) -> Result<Alignment<L>> {
    LabelAligner::default().align(clusters, truth)
}

/// Merges the two least populated clusters until at most `ceiling` remain.
///
/// Ties on population go to the lower ID; the merged cluster keeps the
/// lower of the two IDs. The result is renumbered densely from 1 in
/// ascending order of the surviving IDs.
pub fn reduce_clusters(clusters: &[usize], ceiling: usize) -> Vec<usize> {
    let ceiling = ceiling.max(1);
    let mut population: BTreeMap<usize, usize> = BTreeMap::new();
    for &c in clusters {
        *population.entry(c).or_default() += 1;
    }
    // Old ID -> surviving ID.
    let mut target: BTreeMap<usize, usize> = population.keys().map(|&c| (c, c)).collect();

    while population.len() > ceiling {
        let mut by_size: Vec<(usize, usize)> = population.iter().map(|(&c, &n)| (n, c)).collect();
        by_size.sort_unstable();
        let (a, b) = (by_size[0].1, by_size[1].1);
        let (keep, drop) = (a.min(b), a.max(b));

        let moved = population.remove(&drop).unwrap_or(0);
        *population.entry(keep).or_default() += moved;
        for t in target.values_mut() {
            if *t == drop {
                *t = keep;
            }
        }
    }

    let dense = dense_codes(population.keys().copied());
    clusters
        .iter()
        .map(|c| dense[&target[c]] + 1)
        .collect()
}
