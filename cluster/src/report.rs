//! Per-sample agreement between aligned clusters and prior labels.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::align::Aligned;
use crate::error::{MisclassError, Result};

/// One observation whose aligned cluster disagrees with its prior label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mismatch<L> {
    pub index: usize,
    pub id: String,
    pub expected: L,
    pub assigned: Aligned<L>,
}

/// Summary of how well the clustering reproduces the prior labels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MisclassificationReport<L> {
    pub n: usize,
    /// `agrees[i]` is true when observation i kept its prior label.
    pub agrees: Vec<bool>,
    pub mismatched: usize,
    /// mismatched / n.
    pub rate: f64,
    /// `rate` as a percentage rounded to one decimal.
    pub rate_percent: f64,
    pub mismatches: Vec<Mismatch<L>>,
    /// Chance-corrected partition agreement; independent of the alignment.
    pub adjusted_rand_index: f64,
}

impl<L: Clone + Ord> MisclassificationReport<L> {
    /// Compares `aligned` with `truth` observation by observation.
    ///
    /// `ids` names each observation in the mismatch list.
    pub fn build(ids: &[String], truth: &[L], aligned: &[Aligned<L>]) -> Result<Self> {
        let n = truth.len();
        if aligned.len() != n {
            return Err(MisclassError::DimensionMismatch {
                what: "aligned assignment",
                expected: n,
                got: aligned.len(),
            });
        }
        if ids.len() != n {
            return Err(MisclassError::DimensionMismatch {
                what: "identifier vector",
                expected: n,
                got: ids.len(),
            });
        }

        let agrees: Vec<bool> = aligned
            .iter()
            .zip(truth)
            .map(|(a, t)| a.label() == Some(t))
            .collect();
        let mismatches: Vec<Mismatch<L>> = agrees
            .iter()
            .enumerate()
            .filter(|(_, ok)| !**ok)
            .map(|(i, _)| Mismatch {
                index: i,
                id: ids[i].clone(),
                expected: truth[i].clone(),
                assigned: aligned[i].clone(),
            })
            .collect();

        let mismatched = mismatches.len();
        let rate = if n == 0 {
            0.0
        } else {
            mismatched as f64 / n as f64
        };

        Ok(Self {
            n,
            agrees,
            mismatched,
            rate,
            rate_percent: (rate * 1000.0).round() / 10.0,
            mismatches,
            adjusted_rand_index: adjusted_rand_index(aligned, truth),
        })
    }
}

fn comb2(value: usize) -> f64 {
    let v = value as f64;
    v * (v - 1.0) / 2.0
}

/// Adjusted Rand index between two partitions of the same observations.
///
/// 1.0 for identical partitions (up to renaming), around 0.0 for chance
/// agreement. Panics if the slices differ in length.
pub fn adjusted_rand_index<A: Ord, B: Ord>(left: &[A], right: &[B]) -> f64 {
    assert_eq!(left.len(), right.len());
    let n = left.len();
    if n < 2 {
        return 1.0;
    }

    let mut left_counts: BTreeMap<&A, usize> = BTreeMap::new();
    let mut right_counts: BTreeMap<&B, usize> = BTreeMap::new();
    let mut joint: BTreeMap<(&A, &B), usize> = BTreeMap::new();
    for (l, r) in left.iter().zip(right) {
        *left_counts.entry(l).or_default() += 1;
        *right_counts.entry(r).or_default() += 1;
        *joint.entry((l, r)).or_default() += 1;
    }

    let sum_ij: f64 = joint.values().copied().map(comb2).sum();
    let sum_i: f64 = left_counts.values().copied().map(comb2).sum();
    let sum_j: f64 = right_counts.values().copied().map(comb2).sum();
    let total = comb2(n);

    let expected = sum_i * sum_j / total;
    let max_index = 0.5 * (sum_i + sum_j);
    let denom = max_index - expected;
    if denom == 0.0 {
        // Both partitions trivial in the same way.
        if sum_ij == max_index { 1.0 } else { 0.0 }
    } else {
        (sum_ij - expected) / denom
    }
}
