//! Agglomerative hierarchical clustering over a distance matrix.
//!
//! All linkages share one loop: find the closest active pair, record the
//! merge, then refresh the distances from the merged cluster to every other
//! active cluster with the Lance–Williams recurrence. Ward.D2 runs the
//! recurrence on squared distances and reports square-rooted heights.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use tracing::debug;

use crate::distance::DistanceMatrix;
use crate::error::{MisclassError, Result};

/// Cluster-to-cluster distance update rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Linkage {
    /// Ward's minimum variance on squared distances (heights on the input scale).
    #[default]
    WardD2,
    /// Ward's update applied to the distances as given.
    WardD,
    /// Nearest neighbour.
    Single,
    /// Furthest neighbour.
    Complete,
    /// UPGMA.
    Average,
    /// WPGMA.
    McQuitty,
    /// UPGMC. Not monotone.
    Centroid,
    /// WPGMC. Not monotone.
    Median,
}

impl Linkage {
    pub fn name(&self) -> &'static str {
        match self {
            Linkage::WardD2 => "ward.D2",
            Linkage::WardD => "ward.D",
            Linkage::Single => "single",
            Linkage::Complete => "complete",
            Linkage::Average => "average",
            Linkage::McQuitty => "mcquitty",
            Linkage::Centroid => "centroid",
            Linkage::Median => "median",
        }
    }

    /// True when the update rule can never produce a merge lower than the
    /// one before it.
    pub fn is_monotone(&self) -> bool {
        !matches!(self, Linkage::Centroid | Linkage::Median)
    }

    /// Distance from cluster k to the union of i and j.
    fn update(&self, d_ki: f64, d_kj: f64, d_ij: f64, n_i: f64, n_j: f64, n_k: f64) -> f64 {
        match self {
            Linkage::WardD2 | Linkage::WardD => {
                ((n_i + n_k) * d_ki + (n_j + n_k) * d_kj - n_k * d_ij) / (n_i + n_j + n_k)
            }
            Linkage::Single => d_ki.min(d_kj),
            Linkage::Complete => d_ki.max(d_kj),
            Linkage::Average => (n_i * d_ki + n_j * d_kj) / (n_i + n_j),
            Linkage::McQuitty => 0.5 * (d_ki + d_kj),
            Linkage::Centroid => {
                let n_ij = n_i + n_j;
                (n_i * d_ki + n_j * d_kj) / n_ij - n_i * n_j * d_ij / (n_ij * n_ij)
            }
            Linkage::Median => 0.5 * d_ki + 0.5 * d_kj - 0.25 * d_ij,
        }
    }
}

impl fmt::Display for Linkage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Linkage {
    type Err = MisclassError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('_', ".").as_str() {
            "ward.d2" | "ward" => Ok(Linkage::WardD2),
            "ward.d" => Ok(Linkage::WardD),
            "single" => Ok(Linkage::Single),
            "complete" => Ok(Linkage::Complete),
            "average" | "upgma" => Ok(Linkage::Average),
            "mcquitty" | "wpgma" => Ok(Linkage::McQuitty),
            "centroid" | "upgmc" => Ok(Linkage::Centroid),
            "median" | "wpgmc" => Ok(Linkage::Median),
            other => Err(MisclassError::InvalidInput(format!(
                "unknown linkage {other:?}"
            ))),
        }
    }
}

/// Child of a merge: an original observation or an earlier merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "index", rename_all = "snake_case")]
pub enum Node {
    Leaf(usize),
    Merge(usize),
}

/// One agglomeration step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Merge {
    /// The older of the two joined clusters.
    pub left: Node,
    pub right: Node,
    pub height: f64,
    /// Observations under this node.
    pub size: usize,
}

/// Binary merge tree (dendrogram) with `n_leaves - 1` merges in the order
/// they happened.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergeTree {
    n_leaves: usize,
    linkage: Linkage,
    merges: Vec<Merge>,
}

impl MergeTree {
    pub fn n_leaves(&self) -> usize {
        self.n_leaves
    }

    pub fn linkage(&self) -> Linkage {
        self.linkage
    }

    pub fn merges(&self) -> &[Merge] {
        &self.merges
    }

    /// Merge heights in merge order.
    pub fn heights(&self) -> Vec<f64> {
        self.merges.iter().map(|m| m.height).collect()
    }

    /// Index of the first merge whose height is lower than its predecessor.
    pub fn first_inversion(&self) -> Option<usize> {
        self.merges
            .windows(2)
            .position(|w| w[1].height < w[0].height)
            .map(|i| i + 1)
    }

    /// True when heights never decrease along the merge sequence.
    pub fn is_monotone(&self) -> bool {
        self.first_inversion().is_none()
    }

    /// Leaves in left-to-right dendrogram order, for plotting.
    pub fn leaf_order(&self) -> Vec<usize> {
        let Some(root) = self.merges.len().checked_sub(1) else {
            return (0..self.n_leaves).collect();
        };
        let mut order = Vec::with_capacity(self.n_leaves);
        let mut stack = vec![Node::Merge(root)];
        while let Some(node) = stack.pop() {
            match node {
                Node::Leaf(i) => order.push(i),
                Node::Merge(m) => {
                    stack.push(self.merges[m].right);
                    stack.push(self.merges[m].left);
                }
            }
        }
        order
    }
}

/// Builds the Ward.D2 merge tree.
pub fn ward(distances: &DistanceMatrix) -> Result<MergeTree> {
    build(distances, Linkage::WardD2)
}

/// Builds the merge tree for any supported linkage.
///
/// Ties on the minimum distance go to the pair with the lexicographically
/// smallest (older id, newer id), where observations have ids 0..n and the
/// m-th merge gets id n + m.
pub fn build(distances: &DistanceMatrix, linkage: Linkage) -> Result<MergeTree> {
    distances.check()?;
    let n = distances.n();
    if n == 0 {
        return Err(MisclassError::DegenerateInput("no observations".into()));
    }

    let squared = linkage == Linkage::WardD2;
    // Squared distances are taken relative to the largest one when squaring
    // would leave the normal range. The Ward update is homogeneous, so
    // heights scale back exactly.
    let largest = (0..n)
        .flat_map(|i| distances.row(i).iter().copied())
        .fold(0.0, f64::max);
    let scale = if squared && largest > 0.0 && !(largest * largest).is_normal() {
        largest
    } else {
        1.0
    };
    let mut work: Vec<f64> = (0..n)
        .flat_map(|i| distances.row(i).iter().copied())
        .map(|d| if squared { (d / scale) * (d / scale) } else { d })
        .collect();

    // Slots index rows of `work`; a merge reuses the older cluster's slot.
    // `active` stays sorted by creation id because merges are appended.
    let mut active: Vec<usize> = (0..n).collect();
    let mut node: Vec<Node> = (0..n).map(Node::Leaf).collect();
    let mut size: Vec<usize> = vec![1; n];
    let mut merges = Vec::with_capacity(n - 1);

    while active.len() > 1 {
        let mut best = f64::INFINITY;
        let (mut best_p, mut best_q) = (0, 1);
        for p in 0..active.len() {
            let row = active[p] * n;
            for q in (p + 1)..active.len() {
                let d = work[row + active[q]];
                if d < best {
                    best = d;
                    best_p = p;
                    best_q = q;
                }
            }
        }

        let (a, b) = (active[best_p], active[best_q]);
        let (n_a, n_b) = (size[a] as f64, size[b] as f64);
        let height = if squared { best.sqrt() * scale } else { best };
        merges.push(Merge {
            left: node[a],
            right: node[b],
            height: height.max(0.0),
            size: size[a] + size[b],
        });

        for &c in &active {
            if c == a || c == b {
                continue;
            }
            let mut d = linkage.update(
                work[c * n + a],
                work[c * n + b],
                best,
                n_a,
                n_b,
                size[c] as f64,
            );
            if linkage.is_monotone() {
                // Rounding can dip below the merge height.
                d = d.max(best);
            }
            let d = d.max(0.0);
            work[c * n + a] = d;
            work[a * n + c] = d;
        }

        node[a] = Node::Merge(merges.len() - 1);
        size[a] += size[b];
        active.remove(best_q);
        active.remove(best_p);
        active.push(a);
    }

    debug!(n, %linkage, "built merge tree");
    Ok(MergeTree {
        n_leaves: n,
        linkage,
        merges,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::{pairwise, Metric};
    use crate::matrix::FeatureMatrix;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn line(points: &[f64]) -> DistanceMatrix {
        let rows = points.iter().map(|&p| vec![p]).collect();
        pairwise(&FeatureMatrix::from_rows(rows).unwrap(), Metric::Euclidean).unwrap()
    }

    fn random_points(rng: &mut StdRng, n: usize, dims: usize) -> FeatureMatrix {
        let rows = (0..n)
            .map(|_| (0..dims).map(|_| rng.gen_range(-10.0..10.0)).collect())
            .collect();
        FeatureMatrix::from_rows(rows).unwrap()
    }

    #[test]
    fn ward_d2_known_heights() {
        let tree = ward(&line(&[0.0, 1.0, 3.0])).unwrap();
        let h = tree.heights();
        assert_eq!(h.len(), 2);
        assert!((h[0] - 1.0).abs() < 1e-12);
        // sqrt(((1+1)*9 + (1+1)*4 - 1) / 3)
        assert!((h[1] - (25.0f64 / 3.0).sqrt()).abs() < 1e-12, "got {}", h[1]);
        assert_eq!(tree.merges()[0].left, Node::Leaf(0));
        assert_eq!(tree.merges()[0].right, Node::Leaf(1));
        assert_eq!(tree.merges()[1].left, Node::Leaf(2));
        assert_eq!(tree.merges()[1].right, Node::Merge(0));
        assert_eq!(tree.merges()[1].size, 3);
    }

    #[test]
    fn classic_linkage_heights() {
        let d = line(&[0.0, 1.0, 3.0]);
        let top = |l: Linkage| build(&d, l).unwrap().heights()[1];
        assert_eq!(top(Linkage::Single), 2.0);
        assert_eq!(top(Linkage::Complete), 3.0);
        assert_eq!(top(Linkage::Average), 2.5);
        assert_eq!(top(Linkage::McQuitty), 2.5);
        // ((1+1)*3 + (1+1)*2 - 1) / 3
        assert!((top(Linkage::WardD) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn ties_resolved_by_creation_order() {
        // Unit square: four edges at distance 1.
        let m = FeatureMatrix::from_rows(vec![
            vec![0.0, 0.0],
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 1.0],
        ])
        .unwrap();
        let tree = ward(&pairwise(&m, Metric::Euclidean).unwrap()).unwrap();
        let merges = tree.merges();
        assert_eq!((merges[0].left, merges[0].right), (Node::Leaf(0), Node::Leaf(1)));
        assert_eq!((merges[1].left, merges[1].right), (Node::Leaf(2), Node::Leaf(3)));
        assert_eq!((merges[2].left, merges[2].right), (Node::Merge(0), Node::Merge(1)));
        assert_eq!(tree.leaf_order(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn ward_heights_monotone_on_random_data() {
        let mut rng = StdRng::seed_from_u64(42);
        let metrics = [
            Metric::Euclidean,
            Metric::Manhattan,
            Metric::Maximum,
            Metric::Canberra,
            Metric::Minkowski(3.0),
        ];
        for trial in 0..20 {
            let n = rng.gen_range(2..40);
            let m = random_points(&mut rng, n, 3);
            for metric in metrics {
                let tree = ward(&pairwise(&m, metric).unwrap()).unwrap();
                assert_eq!(tree.merges().len(), n - 1);
                assert!(
                    tree.is_monotone(),
                    "trial {trial} {metric}: heights {:?}",
                    tree.heights()
                );
                assert_eq!(tree.merges().last().unwrap().size, n);
            }
        }
    }

    #[test]
    fn deterministic_across_runs() {
        let mut rng = StdRng::seed_from_u64(7);
        let m = random_points(&mut rng, 30, 2);
        let d = pairwise(&m, Metric::Euclidean).unwrap();
        assert_eq!(ward(&d).unwrap(), ward(&d).unwrap());
    }

    #[test]
    fn leaf_order_is_permutation() {
        let mut rng = StdRng::seed_from_u64(3);
        let m = random_points(&mut rng, 17, 2);
        let tree = ward(&pairwise(&m, Metric::Euclidean).unwrap()).unwrap();
        let mut order = tree.leaf_order();
        order.sort_unstable();
        assert_eq!(order, (0..17).collect::<Vec<_>>());
    }

    #[test]
    fn centroid_can_invert() {
        let m = FeatureMatrix::from_rows(vec![vec![0.0, 0.0], vec![2.0, 0.0], vec![1.0, 1.8]])
            .unwrap();
        let tree = build(&pairwise(&m, Metric::Euclidean).unwrap(), Linkage::Centroid).unwrap();
        assert_eq!(tree.first_inversion(), Some(1));
        assert!(!tree.is_monotone());
    }

    #[test]
    fn rejects_degenerate_matrix() {
        let d = DistanceMatrix::from_full(2, vec![0.0, -0.5, -0.5, 0.0]).unwrap();
        assert!(matches!(ward(&d), Err(MisclassError::DegenerateInput(_))));
        let empty = DistanceMatrix::from_full(0, Vec::new()).unwrap();
        assert!(ward(&empty).is_err());
    }

    #[test]
    fn ward_heights_survive_extreme_scales() {
        for unit in [1e160, 1e-170] {
            let d = line(&[0.0, unit, 4.0 * unit]);
            let heights = ward(&d).unwrap().heights();
            let plain = ward(&line(&[0.0, 1.0, 4.0])).unwrap().heights();
            for (h, p) in heights.iter().zip(&plain) {
                assert!(h.is_finite());
                assert!((h / unit / p - 1.0).abs() < 1e-12, "{h} vs {p} at {unit}");
            }
        }
    }

    #[test]
    fn single_observation_has_no_merges() {
        let d = DistanceMatrix::from_full(1, vec![0.0]).unwrap();
        let tree = ward(&d).unwrap();
        assert!(tree.merges().is_empty());
        assert_eq!(tree.leaf_order(), vec![0]);
    }

    #[test]
    fn parse_linkage_names() {
        assert_eq!("ward.D2".parse::<Linkage>().unwrap(), Linkage::WardD2);
        assert_eq!("ward_d".parse::<Linkage>().unwrap(), Linkage::WardD);
        assert_eq!("UPGMA".parse::<Linkage>().unwrap(), Linkage::Average);
        assert!("ward.d3".parse::<Linkage>().is_err());
        assert_eq!(Linkage::WardD2.to_string(), "ward.D2");
    }
}
