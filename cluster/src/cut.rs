//! Flat clusterings from a merge tree.

use crate::error::{MisclassError, Result};
use crate::linkage::{MergeTree, Node};

/// Cuts `tree` into exactly `k` groups.
///
/// Applies the first `n - k` merges and returns one cluster ID per
/// observation. IDs are dense in `1..=k`, numbered by the first
/// observation (in index order) that falls into each group.
pub fn cut_tree(tree: &MergeTree, k: usize) -> Result<Vec<usize>> {
    let n = tree.n_leaves();
    if k < 1 || k > n {
        return Err(MisclassError::InvalidClusterCount { k, n });
    }
    Ok(components(tree, n - k))
}

/// Cuts `tree` at `height`, joining every merge at or below it.
///
/// Only defined for monotone trees; centroid and median linkages can
/// produce inversions that make a height cut ambiguous.
pub fn cut_height(tree: &MergeTree, height: f64) -> Result<Vec<usize>> {
    if height.is_nan() {
        return Err(MisclassError::InvalidInput("cut height is NaN".into()));
    }
    if let Some(merge) = tree.first_inversion() {
        return Err(MisclassError::NonMonotoneCut { merge });
    }
    let applied = tree
        .merges()
        .iter()
        .take_while(|m| m.height <= height)
        .count();
    Ok(components(tree, applied))
}

/// Labels connected components after applying the first `applied` merges.
fn components(tree: &MergeTree, applied: usize) -> Vec<usize> {
    let n = tree.n_leaves();
    let mut uf = UnionFind::new(n);
    // Any leaf under a merge node stands in for the whole node.
    let mut witness: Vec<usize> = Vec::with_capacity(applied);
    let leaf_of = |node: Node, witness: &[usize]| match node {
        Node::Leaf(i) => i,
        Node::Merge(m) => witness[m],
    };

    for merge in &tree.merges()[..applied] {
        let a = leaf_of(merge.left, &witness);
        let b = leaf_of(merge.right, &witness);
        uf.union(a, b);
        witness.push(a);
    }

    let mut id_of_root = vec![0usize; n];
    let mut next = 0;
    (0..n)
        .map(|i| {
            let root = uf.find(i);
            if id_of_root[root] == 0 {
                next += 1;
                id_of_root[root] = next;
            }
            id_of_root[root]
        })
        .collect()
}

struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
    }
}
