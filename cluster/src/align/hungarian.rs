//! Exact solvers for the square maximum-weight assignment problem.

/// Largest table the permutation search is allowed to enumerate.
pub const BRUTE_FORCE_LIMIT: usize = 9;

/// Maximum-weight perfect matching on a square matrix.
///
/// Kuhn–Munkres with row/column potentials, O(n³). Returns the column
/// assigned to each row.
pub(crate) fn max_weight(weights: &[Vec<i64>]) -> Vec<usize> {
    let n = weights.len();
    if n == 0 {
        return Vec::new();
    }
    let top = weights.iter().flatten().copied().max().unwrap_or(0);
    let cost: Vec<Vec<i64>> = weights
        .iter()
        .map(|row| row.iter().map(|&w| top - w).collect())
        .collect();
    min_cost(&cost)
}

fn min_cost(cost: &[Vec<i64>]) -> Vec<usize> {
    let n = cost.len();
    let inf = i64::MAX / 4;
    // 1-based; column 0 is a virtual start column.
    let mut u = vec![0i64; n + 1];
    let mut v = vec![0i64; n + 1];
    let mut row_of = vec![0usize; n + 1];
    let mut way = vec![0usize; n + 1];

    for i in 1..=n {
        row_of[0] = i;
        let mut j0 = 0;
        let mut minv = vec![inf; n + 1];
        let mut used = vec![false; n + 1];
        loop {
            used[j0] = true;
            let i0 = row_of[j0];
            let mut delta = inf;
            let mut j1 = 0;
            for j in 1..=n {
                if used[j] {
                    continue;
                }
                let cur = cost[i0 - 1][j - 1] - u[i0] - v[j];
                if cur < minv[j] {
                    minv[j] = cur;
                    way[j] = j0;
                }
                if minv[j] < delta {
                    delta = minv[j];
                    j1 = j;
                }
            }
            for j in 0..=n {
                if used[j] {
                    u[row_of[j]] += delta;
                    v[j] -= delta;
                } else {
                    minv[j] -= delta;
                }
            }
            j0 = j1;
            if row_of[j0] == 0 {
                break;
            }
        }
        loop {
            let j1 = way[j0];
            row_of[j0] = row_of[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    let mut assignment = vec![0usize; n];
    for j in 1..=n {
        if row_of[j] != 0 {
            assignment[row_of[j] - 1] = j - 1;
        }
    }
    assignment
}

/// Exhaustive search over all n! permutations in lexicographic order,
/// keeping the first best one. Callers must respect [`BRUTE_FORCE_LIMIT`].
pub(crate) fn brute_force(weights: &[Vec<i64>]) -> Vec<usize> {
    fn walk(
        weights: &[Vec<i64>],
        row: usize,
        used: &mut [bool],
        current: &mut Vec<usize>,
        score: i64,
        best: &mut Option<(i64, Vec<usize>)>,
    ) {
        if row == weights.len() {
            if best.as_ref().is_none_or(|(b, _)| score > *b) {
                *best = Some((score, current.clone()));
            }
            return;
        }
        for col in 0..weights.len() {
            if used[col] {
                continue;
            }
            used[col] = true;
            current.push(col);
            walk(weights, row + 1, used, current, score + weights[row][col], best);
            current.pop();
            used[col] = false;
        }
    }

    let n = weights.len();
    let mut best = None;
    walk(weights, 0, &mut vec![false; n], &mut Vec::with_capacity(n), 0, &mut best);
    best.map(|(_, perm)| perm).unwrap_or_default()
}

/// Total weight of an assignment.
pub(crate) fn score(weights: &[Vec<i64>], assignment: &[usize]) -> i64 {
    assignment
        .iter()
        .enumerate()
        .map(|(row, &col)| weights[row][col])
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_anti_diagonal() {
        let w = vec![vec![1, 9], vec![8, 2]];
        assert_eq!(max_weight(&w), vec![1, 0]);
        assert_eq!(brute_force(&w), vec![1, 0]);
    }

    #[test]
    fn classic_three_by_three() {
        let w = vec![vec![7, 5, 11], vec![5, 4, 1], vec![9, 3, 2]];
        // 11 + 4 + 9
        assert_eq!(score(&w, &max_weight(&w)), 24);
        assert_eq!(score(&w, &brute_force(&w)), 24);
    }

    #[test]
    fn result_is_a_permutation() {
        let w = vec![vec![0; 5]; 5];
        let mut a = max_weight(&w);
        a.sort_unstable();
        assert_eq!(a, vec![0, 1, 2, 3, 4]);
        assert_eq!(brute_force(&w), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn empty_table() {
        assert!(max_weight(&[]).is_empty());
        assert!(brute_force(&[]).is_empty());
    }
}
