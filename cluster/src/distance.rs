//! Pairwise dissimilarities between observations.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use tracing::debug;

use crate::error::{MisclassError, Result};
use crate::matrix::FeatureMatrix;

/// Relative tolerance used when checking symmetry.
const SYMMETRY_TOL: f64 = 1e-9;

/// Supported dissimilarity measures.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Metric {
    /// Root of summed squared differences.
    #[default]
    Euclidean,
    /// Sum of absolute differences.
    Manhattan,
    /// Largest absolute difference (Chebyshev).
    Maximum,
    /// Sum of |x - y| / |x + y|, skipping 0/0 terms.
    Canberra,
    /// Share of "on" positions (non-zero) where exactly one side is on.
    Binary,
    /// p-th root of summed p-th powers of absolute differences.
    Minkowski(f64),
}

impl Metric {
    /// Minkowski distance with exponent `p`.
    pub fn minkowski(p: f64) -> Self {
        Metric::Minkowski(p)
    }

    /// Canonical lower-case name.
    pub fn name(&self) -> &'static str {
        match self {
            Metric::Euclidean => "euclidean",
            Metric::Manhattan => "manhattan",
            Metric::Maximum => "maximum",
            Metric::Canberra => "canberra",
            Metric::Binary => "binary",
            Metric::Minkowski(_) => "minkowski",
        }
    }

    fn check(&self) -> Result<()> {
        if let Metric::Minkowski(p) = self {
            if !p.is_finite() || *p <= 0.0 {
                return Err(MisclassError::InvalidInput(format!(
                    "minkowski exponent must be a positive number, got {p}"
                )));
            }
        }
        Ok(())
    }

    /// Distance between two equally long feature vectors.
    pub fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        debug_assert_eq!(a.len(), b.len());
        let pairs = a.iter().zip(b.iter());
        match self {
            Metric::Euclidean => {
                let sum: f64 = pairs.map(|(x, y)| (x - y) * (x - y)).sum();
                if sum.is_finite() && sum >= f64::MIN_POSITIVE {
                    sum.sqrt()
                } else {
                    scaled_euclidean(a, b)
                }
            }
            Metric::Manhattan => pairs.map(|(x, y)| (x - y).abs()).sum(),
            Metric::Maximum => pairs.map(|(x, y)| (x - y).abs()).fold(0.0, f64::max),
            Metric::Canberra => {
                let mut sum = 0.0;
                let mut used = 0usize;
                for (x, y) in pairs {
                    let num = (x - y).abs();
                    let den = (x + y).abs();
                    if num == 0.0 && den == 0.0 {
                        continue;
                    }
                    sum += num / den;
                    used += 1;
                }
                if used == 0 {
                    0.0
                } else {
                    sum * a.len() as f64 / used as f64
                }
            }
            Metric::Binary => {
                let mut either = 0usize;
                let mut one = 0usize;
                for (x, y) in pairs {
                    let (on_x, on_y) = (*x != 0.0, *y != 0.0);
                    if on_x || on_y {
                        either += 1;
                        if on_x != on_y {
                            one += 1;
                        }
                    }
                }
                if either == 0 {
                    0.0
                } else {
                    one as f64 / either as f64
                }
            }
            Metric::Minkowski(p) => pairs
                .map(|(x, y)| (x - y).abs().powf(*p))
                .sum::<f64>()
                .powf(1.0 / p),
        }
    }
}

/// Euclidean distance accumulated relative to the largest difference, so
/// that squares of very large or very small coordinates stay representable.
fn scaled_euclidean(a: &[f64], b: &[f64]) -> f64 {
    let m = a
        .iter()
        .zip(b)
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max);
    if m == 0.0 || !m.is_finite() {
        return m;
    }
    let sum: f64 = a.iter().zip(b).map(|(x, y)| ((x - y) / m).powi(2)).sum();
    m * sum.sqrt()
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Minkowski(p) => write!(f, "minkowski(p={p})"),
            other => f.write_str(other.name()),
        }
    }
}

impl FromStr for Metric {
    type Err = MisclassError;

    /// Parses a metric name. `minkowski` defaults to p = 2.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "euclidean" => Ok(Metric::Euclidean),
            "manhattan" => Ok(Metric::Manhattan),
            "maximum" | "chebyshev" => Ok(Metric::Maximum),
            "canberra" => Ok(Metric::Canberra),
            "binary" => Ok(Metric::Binary),
            "minkowski" => Ok(Metric::Minkowski(2.0)),
            other => Err(MisclassError::InvalidInput(format!(
                "unknown distance metric {other:?}"
            ))),
        }
    }
}

/// Symmetric n × n dissimilarity matrix with a zero diagonal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistanceMatrix {
    n: usize,
    data: Vec<f64>,
}

impl DistanceMatrix {
    /// Wraps a precomputed row-major n × n buffer.
    ///
    /// Only the shape is checked here. Contents are validated by the
    /// linkage builder, see [`DistanceMatrix::check`].
    pub fn from_full(n: usize, data: Vec<f64>) -> Result<Self> {
        if n.checked_mul(n) != Some(data.len()) {
            return Err(MisclassError::DegenerateInput(format!(
                "buffer of {} values is not a {n}x{n} matrix",
                data.len()
            )));
        }
        Ok(Self { n, data })
    }

    /// Number of observations.
    pub fn n(&self) -> usize {
        self.n
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.n + j]
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.n..(i + 1) * self.n]
    }

    /// Verifies the matrix is usable for agglomeration: finite,
    /// non-negative, zero diagonal, symmetric within tolerance.
    pub fn check(&self) -> Result<()> {
        for i in 0..self.n {
            let d = self.get(i, i);
            if d != 0.0 {
                return Err(MisclassError::DegenerateInput(format!(
                    "diagonal entry ({i},{i}) is {d}, expected 0"
                )));
            }
            for j in (i + 1)..self.n {
                let a = self.get(i, j);
                let b = self.get(j, i);
                if !a.is_finite() || !b.is_finite() {
                    return Err(MisclassError::DegenerateInput(format!(
                        "non-finite distance between {i} and {j}"
                    )));
                }
                if a < 0.0 || b < 0.0 {
                    return Err(MisclassError::DegenerateInput(format!(
                        "negative distance {} between {i} and {j}",
                        a.min(b)
                    )));
                }
                let scale = a.abs().max(b.abs()).max(1.0);
                if (a - b).abs() > SYMMETRY_TOL * scale {
                    return Err(MisclassError::DegenerateInput(format!(
                        "not symmetric at ({i},{j}): {a} vs {b}"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Computes the full pairwise distance matrix of `features` under `metric`.
///
/// Fails with [`MisclassError::InvalidInput`] when there are fewer than two
/// observations, no features, a non-finite value, or a bad metric
/// parameter. Nothing is computed before validation passes. A distance
/// that overflows is also reported as `InvalidInput`, naming the pair.
pub fn pairwise(features: &FeatureMatrix, metric: Metric) -> Result<DistanceMatrix> {
    features.validate()?;
    metric.check()?;

    let n = features.rows();
    let mut data = vec![0.0; n * n];
    for i in 0..n {
        let a = features.row(i);
        for j in (i + 1)..n {
            let d = metric.distance(a, features.row(j));
            if !d.is_finite() {
                return Err(MisclassError::InvalidInput(format!(
                    "{metric} distance between rows {i} and {j} is not representable"
                )));
            }
            data[i * n + j] = d;
            data[j * n + i] = d;
        }
    }
    debug!(n, dims = features.cols(), %metric, "computed distance matrix");
    Ok(DistanceMatrix { n, data })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn metric_values() {
        let a = [0.0, 3.0, 1.0];
        let b = [4.0, 0.0, 1.0];
        assert!(close(Metric::Euclidean.distance(&a, &b), 5.0));
        assert!(close(Metric::Manhattan.distance(&a, &b), 7.0));
        assert!(close(Metric::Maximum.distance(&a, &b), 4.0));
        assert!(close(Metric::Minkowski(1.0).distance(&a, &b), 7.0));
        assert!(close(Metric::Minkowski(2.0).distance(&a, &b), 5.0));
    }

    #[test]
    fn canberra_skips_zero_terms() {
        // Third term is 0/0 and dropped; result is rescaled by 3/2.
        let a = [1.0, 2.0, 0.0];
        let b = [3.0, 2.0, 0.0];
        let expected = (2.0 / 4.0 + 0.0) * 3.0 / 2.0;
        assert!(close(Metric::Canberra.distance(&a, &b), expected));
        assert_eq!(Metric::Canberra.distance(&[0.0, 0.0], &[0.0, 0.0]), 0.0);
    }

    #[test]
    fn binary_distance() {
        let a = [1.0, 0.0, 2.0, 0.0];
        let b = [1.0, 5.0, 0.0, 0.0];
        // on in either: positions 0,1,2; exactly one: 1,2.
        assert!(close(Metric::Binary.distance(&a, &b), 2.0 / 3.0));
        assert_eq!(Metric::Binary.distance(&[0.0], &[0.0]), 0.0);
    }

    #[test]
    fn parse_metric_names() {
        assert_eq!("Euclidean".parse::<Metric>().unwrap(), Metric::Euclidean);
        assert_eq!("maximum".parse::<Metric>().unwrap(), Metric::Maximum);
        assert_eq!("minkowski".parse::<Metric>().unwrap(), Metric::Minkowski(2.0));
        assert!("cosine".parse::<Metric>().is_err());
        assert_eq!(Metric::Minkowski(3.0).to_string(), "minkowski(p=3)");
    }

    #[test]
    fn pairwise_symmetric_zero_diagonal() {
        let m = FeatureMatrix::from_rows(vec![
            vec![0.0, 0.0],
            vec![3.0, 4.0],
            vec![6.0, 8.0],
        ])
        .unwrap();
        let d = pairwise(&m, Metric::Euclidean).unwrap();
        assert_eq!(d.n(), 3);
        assert!(close(d.get(0, 1), 5.0));
        assert!(close(d.get(0, 2), 10.0));
        for i in 0..3 {
            assert_eq!(d.get(i, i), 0.0);
            for j in 0..3 {
                assert_eq!(d.get(i, j), d.get(j, i));
            }
        }
        assert!(d.check().is_ok());
    }

    #[test]
    fn pairwise_rejects_non_finite() {
        let m = FeatureMatrix::from_rows(vec![vec![0.0, 1.0], vec![f64::NAN, f64::NAN]]).unwrap();
        assert!(matches!(
            pairwise(&m, Metric::Euclidean),
            Err(MisclassError::InvalidInput(_))
        ));
    }

    #[test]
    fn euclidean_survives_large_coordinates() {
        let m = FeatureMatrix::from_rows(vec![
            vec![0.0, 0.0],
            vec![3e160, 0.0],
            vec![0.0, 4e160],
        ])
        .unwrap();
        let d = pairwise(&m, Metric::Euclidean).unwrap();
        assert!((d.get(1, 2) / 5e160 - 1.0).abs() < 1e-12);
        assert!((d.get(0, 1) / 3e160 - 1.0).abs() < 1e-12);

        let tiny = Metric::Euclidean.distance(&[0.0, 0.0], &[3e-170, 4e-170]);
        assert!((tiny / 5e-170 - 1.0).abs() < 1e-12);
    }

    #[test]
    fn pairwise_rejects_overflowing_distance() {
        let m = FeatureMatrix::from_rows(vec![vec![-1e308], vec![1e308]]).unwrap();
        let err = pairwise(&m, Metric::Euclidean).unwrap_err();
        assert!(matches!(err, MisclassError::InvalidInput(ref msg) if msg.contains("rows 0 and 1")));

        let m = FeatureMatrix::from_rows(vec![vec![0.0], vec![1e200]]).unwrap();
        assert!(matches!(
            pairwise(&m, Metric::Minkowski(3.0)),
            Err(MisclassError::InvalidInput(_))
        ));
    }

    #[test]
    fn pairwise_rejects_bad_minkowski() {
        let m = FeatureMatrix::from_rows(vec![vec![0.0], vec![1.0]]).unwrap();
        assert!(pairwise(&m, Metric::Minkowski(0.0)).is_err());
        assert!(pairwise(&m, Metric::Minkowski(-1.0)).is_err());
    }

    #[test]
    fn check_detects_degenerate() {
        let neg = DistanceMatrix::from_full(2, vec![0.0, -1.0, -1.0, 0.0]).unwrap();
        assert!(matches!(neg.check(), Err(MisclassError::DegenerateInput(_))));

        let asym = DistanceMatrix::from_full(2, vec![0.0, 1.0, 2.0, 0.0]).unwrap();
        assert!(asym.check().is_err());

        let diag = DistanceMatrix::from_full(2, vec![1.0, 1.0, 1.0, 0.0]).unwrap();
        assert!(diag.check().is_err());

        // Rounding-level asymmetry is tolerated.
        let near = DistanceMatrix::from_full(2, vec![0.0, 1.0, 1.0 + 1e-13, 0.0]).unwrap();
        assert!(near.check().is_ok());

        assert!(DistanceMatrix::from_full(3, vec![0.0; 4]).is_err());
    }
}
