use serde::Serialize;

use crate::error::{MisclassError, Result};

/// Dense row-major matrix of observations × features.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl FeatureMatrix {
    /// Wraps a row-major buffer. Fails if `data.len() != rows * cols`.
    pub fn new(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        if rows.checked_mul(cols) != Some(data.len()) {
            return Err(MisclassError::InvalidInput(format!(
                "buffer of {} values does not fill a {rows}x{cols} matrix",
                data.len()
            )));
        }
        Ok(Self { rows, cols, data })
    }

    /// Builds a matrix from row vectors. All rows must have the same width.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != cols {
                return Err(MisclassError::InvalidInput(format!(
                    "row {i} has {} columns, expected {cols}",
                    row.len()
                )));
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            data,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Returns row `i`. Panics if out of range.
    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    /// Iterates rows in order.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[f64]> {
        // chunks_exact panics on a zero chunk size.
        let width = self.cols.max(1);
        self.data.chunks_exact(width).take(self.rows)
    }

    /// Rejects matrices the distance engine cannot work on: fewer than two
    /// rows, no columns, or any NaN / infinite value.
    pub fn validate(&self) -> Result<()> {
        if self.rows < 2 {
            return Err(MisclassError::InvalidInput(format!(
                "need at least 2 observations, got {}",
                self.rows
            )));
        }
        if self.cols == 0 {
            return Err(MisclassError::InvalidInput(
                "observations have no features".into(),
            ));
        }
        if let Some(pos) = self.data.iter().position(|v| !v.is_finite()) {
            return Err(MisclassError::InvalidInput(format!(
                "non-finite value {} at row {}, column {}",
                self.data[pos],
                pos / self.cols,
                pos % self.cols
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_rows_shape() {
        let m = FeatureMatrix::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]])
            .unwrap();
        assert_eq!(m.rows(), 3);
        assert_eq!(m.cols(), 2);
        assert_eq!(m.row(1), &[3.0, 4.0]);
        assert_eq!(m.iter_rows().count(), 3);
    }

    #[test]
    fn from_rows_ragged() {
        let err = FeatureMatrix::from_rows(vec![vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert!(matches!(err, MisclassError::InvalidInput(_)));
    }

    #[test]
    fn new_wrong_len() {
        assert!(FeatureMatrix::new(2, 2, vec![1.0; 3]).is_err());
        assert!(FeatureMatrix::new(2, 2, vec![1.0; 4]).is_ok());
    }

    #[test]
    fn validate_rejects_nan_and_inf() {
        let m = FeatureMatrix::from_rows(vec![vec![1.0, 2.0], vec![f64::NAN, 0.0]]).unwrap();
        let err = m.validate().unwrap_err();
        assert!(err.to_string().contains("row 1, column 0"), "got {err}");

        let m = FeatureMatrix::from_rows(vec![vec![1.0, f64::INFINITY], vec![0.0, 0.0]]).unwrap();
        assert!(m.validate().is_err());
    }

    #[test]
    fn validate_rejects_tiny_inputs() {
        let single = FeatureMatrix::from_rows(vec![vec![1.0, 2.0]]).unwrap();
        assert!(single.validate().is_err());

        let no_cols = FeatureMatrix::new(3, 0, Vec::new()).unwrap();
        assert!(no_cols.validate().is_err());
        assert_eq!(no_cols.iter_rows().count(), 0);
    }
}
