use crate::error::{PipelineError, PipelineResult};
use serde::{Deserialize, Serialize};

/// Dense row-major feature matrix.
///
/// Stores data in a flat contiguous `Vec<f64>`; row `i` occupies
/// `data[i * cols..(i + 1) * cols]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    data: Vec<f64>,
    rows: usize,
    cols: usize,
}

// ─── Construction ───────────────────────────────────────────────────────────

impl Matrix {
    /// Create a matrix from raw row-major data.
    pub fn new(data: Vec<f64>, rows: usize, cols: usize) -> PipelineResult<Self> {
        if data.len() != rows * cols {
            return Err(PipelineError::ShapeMismatch {
                expected: vec![rows, cols],
                got: vec![data.len()],
            });
        }
        Ok(Matrix { data, rows, cols })
    }

    pub fn zeros(rows: usize, cols: usize) -> Self {
        Matrix {
            data: vec![0.0; rows * cols],
            rows,
            cols,
        }
    }

    /// Create a matrix from nested rows. All rows must share a width.
    pub fn from_rows(rows: &[Vec<f64>]) -> PipelineResult<Self> {
        if rows.is_empty() {
            return Ok(Matrix::zeros(0, 0));
        }
        let cols = rows[0].len();
        for (i, row) in rows.iter().enumerate() {
            if row.len() != cols {
                return Err(PipelineError::MalformedRow {
                    row: i,
                    reason: format!("expected {} features, found {}", cols, row.len()),
                });
            }
        }
        let flat: Vec<f64> = rows.iter().flat_map(|r| r.iter().copied()).collect();
        Matrix::new(flat, rows.len(), cols)
    }

    // ─── Accessors ──────────────────────────────────────────────────────────

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn get(&self, row: usize, col: usize) -> PipelineResult<f64> {
        self.check(row, col)?;
        Ok(self.data[row * self.cols + col])
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) -> PipelineResult<()> {
        self.check(row, col)?;
        self.data[row * self.cols + col] = value;
        Ok(())
    }

    fn check(&self, row: usize, col: usize) -> PipelineResult<()> {
        if row >= self.rows || col >= self.cols {
            return Err(PipelineError::ShapeMismatch {
                expected: vec![self.rows, self.cols],
                got: vec![row, col],
            });
        }
        Ok(())
    }

    /// Borrow row `i` as a slice.
    pub fn row(&self, i: usize) -> PipelineResult<&[f64]> {
        if i >= self.rows {
            return Err(PipelineError::ShapeMismatch {
                expected: vec![self.rows],
                got: vec![i],
            });
        }
        Ok(&self.data[i * self.cols..(i + 1) * self.cols])
    }

    pub fn row_iter(&self) -> impl Iterator<Item = &[f64]> {
        // chunks_exact panics on a zero chunk size
        self.data.chunks_exact(self.cols.max(1)).take(self.rows)
    }

    /// Copy column `j` out as a vector.
    pub fn col(&self, j: usize) -> PipelineResult<Vec<f64>> {
        if j >= self.cols {
            return Err(PipelineError::ShapeMismatch {
                expected: vec![self.cols],
                got: vec![j],
            });
        }
        Ok((0..self.rows).map(|i| self.data[i * self.cols + j]).collect())
    }

    /// Overwrite column `j` with `values`.
    pub fn set_col(&mut self, j: usize, values: &[f64]) -> PipelineResult<()> {
        if j >= self.cols || values.len() != self.rows {
            return Err(PipelineError::ShapeMismatch {
                expected: vec![self.rows, self.cols],
                got: vec![values.len(), j],
            });
        }
        for (i, &v) in values.iter().enumerate() {
            self.data[i * self.cols + j] = v;
        }
        Ok(())
    }

    /// Gather the given rows into a new matrix.
    pub fn select_rows(&self, indices: &[usize]) -> PipelineResult<Matrix> {
        let mut data = Vec::with_capacity(indices.len() * self.cols);
        for &i in indices {
            data.extend_from_slice(self.row(i)?);
        }
        Matrix::new(data, indices.len(), self.cols)
    }

    /// Gather the given columns into a new matrix.
    pub fn select_cols(&self, indices: &[usize]) -> PipelineResult<Matrix> {
        let mut data = Vec::with_capacity(self.rows * indices.len());
        for i in 0..self.rows {
            for &j in indices {
                data.push(self.get(i, j)?);
            }
        }
        Matrix::new(data, self.rows, indices.len())
    }
}
