//! Index-based readers over the three matrix storage kinds.
//!
//! A model description stores small square matrices (loss tables, cluster
//! covariances) in one of three shapes:
//!
//! - [`MatrixKind::Diagonal`]: one array of diagonal values, a shared
//!   off-diagonal default
//! - [`MatrixKind::Symmetric`]: row arrays covering the lower triangle only;
//!   addressing auto-reflects
//! - [`MatrixKind::Any`]: full row arrays, or sparse `(row, col, value)`
//!   cells with independent diagonal/off-diagonal defaults
//!
//! All indices are 1-based, matching the description format.
//!
//! # Example
//!
//! ```
//! use modeleval::schema::Matrix;
//!
//! let m = Matrix::symmetric(vec![vec![1.0], vec![2.0, 3.0]]);
//! assert_eq!(m.get_element(1, 2).unwrap(), Some(2.0));
//! assert_eq!(m.get_element(2, 1).unwrap(), Some(2.0));
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{EvalError, Result};

/// Storage kind of a [`Matrix`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatrixKind {
    Diagonal,
    Symmetric,
    Any,
}

/// One sparse matrix cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatCell {
    pub row: usize,
    pub col: usize,
    pub value: f64,
}

/// A declaratively stored matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    pub kind: MatrixKind,
    /// Explicit row count; inferred from storage shape when absent.
    pub n_rows: Option<usize>,
    /// Explicit column count; inferred from storage shape when absent.
    pub n_cols: Option<usize>,
    pub arrays: Vec<Vec<f64>>,
    pub cells: Vec<MatCell>,
    pub diag_default: Option<f64>,
    pub off_diag_default: Option<f64>,
}

impl Matrix {
    pub fn diagonal(values: Vec<f64>, off_diag_default: Option<f64>) -> Self {
        Self {
            kind: MatrixKind::Diagonal,
            n_rows: None,
            n_cols: None,
            arrays: vec![values],
            cells: Vec::new(),
            diag_default: None,
            off_diag_default,
        }
    }

    pub fn symmetric(lower_triangle: Vec<Vec<f64>>) -> Self {
        Self {
            kind: MatrixKind::Symmetric,
            n_rows: None,
            n_cols: None,
            arrays: lower_triangle,
            cells: Vec::new(),
            diag_default: None,
            off_diag_default: None,
        }
    }

    pub fn dense(rows: Vec<Vec<f64>>) -> Self {
        Self {
            kind: MatrixKind::Any,
            n_rows: None,
            n_cols: None,
            arrays: rows,
            cells: Vec::new(),
            diag_default: None,
            off_diag_default: None,
        }
    }

    pub fn sparse(
        cells: Vec<MatCell>,
        diag_default: Option<f64>,
        off_diag_default: Option<f64>,
    ) -> Self {
        Self {
            kind: MatrixKind::Any,
            n_rows: None,
            n_cols: None,
            arrays: Vec::new(),
            cells,
            diag_default,
            off_diag_default,
        }
    }

    /// Read the element at 1-based `(row, col)`.
    ///
    /// Returns `Ok(None)` when the location falls back to an undeclared
    /// default. Out-of-range indices are an evaluation failure; a matrix
    /// with no usable storage is an invalid feature.
    pub fn get_element(&self, row: usize, col: usize) -> Result<Option<f64>> {
        match self.kind {
            MatrixKind::Diagonal => {
                // One array of diagonal values, shared off-diagonal default.
                let [diag] = self.arrays.as_slice() else {
                    return Err(self.invalid("diagonal matrix requires exactly one array"));
                };

                let in_range = |index: usize| (1..=diag.len()).contains(&index);
                if !in_range(row) || !in_range(col) {
                    return Err(self.out_of_bounds(row, col));
                }

                if row == col {
                    Ok(Some(diag[row - 1]))
                } else {
                    Ok(self.off_diag_default)
                }
            }
            MatrixKind::Symmetric => {
                if self.arrays.is_empty() {
                    return Err(self.invalid("symmetric matrix requires arrays"));
                }

                // Reflect to the lower-left triangle before lookup.
                let (row, col) = if col > row { (col, row) } else { (row, col) };

                self.array_value(row, col).map(Some)
            }
            MatrixKind::Any => {
                if !self.arrays.is_empty() {
                    return self.array_value(row, col).map(Some);
                }

                if !self.cells.is_empty() {
                    if row < 1 || col < 1 {
                        return Err(self.out_of_bounds(row, col));
                    }

                    let hit = self
                        .cells
                        .iter()
                        .find(|cell| cell.row == row && cell.col == col);

                    return Ok(match hit {
                        Some(cell) => Some(cell.value),
                        None if row == col => self.diag_default,
                        None => self.off_diag_default,
                    });
                }

                Err(self.invalid("matrix declares neither arrays nor cells"))
            }
        }
    }

    /// The number of rows: the explicit count, else inferred from storage.
    pub fn n_rows(&self) -> Result<usize> {
        if let Some(n) = self.n_rows {
            return Ok(n);
        }

        match self.kind {
            MatrixKind::Diagonal => match self.arrays.as_slice() {
                [diag] => Ok(diag.len()),
                _ => Err(self.invalid("diagonal matrix requires exactly one array")),
            },
            MatrixKind::Symmetric | MatrixKind::Any if !self.arrays.is_empty() => {
                Ok(self.arrays.len())
            }
            MatrixKind::Any if !self.cells.is_empty() => Ok(self
                .cells
                .iter()
                .map(|cell| cell.row)
                .max()
                .unwrap_or_default()),
            _ => Err(self.invalid("matrix declares neither arrays nor cells")),
        }
    }

    /// The number of columns: the explicit count, else inferred from storage.
    pub fn n_cols(&self) -> Result<usize> {
        if let Some(n) = self.n_cols {
            return Ok(n);
        }

        match self.kind {
            MatrixKind::Diagonal => match self.arrays.as_slice() {
                [diag] => Ok(diag.len()),
                _ => Err(self.invalid("diagonal matrix requires exactly one array")),
            },
            MatrixKind::Symmetric if !self.arrays.is_empty() => Ok(self.arrays.len()),
            MatrixKind::Any if !self.arrays.is_empty() => {
                // Dense rows may be ragged in the description; the widest
                // shape is the last row's.
                Ok(self.arrays.last().map(Vec::len).unwrap_or_default())
            }
            MatrixKind::Any if !self.cells.is_empty() => Ok(self
                .cells
                .iter()
                .map(|cell| cell.col)
                .max()
                .unwrap_or_default()),
            _ => Err(self.invalid("matrix declares neither arrays nor cells")),
        }
    }

    fn array_value(&self, row: usize, col: usize) -> Result<f64> {
        let values = self
            .arrays
            .get(row.checked_sub(1).ok_or_else(|| self.out_of_bounds(row, col))?)
            .ok_or_else(|| self.out_of_bounds(row, col))?;

        values
            .get(col.checked_sub(1).ok_or_else(|| self.out_of_bounds(row, col))?)
            .copied()
            .ok_or_else(|| self.out_of_bounds(row, col))
    }

    fn out_of_bounds(&self, row: usize, col: usize) -> EvalError {
        EvalError::Evaluation(format!("matrix index ({row}, {col}) out of bounds"))
    }

    fn invalid(&self, reason: &str) -> EvalError {
        EvalError::InvalidFeature(reason.to_owned())
    }
}
