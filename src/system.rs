//! Validated linear systems and conversion from the row-major wire format.

use ndarray::Array2;

use crate::error::{ControlError, ControlResult};

/// Build a matrix from row-major nested rows.
///
/// Rejects empty matrices, ragged rows and non-finite entries.
///
/// # Examples
/// ```
/// use ndarray::array;
/// use geometric_control::system::matrix_from_rows;
///
/// let mat = matrix_from_rows("A", &[vec![0., 1.], vec![2., 0.]]).unwrap();
/// assert_eq!(mat, array![[0., 1.], [2., 0.]]);
/// assert!(matrix_from_rows("A", &[vec![0., 1.], vec![2.]]).is_err());
/// ```
pub fn matrix_from_rows(name: &str, rows: &[Vec<f64>]) -> ControlResult<Array2<f64>> {
    let n_cols = match rows.first() {
        Some(row) if !row.is_empty() => row.len(),
        _ => {
            return Err(ControlError::DimensionMismatch(format!(
                "matrix {name} must have at least one row and one column"
            )))
        }
    };
    if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != n_cols) {
        return Err(ControlError::DimensionMismatch(format!(
            "matrix {name} row {i} has {} entries, expected {n_cols}",
            row.len()
        )));
    }
    if rows.iter().flatten().any(|v| !v.is_finite()) {
        return Err(ControlError::InvalidInput(format!(
            "matrix {name} contains a non-finite entry"
        )));
    }
    let flat: Vec<f64> = rows.iter().flatten().copied().collect();
    Array2::from_shape_vec((rows.len(), n_cols), flat)
        .map_err(|e| ControlError::DimensionMismatch(format!("matrix {name}: {e}")))
}

/// Convert a matrix back to row-major nested rows.
pub fn matrix_to_rows(mat: &Array2<f64>) -> Vec<Vec<f64>> {
    mat.rows().into_iter().map(|row| row.to_vec()).collect()
}

/// A linear system $\dot{x} = Ax + Bu + Ed$, $y = Cx$.
///
/// Construction checks that $A$ is $n \times n$, $B$ is $n \times m$,
/// $C$ is $p \times n$ and (when present) $E$ is $n \times q$.
#[derive(Clone, Debug)]
pub struct LinearSystem {
    a_mat: Array2<f64>,
    b_mat: Array2<f64>,
    c_mat: Array2<f64>,
    e_mat: Option<Array2<f64>>,
}

impl LinearSystem {
    pub fn new(
        a_mat: Array2<f64>,
        b_mat: Array2<f64>,
        c_mat: Array2<f64>,
        e_mat: Option<Array2<f64>>,
    ) -> ControlResult<Self> {
        let n = a_mat.nrows();
        if a_mat.ncols() != n {
            return Err(ControlError::DimensionMismatch(format!(
                "A must be square, got {}x{}",
                n,
                a_mat.ncols()
            )));
        }
        if b_mat.nrows() != n {
            return Err(ControlError::DimensionMismatch(format!(
                "B must have {n} rows to match A, got {}",
                b_mat.nrows()
            )));
        }
        if c_mat.ncols() != n {
            return Err(ControlError::DimensionMismatch(format!(
                "C must have {n} columns to match A, got {}",
                c_mat.ncols()
            )));
        }
        if let Some(e) = &e_mat {
            if e.nrows() != n {
                return Err(ControlError::DimensionMismatch(format!(
                    "E must have {n} rows to match A, got {}",
                    e.nrows()
                )));
            }
        }
        Ok(LinearSystem {
            a_mat,
            b_mat,
            c_mat,
            e_mat,
        })
    }

    /// Build a system from the nested-row wire format.
    pub fn from_rows(
        a: &[Vec<f64>],
        b: &[Vec<f64>],
        c: &[Vec<f64>],
        e: Option<&[Vec<f64>]>,
    ) -> ControlResult<Self> {
        let e_mat = e.map(|rows| matrix_from_rows("E", rows)).transpose()?;
        LinearSystem::new(
            matrix_from_rows("A", a)?,
            matrix_from_rows("B", b)?,
            matrix_from_rows("C", c)?,
            e_mat,
        )
    }

    pub fn a_mat(&self) -> &Array2<f64> {
        &self.a_mat
    }

    pub fn b_mat(&self) -> &Array2<f64> {
        &self.b_mat
    }

    pub fn c_mat(&self) -> &Array2<f64> {
        &self.c_mat
    }

    pub fn e_mat(&self) -> Option<&Array2<f64>> {
        self.e_mat.as_ref()
    }

    /// The disturbance matrix, or an error naming the operation that needs it.
    pub fn require_e(&self) -> ControlResult<&Array2<f64>> {
        self.e_mat
            .as_ref()
            .ok_or_else(|| ControlError::InvalidInput("Matrix E is required for DDP check.".into()))
    }

    /// Replace a missing $E$ by an $n \times 1$ zero matrix.
    pub fn with_default_disturbance(mut self) -> Self {
        if self.e_mat.is_none() {
            self.e_mat = Some(Array2::zeros((self.n_state(), 1)));
        }
        self
    }

    pub fn n_state(&self) -> usize {
        self.a_mat.nrows()
    }

    pub fn n_input(&self) -> usize {
        self.b_mat.ncols()
    }

    pub fn n_output(&self) -> usize {
        self.c_mat.nrows()
    }
}
