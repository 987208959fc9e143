//! Step calculation for the Levenberg-Marquardt algorithm.
//!
//! This module solves the damped normal equations, which interpolate between the
//! Gauss-Newton step (small damping) and a scaled gradient descent step (large
//! damping).

use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, Array2};

/// Floor for diagonal entries of `JᵗJ` used in Marquardt scaling, so columns with a
/// vanishing derivative still receive some damping.
const MIN_DIAGONAL: f64 = 1e-12;

/// Handles step calculation for the Levenberg-Marquardt algorithm.
pub struct LmStep;

impl LmStep {
    /// Solves `(JᵗJ + λ·diag(JᵗJ)) δ = −Jᵗr` for the step `δ`.
    ///
    /// Cholesky is tried first; an LU factorization is the fallback for matrices
    /// that lost positive definiteness to rounding. Returns `None` when neither
    /// succeeds or the solution is not finite, in which case the caller should
    /// raise the damping and retry.
    pub fn calculate_step(
        j_t_j: &Array2<f64>,
        j_t_r: &Array1<f64>,
        lambda: f64,
    ) -> Option<Array1<f64>> {
        let n = j_t_j.nrows();
        let mut augmented = to_dmatrix(j_t_j);
        for i in 0..n {
            augmented[(i, i)] += lambda * j_t_j[[i, i]].max(MIN_DIAGONAL);
        }

        let rhs = DVector::from_iterator(n, j_t_r.iter().map(|g| -g));

        let solution = match augmented.clone().cholesky() {
            Some(chol) => Some(chol.solve(&rhs)),
            None => augmented.lu().solve(&rhs),
        }?;

        if solution.iter().all(|v| v.is_finite()) {
            Some(solution.iter().copied().collect())
        } else {
            None
        }
    }
}

/// Copies an ndarray matrix into a nalgebra matrix.
pub(crate) fn to_dmatrix(a: &Array2<f64>) -> DMatrix<f64> {
    DMatrix::from_fn(a.nrows(), a.ncols(), |i, j| a[[i, j]])
}

/// Copies a nalgebra matrix into an ndarray matrix.
pub(crate) fn from_dmatrix(a: &DMatrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn((a.nrows(), a.ncols()), |(i, j)| a[(i, j)])
}
