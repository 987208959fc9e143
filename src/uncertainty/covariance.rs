//! # Covariance Matrix Calculations
//!
//! This module provides functions for calculating and manipulating covariance
//! matrices from Jacobian matrices in nonlinear least-squares optimization.

use crate::error::{FitError, Result};
use crate::lm::step::{from_dmatrix, to_dmatrix};
use ndarray::{Array1, Array2};

/// Calculate the covariance matrix from the Jacobian at the optimum.
///
/// For nonlinear least-squares problems, the covariance matrix is estimated as:
///   covar = σ² · inv(Jᵗ J)
/// where:
///   - J is the Jacobian of the residuals
///   - σ² is the residual variance, `rss / (n − p)`
///
/// `JᵗJ` is first normalized to unit diagonal so the rank check does not depend
/// on the scale of each parameter. The matrix is singular when its smallest singular
/// value is at most `rcond` times its largest.
///
/// # Arguments
///
/// * `jacobian` - The `n × p` Jacobian
/// * `rss` - The residual sum of squares at the optimum
/// * `rcond` - Relative singular value cutoff
///
/// # Returns
///
/// * `Ok(None)` when `n == p`, since the residual variance is then undefined
/// * `Err(FitError::NumericalInstability)` when `JᵗJ` is singular
pub fn calculate_covariance(
    jacobian: &Array2<f64>,
    rss: f64,
    rcond: f64,
) -> Result<Option<Array2<f64>>> {
    let (n, p) = jacobian.dim();
    if n < p {
        return Err(FitError::InvalidInput(format!(
            "{} residuals cannot determine {} parameters",
            n, p
        )));
    }

    let jtj = jacobian.t().dot(jacobian);
    let diag: Array1<f64> = jtj.diag().to_owned();
    if let Some(i) = diag.iter().position(|d| !(d.is_finite() && *d > 0.0)) {
        return Err(FitError::NumericalInstability(format!(
            "parameter {} does not affect the residuals",
            i
        )));
    }

    let scale = diag.mapv(|d| 1.0 / d.sqrt());
    let scaled = Array2::from_shape_fn((p, p), |(i, j)| jtj[[i, j]] * scale[i] * scale[j]);

    let matrix = to_dmatrix(&scaled);
    let singular_values = matrix.clone().svd(false, false).singular_values;
    let s_max = singular_values.max();
    let s_min = singular_values.min();
    if !(s_min > rcond * s_max) {
        return Err(FitError::NumericalInstability(format!(
            "JᵗJ is singular (condition {:.3e})",
            s_max / s_min
        )));
    }

    if n == p {
        return Ok(None);
    }

    let inverse = matrix.try_inverse().ok_or_else(|| {
        FitError::NumericalInstability("failed to invert JᵗJ".to_string())
    })?;
    let inverse = from_dmatrix(&inverse);

    let variance = rss / (n - p) as f64;
    let covar = Array2::from_shape_fn((p, p), |(i, j)| {
        let sym = 0.5 * (inverse[[i, j]] + inverse[[j, i]]);
        variance * sym * scale[i] * scale[j]
    });

    Ok(Some(covar))
}

/// Calculate correlation matrix from covariance matrix.
///
/// The correlation matrix is calculated as:
///   correl[i,j] = covar[i,j] / sqrt(covar[i,i] * covar[j,j])
///
/// Entries involving a parameter with zero variance are 0 off the diagonal.
pub fn calculate_correlation(covar: &Array2<f64>) -> Array2<f64> {
    let n = covar.nrows();
    Array2::from_shape_fn((n, n), |(i, j)| {
        if i == j {
            return 1.0;
        }
        let denom = (covar[[i, i]] * covar[[j, j]]).sqrt();
        if denom > 0.0 {
            covar[[i, j]] / denom
        } else {
            0.0
        }
    })
}

/// Standard errors are the square roots of the covariance diagonal.
///
/// Fails with `NumericalInstability` if any variance is negative or not finite.
pub fn standard_errors_from_covariance(covar: &Array2<f64>) -> Result<Array1<f64>> {
    covar
        .diag()
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            if v.is_finite() && v >= 0.0 {
                Ok(v.sqrt())
            } else {
                Err(FitError::NumericalInstability(format!(
                    "variance of parameter {} is {}",
                    i, v
                )))
            }
        })
        .collect()
}
