//! # Confidence Interval Calculations
//!
//! Wald intervals from the covariance of a fit. The two-sided quantile comes from
//! the inverse standard normal CDF, so any confidence level in `(0, 1)` is supported.

use super::covariance::standard_errors_from_covariance;
use crate::error::{FitError, Result};
use crate::fit::FitResult;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use statrs::function::erf::erf;
use std::fmt;

/// A confidence interval for one parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    /// Name of the parameter
    pub parameter: String,

    /// Confidence level, e.g. 0.95
    pub level: f64,

    /// Point estimate
    pub estimate: f64,

    /// Standard error of the estimate
    pub std_error: f64,

    /// Lower bound
    pub lower: f64,

    /// Upper bound
    pub upper: f64,
}

impl ConfidenceInterval {
    /// The `(lower, upper)` pair.
    pub fn bounds(&self) -> (f64, f64) {
        (self.lower, self.upper)
    }

    pub fn half_width(&self) -> f64 {
        0.5 * (self.upper - self.lower)
    }

    pub fn contains(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }
}

impl fmt::Display for ConfidenceInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} = {:.6} [{:.6}, {:.6}] ({:.1}%)",
            self.parameter,
            self.estimate,
            self.lower,
            self.upper,
            self.level * 100.0
        )
    }
}

fn standard_normal() -> Result<Normal> {
    Normal::new(0.0, 1.0).map_err(|e| FitError::NumericalInstability(e.to_string()))
}

/// Two-sided standard normal quantile for a confidence level, `Φ⁻¹((1 + level) / 2)`.
///
/// Fails with `InvalidInput` unless `0 < level < 1`.
pub fn quantile_for_confidence(level: f64) -> Result<f64> {
    if !(level > 0.0 && level < 1.0) {
        return Err(FitError::InvalidInput(format!(
            "confidence level must be in (0, 1), got {}",
            level
        )));
    }
    Ok(standard_normal()?.inverse_cdf(0.5 * (1.0 + level)))
}

/// Convert a sigma level to a two-sided probability.
///
/// For example, 1-sigma corresponds to approximately 68.3% probability.
pub fn sigma_to_probability(sigma: f64) -> f64 {
    erf(sigma / std::f64::consts::SQRT_2)
}

/// Convert a two-sided probability to a sigma level.
///
/// For example, 95% probability corresponds to approximately 1.96-sigma.
pub fn probability_to_sigma(probability: f64) -> Result<f64> {
    quantile_for_confidence(probability)
}

/// Wald confidence intervals for every parameter of a fit.
///
/// Fails with `NumericalInstability` when the fit carries no covariance or a
/// variance is negative or not finite, and with `InvalidInput` for a level outside
/// `(0, 1)`.
pub fn confidence_intervals(fit: &FitResult, level: f64) -> Result<Vec<ConfidenceInterval>> {
    let covar = fit.covariance.as_ref().ok_or_else(|| {
        FitError::NumericalInstability(format!(
            "no covariance available ({} points for {} parameters)",
            fit.ndata,
            fit.params.len()
        ))
    })?;

    intervals_from_covariance(&fit.parameter_names, &fit.params, covar, level)
}

/// Wald confidence intervals from explicit estimates and covariance.
///
/// # Arguments
///
/// * `names` - Parameter names, one per estimate
/// * `params` - Point estimates
/// * `covar` - Covariance matrix of the estimates
/// * `level` - Confidence level in `(0, 1)`
pub fn intervals_from_covariance(
    names: &[String],
    params: &Array1<f64>,
    covar: &Array2<f64>,
    level: f64,
) -> Result<Vec<ConfidenceInterval>> {
    let n = params.len();
    if names.len() != n || covar.dim() != (n, n) {
        return Err(FitError::InvalidInput(format!(
            "{} estimates with {} names and a {:?} covariance",
            n,
            names.len(),
            covar.dim()
        )));
    }

    let z = quantile_for_confidence(level)?;
    let errors = standard_errors_from_covariance(covar)?;

    Ok(names
        .iter()
        .zip(params.iter())
        .zip(errors.iter())
        .map(|((name, &estimate), &std_error)| ConfidenceInterval {
            parameter: name.clone(),
            level,
            estimate,
            std_error,
            lower: estimate - z * std_error,
            upper: estimate + z * std_error,
        })
        .collect())
}
