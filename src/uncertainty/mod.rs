//! # Uncertainty Calculation
//!
//! This module provides functionality for calculating uncertainties in parameter
//! estimates from nonlinear least-squares optimization results. It includes:
//!
//! - Covariance matrix estimation from Jacobian matrices
//! - Standard errors and correlations of the estimates
//! - Wald confidence intervals at arbitrary confidence levels

mod confidence;
mod covariance;

pub use covariance::{
    calculate_correlation, calculate_covariance, standard_errors_from_covariance,
};

pub use confidence::{
    confidence_intervals, intervals_from_covariance, probability_to_sigma,
    quantile_for_confidence, sigma_to_probability, ConfidenceInterval,
};

use crate::error::{FitError, Result};
use crate::fit::FitResult;
use ndarray::{Array1, Array2};

fn require_covariance(fit: &FitResult) -> Result<&Array2<f64>> {
    fit.covariance.as_ref().ok_or_else(|| {
        FitError::NumericalInstability("fit has no covariance matrix".to_string())
    })
}

/// Standard errors of the fitted parameters.
pub fn standard_errors(fit: &FitResult) -> Result<Array1<f64>> {
    standard_errors_from_covariance(require_covariance(fit)?)
}

/// Correlation matrix of the fitted parameters.
pub fn correlation(fit: &FitResult) -> Result<Array2<f64>> {
    Ok(calculate_correlation(require_covariance(fit)?))
}
