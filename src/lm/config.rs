//! Configuration options for the Levenberg-Marquardt algorithm.
//!
//! This module defines the convergence tolerances, damping schedule and budgets
//! used by [`LevenbergMarquardt`](super::LevenbergMarquardt). The configuration is
//! serde-serializable so it can be stored alongside an analysis.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration options for the Levenberg-Marquardt algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LmConfig {
    /// Maximum number of iterations. Default: 200
    pub max_iterations: usize,

    /// Tolerance for the relative reduction of the residual sum. Default: 1e-10
    pub ftol: f64,

    /// Tolerance for the relative parameter step. Default: 1e-10
    pub xtol: f64,

    /// Tolerance for the scaled gradient (cosine between residuals and Jacobian columns). Default: 1e-10
    pub gtol: f64,

    /// Initial value for the damping parameter. Default: 1e-3
    pub initial_lambda: f64,

    /// Factor by which to increase lambda after a rejected step. Default: 10.0
    pub lambda_up_factor: f64,

    /// Factor by which to decrease lambda after an accepted step. Default: 0.1
    pub lambda_down_factor: f64,

    /// Minimum value for lambda. Default: 1e-12
    pub min_lambda: f64,

    /// Maximum value for lambda. Default: 1e12
    pub max_lambda: f64,

    /// Relative singular value threshold below which `JᵗJ` is treated as singular. Default: 1e-12
    pub singular_rcond: f64,

    /// Wall-clock budget for a single minimization. Default: none
    pub max_duration: Option<Duration>,
}

impl Default for LmConfig {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            ftol: 1e-10,
            xtol: 1e-10,
            gtol: 1e-10,
            initial_lambda: 1e-3,
            lambda_up_factor: 10.0,
            lambda_down_factor: 0.1,
            min_lambda: 1e-12,
            max_lambda: 1e12,
            singular_rcond: 1e-12,
            max_duration: None,
        }
    }
}
