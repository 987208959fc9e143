//! Convergence criteria for the optimizer.
//!
//! This module defines the criteria used to determine when the Levenberg-Marquardt
//! iteration has reached a solution, and the terminal states it can end in.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use super::config::LmConfig;

/// Possible convergence states for an optimization run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConvergenceStatus {
    /// The algorithm has converged due to a small parameter step.
    ParameterConvergence,

    /// The algorithm has converged due to a small relative reduction of the cost.
    FunctionValueConvergence,

    /// The algorithm has converged due to a small scaled gradient.
    GradientConvergence,

    /// The residuals vanished exactly.
    ZeroResidual,

    /// The algorithm has terminated due to reaching the maximum number of iterations.
    MaxIterationsReached,

    /// The damping parameter saturated without any step reducing the cost.
    DampingSaturated,
}

impl ConvergenceStatus {
    /// Returns true if the optimization has converged.
    pub fn is_converged(&self) -> bool {
        matches!(
            self,
            ConvergenceStatus::ParameterConvergence
                | ConvergenceStatus::FunctionValueConvergence
                | ConvergenceStatus::GradientConvergence
                | ConvergenceStatus::ZeroResidual
        )
    }

    /// Returns a description of the convergence status.
    pub fn description(&self) -> String {
        match self {
            ConvergenceStatus::ParameterConvergence => {
                "Converged: small parameter change".to_string()
            }
            ConvergenceStatus::FunctionValueConvergence => {
                "Converged: small function value change".to_string()
            }
            ConvergenceStatus::GradientConvergence => "Converged: small gradient".to_string(),
            ConvergenceStatus::ZeroResidual => "Converged: zero residual".to_string(),
            ConvergenceStatus::MaxIterationsReached => {
                "Terminated: maximum iterations reached".to_string()
            }
            ConvergenceStatus::DampingSaturated => {
                "Terminated: damping saturated without reducing the cost".to_string()
            }
        }
    }
}

/// Criteria for determining when an optimization algorithm has converged.
#[derive(Debug, Clone)]
pub struct ConvergenceCriteria {
    /// Tolerance for the relative parameter step.
    pub xtol: f64,

    /// Tolerance for the relative cost reduction.
    pub ftol: f64,

    /// Tolerance for the scaled gradient.
    pub gtol: f64,
}

impl Default for ConvergenceCriteria {
    fn default() -> Self {
        Self::from(&LmConfig::default())
    }
}

impl From<&LmConfig> for ConvergenceCriteria {
    fn from(config: &LmConfig) -> Self {
        Self {
            xtol: config.xtol,
            ftol: config.ftol,
            gtol: config.gtol,
        }
    }
}

impl ConvergenceCriteria {
    /// Creates a new set of convergence criteria with the given tolerances.
    pub fn new(xtol: f64, ftol: f64, gtol: f64) -> Self {
        Self { xtol, ftol, gtol }
    }

    /// Scaled gradient test.
    ///
    /// For each parameter j, `|(Jᵗr)_j| / (‖J_j‖·‖r‖)` is the cosine of the angle
    /// between the residual vector and the j-th Jacobian column; the iterate is
    /// stationary when the largest cosine drops below `gtol`.
    pub fn gradient_converged(&self, j_t_j: &Array2<f64>, j_t_r: &Array1<f64>, cost: f64) -> bool {
        let r_norm = cost.sqrt();
        if r_norm == 0.0 {
            return true;
        }

        let max_cosine = j_t_r
            .iter()
            .enumerate()
            .filter_map(|(j, g)| {
                let col_norm = j_t_j[[j, j]].sqrt();
                (col_norm > 0.0).then(|| g.abs() / (col_norm * r_norm))
            })
            .fold(0.0, f64::max);

        max_cosine < self.gtol
    }

    /// Relative step test: `‖δ‖ ≤ xtol·(‖x‖ + xtol)`.
    pub fn step_converged(&self, params: &Array1<f64>, step: &Array1<f64>) -> bool {
        let step_norm = step.dot(step).sqrt();
        let param_norm = params.dot(params).sqrt();
        step_norm <= self.xtol * (param_norm + self.xtol)
    }

    /// Relative cost reduction test for an accepted step.
    pub fn cost_converged(&self, cost: f64, new_cost: f64) -> bool {
        if cost <= 0.0 {
            return true;
        }
        (cost - new_cost).abs() / cost <= self.ftol
    }
}
