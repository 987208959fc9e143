//! Implementation of the Levenberg-Marquardt algorithm.
//!
//! This module contains the bounded Levenberg-Marquardt loop: every trial point is
//! projected into the parameter box before it is evaluated, so the iterate is always
//! feasible.

use ndarray::{Array1, Array2};
use std::fmt;
use std::time::Instant;
use tracing::{debug, trace};

use crate::error::{FitError, Result};
use crate::parameters::bounds::{self, Bounds};
use crate::problem::Problem;

use super::config::LmConfig;
use super::convergence::{ConvergenceCriteria, ConvergenceStatus};
use super::damping::Damping;
use super::step::LmStep;

/// Result of the Levenberg-Marquardt optimization.
#[derive(Debug, Clone)]
pub struct LmResult {
    /// Optimized parameter values
    pub params: Array1<f64>,

    /// Residuals at the solution
    pub residuals: Array1<f64>,

    /// Sum of squared residuals
    pub cost: f64,

    /// Number of iterations performed
    pub iterations: usize,

    /// Number of residual evaluations, excluding Jacobians
    pub func_evals: usize,

    /// Whether the optimization converged
    pub success: bool,

    /// Terminal state of the iteration
    pub status: ConvergenceStatus,

    /// A message describing the result
    pub message: String,

    /// The Jacobian of the residuals at the solution
    pub jacobian: Array2<f64>,
}

impl fmt::Display for LmResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Optimization Result:")?;
        writeln!(f, "  Success: {}", self.success)?;
        writeln!(f, "  Message: {}", self.message)?;
        writeln!(f, "  Cost: {:.6e}", self.cost)?;
        writeln!(f, "  Iterations: {}", self.iterations)?;
        writeln!(f, "  Function evaluations: {}", self.func_evals)?;
        writeln!(f, "  Parameters: {:?}", self.params)?;
        Ok(())
    }
}

/// Outcome of the damping retries within one iteration.
enum StepOutcome {
    Accepted,
    Converged(ConvergenceStatus),
    Stalled,
}

/// The Levenberg-Marquardt optimizer.
#[derive(Debug, Clone, Default)]
pub struct LevenbergMarquardt {
    /// Configuration options
    config: LmConfig,
}

impl LevenbergMarquardt {
    /// Create a new Levenberg-Marquardt optimizer with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new Levenberg-Marquardt optimizer with the given configuration.
    pub fn with_config(config: LmConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    pub fn config(&self) -> &LmConfig {
        &self.config
    }

    /// Set the maximum number of iterations.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    /// Set the tolerance for the relative cost reduction.
    pub fn with_ftol(mut self, ftol: f64) -> Self {
        self.config.ftol = ftol;
        self
    }

    /// Set the tolerance for the relative parameter step.
    pub fn with_xtol(mut self, xtol: f64) -> Self {
        self.config.xtol = xtol;
        self
    }

    /// Set the tolerance for the scaled gradient.
    pub fn with_gtol(mut self, gtol: f64) -> Self {
        self.config.gtol = gtol;
        self
    }

    /// Set the initial value for the damping parameter.
    pub fn with_lambda(mut self, lambda: f64) -> Self {
        self.config.initial_lambda = lambda;
        self
    }

    /// Set the wall-clock budget for one minimization.
    pub fn with_max_duration(mut self, max_duration: std::time::Duration) -> Self {
        self.config.max_duration = Some(max_duration);
        self
    }

    /// Minimize the sum of squared residuals without bounds.
    pub fn minimize<P: Problem + ?Sized>(
        &self,
        problem: &P,
        initial_params: Array1<f64>,
    ) -> Result<LmResult> {
        let unbounded = vec![Bounds::unbounded(); initial_params.len()];
        self.minimize_bounded(problem, initial_params, &unbounded)
    }

    /// Minimize the sum of squared residuals subject to box constraints.
    ///
    /// The initial guess is projected into the box first. A run that ends without
    /// meeting a tolerance is returned with `success == false`; errors are reserved
    /// for invalid input, non-finite residuals at the start and an exceeded time
    /// budget.
    ///
    /// # Arguments
    ///
    /// * `problem` - The problem to solve
    /// * `initial_params` - Initial guess for the parameter values
    /// * `bounds` - One bound per parameter
    pub fn minimize_bounded<P: Problem + ?Sized>(
        &self,
        problem: &P,
        initial_params: Array1<f64>,
        bounds: &[Bounds],
    ) -> Result<LmResult> {
        let n_params = problem.parameter_count();
        if initial_params.len() != n_params {
            return Err(FitError::InvalidInput(format!(
                "Expected {} parameters, got {}",
                n_params,
                initial_params.len()
            )));
        }
        bounds::check_len(bounds, n_params)?;
        if initial_params.iter().any(|p| !p.is_finite()) {
            return Err(FitError::InvalidInput(
                "Initial parameters must be finite".to_string(),
            ));
        }

        let start = Instant::now();
        let criteria = ConvergenceCriteria::from(&self.config);
        let mut damping = Damping::from(&self.config);

        let mut params = bounds::project(bounds, &initial_params);
        let mut residuals = problem.eval(&params)?;
        let mut cost = sum_of_squares(&residuals);
        let mut func_evals = 1;
        let mut iterations = 0;
        // Set once a trial point has produced a finite cost
        let mut evaluated_finite = false;

        if !cost.is_finite() {
            return Err(FitError::NumericalInstability(
                "Residuals are not finite at the initial parameters".to_string(),
            ));
        }

        let status = loop {
            self.check_budget(start)?;

            if cost == 0.0 {
                break ConvergenceStatus::ZeroResidual;
            }
            if iterations >= self.config.max_iterations {
                break ConvergenceStatus::MaxIterationsReached;
            }

            let jacobian = problem.jacobian(&params)?;
            if jacobian.iter().any(|v| !v.is_finite()) {
                return Err(FitError::NumericalInstability(format!(
                    "Jacobian is not finite at iteration {}",
                    iterations
                )));
            }
            let (j_t_j, j_t_r) = free_system(
                bounds,
                &params,
                jacobian.t().dot(&jacobian),
                jacobian.t().dot(&residuals),
            );

            if criteria.gradient_converged(&j_t_j, &j_t_r, cost) {
                break ConvergenceStatus::GradientConvergence;
            }

            iterations += 1;

            let outcome = loop {
                self.check_budget(start)?;

                let step = match LmStep::calculate_step(&j_t_j, &j_t_r, damping.lambda) {
                    Some(step) => step,
                    None => {
                        if damping.reject() {
                            continue;
                        }
                        break StepOutcome::Stalled;
                    }
                };

                let trial = bounds::project(bounds, &(&params + &step));
                let projected_step = &trial - &params;
                if criteria.step_converged(&params, &projected_step) {
                    // A tiny step only means convergence if the neighbourhood is finite
                    if !evaluated_finite {
                        func_evals += 1;
                        if !problem.eval_cost(&trial)?.is_finite() {
                            break StepOutcome::Stalled;
                        }
                    }
                    break StepOutcome::Converged(ConvergenceStatus::ParameterConvergence);
                }

                let trial_residuals = problem.eval(&trial)?;
                let trial_cost = sum_of_squares(&trial_residuals);
                func_evals += 1;
                evaluated_finite |= trial_cost.is_finite();

                if trial_cost.is_finite() && trial_cost < cost {
                    trace!(
                        iteration = iterations,
                        cost = trial_cost,
                        lambda = damping.lambda,
                        "accepted step"
                    );
                    damping.accept();
                    let reduced_enough = criteria.cost_converged(cost, trial_cost);

                    params = trial;
                    residuals = trial_residuals;
                    cost = trial_cost;

                    if reduced_enough {
                        break StepOutcome::Converged(ConvergenceStatus::FunctionValueConvergence);
                    }
                    break StepOutcome::Accepted;
                }

                trace!(
                    iteration = iterations,
                    trial_cost,
                    lambda = damping.lambda,
                    "rejected step"
                );
                if !damping.reject() {
                    break StepOutcome::Stalled;
                }
            };

            match outcome {
                StepOutcome::Accepted => continue,
                StepOutcome::Converged(status) => break status,
                StepOutcome::Stalled => break ConvergenceStatus::DampingSaturated,
            }
        };

        debug!(
            ?status,
            iterations,
            func_evals,
            cost,
            analytic_jacobian = problem.has_custom_jacobian(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "optimization finished"
        );

        let message = match status {
            ConvergenceStatus::MaxIterationsReached => format!(
                "Maximum iterations ({}) reached",
                self.config.max_iterations
            ),
            other => other.description(),
        };

        Ok(LmResult {
            jacobian: problem.jacobian(&params)?,
            params,
            residuals,
            cost,
            iterations,
            func_evals,
            success: status.is_converged(),
            status,
            message,
        })
    }

    fn check_budget(&self, start: Instant) -> Result<()> {
        match self.config.max_duration {
            Some(budget) if start.elapsed() > budget => Err(FitError::Timeout(budget)),
            _ => Ok(()),
        }
    }
}

/// Freezes parameters that sit on a bound while the descent direction points out
/// of the box.
///
/// Their rows and columns of `JᵗJ` are replaced by the identity and their gradient
/// entries by zero, so the step leaves them in place and the remaining parameters
/// are solved for jointly.
fn free_system(
    bounds: &[Bounds],
    params: &Array1<f64>,
    mut j_t_j: Array2<f64>,
    mut j_t_r: Array1<f64>,
) -> (Array2<f64>, Array1<f64>) {
    let n = params.len();
    for i in 0..n {
        let g = j_t_r[i];
        let blocked = (params[i] <= bounds[i].min && g > 0.0)
            || (params[i] >= bounds[i].max && g < 0.0);
        if !blocked {
            continue;
        }
        for k in 0..n {
            j_t_j[[i, k]] = 0.0;
            j_t_j[[k, i]] = 0.0;
        }
        j_t_j[[i, i]] = 1.0;
        j_t_r[i] = 0.0;
    }
    (j_t_j, j_t_r)
}

fn sum_of_squares(residuals: &Array1<f64>) -> f64 {
    residuals.iter().map(|r| r.powi(2)).sum()
}
