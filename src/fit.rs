//! Fitting a model to data.
//!
//! [`fit_model`] validates the data, picks bounds and starting values, runs the
//! bounded Levenberg-Marquardt optimizer and estimates the covariance of the
//! result. [`evaluate`] computes curve values from fitted parameters; the two are
//! kept separate so callers can compose them.

use crate::error::{FitError, Result};
use crate::lm::{LevenbergMarquardt, LmConfig};
use crate::model::{Model, ModelProblem};
use crate::parameters::bounds::{self, Bounds};
use crate::uncertainty::calculate_covariance;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Options for a single fit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FitOptions {
    /// Overrides the model's default bounds
    pub bounds: Option<Vec<Bounds>>,

    /// Overrides the model's data-derived starting values
    pub initial_guess: Option<Vec<f64>>,

    /// Optimizer settings
    pub config: LmConfig,
}

impl FitOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bounds(mut self, bounds: Vec<Bounds>) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn with_initial_guess(mut self, guess: Vec<f64>) -> Self {
        self.initial_guess = Some(guess);
        self
    }

    pub fn with_config(mut self, config: LmConfig) -> Self {
        self.config = config;
        self
    }
}

/// The outcome of a converged fit.
#[derive(Debug, Clone)]
pub struct FitResult {
    /// Name of the fitted model
    pub model: String,

    /// Parameter names in canonical order
    pub parameter_names: Vec<String>,

    /// Parameter estimates
    pub params: Array1<f64>,

    /// Covariance of the estimates; `None` when there are no residual degrees of freedom
    pub covariance: Option<Array2<f64>>,

    /// Residuals `model − data` at the estimate
    pub residuals: Array1<f64>,

    /// Residual sum of squares
    pub rss: f64,

    /// Number of data points
    pub ndata: usize,

    /// Residual degrees of freedom
    pub nfree: usize,

    /// Reduced residual variance `rss / nfree`
    pub redchi: Option<f64>,

    /// Coefficient of determination; `None` for data without variance
    pub r_squared: Option<f64>,

    /// Number of optimizer iterations
    pub iterations: usize,

    /// Number of residual evaluations
    pub func_evals: usize,

    pub converged: bool,

    /// Why the optimizer stopped
    pub message: String,
}

impl FitResult {
    /// Look up an estimate by parameter name.
    pub fn param(&self, name: &str) -> Option<f64> {
        self.parameter_names
            .iter()
            .position(|n| n == name)
            .map(|i| self.params[i])
    }

    /// Iterate over `(name, estimate)` pairs in canonical order.
    pub fn named_params(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.parameter_names
            .iter()
            .map(String::as_str)
            .zip(self.params.iter().copied())
    }
}

impl fmt::Display for FitResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Fit Result ({}):", self.model)?;
        writeln!(f, "  Converged: {} ({})", self.converged, self.message)?;
        writeln!(f, "  Data points: {}", self.ndata)?;
        writeln!(f, "  RSS: {:.6e}", self.rss)?;
        if let Some(r2) = self.r_squared {
            writeln!(f, "  R²: {:.6}", r2)?;
        }
        writeln!(f, "  Iterations: {}", self.iterations)?;
        for (name, value) in self.named_params() {
            writeln!(f, "  {}: {:.6}", name, value)?;
        }
        Ok(())
    }
}

fn check_finite(label: &str, values: &Array1<f64>) -> Result<()> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(i) => Err(FitError::InvalidInput(format!(
            "{}[{}] is not finite ({})",
            label, i, values[i]
        ))),
        None => Ok(()),
    }
}

/// Fit `model` to paired `x`/`y` data by bounded least squares.
///
/// # Arguments
///
/// * `model` - The model to fit
/// * `x` - Independent values
/// * `y` - Observed responses, one per x value
/// * `options` - Bounds, starting values and optimizer settings
///
/// # Errors
///
/// * `InvalidInput` for mismatched lengths, fewer points than parameters,
///   non-finite data, negative x values, or bounds/guesses of the wrong length
/// * `ConvergenceFailure` when no tolerance is met within the iteration limit or
///   the damping saturates
/// * `NumericalInstability` when the residuals are not finite at the start or
///   `JᵗJ` is singular at the optimum
/// * `Timeout` when `options.config.max_duration` is exceeded
pub fn fit_model<M: Model + ?Sized>(
    model: &M,
    x: &Array1<f64>,
    y: &Array1<f64>,
    options: &FitOptions,
) -> Result<FitResult> {
    let n_params = model.parameter_count();
    if x.len() != y.len() {
        return Err(FitError::InvalidInput(format!(
            "x has {} values but y has {}",
            x.len(),
            y.len()
        )));
    }
    if x.len() < n_params {
        return Err(FitError::InvalidInput(format!(
            "{} needs at least {} points, got {}",
            model.name(),
            n_params,
            x.len()
        )));
    }
    check_finite("x", x)?;
    check_finite("y", y)?;
    if let Some(i) = x.iter().position(|v| *v < 0.0) {
        return Err(FitError::InvalidInput(format!(
            "x[{}] is a negative concentration ({})",
            i, x[i]
        )));
    }

    let bounds = match &options.bounds {
        Some(b) => {
            bounds::check_len(b, n_params)?;
            // Fields are public, so re-validate
            b.iter()
                .map(|b| Bounds::new(b.min, b.max))
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
        None => model.default_bounds(),
    };

    let initial = match &options.initial_guess {
        Some(guess) => {
            if guess.len() != n_params {
                return Err(FitError::InvalidInput(format!(
                    "initial guess has {} values, {} expects {}",
                    guess.len(),
                    model.name(),
                    n_params
                )));
            }
            Array1::from_vec(guess.clone())
        }
        None => model.initial_guess(x, y)?,
    };

    let problem = ModelProblem::new(model, x, y)?;
    let optimizer = LevenbergMarquardt::with_config(options.config.clone());
    let result = optimizer.minimize_bounded(&problem, initial, &bounds)?;

    if !result.success {
        return Err(FitError::ConvergenceFailure(format!(
            "{} after {} iterations (rss = {:.6e})",
            result.message, result.iterations, result.cost
        )));
    }

    let ndata = x.len();
    let nfree = ndata - n_params;
    let covariance =
        calculate_covariance(&result.jacobian, result.cost, options.config.singular_rcond)?;

    let y_mean = y.sum() / ndata as f64;
    let tss: f64 = y.iter().map(|v| (v - y_mean).powi(2)).sum();
    let r_squared = (tss > 0.0).then(|| 1.0 - result.cost / tss);
    let redchi = (nfree > 0).then(|| result.cost / nfree as f64);

    debug!(
        model = model.name(),
        ndata,
        rss = result.cost,
        iterations = result.iterations,
        "fit converged: {}",
        result.message
    );

    Ok(FitResult {
        model: model.name().to_string(),
        parameter_names: model
            .parameter_names()
            .iter()
            .map(|s| s.to_string())
            .collect(),
        params: result.params,
        covariance,
        residuals: result.residuals,
        rss: result.cost,
        ndata,
        nfree,
        redchi,
        r_squared,
        iterations: result.iterations,
        func_evals: result.func_evals,
        converged: result.success,
        message: result.message,
    })
}

/// Evaluate a model at `x` with the given parameters.
pub fn evaluate<M: Model + ?Sized>(
    model: &M,
    x: &Array1<f64>,
    params: &Array1<f64>,
) -> Result<Array1<f64>> {
    model.eval(x, params)
}
