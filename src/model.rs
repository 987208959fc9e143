//! Model trait and the adapter that turns a model plus data into a [`Problem`].
//!
//! A model is a pure parametric curve `y = f(x; θ)` with a fixed, canonical
//! parameter order. Models know their own default bounds, can guess starting values
//! from data, and provide analytical partial derivatives. They know nothing about
//! optimization; [`ModelProblem`] binds a model to a dataset for the optimizer.

use crate::error::{FitError, Result};
use crate::parameters::Bounds;
use crate::problem::Problem;
use ndarray::{Array1, Array2};

/// A parametric model `y = f(x; θ)` that can be fit to data.
pub trait Model {
    /// Short human-readable model name.
    fn name(&self) -> &str;

    /// Parameter names in canonical order.
    fn parameter_names(&self) -> &[&'static str];

    /// Number of parameters.
    fn parameter_count(&self) -> usize {
        self.parameter_names().len()
    }

    /// Evaluates the model at a single x value. `params` has `parameter_count()` entries.
    fn eval_point(&self, x: f64, params: &[f64]) -> f64;

    /// Writes `∂f/∂θ_j` at a single x value into `grad`.
    fn gradient_point(&self, x: f64, params: &[f64], grad: &mut [f64]);

    /// Box bounds per parameter, in canonical order.
    fn default_bounds(&self) -> Vec<Bounds>;

    /// Data-derived starting values.
    fn initial_guess(&self, x: &Array1<f64>, y: &Array1<f64>) -> Result<Array1<f64>>;

    /// Evaluates the model over a vector of x values.
    fn eval(&self, x: &Array1<f64>, params: &Array1<f64>) -> Result<Array1<f64>> {
        let p = self.checked_params(params)?;
        Ok(x.mapv(|xi| self.eval_point(xi, &p)))
    }

    /// Jacobian of the model values (not residuals): `J[i, j] = ∂f(x_i)/∂θ_j`.
    fn jacobian(&self, x: &Array1<f64>, params: &Array1<f64>) -> Result<Array2<f64>> {
        let p = self.checked_params(params)?;
        let mut jac = Array2::zeros((x.len(), p.len()));
        let mut grad = vec![0.0; p.len()];

        for (i, &xi) in x.iter().enumerate() {
            self.gradient_point(xi, &p, &mut grad);
            for (j, g) in grad.iter().enumerate() {
                jac[[i, j]] = *g;
            }
        }

        Ok(jac)
    }

    /// Copies `params` into a slice after checking its length.
    fn checked_params(&self, params: &Array1<f64>) -> Result<Vec<f64>> {
        if params.len() != self.parameter_count() {
            return Err(FitError::InvalidInput(format!(
                "{} expects {} parameters, got {}",
                self.name(),
                self.parameter_count(),
                params.len()
            )));
        }
        Ok(params.to_vec())
    }
}

/// An adapter that implements [`Problem`] for a model bound to data.
///
/// Residuals are `f(x_i; θ) − y_i`, so the residual Jacobian is the model Jacobian.
pub struct ModelProblem<'a, M: Model + ?Sized> {
    model: &'a M,
    x_data: &'a Array1<f64>,
    y_data: &'a Array1<f64>,
}

impl<'a, M: Model + ?Sized> ModelProblem<'a, M> {
    /// Create a new problem for `model` over paired `x`/`y` data.
    pub fn new(model: &'a M, x_data: &'a Array1<f64>, y_data: &'a Array1<f64>) -> Result<Self> {
        if x_data.len() != y_data.len() {
            return Err(FitError::InvalidInput(format!(
                "x has {} values but y has {}",
                x_data.len(),
                y_data.len()
            )));
        }
        Ok(Self {
            model,
            x_data,
            y_data,
        })
    }
}

impl<'a, M: Model + ?Sized> Problem for ModelProblem<'a, M> {
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
        Ok(self.model.eval(self.x_data, params)? - self.y_data)
    }

    fn parameter_count(&self) -> usize {
        self.model.parameter_count()
    }

    fn residual_count(&self) -> usize {
        self.x_data.len()
    }

    fn jacobian(&self, params: &Array1<f64>) -> Result<Array2<f64>> {
        self.model.jacobian(self.x_data, params)
    }

    fn has_custom_jacobian(&self) -> bool {
        true
    }
}
