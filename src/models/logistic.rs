//! Logistic dose-response models.
//!
//! Both models share the inhibition-curve convention: with a positive Hill slope the
//! response falls from `top` toward `bottom` as the concentration rises.
//!
//! y(x) = bottom + (top - bottom) / (1 + (x / ic50)^hill)
//!
//! The default bounds assume responses expressed as a percentage of control:
//! bottom and top in `[0, 100]`, ic50 strictly positive, hill in `[0, 5]`.

use crate::error::{FitError, Result};
use crate::model::Model;
use crate::parameters::bounds::{self, Bounds};
use crate::utils::stats;
use ndarray::Array1;

const FOUR_PARAMETER_NAMES: [&str; 4] = ["bottom", "top", "ic50", "hill"];
const THREE_PARAMETER_NAMES: [&str; 3] = ["bottom", "top", "ic50"];

/// Upper limit of the Hill slope in the default bounds.
pub const MAX_HILL: f64 = 5.0;

fn percent_bounds() -> Bounds {
    Bounds {
        min: 0.0,
        max: 100.0,
    }
}

/// `s = 1 / (1 + (x / ic50)^hill)` and `s·(1 - s)`, stable when the power overflows.
fn logistic_terms(x: f64, ic50: f64, hill: f64) -> (f64, f64) {
    let u = (x / ic50).powf(hill);
    let s = 1.0 / (1.0 + u);
    (s, s * (1.0 - s))
}

fn logistic_value(x: f64, bottom: f64, top: f64, ic50: f64, hill: f64) -> f64 {
    let (s, _) = logistic_terms(x, ic50, hill);
    bottom + (top - bottom) * s
}

/// Fills the partials for `(bottom, top, ic50)` and returns `s·(1 - s)` for reuse.
fn logistic_gradient(x: f64, bottom: f64, top: f64, ic50: f64, hill: f64, grad: &mut [f64]) -> f64 {
    let (s, ds) = logistic_terms(x, ic50, hill);
    grad[0] = 1.0 - s;
    grad[1] = s;
    grad[2] = (top - bottom) * hill * ds / ic50;
    ds
}

/// Starting values shared by both logistic models: bottom = min(y), top = max(y),
/// ic50 = median of the positive concentrations.
fn logistic_guess(x: &Array1<f64>, y: &Array1<f64>) -> Result<(f64, f64, f64)> {
    let y = y.to_vec();
    let bottom = stats::min(&y);
    let top = stats::max(&y);

    let positive: Vec<f64> = x.iter().copied().filter(|v| *v > 0.0).collect();
    let ic50 = stats::median(&positive).or_else(|| stats::median(&x.to_vec()));

    match (bottom, top, ic50) {
        (Some(bottom), Some(top), Some(ic50)) => Ok((bottom, top, ic50)),
        _ => Err(FitError::InvalidInput(
            "cannot guess logistic parameters from empty data".into(),
        )),
    }
}

/// The four-parameter logistic (4PL) dose-response model
///
/// Parameters in canonical order: `(bottom, top, ic50, hill)`.
#[derive(Debug, Clone)]
pub struct FourParameterLogistic {
    bounds: Vec<Bounds>,
}

impl Default for FourParameterLogistic {
    fn default() -> Self {
        Self::percent_response()
    }
}

impl FourParameterLogistic {
    /// Same as [`FourParameterLogistic::percent_response`].
    pub fn new() -> Self {
        Self::percent_response()
    }

    /// Responses are percentages of control: bottom and top are capped to `[0, 100]`.
    pub fn percent_response() -> Self {
        Self {
            bounds: vec![
                percent_bounds(),
                percent_bounds(),
                Bounds::positive(),
                Bounds {
                    min: 0.0,
                    max: MAX_HILL,
                },
            ],
        }
    }

    /// Responses in arbitrary units: bottom and top are unbounded.
    pub fn unbounded_response() -> Self {
        let mut model = Self::percent_response();
        model.bounds[0] = Bounds::unbounded();
        model.bounds[1] = Bounds::unbounded();
        model
    }

    /// Replace the bounds for `(bottom, top, ic50, hill)`.
    pub fn with_bounds(mut self, bounds: Vec<Bounds>) -> Result<Self> {
        bounds::check_len(&bounds, FOUR_PARAMETER_NAMES.len())?;
        self.bounds = bounds;
        Ok(self)
    }
}

impl Model for FourParameterLogistic {
    fn name(&self) -> &str {
        "logistic4"
    }

    fn parameter_names(&self) -> &[&'static str] {
        &FOUR_PARAMETER_NAMES
    }

    fn eval_point(&self, x: f64, params: &[f64]) -> f64 {
        logistic_value(x, params[0], params[1], params[2], params[3])
    }

    fn gradient_point(&self, x: f64, params: &[f64], grad: &mut [f64]) {
        let (bottom, top, ic50, hill) = (params[0], params[1], params[2], params[3]);
        let ds = logistic_gradient(x, bottom, top, ic50, hill, grad);

        // ln(x / ic50) diverges at x = 0 and on the saturated plateaus, where the
        // curve does not depend on hill
        grad[3] = if x > 0.0 && ds > 0.0 {
            -(top - bottom) * ds * (x / ic50).ln()
        } else {
            0.0
        };
    }

    fn default_bounds(&self) -> Vec<Bounds> {
        self.bounds.clone()
    }

    fn initial_guess(&self, x: &Array1<f64>, y: &Array1<f64>) -> Result<Array1<f64>> {
        let (bottom, top, ic50) = logistic_guess(x, y)?;
        Ok(bounds::project(
            &self.bounds,
            &Array1::from_vec(vec![bottom, top, ic50, 1.0]),
        ))
    }
}

/// The three-parameter logistic model: a 4PL with the Hill slope fixed at 1
///
/// Parameters in canonical order: `(bottom, top, ic50)`.
#[derive(Debug, Clone)]
pub struct ThreeParameterLogistic {
    bounds: Vec<Bounds>,
}

impl Default for ThreeParameterLogistic {
    fn default() -> Self {
        Self::percent_response()
    }
}

impl ThreeParameterLogistic {
    pub fn new() -> Self {
        Self::percent_response()
    }

    pub fn percent_response() -> Self {
        Self {
            bounds: vec![percent_bounds(), percent_bounds(), Bounds::positive()],
        }
    }

    pub fn unbounded_response() -> Self {
        Self {
            bounds: vec![Bounds::unbounded(), Bounds::unbounded(), Bounds::positive()],
        }
    }

    /// Replace the bounds for `(bottom, top, ic50)`.
    pub fn with_bounds(mut self, bounds: Vec<Bounds>) -> Result<Self> {
        bounds::check_len(&bounds, THREE_PARAMETER_NAMES.len())?;
        self.bounds = bounds;
        Ok(self)
    }
}

impl Model for ThreeParameterLogistic {
    fn name(&self) -> &str {
        "logistic3"
    }

    fn parameter_names(&self) -> &[&'static str] {
        &THREE_PARAMETER_NAMES
    }

    fn eval_point(&self, x: f64, params: &[f64]) -> f64 {
        logistic_value(x, params[0], params[1], params[2], 1.0)
    }

    fn gradient_point(&self, x: f64, params: &[f64], grad: &mut [f64]) {
        logistic_gradient(x, params[0], params[1], params[2], 1.0, grad);
    }

    fn default_bounds(&self) -> Vec<Bounds> {
        self.bounds.clone()
    }

    fn initial_guess(&self, x: &Array1<f64>, y: &Array1<f64>) -> Result<Array1<f64>> {
        let (bottom, top, ic50) = logistic_guess(x, y)?;
        Ok(bounds::project(
            &self.bounds,
            &Array1::from_vec(vec![bottom, top, ic50]),
        ))
    }
}
