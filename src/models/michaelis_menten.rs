//! Michaelis-Menten enzyme kinetics.

use crate::error::{FitError, Result};
use crate::model::Model;
use crate::parameters::Bounds;
use crate::utils::stats;
use ndarray::Array1;

const PARAMETER_NAMES: [&str; 2] = ["vmax", "km"];

/// The Michaelis-Menten rate law
///
/// v(S) = vmax * S / (km + S)
///
/// Where:
/// - vmax: the limiting reaction velocity
/// - km: the substrate concentration at half-maximal velocity
///
/// Both parameters are bounded to `[0, ∞)`. The rate is defined as 0 when
/// `km + S == 0`.
#[derive(Debug, Clone)]
pub struct MichaelisMenten {
    bounds: Vec<Bounds>,
}

impl Default for MichaelisMenten {
    fn default() -> Self {
        Self::new()
    }
}

impl MichaelisMenten {
    /// Create a Michaelis-Menten model with non-negative bounds on both parameters.
    pub fn new() -> Self {
        Self {
            bounds: vec![Bounds::non_negative(), Bounds::non_negative()],
        }
    }

    /// Replace the default bounds.
    ///
    /// # Arguments
    ///
    /// * `bounds` - Bounds for `(vmax, km)`, in that order
    pub fn with_bounds(mut self, bounds: Vec<Bounds>) -> Result<Self> {
        crate::parameters::bounds::check_len(&bounds, PARAMETER_NAMES.len())?;
        self.bounds = bounds;
        Ok(self)
    }
}

impl Model for MichaelisMenten {
    fn name(&self) -> &str {
        "michaelis-menten"
    }

    fn parameter_names(&self) -> &[&'static str] {
        &PARAMETER_NAMES
    }

    fn eval_point(&self, s: f64, params: &[f64]) -> f64 {
        let (vmax, km) = (params[0], params[1]);
        let denom = km + s;
        if denom == 0.0 {
            0.0
        } else {
            vmax * s / denom
        }
    }

    fn gradient_point(&self, s: f64, params: &[f64], grad: &mut [f64]) {
        let (vmax, km) = (params[0], params[1]);
        let denom = km + s;
        if denom == 0.0 {
            grad[0] = 0.0;
            grad[1] = 0.0;
            return;
        }
        grad[0] = s / denom;
        grad[1] = -vmax * s / (denom * denom);
    }

    fn default_bounds(&self) -> Vec<Bounds> {
        self.bounds.clone()
    }

    fn initial_guess(&self, x: &Array1<f64>, y: &Array1<f64>) -> Result<Array1<f64>> {
        let x = x.to_vec();
        let y = y.to_vec();

        let vmax = stats::max(&y)
            .ok_or_else(|| FitError::InvalidInput("cannot guess vmax from empty data".into()))?;
        let km = stats::median(&x)
            .ok_or_else(|| FitError::InvalidInput("cannot guess km from empty data".into()))?;

        Ok(Array1::from_vec(vec![vmax, km]))
    }
}
