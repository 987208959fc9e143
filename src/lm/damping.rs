//! Damping schedule for the Levenberg-Marquardt algorithm.
//!
//! The damping parameter shrinks after every step that lowers the cost and grows
//! after every rejected step, staying inside `[min_lambda, max_lambda]`.

use super::config::LmConfig;

/// Adaptive damping state for one minimization.
#[derive(Debug, Clone)]
pub struct Damping {
    /// Current value of the damping parameter
    pub lambda: f64,

    /// Minimum allowed value for the damping parameter
    pub lambda_min: f64,

    /// Maximum allowed value for the damping parameter
    pub lambda_max: f64,

    /// Factor to increase lambda by when a step is rejected
    pub lambda_increase_factor: f64,

    /// Factor to decrease lambda by when a step is accepted
    pub lambda_decrease_factor: f64,
}

impl Default for Damping {
    fn default() -> Self {
        Self::from(&LmConfig::default())
    }
}

impl From<&LmConfig> for Damping {
    fn from(config: &LmConfig) -> Self {
        Self {
            lambda: config
                .initial_lambda
                .clamp(config.min_lambda, config.max_lambda),
            lambda_min: config.min_lambda,
            lambda_max: config.max_lambda,
            lambda_increase_factor: config.lambda_up_factor,
            lambda_decrease_factor: config.lambda_down_factor,
        }
    }
}

impl Damping {
    /// Relaxes the damping after an accepted step.
    pub fn accept(&mut self) {
        self.lambda = (self.lambda * self.lambda_decrease_factor).max(self.lambda_min);
    }

    /// Tightens the damping after a rejected step.
    ///
    /// Returns `false` once lambda was already at its maximum, meaning no further
    /// retries are possible.
    pub fn reject(&mut self) -> bool {
        if self.lambda >= self.lambda_max {
            return false;
        }
        self.lambda = (self.lambda * self.lambda_increase_factor).min(self.lambda_max);
        true
    }
}
