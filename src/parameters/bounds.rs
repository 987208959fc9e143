//! Parameter bounds implementation
//!
//! This module provides box constraints for model parameters. The optimizer keeps
//! every trial point feasible by projecting it into the box, so a bound is simply a
//! closed `[min, max]` interval with infinite ends allowed.

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::f64::{INFINITY, NEG_INFINITY};
use thiserror::Error;

/// Errors that can occur when working with parameter bounds
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BoundsError {
    #[error("Invalid bounds: min ({min}) must not exceed max ({max})")]
    InvalidBounds { min: f64, max: f64 },

    #[error("Bounds contain NaN")]
    NanBound,

    #[error("Expected {expected} bounds, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}

/// Represents the bounds constraints on a parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Minimum allowed value for the parameter
    pub min: f64,

    /// Maximum allowed value for the parameter
    pub max: f64,
}

impl Serialize for Bounds {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;

        // Infinite ends are written as null
        let min = if self.min == NEG_INFINITY { None } else { Some(self.min) };
        let max = if self.max == INFINITY { None } else { Some(self.max) };

        let mut state = serializer.serialize_struct("Bounds", 2)?;
        state.serialize_field("min", &min)?;
        state.serialize_field("max", &max)?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for Bounds {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct BoundsHelper {
            #[serde(default)]
            min: Option<f64>,

            #[serde(default)]
            max: Option<f64>,
        }

        let helper = BoundsHelper::deserialize(deserializer)?;
        let min = helper.min.unwrap_or(NEG_INFINITY);
        let max = helper.max.unwrap_or(INFINITY);

        Bounds::new(min, max).map_err(serde::de::Error::custom)
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            min: NEG_INFINITY,
            max: INFINITY,
        }
    }
}

impl Bounds {
    /// Create a new bounds constraint with min and max values
    ///
    /// # Examples
    ///
    /// ```
    /// use kinfit_rs::parameters::bounds::Bounds;
    ///
    /// let bounds = Bounds::new(0.0, 10.0).unwrap();
    /// assert_eq!(bounds.min, 0.0);
    /// assert_eq!(bounds.max, 10.0);
    /// ```
    pub fn new(min: f64, max: f64) -> Result<Self, BoundsError> {
        if min.is_nan() || max.is_nan() {
            return Err(BoundsError::NanBound);
        }
        if min > max {
            return Err(BoundsError::InvalidBounds { min, max });
        }

        Ok(Self { min, max })
    }

    /// Create an unbounded constraint (negative infinity to positive infinity)
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Create a bounds constraint with only a minimum value
    pub fn min_only(min: f64) -> Self {
        Self { min, max: INFINITY }
    }

    /// Create a bounds constraint with only a maximum value
    pub fn max_only(max: f64) -> Self {
        Self {
            min: NEG_INFINITY,
            max,
        }
    }

    /// `[0, ∞)`, the domain of rates and concentrations.
    pub fn non_negative() -> Self {
        Self::min_only(0.0)
    }

    /// `(0, ∞)`, represented as `[f64::MIN_POSITIVE, ∞)`.
    pub fn positive() -> Self {
        Self::min_only(f64::MIN_POSITIVE)
    }

    /// Check if a value is within the bounds
    pub fn is_within_bounds(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Check if the bounds are finite (both min and max are finite)
    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }

    /// Check if the parameter is bounded from below
    pub fn has_lower_bound(&self) -> bool {
        self.min.is_finite()
    }

    /// Check if the parameter is bounded from above
    pub fn has_upper_bound(&self) -> bool {
        self.max.is_finite()
    }

    /// Clamp a value to be within the bounds
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

/// Checks that there is exactly one bound per parameter.
pub fn check_len(bounds: &[Bounds], n_params: usize) -> Result<(), BoundsError> {
    if bounds.len() != n_params {
        return Err(BoundsError::LengthMismatch {
            expected: n_params,
            actual: bounds.len(),
        });
    }
    Ok(())
}

/// Projects a parameter vector into the box, component by component.
pub fn project(bounds: &[Bounds], params: &Array1<f64>) -> Array1<f64> {
    params
        .iter()
        .zip(bounds.iter())
        .map(|(&p, b)| b.clamp(p))
        .collect()
}

/// Returns true when every component lies inside its bound.
pub fn all_within(bounds: &[Bounds], params: &Array1<f64>) -> bool {
    params
        .iter()
        .zip(bounds.iter())
        .all(|(&p, b)| b.is_within_bounds(p))
}
