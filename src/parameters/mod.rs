//! # Parameter Bounds
//!
//! Box constraints for model parameters. Every model publishes one [`Bounds`] per
//! parameter in its canonical parameter order; callers may override them per fit.

pub mod bounds;

// Re-export key types
pub use bounds::{Bounds, BoundsError};
