//! Levenberg-Marquardt algorithm implementation.
//!
//! This module provides a bounded implementation of the Levenberg-Marquardt
//! algorithm for nonlinear least-squares optimization. Iterations are strictly
//! sequential; each step depends on the previous estimate and damping value.

pub mod algorithm;
pub mod config;
pub mod convergence;
pub mod damping;
pub mod step;

// Re-export key types
pub use algorithm::{LevenbergMarquardt, LmResult};
pub use config::LmConfig;
pub use convergence::{ConvergenceCriteria, ConvergenceStatus};
pub use damping::Damping;
pub use step::LmStep;
