//! # kinfit-rs
//!
//! `kinfit-rs` fits enzyme kinetics and dose-response models to laboratory data
//! with a bounded Levenberg-Marquardt optimizer.
//!
//! The library provides:
//! - Michaelis-Menten and three/four-parameter logistic models with analytical
//!   derivatives, default bounds and data-derived starting values
//! - A bounded Levenberg-Marquardt implementation with covariance estimation
//! - Wald confidence intervals at any confidence level
//! - Replicate aggregation by exact concentration
//! - A batch driver that fits independent groups in parallel and records a skip
//!   reason for every group that cannot be fitted
//!
//! ## Basic Usage
//!
//! ```
//! use kinfit_rs::{evaluate, fit_model, FitOptions, MichaelisMenten};
//! use ndarray::array;
//!
//! let model = MichaelisMenten::new();
//! let s = array![0.5, 1.0, 2.0, 4.0, 8.0, 16.0];
//! let v = evaluate(&model, &s, &array![12.0, 3.0]).unwrap();
//!
//! let fit = fit_model(&model, &s, &v, &FitOptions::default()).unwrap();
//! assert!((fit.params[0] - 12.0).abs() < 1e-6);
//! assert!((fit.params[1] - 3.0).abs() < 1e-6);
//! ```

// Public modules
pub mod error;

// Parameter bounds
pub mod parameters;

pub mod utils;

pub mod problem;

pub mod lm;

pub mod model;

pub mod models;

pub mod fit;

pub mod uncertainty;

pub mod data;

pub mod batch;

pub mod simulate;

// Re-exports for convenience
pub use error::{FitError, FitErrorKind, Result};

pub use batch::{batch_fit, BatchConfig, BatchFitter, BatchRecord, BatchReport, ResultRow};
pub use data::{aggregate, Dataset, Observation, ReplicatePoint, ReplicateSet};
pub use fit::{evaluate, fit_model, FitOptions, FitResult};
pub use lm::{LevenbergMarquardt, LmConfig};
pub use model::Model;
pub use models::{FourParameterLogistic, MichaelisMenten, ThreeParameterLogistic};
pub use parameters::Bounds;
pub use problem::Problem;
pub use simulate::synthesize;
pub use uncertainty::{confidence_intervals, ConfidenceInterval};

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
