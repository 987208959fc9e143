//! Utility functions and helpers for the kinfit-rs library.

pub mod finite_difference;
pub mod stats;

pub use stats::{max, mean, median, min, sample_std};
