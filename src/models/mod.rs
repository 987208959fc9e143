//! Built-in models for enzyme kinetics and dose-response curves.

pub mod logistic;
pub mod michaelis_menten;

pub use logistic::{FourParameterLogistic, ThreeParameterLogistic};
pub use michaelis_menten::MichaelisMenten;
