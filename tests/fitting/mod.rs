//! Tests for fitting single models to data

mod logistic_tests;
mod michaelis_menten_tests;
mod optimality_tests;
