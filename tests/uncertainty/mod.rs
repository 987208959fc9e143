//! Tests for uncertainty calculation

mod confidence_intervals_tests;
mod covariance_tests;
