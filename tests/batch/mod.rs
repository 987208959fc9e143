//! Tests for the batch driver

mod batch_fit_tests;
