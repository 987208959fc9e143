use crate::test_helpers::seeded_rng;
use approx::assert_relative_eq;
use kinfit_rs::uncertainty::quantile_for_confidence;
use kinfit_rs::{
    confidence_intervals, fit_model, synthesize, FitError, FitOptions, FitResult,
    FourParameterLogistic, MichaelisMenten,
};
use ndarray::array;

fn noisy_logistic_fit() -> FitResult {
    let model = FourParameterLogistic::new();
    let x = array![0.0, 0.1, 0.3, 1.0, 3.0, 10.0, 30.0, 100.0, 300.0];
    let y = synthesize(&model, &x, &array![5.0, 95.0, 4.0, 1.0], 1.5, &mut seeded_rng(5)).unwrap();
    fit_model(&model, &x, &y, &FitOptions::default()).unwrap()
}

#[test]
fn test_intervals_are_symmetric() {
    let fit = noisy_logistic_fit();
    let intervals = confidence_intervals(&fit, 0.95).unwrap();

    assert_eq!(intervals.len(), 4);
    for (ci, &estimate) in intervals.iter().zip(fit.params.iter()) {
        assert_relative_eq!(ci.estimate, estimate);
        assert_relative_eq!(estimate - ci.lower, ci.upper - estimate, epsilon = 1e-9);
        assert!(ci.lower <= ci.upper);
        assert_eq!(ci.level, 0.95);
    }
    assert_eq!(intervals[2].parameter, "ic50");
}

#[test]
fn test_intervals_are_nested() {
    let fit = noisy_logistic_fit();
    let ci90 = confidence_intervals(&fit, 0.90).unwrap();
    let ci95 = confidence_intervals(&fit, 0.95).unwrap();
    let ci99 = confidence_intervals(&fit, 0.99).unwrap();

    for i in 0..fit.params.len() {
        assert!(ci99[i].lower <= ci95[i].lower && ci95[i].lower <= ci90[i].lower);
        assert!(ci90[i].upper <= ci95[i].upper && ci95[i].upper <= ci99[i].upper);
    }
}

#[test]
fn test_width_follows_normal_quantile() {
    let fit = noisy_logistic_fit();
    let ci68 = confidence_intervals(&fit, 0.6827).unwrap();
    let ci95 = confidence_intervals(&fit, 0.95).unwrap();

    let ratio = quantile_for_confidence(0.95).unwrap() / quantile_for_confidence(0.6827).unwrap();
    for (a, b) in ci68.iter().zip(ci95.iter()) {
        if a.half_width() > 0.0 {
            assert_relative_eq!(b.half_width() / a.half_width(), ratio, max_relative = 1e-9);
        }
    }
    assert_relative_eq!(ratio, 1.96, epsilon = 1e-2);
}

#[test]
fn test_invalid_level() {
    let fit = noisy_logistic_fit();
    for level in [0.0, 1.0, 95.0] {
        assert!(matches!(
            confidence_intervals(&fit, level),
            Err(FitError::InvalidInput(_))
        ));
    }
}

#[test]
fn test_no_covariance_without_residual_freedom() {
    let model = MichaelisMenten::new();
    let x = array![1.0, 5.0];
    let y = array![2.0, 5.0];
    let fit = fit_model(&model, &x, &y, &FitOptions::default()).unwrap();

    assert!(fit.covariance.is_none());
    assert!(matches!(
        confidence_intervals(&fit, 0.95),
        Err(FitError::NumericalInstability(_))
    ));
}
