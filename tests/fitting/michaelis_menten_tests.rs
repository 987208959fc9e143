use crate::test_helpers::{max_relative_error, standard_normal_draws};
use approx::assert_relative_eq;
use kinfit_rs::{evaluate, fit_model, FitError, FitOptions, MichaelisMenten};
use ndarray::{array, Array1};

fn substrate() -> Array1<f64> {
    array![0.5, 1.0, 2.0, 4.0, 8.0, 16.0, 32.0, 64.0]
}

#[test]
fn test_noiseless_recovery() {
    let model = MichaelisMenten::new();
    let x = substrate();
    let truth = array![10.0, 4.0];
    let y = evaluate(&model, &x, &truth).unwrap();

    let fit = fit_model(&model, &x, &y, &FitOptions::default()).unwrap();

    assert!(fit.converged);
    assert!(max_relative_error(&fit.params, &truth) < 1e-6);
    assert_eq!(fit.parameter_names, vec!["vmax", "km"]);
    assert_eq!(fit.ndata, 8);
    assert_eq!(fit.nfree, 6);
    assert_relative_eq!(fit.r_squared.unwrap(), 1.0, epsilon = 1e-9);
}

#[test]
fn test_error_grows_with_noise() {
    let model = MichaelisMenten::new();
    let x = substrate();
    let truth = array![10.0, 4.0];
    let exact = evaluate(&model, &x, &truth).unwrap();
    let draws = standard_normal_draws(x.len(), 2024);

    // Same draws scaled by increasing standard deviations
    let errors: Vec<f64> = [0.01, 0.05, 0.2, 0.5]
        .iter()
        .map(|&sd| {
            let y = &exact + &(&draws * sd);
            let fit = fit_model(&model, &x, &y, &FitOptions::default()).unwrap();
            max_relative_error(&fit.params, &truth)
        })
        .collect();

    for pair in errors.windows(2) {
        assert!(
            pair[0] < pair[1],
            "recovery error should grow with noise: {:?}",
            errors
        );
    }
}

#[test]
fn test_explicit_guess_and_bounds() {
    let model = MichaelisMenten::new();
    let x = substrate();
    let y = evaluate(&model, &x, &array![10.0, 4.0]).unwrap();

    // Km capped below its true value
    let options = FitOptions::new()
        .with_initial_guess(vec![5.0, 1.0])
        .with_bounds(vec![
            kinfit_rs::Bounds::non_negative(),
            kinfit_rs::Bounds::new(0.0, 2.0).unwrap(),
        ]);
    let fit = fit_model(&model, &x, &y, &options).unwrap();

    assert!(fit.params[1] <= 2.0);
    assert_relative_eq!(fit.params[1], 2.0, epsilon = 1e-8);
    assert!(fit.rss > 0.0);
}

#[test]
fn test_single_concentration_is_singular() {
    let model = MichaelisMenten::new();
    let x = array![2.0, 2.0, 2.0, 2.0];
    let y = array![1.0, 1.1, 0.9, 1.05];

    let err = fit_model(&model, &x, &y, &FitOptions::default()).unwrap_err();
    assert!(
        matches!(err, FitError::NumericalInstability(_)),
        "unexpected error: {}",
        err
    );
}

#[test]
fn test_infinite_substrate_rejected() {
    let model = MichaelisMenten::new();
    let x = array![1.0, f64::INFINITY, 3.0];
    let y = array![1.0, 2.0, 3.0];

    assert!(matches!(
        fit_model(&model, &x, &y, &FitOptions::default()),
        Err(FitError::InvalidInput(_))
    ));
}
