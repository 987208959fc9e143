use approx::assert_relative_eq;
use kinfit_rs::{
    evaluate, fit_model, FitOptions, FourParameterLogistic, Model, ThreeParameterLogistic,
};
use ndarray::{array, Array1};

#[test]
fn test_four_parameter_scenario() {
    let model = FourParameterLogistic::new();
    let x = array![0.0, 1.0, 2.0, 4.0, 8.0, 16.0, 32.0];
    let y = evaluate(&model, &x, &array![0.0, 100.0, 4.0, 1.0]).unwrap();

    let fit = fit_model(&model, &x, &y, &FitOptions::default()).unwrap();

    let bottom = fit.param("bottom").unwrap();
    let top = fit.param("top").unwrap();
    let ic50 = fit.param("ic50").unwrap();
    let hill = fit.param("hill").unwrap();

    assert_relative_eq!(ic50, 4.0, max_relative = 0.01);
    assert_relative_eq!(hill, 1.0, max_relative = 0.05);
    assert_relative_eq!(bottom, 0.0, epsilon = 0.5);
    assert_relative_eq!(top, 100.0, epsilon = 0.5);

    // Estimates respect the percent-response bounds
    assert!((0.0..=100.0).contains(&bottom));
    assert!((0.0..=100.0).contains(&top));
}

#[test]
fn test_fitted_curve_is_monotonic() {
    let model = FourParameterLogistic::new();
    let x = array![0.01, 0.03, 0.1, 0.3, 1.0, 3.0, 10.0, 30.0, 100.0];
    let truth = array![5.0, 95.0, 0.8, 1.5];
    let y = evaluate(&model, &x, &truth).unwrap();

    let fit = fit_model(&model, &x, &y, &FitOptions::default()).unwrap();
    assert_relative_eq!(fit.params[2], 0.8, max_relative = 0.01);
    assert_relative_eq!(fit.params[3], 1.5, max_relative = 0.05);
    assert!(fit.params[3] > 0.0);

    let grid = Array1::logspace(10.0, -3.0, 3.0, 200);
    let curve = evaluate(&model, &grid, &fit.params).unwrap();
    for pair in curve.as_slice().unwrap().windows(2) {
        assert!(pair[1] <= pair[0]);
    }
}

#[test]
fn test_unbounded_response_units() {
    // Raw signal counts far outside [0, 100]
    let model = FourParameterLogistic::unbounded_response();
    let x = array![0.1, 0.3, 1.0, 3.0, 10.0, 30.0, 100.0, 300.0];
    let truth = array![1500.0, 42000.0, 12.0, 0.9];
    let y = evaluate(&model, &x, &truth).unwrap();

    let fit = fit_model(&model, &x, &y, &FitOptions::default()).unwrap();
    assert_relative_eq!(fit.params[0], 1500.0, max_relative = 1e-3);
    assert_relative_eq!(fit.params[1], 42000.0, max_relative = 1e-3);
    assert_relative_eq!(fit.params[2], 12.0, max_relative = 0.01);

    // The percent-response model cannot reach that plateau
    let capped = fit_model(&FourParameterLogistic::new(), &x, &y, &FitOptions::default());
    if let Ok(capped) = capped {
        assert!(capped.params[1] <= 100.0);
    }
}

#[test]
fn test_three_parameter_recovery() {
    let model = ThreeParameterLogistic::new();
    let x = array![0.0, 0.5, 1.0, 2.0, 4.0, 8.0, 16.0, 32.0];
    let truth = array![10.0, 90.0, 3.0];
    let y = evaluate(&model, &x, &truth).unwrap();

    let fit = fit_model(&model, &x, &y, &FitOptions::default()).unwrap();
    assert_eq!(fit.params.len(), model.parameter_count());
    assert_relative_eq!(fit.params[0], 10.0, epsilon = 1e-4);
    assert_relative_eq!(fit.params[1], 90.0, epsilon = 1e-4);
    assert_relative_eq!(fit.params[2], 3.0, max_relative = 1e-5);
}
