use crate::test_helpers::seeded_rng;
use approx::assert_relative_eq;
use kinfit_rs::uncertainty::{correlation, standard_errors};
use kinfit_rs::{fit_model, synthesize, FitOptions, MichaelisMenten};
use ndarray::array;

#[test]
fn test_covariance_properties() {
    let model = MichaelisMenten::new();
    let x = array![0.25, 0.5, 1.0, 2.0, 4.0, 8.0, 16.0, 32.0];
    let y = synthesize(&model, &x, &array![6.0, 2.0], 0.1, &mut seeded_rng(99)).unwrap();
    let fit = fit_model(&model, &x, &y, &FitOptions::default()).unwrap();

    let covar = fit.covariance.as_ref().unwrap();
    assert_eq!(covar.dim(), (2, 2));
    assert_relative_eq!(covar[[0, 1]], covar[[1, 0]], max_relative = 1e-12);
    assert!(covar[[0, 0]] > 0.0 && covar[[1, 1]] > 0.0);
    assert!(covar[[0, 0]] * covar[[1, 1]] >= covar[[0, 1]].powi(2));

    let errors = standard_errors(&fit).unwrap();
    assert_relative_eq!(errors[0], covar[[0, 0]].sqrt());

    // Vmax and Km estimates are positively correlated for Michaelis-Menten data
    let correl = correlation(&fit).unwrap();
    assert_relative_eq!(correl[[0, 0]], 1.0);
    assert!(correl[[0, 1]] > 0.0 && correl[[0, 1]] < 1.0);

    // σ² = rss / (n − p)
    assert_relative_eq!(fit.redchi.unwrap(), fit.rss / 6.0);
}
