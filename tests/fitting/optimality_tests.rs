//! The reported optimum must be a local minimum of the residual sum within the bounds.

use crate::test_helpers::{rss, seeded_rng};
use kinfit_rs::{
    fit_model, synthesize, Bounds, FitOptions, FourParameterLogistic, MichaelisMenten, Model,
};
use ndarray::{array, Array1};
use rand::Rng;

fn assert_local_minimum<M: Model>(model: &M, x: &Array1<f64>, y: &Array1<f64>, seed: u64) {
    let fit = fit_model(model, x, y, &FitOptions::default()).unwrap();
    let best = rss(model, x, y, &fit.params);
    let bounds = model.default_bounds();
    let mut rng = seeded_rng(seed);

    for _ in 0..200 {
        let perturbed: Array1<f64> = fit
            .params
            .iter()
            .zip(bounds.iter())
            .map(|(&p, b): (&f64, &Bounds)| {
                let delta = rng.gen_range(-0.02..0.02) * p.abs().max(1e-3);
                b.clamp(p + delta)
            })
            .collect();

        let value = rss(model, x, y, &perturbed);
        assert!(
            value >= best - 1e-9 * best.max(1.0),
            "perturbation {:?} lowered rss from {} to {}",
            perturbed,
            best,
            value
        );
    }
}

#[test]
fn test_michaelis_menten_local_optimality() {
    let model = MichaelisMenten::new();
    let x = array![0.5, 1.0, 2.0, 4.0, 8.0, 16.0, 32.0];
    let y = synthesize(&model, &x, &array![8.0, 3.0], 0.2, &mut seeded_rng(11)).unwrap();

    assert_local_minimum(&model, &x, &y, 12);
}

#[test]
fn test_logistic_local_optimality() {
    let model = FourParameterLogistic::new();
    let x = array![0.0, 0.1, 0.3, 1.0, 3.0, 10.0, 30.0, 100.0];
    let y = synthesize(&model, &x, &array![8.0, 92.0, 2.5, 1.2], 2.0, &mut seeded_rng(21)).unwrap();

    assert_local_minimum(&model, &x, &y, 22);
}
