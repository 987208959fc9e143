//! Synthetic data generation.
//!
//! Used to validate fits against known parameters. Noise is Gaussian and drawn from
//! a caller-supplied RNG, so a seeded RNG gives reproducible data.

use crate::data::Observation;
use crate::error::{FitError, Result};
use crate::model::Model;
use ndarray::Array1;
use rand::Rng;
use rand_distr::{Distribution, Normal};

fn noise_distribution(noise_sd: f64) -> Result<Option<Normal<f64>>> {
    if !(noise_sd.is_finite() && noise_sd >= 0.0) {
        return Err(FitError::InvalidInput(format!(
            "noise standard deviation must be finite and non-negative, got {}",
            noise_sd
        )));
    }
    if noise_sd == 0.0 {
        return Ok(None);
    }
    Normal::new(0.0, noise_sd)
        .map(Some)
        .map_err(|e| FitError::InvalidInput(e.to_string()))
}

/// Evaluate `model` at `x` and add Gaussian noise with standard deviation `noise_sd`.
///
/// A `noise_sd` of 0 returns the exact curve and draws nothing from `rng`.
pub fn synthesize<M, R>(
    model: &M,
    x: &Array1<f64>,
    params: &Array1<f64>,
    noise_sd: f64,
    rng: &mut R,
) -> Result<Array1<f64>>
where
    M: Model + ?Sized,
    R: Rng + ?Sized,
{
    let noise = noise_distribution(noise_sd)?;
    let mut y = model.eval(x, params)?;
    if let Some(noise) = noise {
        y.mapv_inplace(|v| v + noise.sample(rng));
    }
    Ok(y)
}

/// Noisy replicate observations for one group.
///
/// Produces `replicates` observations per concentration, tagged with `group` and
/// replicate ids `rep1`, `rep2`, ...
pub fn synthesize_replicates<M, R>(
    model: &M,
    concentrations: &[f64],
    params: &Array1<f64>,
    replicates: usize,
    noise_sd: f64,
    group: &str,
    rng: &mut R,
) -> Result<Vec<Observation>>
where
    M: Model + ?Sized,
    R: Rng + ?Sized,
{
    let x = Array1::from_vec(concentrations.to_vec());
    let mut observations = Vec::with_capacity(concentrations.len() * replicates);

    for rep in 1..=replicates {
        let y = synthesize(model, &x, params, noise_sd, rng)?;
        observations.extend(x.iter().zip(y.iter()).map(|(&xi, &yi)| {
            Observation::new(xi, yi)
                .with_group(group)
                .with_replicate(format!("rep{}", rep))
        }));
    }

    Ok(observations)
}
