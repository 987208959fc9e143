//! Observations, datasets and replicate aggregation.
//!
//! Observations are structured records. Replicates of the same concentration are
//! matched by exact value before averaging, so responses are never pooled across
//! distinct concentrations.

use crate::error::{FitError, Result};
use crate::utils::stats;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One measured response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Group key, e.g. an enzyme/condition pair or an inhibitor name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,

    /// Independent value, usually a concentration
    pub x: f64,

    /// Measured response
    pub y: f64,

    /// Replicate identifier within the concentration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicate: Option<String>,
}

impl Observation {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            group: None,
            x,
            y,
            replicate: None,
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_replicate(mut self, replicate: impl Into<String>) -> Self {
        self.replicate = Some(replicate.into());
        self
    }
}

/// Mean and spread of the replicates at one concentration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplicatePoint {
    pub concentration: f64,

    /// Sample mean of the responses
    pub mean: f64,

    /// Sample standard deviation (n − 1 denominator); 0 for a single replicate
    pub std: f64,

    /// Number of replicates
    pub count: usize,
}

/// Splits aggregated points into `(x, y)` arrays of concentrations and mean responses.
pub fn to_arrays(points: &[ReplicatePoint]) -> (Array1<f64>, Array1<f64>) {
    (
        points.iter().map(|p| p.concentration).collect(),
        points.iter().map(|p| p.mean).collect(),
    )
}

/// Aggregates a set of observations by exact concentration.
///
/// All observations are considered regardless of their group. Concentrations are
/// compared bitwise after normalizing `-0.0` to `0.0`; the output is sorted
/// ascending by concentration.
///
/// # Errors
///
/// * `InvalidInput` when a concentration or response is not finite, or a
///   concentration is negative
/// * `InsufficientData` when fewer than `min_points` distinct concentrations remain
pub fn aggregate_points<'a, I>(observations: I, min_points: usize) -> Result<Vec<ReplicatePoint>>
where
    I: IntoIterator<Item = &'a Observation>,
{
    let mut by_concentration: BTreeMap<OrderedKey, Vec<f64>> = BTreeMap::new();
    let mut total = 0;

    for obs in observations {
        if !obs.x.is_finite() || !obs.y.is_finite() {
            return Err(FitError::InvalidInput(format!(
                "observation ({}, {}) is not finite",
                obs.x, obs.y
            )));
        }
        if obs.x < 0.0 {
            return Err(FitError::InvalidInput(format!(
                "negative concentration {}",
                obs.x
            )));
        }
        by_concentration
            .entry(OrderedKey::new(obs.x))
            .or_default()
            .push(obs.y);
        total += 1;
    }

    if by_concentration.len() < min_points {
        return Err(FitError::InsufficientData(format!(
            "{} distinct concentrations from {} observations, need {}",
            by_concentration.len(),
            total,
            min_points
        )));
    }

    Ok(by_concentration
        .into_iter()
        .filter_map(|(key, responses)| {
            Some(ReplicatePoint {
                concentration: key.value(),
                mean: stats::mean(&responses)?,
                std: stats::sample_std(&responses)?,
                count: responses.len(),
            })
        })
        .collect())
}

/// Aggregates the observations whose group equals `group_key`.
///
/// See [`aggregate_points`] for the matching rules and errors.
pub fn aggregate(
    observations: &[Observation],
    group_key: &str,
    min_points: usize,
) -> Result<Vec<ReplicatePoint>> {
    aggregate_points(
        observations
            .iter()
            .filter(|o| o.group.as_deref() == Some(group_key)),
        min_points,
    )
}

/// A finite concentration usable as an ordered map key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OrderedKey(u64);

impl OrderedKey {
    fn new(value: f64) -> Self {
        // Adding 0.0 turns -0.0 into 0.0
        Self((value + 0.0).to_bits())
    }

    fn value(self) -> f64 {
        f64::from_bits(self.0)
    }
}

impl Ord for OrderedKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.value().total_cmp(&other.value())
    }
}

impl PartialOrd for OrderedKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Replicate responses recorded side by side for one group.
///
/// Each row holds one concentration and all of its replicate responses. Replicate
/// ids are `rep1`, `rep2`, ... by column position.
#[derive(Debug, Clone, Default)]
pub struct ReplicateSet {
    group: Option<String>,
    rows: Vec<(f64, Vec<f64>)>,
}

impl ReplicateSet {
    pub fn new(group: impl Into<String>) -> Self {
        Self {
            group: Some(group.into()),
            rows: Vec::new(),
        }
    }

    /// A set whose observations carry no group key.
    pub fn ungrouped() -> Self {
        Self::default()
    }

    /// Add a concentration with its replicate responses.
    pub fn with_row(mut self, concentration: f64, responses: &[f64]) -> Self {
        self.rows.push((concentration, responses.to_vec()));
        self
    }

    /// Flatten into one observation per replicate response.
    pub fn observations(&self) -> Vec<Observation> {
        self.rows
            .iter()
            .flat_map(|(x, responses)| {
                responses.iter().enumerate().map(move |(i, &y)| Observation {
                    group: self.group.clone(),
                    x: *x,
                    y,
                    replicate: Some(format!("rep{}", i + 1)),
                })
            })
            .collect()
    }
}

/// An ordered collection of observations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    observations: Vec<Observation>,
}

impl Dataset {
    pub fn new(observations: Vec<Observation>) -> Self {
        Self { observations }
    }

    pub fn push(&mut self, observation: Observation) {
        self.observations.push(observation);
    }

    /// Append all observations of a replicate set.
    pub fn extend_from_set(&mut self, set: &ReplicateSet) {
        self.observations.extend(set.observations());
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Partition the observations by a key function, ordered by key.
    pub fn partition<K, F>(&self, key_fn: F) -> BTreeMap<K, Vec<&Observation>>
    where
        K: Ord,
        F: Fn(&Observation) -> K,
    {
        let mut groups: BTreeMap<K, Vec<&Observation>> = BTreeMap::new();
        for obs in &self.observations {
            groups.entry(key_fn(obs)).or_default().push(obs);
        }
        groups
    }
}

impl From<Vec<Observation>> for Dataset {
    fn from(observations: Vec<Observation>) -> Self {
        Self::new(observations)
    }
}

impl FromIterator<Observation> for Dataset {
    fn from_iter<T: IntoIterator<Item = Observation>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
