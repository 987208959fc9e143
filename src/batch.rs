//! Batch fitting of many independent groups.
//!
//! Each group of a [`Dataset`] goes through the same pipeline:
//! aggregate replicates, fit, and optionally compute confidence intervals. A failure
//! in one group becomes a skipped record and never aborts the others. Groups are
//! fitted as independent rayon tasks and reported in key order.

use crate::data::{aggregate_points, to_arrays, Dataset, Observation, ReplicatePoint};
use crate::error::{FitErrorKind, Result};
use crate::fit::{fit_model, FitOptions, FitResult};
use crate::model::Model;
use crate::uncertainty::{confidence_intervals, ConfidenceInterval};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Configuration for a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Options applied to every group's fit
    pub fit: FitOptions,

    /// Confidence level for intervals; `None` skips interval estimation
    pub confidence_level: Option<f64>,

    /// Fit groups on the rayon thread pool
    pub parallel: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            fit: FitOptions::default(),
            confidence_level: Some(0.95),
            parallel: true,
        }
    }
}

/// Why a group produced no fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkipReason {
    pub kind: FitErrorKind,
    pub message: String,
}

impl Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.kind, self.message)
    }
}

/// A successful fit together with the points it was fitted to.
#[derive(Debug, Clone)]
pub struct GroupFit {
    pub fit: FitResult,
    pub points: Vec<ReplicatePoint>,
    pub intervals: Option<Vec<ConfidenceInterval>>,
}

#[derive(Debug, Clone)]
pub enum BatchOutcome {
    Success(Box<GroupFit>),
    Skipped(SkipReason),
}

/// The outcome for one group.
#[derive(Debug, Clone)]
pub struct BatchRecord<K> {
    pub group: K,

    /// Number of raw observations in the group
    pub observations: usize,

    pub outcome: BatchOutcome,
}

impl<K> BatchRecord<K> {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, BatchOutcome::Success(_))
    }

    pub fn group_fit(&self) -> Option<&GroupFit> {
        match &self.outcome {
            BatchOutcome::Success(fit) => Some(fit),
            BatchOutcome::Skipped(_) => None,
        }
    }

    pub fn skip_reason(&self) -> Option<&SkipReason> {
        match &self.outcome {
            BatchOutcome::Success(_) => None,
            BatchOutcome::Skipped(reason) => Some(reason),
        }
    }
}

impl<K: Display> Display for BatchRecord<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            BatchOutcome::Success(g) => write!(
                f,
                "{}: {} fit to {} points in {} iterations (rss = {:.4e})",
                self.group,
                g.fit.model,
                g.points.len(),
                g.fit.iterations,
                g.fit.rss
            ),
            BatchOutcome::Skipped(reason) => write!(f, "{}: {}", self.group, reason),
        }
    }
}

/// One fitted parameter in a [`ResultRow`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterRow {
    pub name: String,
    pub value: f64,
    pub std_error: Option<f64>,
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

/// A flat, serializable summary of one batch record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    pub group: String,
    pub model: Option<String>,
    pub parameters: Vec<ParameterRow>,
    pub confidence_level: Option<f64>,
    pub rss: Option<f64>,
    pub r_squared: Option<f64>,
    pub converged: bool,
    pub n_points: usize,
    pub skip_reason: Option<String>,
}

impl<K: Display> BatchRecord<K> {
    /// Flatten into a [`ResultRow`].
    pub fn to_row(&self) -> ResultRow {
        match &self.outcome {
            BatchOutcome::Success(g) => {
                let intervals = g.intervals.as_deref();
                let parameters = g
                    .fit
                    .named_params()
                    .enumerate()
                    .map(|(i, (name, value))| {
                        let ci = intervals.and_then(|ci| ci.get(i));
                        ParameterRow {
                            name: name.to_string(),
                            value,
                            std_error: ci.map(|c| c.std_error),
                            lower: ci.map(|c| c.lower),
                            upper: ci.map(|c| c.upper),
                        }
                    })
                    .collect();

                ResultRow {
                    group: self.group.to_string(),
                    model: Some(g.fit.model.clone()),
                    parameters,
                    confidence_level: intervals.and_then(|ci| ci.first()).map(|c| c.level),
                    rss: Some(g.fit.rss),
                    r_squared: g.fit.r_squared,
                    converged: g.fit.converged,
                    n_points: g.points.len(),
                    skip_reason: None,
                }
            }
            BatchOutcome::Skipped(reason) => ResultRow {
                group: self.group.to_string(),
                model: None,
                parameters: Vec::new(),
                confidence_level: None,
                rss: None,
                r_squared: None,
                converged: false,
                n_points: 0,
                skip_reason: Some(reason.to_string()),
            },
        }
    }
}

/// Records for all groups of a batch run, in key order.
#[derive(Debug, Clone)]
pub struct BatchReport<K> {
    records: Vec<BatchRecord<K>>,
    elapsed: Duration,
}

impl<K> BatchReport<K> {
    pub fn records(&self) -> &[BatchRecord<K>] {
        &self.records
    }

    pub fn into_records(self) -> Vec<BatchRecord<K>> {
        self.records
    }

    /// Number of groups.
    pub fn total(&self) -> usize {
        self.records.len()
    }

    pub fn success_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_success()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.total() - self.success_count()
    }

    pub fn successes(&self) -> impl Iterator<Item = &BatchRecord<K>> {
        self.records.iter().filter(|r| r.is_success())
    }

    pub fn skipped(&self) -> impl Iterator<Item = &BatchRecord<K>> {
        self.records.iter().filter(|r| !r.is_success())
    }

    /// Wall-clock time of the whole run.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn summary(&self) -> String {
        format!(
            "{} groups: {} fitted, {} skipped",
            self.total(),
            self.success_count(),
            self.skipped_count()
        )
    }
}

impl<K: Display> BatchReport<K> {
    /// One row per group.
    pub fn rows(&self) -> Vec<ResultRow> {
        self.records.iter().map(BatchRecord::to_row).collect()
    }

    /// The rows as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.rows())?)
    }
}

impl<K: Display> Display for BatchReport<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.summary())?;
        for record in self.skipped() {
            writeln!(f, "  skipped {}", record)?;
        }
        Ok(())
    }
}

/// Fits one model to every group of a dataset.
#[derive(Debug, Clone, Default)]
pub struct BatchFitter {
    config: BatchConfig,
}

impl BatchFitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: BatchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Set the confidence level for intervals, or `None` to skip them.
    pub fn with_confidence_level(mut self, level: Option<f64>) -> Self {
        self.config.confidence_level = level;
        self
    }

    /// Set the per-group iteration budget.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.fit.config.max_iterations = max_iterations;
        self
    }

    /// Set the per-group wall-clock budget.
    pub fn with_max_duration(mut self, max_duration: Duration) -> Self {
        self.config.fit.config.max_duration = Some(max_duration);
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.config.parallel = parallel;
        self
    }

    /// Fit `model` to each group of `dataset`.
    ///
    /// # Arguments
    ///
    /// * `dataset` - All observations
    /// * `key_fn` - Maps an observation to its group key
    /// * `model` - The model fitted to every group
    pub fn fit<K, F, M>(&self, dataset: &Dataset, key_fn: F, model: &M) -> BatchReport<K>
    where
        K: Ord + Clone + Display + Send + Sync,
        F: Fn(&Observation) -> K,
        M: Model + Sync + ?Sized,
    {
        let start = Instant::now();
        let groups: Vec<(K, Vec<&Observation>)> = dataset.partition(key_fn).into_iter().collect();
        debug!(groups = groups.len(), model = model.name(), "starting batch fit");

        // Both paths keep the key order of the partition
        let records: Vec<BatchRecord<K>> = if self.config.parallel {
            groups
                .into_par_iter()
                .map(|(group, observations)| self.fit_group(group, &observations, model))
                .collect()
        } else {
            groups
                .into_iter()
                .map(|(group, observations)| self.fit_group(group, &observations, model))
                .collect()
        };

        let report = BatchReport {
            records,
            elapsed: start.elapsed(),
        };
        info!(
            total = report.total(),
            fitted = report.success_count(),
            skipped = report.skipped_count(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "batch fit finished"
        );
        report
    }

    fn fit_group<K, M>(&self, group: K, observations: &[&Observation], model: &M) -> BatchRecord<K>
    where
        K: Display,
        M: Model + ?Sized,
    {
        let outcome = match self.try_fit_group(&group, observations, model) {
            Ok(group_fit) => BatchOutcome::Success(Box::new(group_fit)),
            Err(e) => {
                warn!(group = %group, kind = %e.kind(), "skipping group: {}", e);
                BatchOutcome::Skipped(SkipReason {
                    kind: e.kind(),
                    message: e.detail(),
                })
            }
        };

        BatchRecord {
            group,
            observations: observations.len(),
            outcome,
        }
    }

    fn try_fit_group<K, M>(
        &self,
        group: &K,
        observations: &[&Observation],
        model: &M,
    ) -> Result<GroupFit>
    where
        K: Display,
        M: Model + ?Sized,
    {
        let points = aggregate_points(observations.iter().copied(), model.parameter_count())?;
        let (x, y) = to_arrays(&points);
        let fit = fit_model(model, &x, &y, &self.config.fit)?;

        let intervals = match self.config.confidence_level {
            None => None,
            Some(level) => match confidence_intervals(&fit, level) {
                Ok(intervals) => Some(intervals),
                Err(e) if e.kind() == FitErrorKind::NumericalInstability => {
                    warn!(group = %group, "no confidence intervals: {}", e);
                    None
                }
                Err(e) => return Err(e),
            },
        };

        Ok(GroupFit {
            fit,
            points,
            intervals,
        })
    }
}

/// Fit `model` to every group with the default [`BatchConfig`].
pub fn batch_fit<K, F, M>(dataset: &Dataset, key_fn: F, model: &M) -> BatchReport<K>
where
    K: Ord + Clone + Display + Send + Sync,
    F: Fn(&Observation) -> K,
    M: Model + Sync + ?Sized,
{
    BatchFitter::new().fit(dataset, key_fn, model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ReplicateSet;
    use crate::models::MichaelisMenten;

    fn dataset() -> Dataset {
        let model = MichaelisMenten::new();
        let mut data = Dataset::default();

        let mut set = ReplicateSet::new("good");
        for s in [0.5, 1.0, 2.0, 4.0, 8.0, 16.0] {
            let v = model.eval_point(s, &[10.0, 2.0]);
            set = set.with_row(s, &[v - 0.05, v + 0.05]);
        }
        data.extend_from_set(&set);
        data.extend_from_set(&ReplicateSet::new("flat").with_row(3.0, &[1.0, 1.1, 0.9]));
        data
    }

    fn group_of(o: &Observation) -> String {
        o.group.clone().unwrap_or_default()
    }

    #[test]
    fn test_one_success_one_skip() {
        let report = BatchFitter::new().fit(&dataset(), group_of, &MichaelisMenten::new());

        assert_eq!(report.total(), 2);
        assert_eq!(report.success_count(), 1);
        assert_eq!(report.skipped_count(), 1);

        // Sorted by key: "flat" before "good"
        let records = report.records();
        assert_eq!(records[0].group, "flat");
        assert_eq!(
            records[0].skip_reason().map(|r| r.kind),
            Some(FitErrorKind::InsufficientData)
        );
        assert!(records[0].to_string().starts_with("flat: insufficient data ("));
        assert_eq!(records[0].observations, 3);

        let fitted = records[1].group_fit().unwrap();
        assert_eq!(fitted.points.len(), 6);
        assert!(fitted.intervals.is_some());
    }

    #[test]
    fn test_sequential_matches_parallel() {
        let model = MichaelisMenten::new();
        let parallel = BatchFitter::new().fit(&dataset(), group_of, &model);
        let sequential = BatchFitter::new()
            .with_parallel(false)
            .fit(&dataset(), group_of, &model);

        assert_eq!(parallel.rows(), sequential.rows());
    }

    #[test]
    fn test_rows_and_json() {
        let report = BatchFitter::new()
            .with_confidence_level(None)
            .fit(&dataset(), group_of, &MichaelisMenten::new());
        let rows = report.rows();

        assert_eq!(rows.len(), 2);
        assert!(rows[0].skip_reason.is_some());
        assert!(rows[0].parameters.is_empty());

        assert_eq!(rows[1].parameters[0].name, "vmax");
        assert!(rows[1].parameters[0].lower.is_none());
        assert!(rows[1].converged);

        let json = report.to_json().unwrap();
        let parsed: Vec<ResultRow> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, rows);
    }

    #[test]
    fn test_config_from_json() {
        let config: BatchConfig =
            serde_json::from_str(r#"{"confidence_level": 0.9, "parallel": false}"#).unwrap();

        assert_eq!(config.confidence_level, Some(0.9));
        assert!(!config.parallel);
        assert_eq!(config.fit.config.max_iterations, 200);
    }
}
