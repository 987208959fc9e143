use crate::test_helpers::seeded_rng;
use kinfit_rs::batch::BatchOutcome;
use kinfit_rs::simulate::synthesize_replicates;
use kinfit_rs::{
    batch_fit, BatchFitter, Bounds, Dataset, FitErrorKind, FourParameterLogistic,
    MichaelisMenten, Model, Observation, ReplicateSet,
};
use ndarray::{array, Array1};
use std::fmt;
use std::thread;
use std::time::Duration;

/// Enzyme/condition pair used as a composite group key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct Condition {
    enzyme: String,
    treatment: String,
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.enzyme, self.treatment)
    }
}

fn group_of(o: &Observation) -> String {
    o.group.clone().unwrap_or_default()
}

fn kinetics_dataset() -> Dataset {
    let model = MichaelisMenten::new();
    let substrate = [0.5, 1.0, 2.0, 4.0, 8.0, 16.0, 32.0];
    let mut rng = seeded_rng(77);

    let mut observations =
        synthesize_replicates(&model, &substrate, &array![10.0, 4.0], 3, 0.1, "enzyme-a", &mut rng)
            .unwrap();
    observations.extend(
        ReplicateSet::new("enzyme-b")
            .with_row(5.0, &[3.1, 2.9, 3.0])
            .observations(),
    );
    Dataset::new(observations)
}

#[test]
fn test_one_sufficient_one_insufficient() {
    let report = batch_fit(&kinetics_dataset(), group_of, &MichaelisMenten::new());

    assert_eq!(report.total(), 2);
    assert_eq!(report.success_count(), 1);
    assert_eq!(report.skipped_count(), 1);

    let records = report.records();
    assert_eq!(records[0].group, "enzyme-a");
    assert!(records[0].is_success());

    let fitted = records[0].group_fit().unwrap();
    assert_eq!(fitted.points.len(), 7);
    assert!(fitted.points.iter().all(|p| p.count == 3));
    assert!((fitted.fit.params[0] - 10.0).abs() < 0.5);
    assert_eq!(fitted.intervals.as_ref().map(Vec::len), Some(2));

    assert_eq!(records[1].group, "enzyme-b");
    let reason = records[1].skip_reason().unwrap();
    assert_eq!(reason.kind, FitErrorKind::InsufficientData);
    assert!(records[1]
        .to_string()
        .starts_with("enzyme-b: insufficient data ("));

    let summary = report.to_string();
    assert!(summary.starts_with("2 groups: 1 fitted, 1 skipped"));
    assert!(summary.contains("enzyme-b"));
}

#[test]
fn test_composite_keys_are_ordered() {
    let model = FourParameterLogistic::new();
    let doses = [0.0, 0.3, 1.0, 3.0, 10.0, 30.0, 100.0];
    let mut rng = seeded_rng(3);
    let mut dataset = Dataset::default();

    for (group, ic50) in [("kinase-2|dmso", 8.0), ("kinase-1|atp", 2.0), ("kinase-1|dmso", 1.0)] {
        let params = array![2.0, 98.0, ic50, 1.0];
        for obs in synthesize_replicates(&model, &doses, &params, 2, 0.5, group, &mut rng).unwrap()
        {
            dataset.push(obs);
        }
    }

    let key = |o: &Observation| {
        let group = o.group.clone().unwrap_or_default();
        let (enzyme, treatment) = group.split_once('|').unwrap_or((group.as_str(), ""));
        Condition {
            enzyme: enzyme.to_string(),
            treatment: treatment.to_string(),
        }
    };
    let report = BatchFitter::new().fit(&dataset, key, &model);

    let order: Vec<String> = report.records().iter().map(|r| r.group.to_string()).collect();
    assert_eq!(order, vec!["kinase-1/atp", "kinase-1/dmso", "kinase-2/dmso"]);
    assert_eq!(report.success_count(), 3);

    let ic50: Vec<f64> = report
        .successes()
        .map(|r| r.group_fit().unwrap().fit.param("ic50").unwrap())
        .collect();
    assert!(ic50[0] > ic50[1] && ic50[2] > ic50[0]);
}

/// Michaelis-Menten kinetics that take a millisecond per point to evaluate.
struct SlowKinetics(MichaelisMenten);

impl Model for SlowKinetics {
    fn name(&self) -> &str {
        self.0.name()
    }

    fn parameter_names(&self) -> &[&'static str] {
        self.0.parameter_names()
    }

    fn eval_point(&self, x: f64, params: &[f64]) -> f64 {
        thread::sleep(Duration::from_millis(1));
        self.0.eval_point(x, params)
    }

    fn gradient_point(&self, x: f64, params: &[f64], grad: &mut [f64]) {
        self.0.gradient_point(x, params, grad)
    }

    fn default_bounds(&self) -> Vec<Bounds> {
        self.0.default_bounds()
    }

    fn initial_guess(&self, x: &Array1<f64>, y: &Array1<f64>) -> kinfit_rs::Result<Array1<f64>> {
        self.0.initial_guess(x, y)
    }
}

#[test]
fn test_time_budget_skips_group() {
    // The initial evaluation of seven points alone outlasts the budget
    let report = BatchFitter::new()
        .with_max_duration(Duration::from_millis(2))
        .fit(&kinetics_dataset(), group_of, &SlowKinetics(MichaelisMenten::new()));

    let record = &report.records()[0];
    match &record.outcome {
        BatchOutcome::Skipped(reason) => {
            assert_eq!(reason.kind, FitErrorKind::Timeout);
            assert!(record.to_string().starts_with("enzyme-a: timeout"));
        }
        BatchOutcome::Success(_) => panic!("expected a timeout"),
    }
    assert_eq!(report.success_count(), 0);
}

#[test]
fn test_iteration_budget_skips_group() {
    let report = BatchFitter::new()
        .with_max_iterations(1)
        .fit(&kinetics_dataset(), group_of, &MichaelisMenten::new());

    let reason = report.records()[0].skip_reason().unwrap();
    assert_eq!(reason.kind, FitErrorKind::ConvergenceFailure);
}

#[test]
fn test_json_rows() {
    let report = BatchFitter::new()
        .with_confidence_level(Some(0.9))
        .fit(&kinetics_dataset(), group_of, &MichaelisMenten::new());

    let json = report.to_json().unwrap();
    let rows: serde_json::Value = serde_json::from_str(&json).unwrap();
    let rows = rows.as_array().unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["group"], "enzyme-a");
    assert_eq!(rows[0]["parameters"][1]["name"], "km");
    assert_eq!(rows[0]["confidence_level"], 0.9);
    assert!(rows[0]["parameters"][1]["lower"].is_number());
    assert_eq!(rows[0]["converged"], true);
    assert_eq!(rows[0]["n_points"], 7);

    assert!(rows[1]["skip_reason"]
        .as_str()
        .unwrap()
        .starts_with("insufficient data"));
}
