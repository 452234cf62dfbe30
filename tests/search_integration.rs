//! End-to-end tests for the search loop and its exports.
//!
//! These tests drive complete runs through the public API, over both a
//! scripted collaborator (exact outcomes) and the synthetic domain
//! (realistic noise), and check the exported CSV tables.
//! Run with: cargo test --release search_integration

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::cast_possible_truncation)]

use banditsearch::bandit::Algorithm;
use banditsearch::operators::{Operator, OperatorSet};
use banditsearch::search::{
    Evaluation, SearchConfig, SearchDomain, SearchError, WARMUP_REPS, run_search,
};
use banditsearch::sim::SyntheticDomain;
use rand::rngs::SmallRng;
use std::fs;
use std::path::{Path, PathBuf};

/// Collaborator with a scripted outcome per step; descriptions carry
/// quotes and newlines to exercise the CSV escaping.
struct ScriptedDomain {
    warmup_total: u64,
    warmup_passes: bool,
    step_outcomes: Vec<Option<u64>>,
    next: usize,
    saved: Option<PathBuf>,
}

impl ScriptedDomain {
    fn new(warmup_total: u64, step_outcomes: Vec<Option<u64>>) -> Self {
        Self {
            warmup_total,
            warmup_passes: true,
            step_outcomes,
            next: 0,
            saved: None,
        }
    }

    fn failing_warmup() -> Self {
        Self {
            warmup_total: 0,
            warmup_passes: false,
            step_outcomes: Vec::new(),
            next: 0,
            saved: None,
        }
    }
}

impl SearchDomain for ScriptedDomain {
    type Variant = usize;

    fn initial(&self) -> usize {
        0
    }

    fn apply_operator(&mut self, current: &usize, _operator: Operator, _rng: &mut SmallRng) -> usize {
        current + 1
    }

    fn evaluate(&mut self, variant: &usize, _repetitions: u32) -> Evaluation {
        if *variant == 0 {
            return Evaluation {
                valid_patch: true,
                clean_compile: true,
                tests_pass: self.warmup_passes,
                execution_cost: self.warmup_total,
            };
        }
        let outcome = self.step_outcomes[self.next % self.step_outcomes.len()];
        self.next += 1;
        Evaluation {
            valid_patch: true,
            clean_compile: true,
            tests_pass: outcome.is_some(),
            execution_cost: outcome.unwrap_or(0),
        }
    }

    fn describe(&self, variant: &usize) -> String {
        format!("edit {variant}: \"quoted\"\nsecond line")
    }

    fn save_best(&mut self, _variant: &usize) -> std::io::Result<PathBuf> {
        let path = PathBuf::from("scripted_best.txt");
        self.saved = Some(path.clone());
        Ok(path)
    }
}

fn config(dir: &Path, algorithm: Algorithm, seed: u64, steps: usize) -> SearchConfig {
    SearchConfig {
        seed,
        steps,
        algorithm,
        operator_set: OperatorSet::All,
        output_dir: dir.to_path_buf(),
        experiment_id: None,
    }
}

#[test]
fn test_first_improvement_scenario() {
    let dir = tempfile::tempdir().unwrap();
    // warmup totals 10000 over 10 reps: baseline fitness 1000
    let mut domain = ScriptedDomain::new(1000 * u64::from(WARMUP_REPS), vec![Some(800)]);
    let outcome = run_search(&config(dir.path(), Algorithm::Uniform, 42, 1), &mut domain).unwrap();

    assert_eq!(outcome.original_fitness, 1000);
    assert_eq!(outcome.best_fitness, 800);
    assert!(outcome.improved);
    assert_eq!(outcome.summary.improvements, 1);
    assert!((outcome.summary.total_reward - 1.25).abs() < 1e-9);
    assert!(domain.saved.is_some());
}

#[test]
fn test_failing_warmup_aborts_before_any_step() {
    let dir = tempfile::tempdir().unwrap();
    let mut domain = ScriptedDomain::failing_warmup();
    let err = run_search(&config(dir.path(), Algorithm::Uniform, 42, 10), &mut domain).unwrap_err();

    assert!(matches!(err, SearchError::BaselineFailed { .. }));
    assert_eq!(domain.next, 0);
    // nothing was exported
    assert!(fs::read_dir(dir.path()).unwrap().next().is_none());
}

#[test]
fn test_failed_steps_never_halt_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let mut domain = ScriptedDomain::new(10_000, vec![None, None, Some(1500), None]);
    let outcome = run_search(&config(dir.path(), Algorithm::Uniform, 7, 40), &mut domain).unwrap();

    assert_eq!(outcome.summary.total_steps, 40);
    assert_eq!(outcome.summary.successful_steps, 10);
    // a slower child is a success but never an improvement
    assert_eq!(outcome.summary.improvements, 0);
    assert!(!outcome.improved);
    assert_eq!(outcome.best_fitness, outcome.original_fitness);
}

#[test]
fn test_every_algorithm_completes_on_synthetic_domain() {
    let algorithms = [
        Algorithm::Uniform,
        Algorithm::EpsilonGreedy { epsilon: 0.2 },
        Algorithm::Ucb { c: 1.5 },
        Algorithm::PolicyGradient { alpha: 0.1 },
        Algorithm::ProbabilityMatching { p_min: 0.05 },
    ];
    for algorithm in algorithms {
        let dir = tempfile::tempdir().unwrap();
        let mut domain = SyntheticDomain::standard(99, dir.path());
        let outcome = run_search(&config(dir.path(), algorithm, 4242, 60), &mut domain).unwrap();

        assert_eq!(outcome.summary.total_steps, 60, "{}", algorithm.name());
        let selections: u32 = outcome.operators.iter().map(|a| a.selections).sum();
        assert_eq!(selections, 60);
        let successes: u32 = outcome.operators.iter().map(|a| a.successes).sum();
        assert_eq!(successes as usize, outcome.summary.successful_steps);
        assert!(outcome.best_fitness <= outcome.original_fitness);
    }
}

#[test]
fn test_runs_are_deterministic_given_seed() {
    let run = || {
        let dir = tempfile::tempdir().unwrap();
        let mut domain = SyntheticDomain::standard(11, dir.path());
        let outcome = run_search(
            &config(dir.path(), Algorithm::EpsilonGreedy { epsilon: 0.3 }, 77, 80),
            &mut domain,
        )
        .unwrap();
        (
            outcome.best_fitness,
            outcome.summary.successful_steps,
            outcome.summary.total_reward,
        )
    };
    let first = run();
    let second = run();
    assert_eq!(first.0, second.0);
    assert_eq!(first.1, second.1);
    assert!((first.2 - second.2).abs() < 1e-12);
}

#[test]
fn test_csv_tables_have_expected_shape() {
    let dir = tempfile::tempdir().unwrap();
    let steps = 25;
    let mut domain = SyntheticDomain::standard(5, dir.path());
    let outcome = run_search(&config(dir.path(), Algorithm::Ucb { c: 1.0 }, 13, steps), &mut domain)
        .unwrap();

    let read = |table: &str| {
        let path = dir
            .path()
            .join(format!("{}_{table}.csv", outcome.experiment_id));
        fs::read_to_string(&path).unwrap_or_else(|e| panic!("missing {}: {e}", path.display()))
    };

    let steps_csv = read("steps");
    assert!(steps_csv.starts_with("step,operator,category,is_learned,success"));
    assert_eq!(steps_csv.lines().count(), steps + 1);

    let operators_csv = read("operators");
    assert_eq!(
        operators_csv.lines().count(),
        OperatorSet::All.operators().len() + 1
    );

    let config_csv = read("config");
    assert!(config_csv.contains("rl_algorithm,\"ucb\""));
    assert!(config_csv.contains("seed,\"13\""));

    let summary_csv = read("summary");
    assert!(summary_csv.contains(&format!("total_steps,{steps}")));
    assert!(summary_csv.contains(&format!("original_fitness,{}", outcome.original_fitness)));
}

#[test]
fn test_csv_escapes_quotes_and_newlines_in_patch_text() {
    let dir = tempfile::tempdir().unwrap();
    let steps = 3;
    let mut domain = ScriptedDomain::new(10_000, vec![Some(900)]);
    let outcome = run_search(&config(dir.path(), Algorithm::Uniform, 1, steps), &mut domain).unwrap();

    let steps_csv = fs::read_to_string(
        dir.path()
            .join(format!("{}_steps.csv", outcome.experiment_id)),
    )
    .unwrap();

    // embedded quotes are doubled, embedded newlines become a literal \n,
    // so each record stays on one physical line
    assert!(steps_csv.contains("\"\"quoted\"\""));
    assert!(steps_csv.contains("\\n"));
    assert_eq!(steps_csv.lines().count(), steps + 1);
}

#[test]
fn test_experiment_id_names_the_exports() {
    let dir = tempfile::tempdir().unwrap();
    let mut domain = SyntheticDomain::standard(2, dir.path());
    let mut cfg = config(dir.path(), Algorithm::Uniform, 3, 5);
    cfg.experiment_id = Some("custom_run".to_string());
    let outcome = run_search(&cfg, &mut domain).unwrap();

    assert_eq!(outcome.experiment_id, "custom_run");
    for table in ["steps", "operators", "config", "summary"] {
        assert!(dir.path().join(format!("custom_run_{table}.csv")).exists());
    }
}
