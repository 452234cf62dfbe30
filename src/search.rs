//! The search loop: warmup, bandit-guided steps, and final export.
//!
//! Drives one experiment: measure a baseline for the unmodified program,
//! then repeatedly let the selector pick an operator, derive a neighbour
//! of the best-known variant through the collaborator, evaluate it, feed
//! the outcome back, and record the step. Mutation derivation and
//! compile-and-test execution live entirely behind [`SearchDomain`];
//! the loop only sees operator identifiers and fitness outcomes.

use crate::bandit::{Algorithm, OperatorSelector, SelectorError, build_selector};
use crate::metrics::{MetricsLog, OperatorAggregate, RunSummary};
use crate::operators::OperatorSet;
use log::{error, info, warn};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Instant;

/// Repetitions used to establish the baseline fitness.
pub const WARMUP_REPS: u32 = 10;

/// Outcome of evaluating one candidate variant.
#[derive(Debug, Clone, Copy)]
pub struct Evaluation {
    /// The mutation produced a syntactically valid variant.
    pub valid_patch: bool,
    /// The variant compiled without errors.
    pub clean_compile: bool,
    /// Every test passed.
    pub tests_pass: bool,
    /// Total execution cost across the requested repetitions.
    pub execution_cost: u64,
}

impl Evaluation {
    /// A step succeeds only when all three stages succeed.
    #[must_use]
    pub fn success(&self) -> bool {
        self.valid_patch && self.clean_compile && self.tests_pass
    }
}

/// Collaborator contract: variant derivation, evaluation, persistence.
///
/// Implementations own the program representation. `apply_operator`
/// derives a neighbour of `current` — by convention removing one
/// existing edit with 50% probability when any exist, otherwise adding a
/// fresh edit of the selected operator's kind.
pub trait SearchDomain {
    /// Program variant representation.
    type Variant: Clone;

    /// The unmodified program.
    fn initial(&self) -> Self::Variant;

    /// Derive a neighbour of `current` using the selected operator.
    fn apply_operator(
        &mut self,
        current: &Self::Variant,
        operator: crate::operators::Operator,
        rng: &mut SmallRng,
    ) -> Self::Variant;

    /// Compile and run the variant, reporting total cost over
    /// `repetitions` runs.
    fn evaluate(&mut self, variant: &Self::Variant, repetitions: u32) -> Evaluation;

    /// Human-readable description of a variant's edits.
    fn describe(&self, variant: &Self::Variant) -> String;

    /// Persist the best variant; called once at the end of a run that
    /// found an improvement.
    ///
    /// # Errors
    ///
    /// Returns any I/O error from writing the variant.
    fn save_best(&mut self, variant: &Self::Variant) -> std::io::Result<PathBuf>;
}

/// Configuration for one search run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Seed for the selector and the neighbour-move RNG streams.
    pub seed: u64,
    /// Number of search steps.
    pub steps: usize,
    /// Selection strategy and its hyperparameter.
    pub algorithm: Algorithm,
    /// Which operators the selector chooses from.
    pub operator_set: OperatorSet,
    /// Directory the CSV exports are written to.
    pub output_dir: PathBuf,
    /// Experiment identifier; derived from algorithm, operator set, and
    /// seed when absent.
    pub experiment_id: Option<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            seed: 123,
            steps: 100,
            algorithm: Algorithm::EpsilonGreedy { epsilon: 0.2 },
            operator_set: OperatorSet::All,
            output_dir: PathBuf::from("rl_results"),
            experiment_id: None,
        }
    }
}

impl SearchConfig {
    /// The experiment id, explicit or derived.
    #[must_use]
    pub fn experiment_id(&self) -> String {
        self.experiment_id.clone().unwrap_or_else(|| {
            format!(
                "{}_{}_{}",
                self.algorithm.name(),
                self.operator_set.as_str(),
                self.seed
            )
        })
    }
}

/// Result of a completed search run.
#[derive(Debug)]
pub struct SearchOutcome {
    /// Experiment identifier used for the exports.
    pub experiment_id: String,
    /// Baseline fitness from warmup.
    pub original_fitness: u64,
    /// Best fitness found (equals the baseline if nothing improved).
    pub best_fitness: u64,
    /// Description of the best variant.
    pub best_description: String,
    /// Whether any step strictly improved on the baseline.
    pub improved: bool,
    /// Run-level statistics.
    pub summary: RunSummary,
    /// Per-operator statistics with learned quality estimates.
    pub operators: Vec<OperatorAggregate>,
    /// Total wall-clock runtime in seconds.
    pub elapsed_seconds: f64,
}

/// Error aborting a search run before or during warmup.
#[derive(Debug, Clone, Copy)]
pub enum SearchError {
    /// Selector construction failed.
    Selector(SelectorError),
    /// The unmodified program failed to compile or pass its tests, so
    /// there is no baseline to improve on.
    BaselineFailed {
        /// Whether the baseline compiled cleanly.
        clean_compile: bool,
        /// Whether the baseline passed all tests.
        tests_pass: bool,
    },
}

impl fmt::Display for SearchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Selector(e) => write!(f, "selector construction failed: {e}"),
            Self::BaselineFailed {
                clean_compile,
                tests_pass,
            } => {
                if !clean_compile {
                    write!(f, "baseline failed: original program does not compile")
                } else if !tests_pass {
                    write!(f, "baseline failed: original program fails its tests")
                } else {
                    write!(f, "baseline failed: original program is not runnable")
                }
            }
        }
    }
}

impl std::error::Error for SearchError {}

impl From<SelectorError> for SearchError {
    fn from(e: SelectorError) -> Self {
        Self::Selector(e)
    }
}

/// Run one search to completion.
///
/// State machine: INIT (construct selector and metrics log), WARMUP
/// (measure the baseline; fatal on failure), STEP × `config.steps`
/// (select, mutate, evaluate, update, record — per-step failures are
/// recorded and the loop continues), DONE (summarize, export the four
/// CSV tables, and persist the best variant if any step improved).
///
/// # Errors
///
/// Returns [`SearchError`] for an invalid selector configuration or a
/// failing baseline; both happen before any step executes.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn run_search<D: SearchDomain>(
    config: &SearchConfig,
    domain: &mut D,
) -> Result<SearchOutcome, SearchError> {
    let start = Instant::now();

    // INIT
    let operators = config.operator_set.operators();
    let mut selector = build_selector(
        config.algorithm,
        operators,
        SmallRng::seed_from_u64(config.seed),
    )?;
    // independent stream for neighbour moves, so selector draws and
    // mutation draws cannot perturb each other
    let mut move_rng = SmallRng::seed_from_u64(config.seed.wrapping_add(1));

    let experiment_id = config.experiment_id();
    let mut metrics = MetricsLog::new(experiment_id.clone(), config.output_dir.clone());
    record_configuration(&mut metrics, config, selector.as_ref());

    info!(
        "starting search: algorithm={}, operators={}, steps={}",
        config.algorithm,
        selector.core().operators().len(),
        config.steps
    );

    // WARMUP
    info!("running warmup ({WARMUP_REPS} repetitions)");
    let initial = domain.initial();
    let baseline_eval = domain.evaluate(&initial, WARMUP_REPS);
    if !baseline_eval.success() {
        return Err(SearchError::BaselineFailed {
            clean_compile: baseline_eval.clean_compile,
            tests_pass: baseline_eval.tests_pass,
        });
    }
    let original_fitness = baseline_eval.execution_cost / u64::from(WARMUP_REPS);
    metrics.set_original_fitness(original_fitness);
    info!("baseline fitness: {original_fitness}");

    let mut best = initial;
    let mut best_fitness = original_fitness;
    let mut improved = false;

    // STEP
    for step in 1..=config.steps {
        let step_start = Instant::now();

        let operator = selector.select();
        info!("step {step}/{}: trying {operator}", config.steps);

        let candidate = domain.apply_operator(&best, operator, &mut move_rng);
        let result = domain.evaluate(&candidate, 1);
        let success = result.success();
        let child_fitness = if success {
            Some(result.execution_cost)
        } else {
            None
        };
        let improvement = matches!(child_fitness, Some(c) if c < best_fitness);

        let reward = selector.update(operator, Some(best_fitness), child_fitness, success);

        metrics.log_step(
            step,
            operator,
            success,
            Some(best_fitness),
            child_fitness,
            reward,
            step_start.elapsed().as_millis() as u64,
            domain.describe(&candidate),
        );

        if improvement {
            // child_fitness is always present here
            let child = child_fitness.unwrap_or(best_fitness);
            info!(
                "step {step}: new best fitness {child} ({:.1}% improvement)",
                100.0 * (original_fitness - child) as f64 / original_fitness as f64
            );
            best = candidate;
            best_fitness = child;
            improved = true;
        } else if success {
            info!("step {step}: no improvement, reward {reward:.4}");
        } else if result.valid_patch && result.clean_compile {
            info!("step {step}: tests failed, reward {reward:.4}");
        } else if result.valid_patch {
            info!("step {step}: compilation failed, reward {reward:.4}");
        } else {
            info!("step {step}: invalid patch, reward {reward:.4}");
        }
    }

    // DONE
    let summary = metrics.summary();
    let operator_stats = metrics.operator_aggregates(selector.core());
    if let Err(e) = metrics.export_all(selector.core()) {
        error!("failed to export results: {e}");
    }
    if improved {
        match domain.save_best(&best) {
            Ok(path) => info!("best variant written to {}", path.display()),
            Err(e) => warn!("failed to persist best variant: {e}"),
        }
    }

    info!(
        "search complete: original={original_fitness}, best={best_fitness} ({:.2}% improvement)",
        summary.improvement_pct
    );

    Ok(SearchOutcome {
        experiment_id,
        original_fitness,
        best_fitness,
        best_description: domain.describe(&best),
        improved,
        summary,
        operators: operator_stats,
        elapsed_seconds: start.elapsed().as_secs_f64(),
    })
}

fn record_configuration(
    metrics: &mut MetricsLog,
    config: &SearchConfig,
    selector: &dyn OperatorSelector,
) {
    metrics.set_config("experiment_id", config.experiment_id());
    metrics.set_config("seed", config.seed.to_string());
    metrics.set_config("num_steps", config.steps.to_string());
    metrics.set_config("rl_algorithm", config.algorithm.name());
    if let Some((name, value)) = config.algorithm.parameter() {
        metrics.set_config(name, value.to_string());
    }
    metrics.set_config("operator_set", config.operator_set.as_str());
    metrics.set_config(
        "num_operators",
        selector.core().operators().len().to_string(),
    );
}
