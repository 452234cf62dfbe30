//! CLI command comparing the selection strategies over repeated trials.
//!
//! Each trial drives a freshly constructed selector through the
//! synthetic domain for a fixed number of steps; selectors never share
//! state and every trial gets its own seed, so trials can run in
//! parallel. Algorithms see the same trial seeds for a fair comparison.

// Statistics aggregation casts counters to f64
#![allow(clippy::cast_precision_loss)]

use crate::cli::{CliError, OperatorSetName, wall_clock_seed};
use banditsearch::bandit::{Algorithm, UcbSelector, build_selector};
use banditsearch::sim::SyntheticDomain;
use indicatif::{ProgressBar, ProgressStyle};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rayon::prelude::*;
use std::path::Path;

/// Per-trial statistics.
#[derive(Debug, Clone, Copy)]
struct TrialResult {
    total_reward: f64,
    success_rate: f64,
    regret: f64,
}

/// Mean and standard deviation over trials.
#[derive(Debug, Clone, Copy)]
struct Aggregate {
    mean: f64,
    std: f64,
}

fn aggregate(values: impl Iterator<Item = f64> + Clone) -> Aggregate {
    let n = values.clone().count();
    if n == 0 {
        return Aggregate { mean: 0.0, std: 0.0 };
    }
    let mean = values.clone().sum::<f64>() / n as f64;
    let variance = values.map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
    Aggregate {
        mean,
        std: variance.sqrt(),
    }
}

/// Execute the compare command.
pub(crate) fn execute(
    trials: usize,
    steps: usize,
    seed: Option<u64>,
    operators: OperatorSetName,
    progress: bool,
) -> Result<(), CliError> {
    let base_seed = seed.unwrap_or_else(wall_clock_seed);
    let operator_set = operators.to_operator_set();

    let algorithms = [
        Algorithm::Uniform,
        Algorithm::EpsilonGreedy { epsilon: 0.2 },
        Algorithm::Ucb {
            c: UcbSelector::DEFAULT_C,
        },
        Algorithm::PolicyGradient { alpha: 0.1 },
        Algorithm::ProbabilityMatching { p_min: 0.05 },
    ];

    println!("Comparing selection strategies:");
    println!("  Operators: {operator_set}");
    println!("  Trials:    {trials} per algorithm");
    println!("  Steps:     {steps} per trial");
    println!("  Base seed: {base_seed}");
    println!();

    let pb = if progress {
        let pb = ProgressBar::new((algorithms.len() * trials) as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} trials ({per_sec})")
                .expect("valid template")
                .progress_chars("=>-"),
        );
        Some(pb)
    } else {
        None
    };

    println!(
        "{:<22} {:>16} {:>14} {:>12} {:>16}",
        "Algorithm", "TotalReward", "AvgReward", "SuccRate", "Regret"
    );
    println!("{}", "-".repeat(84));

    for algorithm in algorithms {
        let results: Result<Vec<TrialResult>, CliError> = (0..trials)
            .into_par_iter()
            .map(|trial| {
                let trial_seed = base_seed.wrapping_add(trial as u64);
                let result = run_trial(algorithm, operator_set, trial_seed, steps)?;
                if let Some(pb) = &pb {
                    pb.inc(1);
                }
                Ok(result)
            })
            .collect();
        let results = results?;

        let reward = aggregate(results.iter().map(|r| r.total_reward));
        let success = aggregate(results.iter().map(|r| r.success_rate));
        let regret = aggregate(results.iter().map(|r| r.regret));

        println!(
            "{:<22} {:>8.2} ±{:>5.2} {:>14.4} {:>11.1}% {:>8.2} ±{:>5.2}",
            algorithm.name(),
            reward.mean,
            reward.std,
            reward.mean / steps as f64,
            success.mean * 100.0,
            regret.mean,
            regret.std,
        );
    }

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    Ok(())
}

/// One independently seeded trial: fresh selector, fresh domain.
fn run_trial(
    algorithm: Algorithm,
    operator_set: banditsearch::operators::OperatorSet,
    trial_seed: u64,
    steps: usize,
) -> Result<TrialResult, CliError> {
    let mut selector = build_selector(
        algorithm,
        operator_set.operators(),
        SmallRng::seed_from_u64(trial_seed),
    )?;
    let mut domain = SyntheticDomain::standard(trial_seed.wrapping_add(1), Path::new("."));

    let mut successes = 0u32;
    for _ in 0..steps {
        let operator = selector.select();
        let outcome = domain.simulate_operator(operator);
        selector.update(
            operator,
            Some(outcome.parent_fitness),
            outcome.child_fitness,
            outcome.success,
        );
        if outcome.success {
            successes += 1;
        }
    }

    let total_reward = selector.core().cumulative_reward();
    let optimal = steps as f64 * domain.max_true_quality();
    Ok(TrialResult {
        total_reward,
        success_rate: if steps > 0 {
            f64::from(successes) / steps as f64
        } else {
            0.0
        },
        regret: optimal - total_reward,
    })
}
