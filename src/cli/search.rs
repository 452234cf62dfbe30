//! CLI command for running one search experiment.

use crate::cli::{AlgorithmName, CliError, OperatorSetName, OutputFormat, wall_clock_seed};
use banditsearch::metrics::{OperatorAggregate, RunSummary};
use banditsearch::search::{SearchConfig, SearchOutcome, run_search};
use banditsearch::sim::SyntheticDomain;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// JSON-serializable run result.
#[derive(Debug, Serialize)]
struct JsonRunResult<'a> {
    /// Run-level summary.
    summary: &'a RunSummary,
    /// Per-operator statistics.
    operators: &'a [OperatorAggregate],
}

/// Execute the search command.
#[allow(clippy::too_many_arguments)]
pub(crate) fn execute(
    algorithm: AlgorithmName,
    epsilon: f64,
    ucb_c: Option<f64>,
    alpha: f64,
    p_min: f64,
    seed: Option<u64>,
    steps: usize,
    operators: OperatorSetName,
    output: PathBuf,
    experiment_id: Option<String>,
    format: OutputFormat,
) -> Result<(), CliError> {
    let seed = seed.unwrap_or_else(wall_clock_seed);

    let config = SearchConfig {
        seed,
        steps,
        algorithm: algorithm.to_algorithm(epsilon, ucb_c, alpha, p_min),
        operator_set: operators.to_operator_set(),
        output_dir: output,
        experiment_id,
    };

    if format == OutputFormat::Text {
        println!("Starting search:");
        println!("  Experiment: {}", config.experiment_id());
        println!("  Algorithm:  {}", config.algorithm.name());
        if let Some((name, value)) = config.algorithm.parameter() {
            println!("  {name}: {value}");
        }
        println!("  Operators:  {}", config.operator_set);
        println!("  Steps:      {steps}");
        println!("  Seed:       {seed}");
        println!("  Output:     {}", config.output_dir.display());
        println!();
    }

    // the domain's own noise stream is kept apart from the search seeds
    let mut domain = SyntheticDomain::standard(seed.wrapping_add(2), &config.output_dir);
    let outcome = run_search(&config, &mut domain)?;

    match format {
        OutputFormat::Text => print_results(&outcome, &config.output_dir),
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&JsonRunResult {
                summary: &outcome.summary,
                operators: &outcome.operators,
            })?;
            println!("{json}");
        }
    }

    Ok(())
}

fn print_results(outcome: &SearchOutcome, output: &Path) {
    let s = &outcome.summary;

    println!("{}", "=".repeat(64));
    println!("EXPERIMENT SUMMARY: {}", outcome.experiment_id);
    println!("{}", "=".repeat(64));
    println!("Steps:            {}", s.total_steps);
    println!(
        "Successes:        {} ({:.1}%)",
        s.successful_steps,
        s.success_rate * 100.0
    );
    println!(
        "Improvements:     {} ({:.1}%)",
        s.improvements,
        s.improvement_rate * 100.0
    );
    println!("Total reward:     {:.2}", s.total_reward);
    println!("Avg reward:       {:.4}", s.average_reward);
    println!("Original fitness: {}", s.original_fitness);
    println!("Best fitness:     {}", s.best_fitness);
    println!("Improvement:      {:.2}%", s.improvement_pct);
    println!("Runtime:          {:.1}s", outcome.elapsed_seconds);
    if outcome.improved {
        println!("Best patch:       {}", outcome.best_description);
    }
    println!();

    println!(
        "{:<28} {:>6} {:>9} {:>9} {:>7} {:>8}",
        "Operator", "Count", "AvgQ", "SuccRate", "Improv", "Learned"
    );
    println!("{}", "-".repeat(72));
    for a in &outcome.operators {
        println!(
            "{:<28} {:>6} {:>9.4} {:>8.1}% {:>7} {:>8}",
            a.operator,
            a.selections,
            a.learned_q,
            a.success_rate * 100.0,
            a.improvements,
            if a.is_learned { "yes" } else { "no" }
        );
    }
    println!();

    println!("Output files:");
    for table in ["steps", "operators", "config", "summary"] {
        println!(
            "  {}",
            output
                .join(format!("{}_{table}.csv", outcome.experiment_id))
                .display()
        );
    }
}
