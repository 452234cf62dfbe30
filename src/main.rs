//! Banditsearch CLI - run and compare bandit-guided improvement experiments.

// Allow print in the CLI binary
#![allow(clippy::print_stdout, clippy::print_stderr)]

mod cli;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

/// Banditsearch - bandit operator selection for program-improvement search
#[derive(Parser, Debug)]
#[command(name = "banditsearch")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one search experiment over the synthetic benchmark domain
    Search {
        /// Selection algorithm
        #[arg(short, long, default_value = "epsilon-greedy")]
        algorithm: cli::AlgorithmName,

        /// Epsilon for epsilon-greedy (exploration rate)
        #[arg(long, default_value = "0.2")]
        epsilon: f64,

        /// Exploration constant c for UCB (default: sqrt(2))
        #[arg(long)]
        ucb_c: Option<f64>,

        /// Learning rate for policy gradient
        #[arg(long, default_value = "0.1")]
        alpha: f64,

        /// Minimum probability for probability matching
        #[arg(long, default_value = "0.05")]
        p_min: f64,

        /// Random seed (default: wall clock)
        #[arg(short, long)]
        seed: Option<u64>,

        /// Number of search steps
        #[arg(short = 'n', long, default_value = "100")]
        steps: usize,

        /// Operator set
        #[arg(long, default_value = "all")]
        operators: cli::OperatorSetName,

        /// Output directory for CSV exports
        #[arg(short, long, default_value = "rl_results")]
        output: std::path::PathBuf,

        /// Experiment ID (derived from configuration if not specified)
        #[arg(long)]
        experiment_id: Option<String>,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: cli::OutputFormat,
    },

    /// Compare all selection strategies over repeated synthetic trials
    Compare {
        /// Trials per algorithm
        #[arg(short, long, default_value = "20")]
        trials: usize,

        /// Steps per trial
        #[arg(short = 'n', long, default_value = "200")]
        steps: usize,

        /// Base random seed (default: wall clock)
        #[arg(short, long)]
        seed: Option<u64>,

        /// Operator set
        #[arg(long, default_value = "all")]
        operators: cli::OperatorSetName,

        /// Show progress bar
        #[arg(short, long)]
        progress: bool,
    },

    /// List the mutation operator space
    Ops,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let result = match args.command {
        Commands::Search {
            algorithm,
            epsilon,
            ucb_c,
            alpha,
            p_min,
            seed,
            steps,
            operators,
            output,
            experiment_id,
            format,
        } => cli::search::execute(
            algorithm,
            epsilon,
            ucb_c,
            alpha,
            p_min,
            seed,
            steps,
            operators,
            output,
            experiment_id,
            format,
        ),

        Commands::Compare {
            trials,
            steps,
            seed,
            operators,
            progress,
        } => cli::compare::execute(trials, steps, seed, operators, progress),

        Commands::Ops => cli::ops::execute(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
