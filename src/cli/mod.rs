//! CLI command implementations for banditsearch.

pub(crate) mod compare;
pub(crate) mod ops;
pub(crate) mod search;

use banditsearch::bandit::{Algorithm, UcbSelector};
use banditsearch::operators::OperatorSet;
use clap::ValueEnum;
use std::error::Error;
use std::fmt;

/// Selection algorithm choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum AlgorithmName {
    /// Uniform random baseline.
    Uniform,
    /// Epsilon-greedy.
    EpsilonGreedy,
    /// UCB1.
    Ucb,
    /// Softmax policy gradient (REINFORCE).
    PolicyGradient,
    /// Probability matching.
    ProbabilityMatching,
}

impl AlgorithmName {
    /// Pair the algorithm with its hyperparameter from the CLI options.
    pub(crate) fn to_algorithm(
        self,
        epsilon: f64,
        ucb_c: Option<f64>,
        alpha: f64,
        p_min: f64,
    ) -> Algorithm {
        match self {
            Self::Uniform => Algorithm::Uniform,
            Self::EpsilonGreedy => Algorithm::EpsilonGreedy { epsilon },
            Self::Ucb => Algorithm::Ucb {
                c: ucb_c.unwrap_or(UcbSelector::DEFAULT_C),
            },
            Self::PolicyGradient => Algorithm::PolicyGradient { alpha },
            Self::ProbabilityMatching => Algorithm::ProbabilityMatching { p_min },
        }
    }
}

/// Operator set choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OperatorSetName {
    /// Whole-statement operators.
    Statement,
    /// Matched statement operators.
    Matched,
    /// Node modification operators.
    ModifyNode,
    /// All classical operators.
    Traditional,
    /// Model-driven operators.
    Llm,
    /// The full operator space.
    All,
}

impl OperatorSetName {
    /// Map the CLI choice to the library's operator set.
    pub(crate) fn to_operator_set(self) -> OperatorSet {
        match self {
            Self::Statement => OperatorSet::Statement,
            Self::Matched => OperatorSet::Matched,
            Self::ModifyNode => OperatorSet::ModifyNode,
            Self::Traditional => OperatorSet::Traditional,
            Self::Llm => OperatorSet::Llm,
            Self::All => OperatorSet::All,
        }
    }
}

/// Output format for the `search` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// CLI error type.
#[derive(Debug)]
pub(crate) struct CliError {
    message: String,
}

impl CliError {
    /// Create a new CLI error.
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for CliError {}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        Self::new(e.to_string())
    }
}

impl From<banditsearch::bandit::SelectorError> for CliError {
    fn from(e: banditsearch::bandit::SelectorError) -> Self {
        Self::new(e.to_string())
    }
}

impl From<banditsearch::search::SearchError> for CliError {
    fn from(e: banditsearch::search::SearchError) -> Self {
        Self::new(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::new(e.to_string())
    }
}

/// Seed fallback when none is given: seconds since the epoch.
pub(crate) fn wall_clock_seed() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(42, |d| d.as_secs())
}
