//! Synthetic benchmark domain for exercising the search loop end to end.
//!
//! Simulates mutation outcomes from hidden per-operator quality levels:
//! stronger operators succeed more often and produce faster children.
//! The qualities are invisible to the selectors, which makes the domain
//! a controlled testbed for comparing how quickly each strategy finds
//! the effective operators.

// Fitness synthesis converts between integer costs and f64 factors
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]

use crate::operators::Operator;
use crate::search::{Evaluation, SearchDomain};
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Baseline execution cost of the unmodified synthetic program.
pub const BASE_FITNESS: u64 = 1000;

/// Quality assumed for operators missing from a custom table.
const DEFAULT_QUALITY: f64 = 0.3;

/// Hidden per-operator effectiveness used by the standard domain.
///
/// Mirrors the ordering intuition of real genetic-improvement runs:
/// type-aware replacement beats blind deletion, and model-driven
/// rewrites sit at the top.
const STANDARD_QUALITIES: [(Operator, f64); 13] = [
    (Operator::DeleteStatement, 0.3),
    (Operator::CopyStatement, 0.5),
    (Operator::ReplaceStatement, 0.7),
    (Operator::SwapStatement, 0.4),
    (Operator::MoveStatement, 0.35),
    (Operator::MatchedDeleteStatement, 0.35),
    (Operator::MatchedCopyStatement, 0.55),
    (Operator::MatchedReplaceStatement, 0.75),
    (Operator::MatchedSwapStatement, 0.5),
    (Operator::BinaryOperatorReplacement, 0.6),
    (Operator::UnaryOperatorReplacement, 0.45),
    (Operator::LlmMaskedStatement, 0.8),
    (Operator::LlmReplaceStatement, 0.85),
];

/// Outcome of simulating one operator application in isolation.
#[derive(Debug, Clone, Copy)]
pub struct SimulatedOutcome {
    /// Fitness of the parent the operator was applied to.
    pub parent_fitness: u64,
    /// Fitness of the simulated child; absent on failure.
    pub child_fitness: Option<u64>,
    /// Whether the simulated mutation succeeded.
    pub success: bool,
}

/// A synthetic program variant: the list of edits applied so far.
#[derive(Debug, Clone, Default)]
pub struct SyntheticVariant {
    edits: Vec<Operator>,
}

impl SyntheticVariant {
    /// Number of edits in the variant.
    #[must_use]
    pub fn edit_count(&self) -> usize {
        self.edits.len()
    }
}

/// A [`SearchDomain`] with simulated compile/test/fitness behaviour.
#[derive(Debug, Clone)]
pub struct SyntheticDomain {
    qualities: Vec<(Operator, f64)>,
    rng: SmallRng,
    output_path: PathBuf,
}

impl SyntheticDomain {
    /// Create a domain with a custom quality table.
    #[must_use]
    pub fn new(qualities: Vec<(Operator, f64)>, seed: u64, output_path: PathBuf) -> Self {
        Self {
            qualities,
            rng: SmallRng::seed_from_u64(seed),
            output_path,
        }
    }

    /// The standard domain: full quality table, best variant written
    /// under `output_dir`.
    #[must_use]
    pub fn standard(seed: u64, output_dir: &Path) -> Self {
        Self::new(
            STANDARD_QUALITIES.to_vec(),
            seed,
            output_dir.join("best_variant.txt"),
        )
    }

    /// The hidden quality of an operator.
    #[must_use]
    pub fn true_quality(&self, operator: Operator) -> f64 {
        self.qualities
            .iter()
            .find(|(op, _)| *op == operator)
            .map_or(DEFAULT_QUALITY, |(_, q)| *q)
    }

    /// The highest hidden quality in the table; the yardstick for
    /// cumulative regret.
    #[must_use]
    pub fn max_true_quality(&self) -> f64 {
        self.qualities
            .iter()
            .map(|(_, q)| *q)
            .fold(DEFAULT_QUALITY, f64::max)
    }

    /// Simulate applying one operator to the unmodified program.
    ///
    /// Success probability is `0.3 + 0.6 * quality`; on success the
    /// child's cost is `parent / max(0.1, quality * noise)` with noise
    /// uniform in `[0.8, 1.2)`.
    pub fn simulate_operator(&mut self, operator: Operator) -> SimulatedOutcome {
        let quality = self.true_quality(operator);
        let success = self.rng.r#gen::<f64>() < 0.3 + 0.6 * quality;
        if !success {
            return SimulatedOutcome {
                parent_fitness: BASE_FITNESS,
                child_fitness: None,
                success: false,
            };
        }
        let noise = 0.8 + 0.4 * self.rng.r#gen::<f64>();
        let speedup = (quality * noise).max(0.1);
        SimulatedOutcome {
            parent_fitness: BASE_FITNESS,
            child_fitness: Some((BASE_FITNESS as f64 / speedup) as u64),
            success: true,
        }
    }

    /// Draw which stage a failed evaluation dies at.
    fn failure(&mut self) -> Evaluation {
        let draw = self.rng.r#gen::<f64>();
        let (valid_patch, clean_compile) = if draw < 0.2 {
            (false, false)
        } else if draw < 0.5 {
            (true, false)
        } else {
            (true, true)
        };
        Evaluation {
            valid_patch,
            clean_compile,
            tests_pass: false,
            execution_cost: 0,
        }
    }
}

impl SearchDomain for SyntheticDomain {
    type Variant = SyntheticVariant;

    fn initial(&self) -> SyntheticVariant {
        SyntheticVariant::default()
    }

    fn apply_operator(
        &mut self,
        current: &SyntheticVariant,
        operator: Operator,
        rng: &mut SmallRng,
    ) -> SyntheticVariant {
        let mut next = current.clone();
        if !next.edits.is_empty() && rng.r#gen::<f64>() > 0.5 {
            let idx = rng.gen_range(0..next.edits.len());
            next.edits.remove(idx);
        } else {
            next.edits.push(operator);
        }
        next
    }

    fn evaluate(&mut self, variant: &SyntheticVariant, repetitions: u32) -> Evaluation {
        // the unmodified program always compiles and passes
        if variant.edits.is_empty() {
            return Evaluation {
                valid_patch: true,
                clean_compile: true,
                tests_pass: true,
                execution_cost: BASE_FITNESS * u64::from(repetitions),
            };
        }

        let mut speedup = 1.0f64;
        for &edit in &variant.edits {
            let quality = self.true_quality(edit);
            if self.rng.r#gen::<f64>() >= 0.3 + 0.6 * quality {
                return self.failure();
            }
            let noise = 0.8 + 0.4 * self.rng.r#gen::<f64>();
            speedup *= (quality * noise).max(0.1);
        }

        let cost = (BASE_FITNESS as f64 / speedup) as u64;
        Evaluation {
            valid_patch: true,
            clean_compile: true,
            tests_pass: true,
            execution_cost: cost * u64::from(repetitions),
        }
    }

    fn describe(&self, variant: &SyntheticVariant) -> String {
        if variant.edits.is_empty() {
            "(no edits)".to_string()
        } else {
            variant
                .edits
                .iter()
                .map(|op| op.name())
                .collect::<Vec<_>>()
                .join(" | ")
        }
    }

    fn save_best(&mut self, variant: &SyntheticVariant) -> io::Result<PathBuf> {
        if let Some(parent) = self.output_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = fs::File::create(&self.output_path)?;
        writeln!(file, "{}", self.describe(variant))?;
        Ok(self.output_path.clone())
    }
}
