//! Shared bandit state, reward model, and the selector contract.
//!
//! Every selection strategy composes the same [`BanditCore`]: the ordered
//! operator set, one [`BanditState`] per operator, warn-only call-order
//! sanity counters, and append-only time series kept for post-hoc
//! analysis. The strategies differ only in how `select` picks an arm and
//! in whatever derived structures (policy vectors, preference vectors)
//! they maintain on top of the shared incremental-mean update.

// Fitness-to-reward conversion casts 64-bit costs to f64
#![allow(clippy::cast_precision_loss)]

use crate::operators::Operator;
use log::{debug, warn};
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::bandit::epsilon_greedy::EpsilonGreedySelector;
use crate::bandit::policy_gradient::PolicyGradientSelector;
use crate::bandit::probability_matching::ProbabilityMatchingSelector;
use crate::bandit::ucb::UcbSelector;
use crate::bandit::uniform::UniformSelector;

/// Compute the reward for one evaluated mutation.
///
/// Fitness is an execution cost, so the reward is the improvement ratio
/// `parent / child`: above 1 for a faster child, exactly 1 for no change,
/// below 1 for a slower child, and 0 for any failed mutation. A missing
/// or zero parent fitness is a recoverable anomaly: it is logged and
/// yields reward 0.
#[must_use]
pub fn reward(parent_fitness: Option<u64>, child_fitness: Option<u64>, success: bool) -> f64 {
    if !success {
        return 0.0;
    }
    let Some(child) = child_fitness else {
        return 0.0;
    };
    if child == 0 {
        return 0.0;
    }
    match parent_fitness {
        Some(parent) if parent > 0 => parent as f64 / child as f64,
        other => {
            warn!("invalid parent fitness: {other:?}");
            0.0
        }
    }
}

/// Per-operator counters and running reward estimates.
///
/// `selections == successes + failures` holds after every update.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BanditState {
    /// How many times the operator has been selected and evaluated.
    pub selections: u32,
    /// Evaluations where the mutation applied, compiled, and passed tests.
    pub successes: u32,
    /// Evaluations that failed at any stage.
    pub failures: u32,
    /// Incremental mean of all rewards received (the Q-value).
    pub average_quality: f64,
    /// Sum of all rewards received.
    pub total_reward: f64,
}

impl BanditState {
    /// Fraction of evaluations that succeeded, 0 if never selected.
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        if self.selections > 0 {
            f64::from(self.successes) / f64::from(self.selections)
        } else {
            0.0
        }
    }
}

/// Error from selector construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SelectorError {
    /// The operator set was empty.
    EmptyOperatorSet,
    /// A strategy hyperparameter was outside its valid range.
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// The rejected value.
        value: f64,
        /// Human-readable requirement, e.g. "must be in [0, 1]".
        requirement: &'static str,
    },
}

impl fmt::Display for SelectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyOperatorSet => write!(f, "operator set cannot be empty"),
            Self::InvalidParameter {
                name,
                value,
                requirement,
            } => write!(f, "{name} = {value} is invalid: {requirement}"),
        }
    }
}

impl std::error::Error for SelectorError {}

/// Shared bookkeeping composed into every selection strategy.
#[derive(Debug, Clone)]
pub struct BanditCore {
    operators: Vec<Operator>,
    states: Vec<BanditState>,
    previous: Option<Operator>,
    select_calls: u32,
    update_calls: u32,
    reward_log: Vec<f64>,
    quality_log: Vec<Vec<f64>>,
    count_log: Vec<Vec<u32>>,
    selection_log: Vec<Operator>,
    success_log: Vec<bool>,
}

impl BanditCore {
    /// Create zeroed state for the given operator set.
    ///
    /// # Errors
    ///
    /// Returns [`SelectorError::EmptyOperatorSet`] if `operators` is empty.
    pub fn new(operators: Vec<Operator>) -> Result<Self, SelectorError> {
        if operators.is_empty() {
            return Err(SelectorError::EmptyOperatorSet);
        }
        let states = vec![BanditState::default(); operators.len()];
        let mut core = Self {
            operators,
            states,
            previous: None,
            select_calls: 0,
            update_calls: 0,
            reward_log: Vec::new(),
            quality_log: Vec::new(),
            count_log: Vec::new(),
            selection_log: Vec::new(),
            success_log: Vec::new(),
        };
        core.snapshot();
        debug!(
            "initialized bandit core with {} operators",
            core.operators.len()
        );
        Ok(core)
    }

    /// The operator set, in selection-tie-break order.
    #[must_use]
    pub fn operators(&self) -> &[Operator] {
        &self.operators
    }

    /// State for one operator, if it belongs to this selector's set.
    #[must_use]
    pub fn state(&self, operator: Operator) -> Option<&BanditState> {
        self.index_of(operator).map(|i| &self.states[i])
    }

    /// Per-operator state aligned with [`BanditCore::operators`].
    #[must_use]
    pub fn states(&self) -> &[BanditState] {
        &self.states
    }

    /// The most recently selected operator.
    #[must_use]
    pub fn previous_operator(&self) -> Option<Operator> {
        self.previous
    }

    /// Total selections across all operators.
    #[must_use]
    pub fn total_selections(&self) -> u32 {
        self.states.iter().map(|s| s.selections).sum()
    }

    /// Sum of all rewards received.
    #[must_use]
    pub fn cumulative_reward(&self) -> f64 {
        self.reward_log.iter().sum()
    }

    /// Mean of all rewards received, 0 before the first update.
    #[must_use]
    pub fn average_reward(&self) -> f64 {
        if self.reward_log.is_empty() {
            0.0
        } else {
            self.cumulative_reward() / self.reward_log.len() as f64
        }
    }

    /// Operator with the highest average quality (first maximum on ties).
    #[must_use]
    pub fn best_operator(&self) -> Operator {
        let idx = first_max_index(self.states.iter().map(|s| s.average_quality));
        self.operators[idx]
    }

    /// Rewards in step order.
    #[must_use]
    pub fn reward_log(&self) -> &[f64] {
        &self.reward_log
    }

    /// Average-quality snapshots: one entry at construction, then one per
    /// update, each aligned with [`BanditCore::operators`].
    #[must_use]
    pub fn quality_log(&self) -> &[Vec<f64>] {
        &self.quality_log
    }

    /// Selection-count snapshots, same cadence as the quality log.
    #[must_use]
    pub fn count_log(&self) -> &[Vec<u32>] {
        &self.count_log
    }

    /// Operators in selection order.
    #[must_use]
    pub fn selection_log(&self) -> &[Operator] {
        &self.selection_log
    }

    /// Success flags in update order.
    #[must_use]
    pub fn success_log(&self) -> &[bool] {
        &self.success_log
    }

    /// Index of an operator in the ordered set.
    #[must_use]
    pub fn index_of(&self, operator: Operator) -> Option<usize> {
        self.operators.iter().position(|&op| op == operator)
    }

    /// Bookkeeping every strategy runs at the start of `select`.
    ///
    /// Detects two consecutive selects with no intervening update; the
    /// mismatch is a warning, not an error.
    pub fn pre_select(&mut self) {
        if self.select_calls > 0 && self.update_calls < self.select_calls {
            warn!("select() called without update() for the previous selection");
        }
        self.select_calls += 1;
    }

    /// Bookkeeping every strategy runs at the end of `select`.
    pub fn post_select(&mut self, selected: Operator) {
        self.previous = Some(selected);
        self.selection_log.push(selected);
        debug!(
            "selected operator: {selected} (learned: {})",
            selected.is_learned()
        );
    }

    /// Apply the shared quality update and return the computed reward.
    ///
    /// Runs the reward model, then the incremental mean
    /// `Q += (r - Q) / n` with the post-increment selection count `n`,
    /// updates success/failure counters and totals, and appends to every
    /// analysis log. An update with no unmatched preceding select logs a
    /// warning and proceeds.
    pub fn update_quality(
        &mut self,
        operator: Operator,
        parent_fitness: Option<u64>,
        child_fitness: Option<u64>,
        success: bool,
    ) -> f64 {
        if self.update_calls >= self.select_calls {
            warn!("update() called without a matching select() call");
        }
        self.update_calls += 1;

        let r = reward(parent_fitness, child_fitness, success);

        let Some(idx) = self.index_of(operator) else {
            warn!("update() for operator outside the selector's set: {operator}");
            return r;
        };

        let state = &mut self.states[idx];
        state.selections += 1;
        let n = f64::from(state.selections);
        state.average_quality += (r - state.average_quality) / n;
        if success {
            state.successes += 1;
        } else {
            state.failures += 1;
        }
        state.total_reward += r;

        debug!(
            "updated {operator}: reward={r:.4}, q={:.4}, count={}, success={success}",
            state.average_quality, state.selections
        );

        self.reward_log.push(r);
        self.success_log.push(success);
        self.snapshot();

        r
    }

    /// Zero all state and logs, keeping the operator set.
    pub fn reset(&mut self) {
        for state in &mut self.states {
            *state = BanditState::default();
        }
        self.previous = None;
        self.select_calls = 0;
        self.update_calls = 0;
        self.reward_log.clear();
        self.quality_log.clear();
        self.count_log.clear();
        self.selection_log.clear();
        self.success_log.clear();
        self.snapshot();
        debug!("bandit core reset");
    }

    fn snapshot(&mut self) {
        self.quality_log
            .push(self.states.iter().map(|s| s.average_quality).collect());
        self.count_log
            .push(self.states.iter().map(|s| s.selections).collect());
    }
}

/// Index of the first maximum in `scores`.
///
/// Returns 0 for an empty iterator; callers always pass one score per
/// operator and the operator set is non-empty by construction.
pub(crate) fn first_max_index(scores: impl Iterator<Item = f64>) -> usize {
    let mut best_idx = 0;
    let mut best = f64::NEG_INFINITY;
    for (idx, score) in scores.enumerate() {
        if score > best {
            best = score;
            best_idx = idx;
        }
    }
    best_idx
}

/// Contract shared by all selection strategies.
///
/// Exactly one [`OperatorSelector::update`] is expected after each
/// [`OperatorSelector::select`]; violations are logged, never fatal.
/// `select` never mutates any [`BanditState`].
pub trait OperatorSelector: fmt::Debug {
    /// Strategy name as used in configuration and experiment ids.
    fn name(&self) -> &'static str;

    /// Choose the next operator to try.
    fn select(&mut self) -> Operator;

    /// Feed back the outcome of evaluating the selected operator and
    /// return the computed reward.
    fn update(
        &mut self,
        operator: Operator,
        parent_fitness: Option<u64>,
        child_fitness: Option<u64>,
        success: bool,
    ) -> f64;

    /// Reinitialize all state without discarding the operator set.
    fn reset(&mut self);

    /// Read-only access to the shared statistics and analysis logs.
    fn core(&self) -> &BanditCore;
}

/// Selection strategy plus its single hyperparameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    /// Uniform random baseline.
    Uniform,
    /// Epsilon-greedy with exploration probability `epsilon`.
    EpsilonGreedy {
        /// Exploration probability in `[0, 1]`.
        epsilon: f64,
    },
    /// UCB1 with exploration constant `c`.
    Ucb {
        /// Non-negative exploration constant.
        c: f64,
    },
    /// Softmax policy gradient (REINFORCE) with learning rate `alpha`.
    PolicyGradient {
        /// Positive learning rate.
        alpha: f64,
    },
    /// Probability matching with exploration floor `p_min`.
    ProbabilityMatching {
        /// Minimum per-operator probability; `n * p_min` must stay below 1.
        p_min: f64,
    },
}

impl Algorithm {
    /// Strategy name as used in configuration and experiment ids.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Uniform => "uniform",
            Self::EpsilonGreedy { .. } => "epsilon_greedy",
            Self::Ucb { .. } => "ucb",
            Self::PolicyGradient { .. } => "policy_gradient",
            Self::ProbabilityMatching { .. } => "probability_matching",
        }
    }

    /// The strategy's hyperparameter, if it has one.
    #[must_use]
    pub fn parameter(self) -> Option<(&'static str, f64)> {
        match self {
            Self::Uniform => None,
            Self::EpsilonGreedy { epsilon } => Some(("epsilon", epsilon)),
            Self::Ucb { c } => Some(("ucb_c", c)),
            Self::PolicyGradient { alpha } => Some(("alpha", alpha)),
            Self::ProbabilityMatching { p_min } => Some(("p_min", p_min)),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Construct the selector for an [`Algorithm`] over the given operators.
///
/// # Errors
///
/// Returns a [`SelectorError`] for an empty operator set or an
/// out-of-range hyperparameter.
pub fn build_selector(
    algorithm: Algorithm,
    operators: Vec<Operator>,
    rng: SmallRng,
) -> Result<Box<dyn OperatorSelector>, SelectorError> {
    Ok(match algorithm {
        Algorithm::Uniform => Box::new(UniformSelector::new(operators, rng)?),
        Algorithm::EpsilonGreedy { epsilon } => {
            Box::new(EpsilonGreedySelector::new(operators, epsilon, rng)?)
        }
        Algorithm::Ucb { c } => Box::new(UcbSelector::new(operators, c, rng)?),
        Algorithm::PolicyGradient { alpha } => {
            Box::new(PolicyGradientSelector::new(operators, alpha, rng)?)
        }
        Algorithm::ProbabilityMatching { p_min } => {
            Box::new(ProbabilityMatchingSelector::new(operators, p_min, rng)?)
        }
    })
}
