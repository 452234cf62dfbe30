//! Epsilon-greedy selection.
//!
//! With probability `epsilon` the selector explores uniformly at random;
//! otherwise it exploits the operator with the highest average quality.

use crate::bandit::core::{BanditCore, OperatorSelector, SelectorError, first_max_index};
use crate::operators::Operator;
use log::debug;
use rand::Rng;
use rand::rngs::SmallRng;

/// Epsilon-greedy strategy with a fixed exploration rate.
#[derive(Debug, Clone)]
pub struct EpsilonGreedySelector {
    core: BanditCore,
    epsilon: f64,
    rng: SmallRng,
}

impl EpsilonGreedySelector {
    /// Create an epsilon-greedy selector.
    ///
    /// # Errors
    ///
    /// Returns [`SelectorError::EmptyOperatorSet`] for an empty operator
    /// set, or [`SelectorError::InvalidParameter`] if `epsilon` is outside
    /// `[0, 1]`.
    pub fn new(
        operators: Vec<Operator>,
        epsilon: f64,
        rng: SmallRng,
    ) -> Result<Self, SelectorError> {
        if !(0.0..=1.0).contains(&epsilon) {
            return Err(SelectorError::InvalidParameter {
                name: "epsilon",
                value: epsilon,
                requirement: "must be in [0, 1]",
            });
        }
        Ok(Self {
            core: BanditCore::new(operators)?,
            epsilon,
            rng,
        })
    }

    /// The exploration probability.
    #[must_use]
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }
}

impl OperatorSelector for EpsilonGreedySelector {
    fn name(&self) -> &'static str {
        "epsilon_greedy"
    }

    fn select(&mut self) -> Operator {
        self.core.pre_select();

        let selected = if self.rng.r#gen::<f64>() < self.epsilon {
            let idx = self.rng.gen_range(0..self.core.operators().len());
            debug!("epsilon-greedy: explore");
            self.core.operators()[idx]
        } else {
            let idx = first_max_index(self.core.states().iter().map(|s| s.average_quality));
            debug!(
                "epsilon-greedy: exploit (q={:.4})",
                self.core.states()[idx].average_quality
            );
            self.core.operators()[idx]
        };

        self.core.post_select(selected);
        selected
    }

    fn update(
        &mut self,
        operator: Operator,
        parent_fitness: Option<u64>,
        child_fitness: Option<u64>,
        success: bool,
    ) -> f64 {
        self.core
            .update_quality(operator, parent_fitness, child_fitness, success)
    }

    fn reset(&mut self) {
        self.core.reset();
    }

    fn core(&self) -> &BanditCore {
        &self.core
    }
}
