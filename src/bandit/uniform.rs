//! Uniform random selection, the baseline strategy.

use crate::bandit::core::{BanditCore, OperatorSelector, SelectorError};
use crate::operators::Operator;
use rand::Rng;
use rand::rngs::SmallRng;

/// Selects operators uniformly at random, ignoring all feedback.
///
/// Not a learning strategy, but it shares the common bookkeeping so its
/// statistics are comparable with the learned strategies.
#[derive(Debug, Clone)]
pub struct UniformSelector {
    core: BanditCore,
    rng: SmallRng,
}

impl UniformSelector {
    /// Create a uniform selector over the given operators.
    ///
    /// # Errors
    ///
    /// Returns [`SelectorError::EmptyOperatorSet`] if `operators` is empty.
    pub fn new(operators: Vec<Operator>, rng: SmallRng) -> Result<Self, SelectorError> {
        Ok(Self {
            core: BanditCore::new(operators)?,
            rng,
        })
    }
}

impl OperatorSelector for UniformSelector {
    fn name(&self) -> &'static str {
        "uniform"
    }

    fn select(&mut self) -> Operator {
        self.core.pre_select();
        let idx = self.rng.gen_range(0..self.core.operators().len());
        let selected = self.core.operators()[idx];
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
