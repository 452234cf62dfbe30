//! UCB1 selection.
//!
//! Scores each operator as `Q(a) + c * sqrt(ln(t) / n(a))` and takes the
//! maximum, after an initialization phase that tries every operator once
//! in random order so no count is ever zero.

use crate::bandit::core::{BanditCore, OperatorSelector, SelectorError, first_max_index};
use crate::operators::Operator;
use log::debug;
use rand::Rng;
use rand::rngs::SmallRng;

/// UCB1 strategy with exploration constant `c`.
#[derive(Debug, Clone)]
pub struct UcbSelector {
    core: BanditCore,
    c: f64,
    rng: SmallRng,
    /// Operators not yet tried; drained during the initialization phase.
    unselected: Vec<Operator>,
}

impl UcbSelector {
    /// The conventional default exploration constant, `sqrt(2)`.
    pub const DEFAULT_C: f64 = std::f64::consts::SQRT_2;

    /// Create a UCB1 selector.
    ///
    /// # Errors
    ///
    /// Returns [`SelectorError::EmptyOperatorSet`] for an empty operator
    /// set, or [`SelectorError::InvalidParameter`] if `c` is negative.
    pub fn new(operators: Vec<Operator>, c: f64, rng: SmallRng) -> Result<Self, SelectorError> {
        if c < 0.0 {
            return Err(SelectorError::InvalidParameter {
                name: "ucb_c",
                value: c,
                requirement: "must be non-negative",
            });
        }
        let unselected = operators.clone();
        Ok(Self {
            core: BanditCore::new(operators)?,
            c,
            rng,
            unselected,
        })
    }

    /// The exploration constant.
    #[must_use]
    pub fn c(&self) -> f64 {
        self.c
    }

    /// True once every operator has been selected at least once.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.unselected.is_empty()
    }

    fn ucb_score(&self, idx: usize, total_selections: u32) -> f64 {
        let state = &self.core.states()[idx];
        if state.selections == 0 {
            return f64::MAX;
        }
        let bonus = self.c
            * (f64::from(total_selections).ln() / f64::from(state.selections)).sqrt();
        state.average_quality + bonus
    }
}

impl OperatorSelector for UcbSelector {
    fn name(&self) -> &'static str {
        "ucb"
    }

    fn select(&mut self) -> Operator {
        self.core.pre_select();

        let selected = if self.unselected.is_empty() {
            let t = self.core.total_selections();
            let idx = first_max_index(
                (0..self.core.operators().len()).map(|i| self.ucb_score(i, t)),
            );
            debug!("ucb: selected index {idx} (score={:.4})", self.ucb_score(idx, t));
            self.core.operators()[idx]
        } else {
            let idx = self.rng.gen_range(0..self.unselected.len());
            let op = self.unselected.swap_remove(idx);
            debug!(
                "ucb: initialization, {} operators still untried",
                self.unselected.len()
            );
            op
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
        self.unselected = self.core.operators().to_vec();
    }

    fn core(&self) -> &BanditCore {
        &self.core
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::OperatorSet;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn test_negative_c_rejected() {
        let err = UcbSelector::new(
            OperatorSet::All.operators(),
            -1.0,
            SmallRng::seed_from_u64(0),
        )
        .unwrap_err();
        assert!(matches!(err, SelectorError::InvalidParameter { name: "ucb_c", .. }));
    }

    #[test]
    fn test_initialization_tries_every_operator_once() {
        for seed in [0u64, 1, 42, 999] {
            let operators = OperatorSet::All.operators();
            let mut selector =
                UcbSelector::new(operators.clone(), UcbSelector::DEFAULT_C, SmallRng::seed_from_u64(seed))
                    .unwrap();

            let mut seen = HashSet::new();
            for _ in 0..operators.len() {
                let op = selector.select();
                assert!(seen.insert(op), "operator {op} selected twice during init");
                selector.update(op, Some(1000), Some(1000), true);
            }
            assert!(selector.is_initialized());
        }
    }

    #[test]
    fn test_two_operator_init_order_is_seed_deterministic() {
        let operators = vec![Operator::DeleteStatement, Operator::CopyStatement];
        let run = |seed| {
            let mut selector =
                UcbSelector::new(operators.clone(), UcbSelector::DEFAULT_C, SmallRng::seed_from_u64(seed))
                    .unwrap();
            let first = selector.select();
            selector.update(first, Some(1000), Some(1000), true);
            let second = selector.select();
            selector.update(second, Some(1000), Some(1000), true);
            (first, second)
        };
        let (a1, a2) = run(42);
        assert_ne!(a1, a2);
        // same seed, same order
        assert_eq!(run(42), (a1, a2));
    }

    #[test]
    fn test_steady_phase_prefers_high_quality_arm() {
        let operators = vec![Operator::DeleteStatement, Operator::CopyStatement];
        let mut selector =
            UcbSelector::new(operators, 0.5, SmallRng::seed_from_u64(3)).unwrap();

        // initialization: give DeleteStatement a strong reward, CopyStatement none
        for _ in 0..2 {
            let op = selector.select();
            let child = if op == Operator::DeleteStatement {
                Some(500)
            } else {
                None
            };
            selector.update(op, Some(1000), child, child.is_some());
        }

        let mut delete_count = 0;
        for _ in 0..100 {
            let op = selector.select();
            let child = if op == Operator::DeleteStatement {
                Some(500)
            } else {
                None
            };
            selector.update(op, Some(1000), child, child.is_some());
            if op == Operator::DeleteStatement {
                delete_count += 1;
            }
        }
        assert!(delete_count > 60, "expected exploitation, got {delete_count}");
    }

    #[test]
    fn test_reset_repopulates_initialization_set() {
        let operators = OperatorSet::Statement.operators();
        let mut selector =
            UcbSelector::new(operators.clone(), UcbSelector::DEFAULT_C, SmallRng::seed_from_u64(11))
                .unwrap();
        for _ in 0..operators.len() {
            let op = selector.select();
            selector.update(op, Some(1000), Some(900), true);
        }
        assert!(selector.is_initialized());
        selector.reset();
        assert!(!selector.is_initialized());
    }
}
