//! Probability-matching selection.
//!
//! Selection probabilities track each operator's share of the total
//! quality mass, with a floor of `p_min` per operator so no arm ever
//! stops being explored.

use crate::bandit::core::{BanditCore, OperatorSelector, SelectorError};
use crate::bandit::policy_gradient::sample_categorical;
use crate::operators::Operator;
use log::debug;
use rand::rngs::SmallRng;

/// Probability-matching strategy with exploration floor `p_min`.
#[derive(Debug, Clone)]
pub struct ProbabilityMatchingSelector {
    core: BanditCore,
    p_min: f64,
    rng: SmallRng,
    probabilities: Vec<f64>,
    probabilities_log: Vec<Vec<f64>>,
}

impl ProbabilityMatchingSelector {
    /// Create a probability-matching selector.
    ///
    /// # Errors
    ///
    /// Returns [`SelectorError::EmptyOperatorSet`] for an empty operator
    /// set, or [`SelectorError::InvalidParameter`] if `p_min` is not
    /// positive or `n * p_min` reaches 1 (the residual mass would go
    /// negative).
    pub fn new(
        operators: Vec<Operator>,
        p_min: f64,
        rng: SmallRng,
    ) -> Result<Self, SelectorError> {
        let core = BanditCore::new(operators)?;
        let n = core.operators().len();
        if p_min <= 0.0 {
            return Err(SelectorError::InvalidParameter {
                name: "p_min",
                value: p_min,
                requirement: "must be positive",
            });
        }
        #[allow(clippy::cast_precision_loss)]
        if n as f64 * p_min >= 1.0 {
            return Err(SelectorError::InvalidParameter {
                name: "p_min",
                value: p_min,
                requirement: "n * p_min must stay below 1",
            });
        }
        #[allow(clippy::cast_precision_loss)]
        let probabilities = vec![1.0 / n as f64; n];
        let mut selector = Self {
            core,
            p_min,
            rng,
            probabilities,
            probabilities_log: Vec::new(),
        };
        selector.probabilities_log.push(selector.probabilities.clone());
        Ok(selector)
    }

    /// The per-operator probability floor.
    #[must_use]
    pub fn p_min(&self) -> f64 {
        self.p_min
    }

    /// Current selection probabilities, aligned with the operator set.
    #[must_use]
    pub fn probabilities(&self) -> &[f64] {
        &self.probabilities
    }

    /// Probability snapshots: one at construction, then one per update.
    #[must_use]
    pub fn probabilities_log(&self) -> &[Vec<f64>] {
        &self.probabilities_log
    }

    /// Recompute `p(a) = p_min + (1 - n*p_min) * Q(a) / total_q`, falling
    /// back to uniform while no quality mass has accumulated, then
    /// renormalize against floating-point drift.
    #[allow(clippy::cast_precision_loss)]
    fn update_probabilities(&mut self) {
        let n = self.core.operators().len();
        let total_q: f64 = self.core.states().iter().map(|s| s.average_quality).sum();

        if total_q <= 0.0 {
            self.probabilities.fill(1.0 / n as f64);
        } else {
            let residual = 1.0 - n as f64 * self.p_min;
            for (p, state) in self.probabilities.iter_mut().zip(self.core.states()) {
                *p = self.p_min + residual * (state.average_quality / total_q);
            }
        }

        let sum: f64 = self.probabilities.iter().sum();
        if sum > 0.0 {
            for p in &mut self.probabilities {
                *p /= sum;
            }
        }
    }
}

impl OperatorSelector for ProbabilityMatchingSelector {
    fn name(&self) -> &'static str {
        "probability_matching"
    }

    fn select(&mut self) -> Operator {
        self.core.pre_select();
        let idx = sample_categorical(&self.probabilities, &mut self.rng);
        let selected = self.core.operators()[idx];
        debug!(
            "probability-matching: selected {selected} (p={:.4})",
            self.probabilities[idx]
        );
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
        let reward = self
            .core
            .update_quality(operator, parent_fitness, child_fitness, success);
        self.update_probabilities();
        self.probabilities_log.push(self.probabilities.clone());
        reward
    }

    fn reset(&mut self) {
        self.core.reset();
        #[allow(clippy::cast_precision_loss)]
        let uniform = 1.0 / self.core.operators().len() as f64;
        self.probabilities.fill(uniform);
        self.probabilities_log.clear();
        self.probabilities_log.push(self.probabilities.clone());
    }

    fn core(&self) -> &BanditCore {
        &self.core
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    const A: Operator = Operator::DeleteStatement;
    const B: Operator = Operator::CopyStatement;
    const C: Operator = Operator::ReplaceStatement;

    fn seeded(p_min: f64) -> ProbabilityMatchingSelector {
        ProbabilityMatchingSelector::new(vec![A, B, C], p_min, SmallRng::seed_from_u64(42))
            .unwrap()
    }

    /// Drive an operator's quality estimate with one exact-ratio update.
    fn seed_quality(selector: &mut ProbabilityMatchingSelector, op: Operator, q: f64) {
        let parent = 1_000_000u64;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let child = (parent as f64 / q).round() as u64;
        selector.select();
        selector.update(op, Some(parent), Some(child), true);
    }

    #[test]
    fn test_invalid_p_min_rejected() {
        let rng = || SmallRng::seed_from_u64(0);
        assert!(ProbabilityMatchingSelector::new(vec![A, B, C], 0.0, rng()).is_err());
        assert!(ProbabilityMatchingSelector::new(vec![A, B, C], -0.1, rng()).is_err());
        // 3 * 0.34 > 1
        assert!(ProbabilityMatchingSelector::new(vec![A, B, C], 0.34, rng()).is_err());
        assert!(ProbabilityMatchingSelector::new(vec![A, B, C], 0.1, rng()).is_ok());
    }

    #[test]
    fn test_initial_probabilities_uniform() {
        let selector = seeded(0.05);
        for &p in selector.probabilities() {
            assert!((p - 1.0 / 3.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_quality_shares_map_to_probabilities() {
        let mut selector = seeded(0.1);
        seed_quality(&mut selector, A, 6.0);
        seed_quality(&mut selector, B, 3.0);
        seed_quality(&mut selector, C, 1.0);

        // Q = (6, 3, 1), total 10: p = p_min + 0.7 * share
        let p = selector.probabilities();
        assert!((p[0] - 0.52).abs() < 1e-6);
        assert!((p[1] - 0.31).abs() < 1e-6);
        assert!((p[2] - 0.17).abs() < 1e-6);
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_floor_holds_for_unrewarded_operator() {
        let mut selector = seeded(0.1);
        for _ in 0..50 {
            selector.select();
            selector.update(A, Some(1000), Some(200), true);
        }
        for &p in selector.probabilities() {
            assert!(p >= 0.1 - 1e-9);
        }
        // A holds nearly all non-floor mass
        assert!(selector.probabilities()[0] > 0.7);
    }

    #[test]
    fn test_zero_quality_mass_stays_uniform() {
        let mut selector = seeded(0.05);
        for _ in 0..10 {
            let op = selector.select();
            selector.update(op, Some(1000), None, false);
        }
        for &p in selector.probabilities() {
            assert!((p - 1.0 / 3.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_reset_restores_uniform() {
        let mut selector = seeded(0.1);
        seed_quality(&mut selector, A, 4.0);
        selector.reset();
        for &p in selector.probabilities() {
            assert!((p - 1.0 / 3.0).abs() < 1e-12);
        }
        assert_eq!(selector.probabilities_log().len(), 1);
    }
}
