//! Softmax policy-gradient (REINFORCE) selection.
//!
//! Maintains a real-valued preference per operator and samples from the
//! softmax of those preferences. After each outcome the preferences move
//! along the REINFORCE gradient against a running average-reward
//! baseline. The gradient step uses the baseline as it stood *before*
//! the new reward; the baseline then absorbs that reward, so the next
//! update sees it.

use crate::bandit::core::{BanditCore, OperatorSelector, SelectorError};
use crate::operators::Operator;
use log::debug;
use rand::Rng;
use rand::rngs::SmallRng;

/// REINFORCE-style strategy with learning rate `alpha`.
#[derive(Debug, Clone)]
pub struct PolicyGradientSelector {
    core: BanditCore,
    alpha: f64,
    rng: SmallRng,
    preferences: Vec<f64>,
    policy: Vec<f64>,
    average_reward: f64,
    total_reward: f64,
    reward_count: u32,
    preferences_log: Vec<Vec<f64>>,
    policy_log: Vec<Vec<f64>>,
    average_reward_log: Vec<f64>,
}

impl PolicyGradientSelector {
    /// Create a policy-gradient selector.
    ///
    /// # Errors
    ///
    /// Returns [`SelectorError::EmptyOperatorSet`] for an empty operator
    /// set, or [`SelectorError::InvalidParameter`] if `alpha` is not
    /// positive.
    pub fn new(
        operators: Vec<Operator>,
        alpha: f64,
        rng: SmallRng,
    ) -> Result<Self, SelectorError> {
        if alpha <= 0.0 {
            return Err(SelectorError::InvalidParameter {
                name: "alpha",
                value: alpha,
                requirement: "must be positive",
            });
        }
        let core = BanditCore::new(operators)?;
        let n = core.operators().len();
        let preferences = vec![0.0; n];
        let policy = softmax(&preferences);
        let mut selector = Self {
            core,
            alpha,
            rng,
            preferences,
            policy,
            average_reward: 0.0,
            total_reward: 0.0,
            reward_count: 0,
            preferences_log: Vec::new(),
            policy_log: Vec::new(),
            average_reward_log: Vec::new(),
        };
        selector.snapshot();
        Ok(selector)
    }

    /// The learning rate.
    #[must_use]
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Current selection probabilities, aligned with the operator set.
    #[must_use]
    pub fn policy(&self) -> &[f64] {
        &self.policy
    }

    /// Current preference values, aligned with the operator set.
    #[must_use]
    pub fn preferences(&self) -> &[f64] {
        &self.preferences
    }

    /// The running average-reward baseline.
    #[must_use]
    pub fn baseline_reward(&self) -> f64 {
        self.average_reward
    }

    /// Preference snapshots: one at construction, then one per update.
    #[must_use]
    pub fn preferences_log(&self) -> &[Vec<f64>] {
        &self.preferences_log
    }

    /// Policy snapshots, same cadence as the preference log.
    #[must_use]
    pub fn policy_log(&self) -> &[Vec<f64>] {
        &self.policy_log
    }

    /// Baseline snapshots, same cadence as the preference log.
    #[must_use]
    pub fn average_reward_log(&self) -> &[f64] {
        &self.average_reward_log
    }

    fn snapshot(&mut self) {
        self.preferences_log.push(self.preferences.clone());
        self.policy_log.push(self.policy.clone());
        self.average_reward_log.push(self.average_reward);
    }
}

/// Softmax with the max-subtraction stability trick.
fn softmax(preferences: &[f64]) -> Vec<f64> {
    let max = preferences.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut result: Vec<f64> = preferences.iter().map(|&h| (h - max).exp()).collect();
    let sum: f64 = result.iter().sum();
    for p in &mut result {
        *p /= sum;
    }
    result
}

/// Sample an index from a categorical distribution by cumulative
/// inversion; falls back to the last index if rounding leaves the draw
/// unassigned.
pub(crate) fn sample_categorical(probabilities: &[f64], rng: &mut SmallRng) -> usize {
    let draw = rng.r#gen::<f64>();
    let mut cumulative = 0.0;
    for (idx, &p) in probabilities.iter().enumerate() {
        cumulative += p;
        if draw <= cumulative {
            return idx;
        }
    }
    probabilities.len() - 1
}

impl OperatorSelector for PolicyGradientSelector {
    fn name(&self) -> &'static str {
        "policy_gradient"
    }

    fn select(&mut self) -> Operator {
        self.core.pre_select();
        let idx = sample_categorical(&self.policy, &mut self.rng);
        let selected = self.core.operators()[idx];
        debug!("policy-gradient: selected {selected} (pi={:.4})", self.policy[idx]);
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
        // shared incremental-mean update; the policy, not Q, drives
        // selection for this strategy
        let reward = self
            .core
            .update_quality(operator, parent_fitness, child_fitness, success);

        let selected_idx = self.core.index_of(operator);
        let advantage = reward - self.average_reward;
        for (idx, preference) in self.preferences.iter_mut().enumerate() {
            if Some(idx) == selected_idx {
                *preference += self.alpha * advantage * (1.0 - self.policy[idx]);
            } else {
                *preference -= self.alpha * advantage * self.policy[idx];
            }
        }
        self.policy = softmax(&self.preferences);

        self.total_reward += reward;
        self.reward_count += 1;
        self.average_reward = self.total_reward / f64::from(self.reward_count);

        self.snapshot();
        debug!("policy-gradient: baseline={:.4}", self.average_reward);
        reward
    }

    fn reset(&mut self) {
        self.core.reset();
        self.preferences.fill(0.0);
        self.policy = softmax(&self.preferences);
        self.average_reward = 0.0;
        self.total_reward = 0.0;
        self.reward_count = 0;
        self.preferences_log.clear();
        self.policy_log.clear();
        self.average_reward_log.clear();
        self.snapshot();
    }

    fn core(&self) -> &BanditCore {
        &self.core
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    const OPS: [Operator; 3] = [
        Operator::DeleteStatement,
        Operator::CopyStatement,
        Operator::ReplaceStatement,
    ];

    fn seeded(alpha: f64) -> PolicyGradientSelector {
        PolicyGradientSelector::new(OPS.to_vec(), alpha, SmallRng::seed_from_u64(42)).unwrap()
    }

    #[test]
    fn test_non_positive_alpha_rejected() {
        assert!(PolicyGradientSelector::new(OPS.to_vec(), 0.0, SmallRng::seed_from_u64(0)).is_err());
        assert!(
            PolicyGradientSelector::new(OPS.to_vec(), -0.1, SmallRng::seed_from_u64(0)).is_err()
        );
    }

    #[test]
    fn test_initial_policy_is_uniform() {
        let selector = seeded(0.1);
        for &p in selector.policy() {
            assert!((p - 1.0 / 3.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_policy_stays_a_distribution() {
        let mut selector = seeded(0.1);
        for step in 0..200 {
            let op = selector.select();
            let child = if step % 3 == 0 { Some(700) } else { None };
            selector.update(op, Some(1000), child, child.is_some());

            let sum: f64 = selector.policy().iter().sum();
            assert!((sum - 1.0).abs() < 1e-9);
            assert!(selector.policy().iter().all(|&p| p > 0.0 && p < 1.0));
        }
    }

    #[test]
    fn test_consistent_rewards_raise_preference() {
        let mut selector = seeded(0.1);
        let target = OPS[1];
        let idx = selector.core().index_of(target).unwrap();
        let before = selector.preferences()[idx];

        for _ in 0..20 {
            selector.select();
            // rewards well above any baseline the run can accumulate
            selector.update(target, Some(2000), Some(1000), true);
        }

        assert!(selector.preferences()[idx] > before);
        let max_idx = selector
            .policy()
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(max_idx, idx);
    }

    #[test]
    fn test_baseline_excludes_current_reward_in_gradient() {
        let mut selector = seeded(1.0);
        selector.select();
        // first update: baseline is 0, reward 2.0, so the selected
        // preference moves by alpha * 2.0 * (1 - 1/3)
        selector.update(OPS[0], Some(1000), Some(500), true);
        let idx = 0;
        let expected = 1.0 * 2.0 * (1.0 - 1.0 / 3.0);
        assert!((selector.preferences()[idx] - expected).abs() < 1e-9);
        // and the baseline has absorbed the reward afterwards
        assert!((selector.baseline_reward() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_logs_snapshot_each_update() {
        let mut selector = seeded(0.1);
        assert_eq!(selector.policy_log().len(), 1);
        selector.select();
        selector.update(OPS[2], Some(1000), Some(800), true);
        assert_eq!(selector.policy_log().len(), 2);
        assert_eq!(selector.preferences_log().len(), 2);
        assert_eq!(selector.average_reward_log().len(), 2);
    }

    #[test]
    fn test_reset_restores_uniform_policy() {
        let mut selector = seeded(0.5);
        for _ in 0..10 {
            let op = selector.select();
            selector.update(op, Some(1000), Some(500), true);
        }
        selector.reset();
        for &p in selector.policy() {
            assert!((p - 1.0 / 3.0).abs() < 1e-12);
        }
        assert!(selector.baseline_reward().abs() < 1e-12);
        assert_eq!(selector.policy_log().len(), 1);
    }
}
