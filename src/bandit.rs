//! Multi-armed bandit operator selection.
//!
//! Each mutation operator is an arm; the selector learns which arms pay
//! off from the rewards of evaluated mutations. Five interchangeable
//! strategies share one [`BanditCore`] of per-operator statistics:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │  Uniform │ ε-Greedy │ UCB1 │ Policy-Grad │ Prob-Match │
//! ├──────────────────────────────────────────────────────┤
//! │        BanditCore (counts, Q-values, logs)           │
//! ├──────────────────────────────────────────────────────┤
//! │        reward = parent cost / child cost             │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use banditsearch::bandit::{build_selector, Algorithm};
//! use banditsearch::operators::OperatorSet;
//! use rand::SeedableRng;
//! use rand::rngs::SmallRng;
//!
//! let mut selector = build_selector(
//!     Algorithm::EpsilonGreedy { epsilon: 0.2 },
//!     OperatorSet::All.operators(),
//!     SmallRng::seed_from_u64(42),
//! )
//! .unwrap();
//! let op = selector.select();
//! selector.update(op, Some(1000), Some(800), true);
//! ```

mod core;
mod epsilon_greedy;
mod policy_gradient;
mod probability_matching;
mod ucb;
mod uniform;

pub use self::core::{
    Algorithm, BanditCore, BanditState, OperatorSelector, SelectorError, build_selector, reward,
};
pub use epsilon_greedy::EpsilonGreedySelector;
pub use policy_gradient::PolicyGradientSelector;
pub use probability_matching::ProbabilityMatchingSelector;
pub use ucb::UcbSelector;
pub use uniform::UniformSelector;
