// Allow unwrap, unreadable literals, and lossy casts in tests (test code is not production)
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::unreadable_literal))]
#![cfg_attr(
    test,
    allow(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::cast_sign_loss
    )
)]
//! Banditsearch: online bandit operator selection for program-improvement search.
//!
//! At each step of a local search over program variants, a multi-armed
//! bandit chooses which mutation operator to try next and learns from
//! the fitness outcome. The crate provides the bandit engine, the
//! sequential search loop that drives it, and the experiment metrics.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │          Search Loop                │
//! ├─────────────────────────────────────┤
//! │  Selector (uniform / ε-greedy /     │
//! │   UCB1 / policy-grad / prob-match)  │
//! ├─────────────────────────────────────┤
//! │   Reward Model + Bandit State       │
//! ├─────────────────────────────────────┤
//! │   SearchDomain (mutate + evaluate)  │
//! └─────────────────────────────────────┘
//! ```
//!
//! Mutation derivation and compile-and-test execution are collaborator
//! concerns behind [`search::SearchDomain`]; the engine only sees
//! operator identifiers and fitness outcomes. A synthetic domain
//! ([`sim::SyntheticDomain`]) exercises the full loop without a real
//! compiler.

pub mod bandit;
pub mod metrics;
pub mod operators;
pub mod search;
pub mod sim;

pub use bandit::{
    Algorithm, BanditCore, BanditState, OperatorSelector, SelectorError, build_selector,
};
pub use operators::{Operator, OperatorCategory, OperatorSet};
pub use search::{
    Evaluation, SearchConfig, SearchDomain, SearchError, SearchOutcome, WARMUP_REPS, run_search,
};
