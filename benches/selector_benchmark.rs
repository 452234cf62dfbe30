//! Benchmarks for the bandit selection strategies.
//!
//! Measures the select/update cycle for each strategy over the full
//! operator space - the per-step overhead the search loop pays on top
//! of the (much slower) compile-and-test evaluation.

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use std::hint::black_box;
use std::path::Path;

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};

use banditsearch::bandit::{Algorithm, UcbSelector, build_selector};
use banditsearch::operators::OperatorSet;
use banditsearch::sim::SyntheticDomain;
use rand::SeedableRng;
use rand::rngs::SmallRng;

const STEPS_PER_ITER: usize = 1000;

fn bench_select_update_cycle(c: &mut Criterion) {
    let algorithms = [
        Algorithm::Uniform,
        Algorithm::EpsilonGreedy { epsilon: 0.2 },
        Algorithm::Ucb {
            c: UcbSelector::DEFAULT_C,
        },
        Algorithm::PolicyGradient { alpha: 0.1 },
        Algorithm::ProbabilityMatching { p_min: 0.05 },
    ];

    let mut group = c.benchmark_group("select_update_1000_steps");
    for algorithm in algorithms {
        group.bench_function(algorithm.name(), |b| {
            b.iter_batched(
                || {
                    let selector = build_selector(
                        algorithm,
                        OperatorSet::All.operators(),
                        SmallRng::seed_from_u64(42),
                    )
                    .unwrap();
                    let domain = SyntheticDomain::standard(7, Path::new("."));
                    (selector, domain)
                },
                |(mut selector, mut domain)| {
                    for _ in 0..STEPS_PER_ITER {
                        let op = selector.select();
                        let outcome = domain.simulate_operator(black_box(op));
                        selector.update(
                            op,
                            Some(outcome.parent_fitness),
                            outcome.child_fitness,
                            outcome.success,
                        );
                    }
                    black_box(selector.core().cumulative_reward())
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_synthetic_evaluation(c: &mut Criterion) {
    c.bench_function("synthetic_simulate_operator", |b| {
        let mut domain = SyntheticDomain::standard(3, Path::new("."));
        let operators = OperatorSet::All.operators();
        let mut i = 0usize;
        b.iter(|| {
            let op = operators[i % operators.len()];
            i += 1;
            black_box(domain.simulate_operator(black_box(op)))
        });
    });
}

criterion_group!(benches, bench_select_update_cycle, bench_synthetic_evaluation);
criterion_main!(benches);
