//! Compare sequential vs parallel Monte Carlo run times.
//!
//! Run with: `cargo bench --bench monte_carlo_parallel`
//! Or quick comparison: `cargo run --bin benchmark_parallel_speedup` (see src/bin)

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use starforce::simulator::chain::StageChain;
use starforce::simulator::monte_carlo::{run_trials, run_trials_parallel};
use starforce::starforce::{StarForceRequest, TierSystem};

fn chain(level: u32, from: u8, to: u8) -> StageChain {
    StarForceRequest::new(level, from, to, TierSystem::Legacy)
        .to_chain()
        .map(|(chain, _)| chain)
        .expect("benchmark request should be valid")
}

fn bench_monte_carlo_sequential_vs_parallel(c: &mut Criterion) {
    let seed = 42u64;
    let trials = 10_000;
    let deep = chain(160, 12, 22);

    let mut group = c.benchmark_group("monte_carlo");
    group.sample_size(20);
    group.measurement_time(std::time::Duration::from_secs(10));

    group.bench_function("sequential", |b| {
        b.iter(|| black_box(run_trials(&deep, trials, seed)));
    });

    group.bench_function("parallel", |b| {
        b.iter(|| black_box(run_trials_parallel(&deep, trials, seed)));
    });

    group.finish();
}

criterion_group!(benches, bench_monte_carlo_sequential_vs_parallel);
criterion_main!(benches);
