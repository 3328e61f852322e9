//! Simulator throughput benchmarks: closed-form stage outcomes and single
//! trial walks.
//!
//! Run with: `cargo bench`
//! Results show mean time per call and throughput (stages/s, trials/s).

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use starforce::simulator::monte_carlo::walk_chain;
use starforce::simulator::rng::Rng;
use starforce::starforce::{BoostWindow, Modifiers, StarForceRequest, TierSystem};

fn request(to: u8) -> StarForceRequest {
    StarForceRequest::new(200, 0, to, TierSystem::Legacy).with_modifiers(Modifiers {
        cost_discount_30: true,
        catch_bonus: true,
        boosted_success_window: Some(BoostWindow::default()),
        prevent_destruction: true,
        guaranteed_milestone: true,
    })
}

fn bench_simulator(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulator");
    group.sample_size(100);

    // Closed form over every legacy stage
    let full = request(23);
    group.throughput(Throughput::Elements(23));
    group.bench_function("stage_outcomes_0_to_23", |b| {
        b.iter(|| black_box(full.stage_outcomes()))
    });

    // One trial walk, shallow chain without destruction
    let shallow = request(12).to_chain().expect("valid request").0;
    group.throughput(Throughput::Elements(1));
    group.bench_function("walk_0_to_12", |b| {
        let mut index = 0u64;
        b.iter(|| {
            index += 1;
            let mut rng = Rng::for_trial(7, index);
            black_box(walk_chain(&shallow.stages, &mut rng))
        })
    });

    // One trial walk through the destruction tiers
    let deep = request(22).to_chain().expect("valid request").0;
    group.throughput(Throughput::Elements(1));
    group.bench_function("walk_0_to_22", |b| {
        let mut index = 0u64;
        b.iter(|| {
            index += 1;
            let mut rng = Rng::for_trial(7, index);
            black_box(walk_chain(&deep.stages, &mut rng))
        })
    });

    group.finish();
}

criterion_group!(benches, bench_simulator);
criterion_main!(benches);
