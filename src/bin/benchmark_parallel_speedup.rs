//! Run the Monte Carlo trials once sequentially and once in parallel, then
//! print timings and speedup.
//!
//! Usage: cargo run --release --bin benchmark_parallel_speedup [trials]

use std::time::Instant;

use starforce::simulator::monte_carlo::{run_trials, run_trials_parallel};
use starforce::starforce::{Modifiers, StarForceRequest, TierSystem};

fn main() {
    let trials = std::env::args()
        .nth(1)
        .and_then(|raw| raw.parse::<usize>().ok())
        .unwrap_or(20_000);
    let seed = 12345u64;
    let request = StarForceRequest::new(160, 10, 22, TierSystem::Legacy).with_modifiers(Modifiers {
        catch_bonus: true,
        ..Modifiers::default()
    });
    let (chain, _) = match request.to_chain() {
        Ok(chain) => chain,
        Err(err) => {
            eprintln!("invalid benchmark request: {err}");
            std::process::exit(1);
        }
    };

    println!(
        "Monte Carlo: {} trials, level {} tiers {} -> {} ({} stages)",
        trials,
        request.item_level,
        request.current_tier,
        request.target_tier,
        chain.stages.len()
    );
    println!();

    let t0 = Instant::now();
    let sequential = run_trials(&chain, trials, seed);
    let elapsed_seq = t0.elapsed();
    let seq_ms = elapsed_seq.as_secs_f64() * 1000.0;
    println!(
        "Sequential:  {:.2} ms  ({:.1} trials/s)",
        seq_ms,
        trials as f64 / elapsed_seq.as_secs_f64()
    );

    let t0 = Instant::now();
    let parallel = run_trials_parallel(&chain, trials, seed);
    let elapsed_par = t0.elapsed();
    let par_ms = elapsed_par.as_secs_f64() * 1000.0;
    println!(
        "Parallel:    {:.2} ms  ({:.1} trials/s)",
        par_ms,
        trials as f64 / elapsed_par.as_secs_f64()
    );

    println!();
    println!("Speedup:     {:.2}x faster (parallel vs sequential)", seq_ms / par_ms);

    if sequential != parallel {
        eprintln!("sequential and parallel samples differ");
        std::process::exit(1);
    }
    println!("(Samples match sequential vs parallel)");
}
