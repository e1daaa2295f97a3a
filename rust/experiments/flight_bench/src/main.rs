//! Stress driver for the keyed coalescing group.
//!
//! Hammers one `KeyedGroup` from many threads with a small key space and a
//! simulated-latency workload, then prints how many calls were deduplicated.
//!
//! Usage: `flight_bench [threads] [rounds] [keys]`

use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::time::{Duration, Instant};

use onceflight::KeyedGroup;

fn main() {
    let threads = arg(1, 16);
    let rounds = arg(2, 500);
    let keys = arg(3, 8);

    let group: KeyedGroup<usize, Infallible> = KeyedGroup::new();
    let executions = Arc::new(AtomicUsize::new(0));
    let start = Arc::new(Barrier::new(threads));

    let t0 = Instant::now();
    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let group = group.clone();
            let executions = executions.clone();
            let start = start.clone();
            std::thread::spawn(move || {
                let mut rng = fastrand::Rng::with_seed(0xF11A57 + t as u64);
                start.wait();
                for _ in 0..rounds {
                    let key = format!("key-{}", rng.usize(..keys));
                    let executions = executions.clone();
                    group
                        .run(key, move || {
                            // Simulated upstream latency.
                            std::thread::sleep(Duration::from_micros(250));
                            Ok(executions.fetch_add(1, Ordering::SeqCst) + 1)
                        })
                        .unwrap();
                }
            })
        })
        .collect();
    handles.into_iter().for_each(|h| h.join().unwrap());
    let elapsed = t0.elapsed();

    let calls = threads * rounds;
    let executions = executions.load(Ordering::SeqCst);
    let deduped = calls - executions;
    println!("threads:    {threads}, rounds: {rounds}, keys: {keys}");
    println!("calls:      {calls}");
    println!("executions: {executions}");
    println!(
        "deduped:    {deduped} ({:.1}%)",
        deduped as f64 * 100.0 / calls as f64
    );
    println!("elapsed:    {elapsed:?}");
}

fn arg(index: usize, default: usize) -> usize {
    std::env::args()
        .nth(index)
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
