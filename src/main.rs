//! boundq - quick latency/throughput report
//!
//! Measures both queue strategies:
//! - Uncontended put/take latency on a single thread
//! - Contended hand-off throughput, 4 producers x 4 consumers

use std::time::Instant;

use boundq::{BlockingQueue, Strategy, Workload};

fn main() {
    println!("🚀 boundq - Bounded Blocking Queue");
    println!("==================================\n");

    for strategy in Strategy::ALL {
        benchmark_uncontended(strategy);
    }

    for strategy in Strategy::ALL {
        benchmark_contended(strategy);
    }

    println!("\n✅ All benchmarks complete!");
    println!("\nTo run a custom workload: cargo run --release --bin boundq_workload -- --help");
}

fn benchmark_uncontended(strategy: Strategy) {
    println!("📊 Uncontended put/take ({strategy})");
    println!("-----------------------------------");

    const ITERATIONS: usize = 1_000_000;
    const CAPACITY: usize = 1024;

    let queue = match strategy.build::<u64>(CAPACITY) {
        Ok(queue) => queue,
        Err(err) => {
            eprintln!("  failed to build queue: {err}");
            return;
        }
    };

    // Warm up
    for i in 0..CAPACITY as u64 {
        queue.try_put(i).ok();
    }
    while queue.try_take().is_ok() {}

    // Benchmark put, draining whenever the ring fills
    let start = Instant::now();
    for i in 0..ITERATIONS {
        if queue.try_put(i as u64).is_err() {
            while queue.try_take().is_ok() {}
            queue.try_put(i as u64).ok();
        }
    }
    let put_duration = start.elapsed();

    while queue.try_take().is_ok() {}

    // Benchmark put+take pairs
    let start = Instant::now();
    for i in 0..ITERATIONS {
        queue.try_put(i as u64).ok();
        queue.try_take().ok();
    }
    let cycle_duration = start.elapsed();

    let put_ns = put_duration.as_nanos() as f64 / ITERATIONS as f64;
    let cycle_ns = cycle_duration.as_nanos() as f64 / ITERATIONS as f64;

    println!("  Operations: {}", ITERATIONS);
    println!(
        "  Put latency:       {:.2} ns/op ({:.3} μs/op)",
        put_ns,
        put_ns / 1000.0
    );
    println!(
        "  Put+take latency:  {:.2} ns/op ({:.3} μs/op)",
        cycle_ns,
        cycle_ns / 1000.0
    );
    println!(
        "  Throughput:        {:.2} M ops/sec\n",
        ITERATIONS as f64 / put_duration.as_secs_f64() / 1_000_000.0
    );
}

fn benchmark_contended(strategy: Strategy) {
    println!("📊 Contended hand-off ({strategy}, 4P x 4C)");
    println!("-------------------------------------------");

    for capacity in [1, 5, 64, 1024] {
        let workload = Workload {
            strategy,
            capacity,
            producers: 4,
            consumers: 4,
            items_per_producer: 50_000,
        };

        match workload.run() {
            Ok(report) => {
                let status = if report.is_consistent() { "ok" } else { "MISMATCH" };
                println!(
                    "  capacity {:>5}: {:>8.2} K items/sec in {:>7.1} ms [{}]",
                    capacity,
                    report.throughput() / 1000.0,
                    report.elapsed.as_secs_f64() * 1000.0,
                    status
                );
            }
            Err(err) => eprintln!("  capacity {:>5}: {err}", capacity),
        }
    }
    println!();
}
