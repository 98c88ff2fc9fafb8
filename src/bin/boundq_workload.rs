//! boundq workload runner
//!
//! Runs N producers and M consumers against one queue, closes it once the
//! producers are done, and checks that every item arrived exactly once and in
//! per-producer order.
//!
//! Usage:
//!   cargo run --release --bin boundq_workload -- [OPTIONS]

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use boundq::{Strategy, Workload};

#[derive(Parser, Debug)]
#[command(name = "boundq_workload", about = "Producer/consumer run over a bounded queue", version)]
struct Cli {
    /// Synchronization strategy: condvar or semaphore
    #[arg(short, long, default_value = "condvar")]
    strategy: Strategy,

    /// Queue capacity in slots
    #[arg(short, long, default_value_t = 5)]
    capacity: usize,

    /// Number of producer threads
    #[arg(short, long, default_value_t = 2)]
    producers: usize,

    /// Number of consumer threads
    #[arg(short = 'n', long, default_value_t = 2)]
    consumers: usize,

    /// Items put by each producer
    #[arg(short, long, default_value_t = 10)]
    items: u64,

    /// Per-thread debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl From<&Cli> for Workload {
    fn from(cli: &Cli) -> Self {
        Workload {
            strategy: cli.strategy,
            capacity: cli.capacity,
            producers: cli.producers,
            consumers: cli.consumers,
            items_per_producer: cli.items,
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "boundq=debug" } else { "boundq=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_names(true),
        )
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let workload = Workload::from(&cli);
    let report = workload
        .run()
        .with_context(|| format!("running {workload:?}"))?;

    println!("\n📊 WORKLOAD RESULTS ({})", report.strategy);
    println!("=========================");
    println!("  Expected:      {}", report.expected);
    println!("  Produced:      {}", report.produced);
    println!("  Consumed:      {}", report.consumed);
    println!("  Rejected:      {}", report.rejected);
    println!("  Duplicates:    {}", report.duplicates);
    println!("  Missing:       {}", report.missing);
    println!("  Reordered:     {}", report.reordered);
    println!("  Peak len:      {} / {}", report.max_observed_len, workload.capacity);
    println!("  Per consumer:  {:?}", report.per_consumer);
    println!("  Duration:      {:.2} ms", report.elapsed.as_secs_f64() * 1000.0);
    println!("  Rate:          {:.1} items/sec", report.throughput());

    if !report.is_consistent() {
        bail!("items were lost, duplicated or reordered");
    }

    println!("\n✅ All items handed over exactly once, in order");
    Ok(())
}
