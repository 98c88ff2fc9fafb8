//! Producer/consumer workload runner.
//!
//! Spawns `producers` threads that each put `items_per_producer` tagged
//! items, and `consumers` threads that take until the queue reports closed.
//! Once every producer has finished the queue is closed, consumers drain
//! what is left, and the items taken are reconciled against the items put.

use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::queue::{BlockingQueue, InvalidCapacity, Strategy, TakeError};

/// One unit of work: which producer made it and its position in that
/// producer's sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Item {
    pub producer: usize,
    pub seq: u64,
}

/// Workload shape. Nothing here is baked into the queue itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workload {
    pub strategy: Strategy,
    pub capacity: usize,
    pub producers: usize,
    pub consumers: usize,
    pub items_per_producer: u64,
}

impl Default for Workload {
    fn default() -> Self {
        Self {
            strategy: Strategy::Condvar,
            capacity: 5,
            producers: 2,
            consumers: 2,
            items_per_producer: 10,
        }
    }
}

#[derive(Debug, Error)]
pub enum WorkloadError {
    #[error(transparent)]
    InvalidCapacity(#[from] InvalidCapacity),
    #[error("workload needs at least one producer and one consumer")]
    NoWorkers,
    #[error("{0} worker thread(s) panicked")]
    WorkerPanicked(usize),
}

/// Outcome of a [`Workload::run`].
#[derive(Debug, Clone)]
pub struct WorkloadReport {
    pub strategy: Strategy,
    pub expected: u64,
    /// Successful puts.
    pub produced: u64,
    /// Puts rejected because the queue was already closed.
    pub rejected: u64,
    /// Successful takes.
    pub consumed: u64,
    /// Items taken more than once.
    pub duplicates: u64,
    /// Items put but never taken.
    pub missing: u64,
    /// Takes that saw a producer's sequence go backwards.
    pub reordered: u64,
    /// Largest `len()` any producer observed right after a put.
    pub max_observed_len: usize,
    pub per_consumer: Vec<u64>,
    pub elapsed: Duration,
}

impl WorkloadReport {
    /// No item lost, duplicated or reordered, and every put landed.
    pub fn is_consistent(&self) -> bool {
        self.produced == self.expected
            && self.consumed == self.expected
            && self.rejected == 0
            && self.duplicates == 0
            && self.missing == 0
            && self.reordered == 0
    }

    /// Items handed over per second.
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.consumed as f64 / secs
        } else {
            0.0
        }
    }
}

struct ProducerStats {
    produced: u64,
    rejected: u64,
    max_len: usize,
}

struct ConsumerStats {
    taken: Vec<Item>,
    reordered: u64,
}

impl Workload {
    pub fn total_items(&self) -> u64 {
        self.producers as u64 * self.items_per_producer
    }

    /// Builds a queue for [`Self::strategy`] and runs the workload on it.
    pub fn run(&self) -> Result<WorkloadReport, WorkloadError> {
        let queue = self.strategy.build::<Item>(self.capacity)?;
        self.run_on(&*queue)
    }

    /// Runs the workload against an existing, open queue and closes it.
    ///
    /// [`Self::strategy`] is ignored here; the report names the strategy of
    /// `queue`.
    pub fn run_on(
        &self,
        queue: &dyn BlockingQueue<Item>,
    ) -> Result<WorkloadReport, WorkloadError> {
        if self.producers == 0 || self.consumers == 0 {
            return Err(WorkloadError::NoWorkers);
        }

        info!(
            strategy = %queue.strategy(),
            capacity = queue.capacity(),
            producers = self.producers,
            consumers = self.consumers,
            items = self.total_items(),
            "starting workload"
        );

        let start = Instant::now();
        let mut panicked = 0;

        let (producer_stats, consumer_stats) = thread::scope(|s| {
            let consumers: Vec<_> = (0..self.consumers)
                .map(|id| s.spawn(move || consume(queue, id, self.producers)))
                .collect();
            let producers: Vec<_> = (0..self.producers)
                .map(|id| s.spawn(move || produce(queue, id, self.items_per_producer)))
                .collect();

            let producer_stats: Vec<_> = producers
                .into_iter()
                .filter_map(|handle| handle.join().ok())
                .collect();
            panicked += self.producers - producer_stats.len();

            // Every producer is done (or dead); let consumers drain and exit.
            queue.close();

            let consumer_stats: Vec<_> = consumers
                .into_iter()
                .filter_map(|handle| handle.join().ok())
                .collect();
            panicked += self.consumers - consumer_stats.len();

            (producer_stats, consumer_stats)
        });

        let elapsed = start.elapsed();
        if panicked > 0 {
            return Err(WorkloadError::WorkerPanicked(panicked));
        }

        let report = self.reconcile(queue.strategy(), producer_stats, consumer_stats, elapsed);
        if report.is_consistent() {
            info!(
                consumed = report.consumed,
                elapsed_ms = report.elapsed.as_millis() as u64,
                "workload complete"
            );
        } else {
            warn!(
                duplicates = report.duplicates,
                missing = report.missing,
                reordered = report.reordered,
                rejected = report.rejected,
                "workload did not reconcile"
            );
        }
        Ok(report)
    }

    fn reconcile(
        &self,
        strategy: Strategy,
        producers: Vec<ProducerStats>,
        consumers: Vec<ConsumerStats>,
        elapsed: Duration,
    ) -> WorkloadReport {
        let per_consumer = consumers.iter().map(|c| c.taken.len() as u64).collect();
        let reordered = consumers.iter().map(|c| c.reordered).sum();

        let mut taken: Vec<Item> = consumers.into_iter().flat_map(|c| c.taken).collect();
        let consumed = taken.len() as u64;
        taken.sort_unstable();

        let before = taken.len();
        taken.dedup();
        let duplicates = (before - taken.len()) as u64;

        let produced: u64 = producers.iter().map(|p| p.produced).sum();
        let distinct_valid = taken
            .iter()
            .filter(|item| item.producer < self.producers && item.seq < self.items_per_producer)
            .count() as u64;

        WorkloadReport {
            strategy,
            expected: self.total_items(),
            produced,
            rejected: producers.iter().map(|p| p.rejected).sum(),
            consumed,
            duplicates,
            missing: produced.saturating_sub(distinct_valid),
            reordered,
            max_observed_len: producers.iter().map(|p| p.max_len).max().unwrap_or(0),
            per_consumer,
            elapsed,
        }
    }
}

fn produce(queue: &dyn BlockingQueue<Item>, producer: usize, items: u64) -> ProducerStats {
    let _guard = CloseOnPanic(queue);
    let mut stats = ProducerStats {
        produced: 0,
        rejected: 0,
        max_len: 0,
    };

    for seq in 0..items {
        match queue.put(Item { producer, seq }) {
            Ok(()) => {
                stats.produced += 1;
                stats.max_len = stats.max_len.max(queue.len());
            }
            Err(err) => {
                debug!(producer, seq, %err, "producer stopping");
                stats.rejected += items - seq;
                break;
            }
        }
    }

    debug!(producer, produced = stats.produced, "producer finished");
    stats
}

/// Closes the queue if a worker unwinds, so peers blocked on it wake up
/// instead of waiting for a take that will never come.
struct CloseOnPanic<'a>(&'a dyn BlockingQueue<Item>);

impl Drop for CloseOnPanic<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            warn!("worker panicked, closing queue");
            self.0.close();
        }
    }
}

fn consume(queue: &dyn BlockingQueue<Item>, consumer: usize, producers: usize) -> ConsumerStats {
    let _guard = CloseOnPanic(queue);
    let mut stats = ConsumerStats {
        taken: Vec::new(),
        reordered: 0,
    };
    // Last sequence seen from each producer
    let mut last_seen: Vec<Option<u64>> = vec![None; producers];

    loop {
        match queue.take() {
            Ok(item) => {
                if let Some(last) = last_seen.get_mut(item.producer) {
                    if matches!(*last, Some(prev) if prev >= item.seq) {
                        stats.reordered += 1;
                    }
                    *last = Some(item.seq);
                }
                stats.taken.push(item);
            }
            Err(TakeError::Closed) => break,
            Err(err) => {
                // take() only ever fails with Closed
                warn!(consumer, %err, "unexpected take failure");
                break;
            }
        }
    }

    debug!(consumer, taken = stats.taken.len(), "consumer finished");
    stats
}
