//! Contract tests shared by every queue strategy.
//!
//! Each test runs once per [`Strategy`], so the lock + condition queue and
//! the permit queue are held to exactly the same behaviour.
//!
//! Usage:
//!   cargo test --test queue_properties

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use boundq::{BlockingQueue, InvalidCapacity, PutError, Strategy, TakeError};

fn queue<T: Send + 'static>(strategy: Strategy, capacity: usize) -> Arc<dyn BlockingQueue<T>> {
    strategy.build(capacity).unwrap()
}

/// Waits until `threads` callers are parked inside the queue, approximated by
/// a short sleep after all of them have signalled they are about to block.
fn settle(started: &AtomicUsize, threads: usize) {
    while started.load(Ordering::SeqCst) < threads {
        thread::yield_now();
    }
    thread::sleep(Duration::from_millis(50));
}

#[test]
fn test_invalid_capacity() {
    for strategy in Strategy::ALL {
        assert_eq!(strategy.build::<u64>(0).err(), Some(InvalidCapacity(0)));
        assert!(strategy.build::<u64>(1).is_ok());
    }
}

#[test]
fn test_close_drains_in_order() {
    for strategy in Strategy::ALL {
        let q = queue::<u64>(strategy, 5);
        for item in [1, 2, 3] {
            q.put(item).unwrap();
        }
        q.close();

        assert_eq!(q.take(), Ok(1), "{strategy}");
        assert_eq!(q.take(), Ok(2), "{strategy}");
        assert_eq!(q.take(), Ok(3), "{strategy}");
        assert_eq!(q.take(), Err(TakeError::Closed), "{strategy}");
    }
}

#[test]
fn test_put_after_close_fails_without_blocking() {
    for strategy in Strategy::ALL {
        // Full and closed: a put must not wait for a slot that is never coming
        let q = queue::<u64>(strategy, 1);
        q.put(1).unwrap();
        q.close();

        let start = Instant::now();
        assert_eq!(q.put(2), Err(PutError::Closed(2)), "{strategy}");
        assert!(start.elapsed() < Duration::from_secs(1), "{strategy}");
        assert_eq!(q.len(), 1, "{strategy}");
    }
}

#[test]
fn test_close_is_idempotent() {
    for strategy in Strategy::ALL {
        let once = queue::<u64>(strategy, 3);
        let twice = queue::<u64>(strategy, 3);
        for q in [&once, &twice] {
            q.put(10).unwrap();
            q.put(20).unwrap();
        }

        once.close();
        twice.close();
        twice.close();

        for q in [&once, &twice] {
            assert!(q.is_closed());
            assert_eq!(q.len(), 2);
            assert!(q.put(30).unwrap_err().is_closed());
            assert_eq!(q.take(), Ok(10));
            assert_eq!(q.take(), Ok(20));
            assert_eq!(q.take(), Err(TakeError::Closed));
        }
    }
}

#[test]
fn test_try_operations() {
    for strategy in Strategy::ALL {
        let q = queue::<&str>(strategy, 2);
        assert_eq!(q.try_take(), Err(TakeError::Empty));

        q.try_put("a").unwrap();
        q.try_put("b").unwrap();
        assert_eq!(q.try_put("c"), Err(PutError::Full("c")));
        assert_eq!(q.try_take(), Ok("a"));

        q.close();
        assert_eq!(q.try_put("d"), Err(PutError::Closed("d")));
        assert_eq!(q.try_take(), Ok("b"));
        assert_eq!(q.try_take(), Err(TakeError::Closed));
    }
}

#[test]
fn test_concurrent_calls_on_closed_queue_only_see_closed() {
    const THREADS: usize = 8;
    const ROUNDS: usize = 2_000;

    for strategy in Strategy::ALL {
        // Drained: nothing left to take
        let drained = queue::<u64>(strategy, 4);
        drained.close();
        // Full: a closed full queue must not look "full"
        let full = queue::<u64>(strategy, 1);
        full.put(0).unwrap();
        full.close();

        let not_closed = AtomicUsize::new(0);

        thread::scope(|s| {
            for id in 0..THREADS {
                let (drained, full, not_closed) = (&drained, &full, &not_closed);
                s.spawn(move || {
                    for round in 0..ROUNDS {
                        let item = (id * ROUNDS + round) as u64;
                        let outcomes = [
                            drained.try_take().map(|_| ()).map_err(|e| e.is_closed()),
                            drained
                                .take_timeout(Duration::ZERO)
                                .map(|_| ())
                                .map_err(|e| e.is_closed()),
                            full.try_put(item).map_err(|e| e.is_closed()),
                            full.put_timeout(item, Duration::ZERO)
                                .map_err(|e| e.is_closed()),
                            full.put(item).map_err(|e| e.is_closed()),
                        ];
                        let bad = outcomes.iter().filter(|o| **o != Err(true)).count();
                        not_closed.fetch_add(bad, Ordering::Relaxed);
                    }
                });
            }
        });

        assert_eq!(not_closed.load(Ordering::Relaxed), 0, "{strategy}");
        assert_eq!(full.take(), Ok(0), "{strategy}");
        assert_eq!(full.take(), Err(TakeError::Closed), "{strategy}");
    }
}

#[test]
fn test_timeouts_expire() {
    for strategy in Strategy::ALL {
        let q = queue::<u64>(strategy, 1);

        let start = Instant::now();
        assert_eq!(q.take_timeout(Duration::from_millis(50)), Err(TakeError::Timeout));
        assert!(start.elapsed() >= Duration::from_millis(50));

        q.put(1).unwrap();
        let start = Instant::now();
        let err = q.put_timeout(2, Duration::from_millis(50)).unwrap_err();
        assert_eq!(err, PutError::Timeout(2));
        assert_eq!(err.into_inner(), 2);
        assert!(start.elapsed() >= Duration::from_millis(50));

        // State untouched by the failed attempts
        assert_eq!(q.len(), 1);
        assert_eq!(q.take_timeout(Duration::from_millis(50)), Ok(1));
    }
}

#[test]
fn test_timed_take_woken_by_put() {
    for strategy in Strategy::ALL {
        let q = queue::<u64>(strategy, 1);
        let consumer = {
            let q = Arc::clone(&q);
            thread::spawn(move || q.take_timeout(Duration::from_secs(10)))
        };

        thread::sleep(Duration::from_millis(20));
        q.put(99).unwrap();
        assert_eq!(consumer.join().unwrap(), Ok(99), "{strategy}");
    }
}

#[test]
fn test_timed_waits_observe_close() {
    for strategy in Strategy::ALL {
        let q = queue::<u64>(strategy, 1);
        let consumer = {
            let q = Arc::clone(&q);
            thread::spawn(move || q.take_timeout(Duration::from_secs(10)))
        };
        thread::sleep(Duration::from_millis(20));
        q.close();
        assert_eq!(consumer.join().unwrap(), Err(TakeError::Closed), "{strategy}");

        let q = queue::<u64>(strategy, 1);
        q.put(1).unwrap();
        let producer = {
            let q = Arc::clone(&q);
            thread::spawn(move || q.put_timeout(2, Duration::from_secs(10)))
        };
        thread::sleep(Duration::from_millis(20));
        q.close();
        assert_eq!(producer.join().unwrap(), Err(PutError::Closed(2)), "{strategy}");
    }
}

#[test]
fn test_close_wakes_all_blocked_consumers() {
    const WAITERS: usize = 6;

    for strategy in Strategy::ALL {
        let q = queue::<u64>(strategy, 2);
        let started = Arc::new(AtomicUsize::new(0));

        let consumers: Vec<_> = (0..WAITERS)
            .map(|_| {
                let q = Arc::clone(&q);
                let started = Arc::clone(&started);
                thread::spawn(move || {
                    started.fetch_add(1, Ordering::SeqCst);
                    q.take()
                })
            })
            .collect();

        settle(&started, WAITERS);
        q.put(7).unwrap();
        q.close();

        let results: Vec<_> = consumers.into_iter().map(|h| h.join().unwrap()).collect();
        let delivered: Vec<_> = results.iter().filter_map(|r| r.ok()).collect();
        let closed = results.iter().filter(|r| **r == Err(TakeError::Closed)).count();

        // Exactly one consumer got the item; everyone else saw the close
        assert_eq!(delivered, vec![7], "{strategy}");
        assert_eq!(closed, WAITERS - 1, "{strategy}");
    }
}

#[test]
fn test_close_wakes_all_blocked_producers() {
    const WAITERS: u64 = 6;

    for strategy in Strategy::ALL {
        let q = queue::<u64>(strategy, 1);
        q.put(0).unwrap();
        let started = Arc::new(AtomicUsize::new(0));

        let producers: Vec<_> = (1..=WAITERS)
            .map(|i| {
                let q = Arc::clone(&q);
                let started = Arc::clone(&started);
                thread::spawn(move || {
                    started.fetch_add(1, Ordering::SeqCst);
                    q.put(i)
                })
            })
            .collect();

        settle(&started, WAITERS as usize);
        q.close();

        for (i, producer) in (1..=WAITERS).zip(producers) {
            assert_eq!(producer.join().unwrap(), Err(PutError::Closed(i)), "{strategy}");
        }

        // The item buffered before close survives; nothing was added after
        assert_eq!(q.take(), Ok(0), "{strategy}");
        assert_eq!(q.take(), Err(TakeError::Closed), "{strategy}");
    }
}

#[test]
fn test_blocked_take_resumes_on_put() {
    for strategy in Strategy::ALL {
        let q = queue::<String>(strategy, 1);
        let consumer = {
            let q = Arc::clone(&q);
            thread::spawn(move || q.take())
        };

        thread::sleep(Duration::from_millis(20));
        q.put("hello".to_string()).unwrap();
        assert_eq!(consumer.join().unwrap().as_deref(), Ok("hello"), "{strategy}");
    }
}

#[test]
fn test_no_lost_or_duplicated_items() {
    const PRODUCERS: u64 = 3;
    const CONSUMERS: usize = 3;
    const PER_PRODUCER: u64 = 2_000;

    for strategy in Strategy::ALL {
        let q = queue::<u64>(strategy, 4);

        let producers: Vec<_> = (0..PRODUCERS)
            .map(|p| {
                let q = Arc::clone(&q);
                thread::spawn(move || {
                    for i in 0..PER_PRODUCER {
                        q.put(p * PER_PRODUCER + i).unwrap();
                    }
                })
            })
            .collect();

        let consumers: Vec<_> = (0..CONSUMERS)
            .map(|_| {
                let q = Arc::clone(&q);
                thread::spawn(move || {
                    let mut taken = Vec::new();
                    while let Ok(item) = q.take() {
                        taken.push(item);
                    }
                    taken
                })
            })
            .collect();

        for producer in producers {
            producer.join().unwrap();
        }
        q.close();

        let mut all: Vec<u64> = consumers
            .into_iter()
            .flat_map(|c| c.join().unwrap())
            .collect();
        all.sort_unstable();

        let expected: Vec<u64> = (0..PRODUCERS * PER_PRODUCER).collect();
        assert_eq!(all, expected, "{strategy}");
    }
}

#[test]
fn test_fifo_per_producer() {
    const PRODUCERS: usize = 4;
    const PER_PRODUCER: u64 = 1_000;

    for strategy in Strategy::ALL {
        let q = queue::<(usize, u64)>(strategy, 3);

        let producers: Vec<_> = (0..PRODUCERS)
            .map(|p| {
                let q = Arc::clone(&q);
                thread::spawn(move || {
                    for seq in 0..PER_PRODUCER {
                        q.put((p, seq)).unwrap();
                    }
                })
            })
            .collect();

        // Single consumer: it sees the global completion order
        let consumer = {
            let q = Arc::clone(&q);
            thread::spawn(move || {
                let mut next: HashMap<usize, u64> = HashMap::new();
                while let Ok((p, seq)) = q.take() {
                    let expected = next.entry(p).or_insert(0);
                    assert_eq!(seq, *expected, "producer {p} out of order");
                    *expected += 1;
                }
                next
            })
        };

        for producer in producers {
            producer.join().unwrap();
        }
        q.close();

        let next = consumer.join().unwrap();
        assert_eq!(next.len(), PRODUCERS, "{strategy}");
        assert!(next.values().all(|&n| n == PER_PRODUCER), "{strategy}");
    }
}

#[test]
fn test_len_never_exceeds_capacity() {
    const CAPACITY: usize = 3;

    for strategy in Strategy::ALL {
        let q = queue::<u64>(strategy, CAPACITY);
        let done = Arc::new(AtomicBool::new(false));

        let monitor = {
            let q = Arc::clone(&q);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut peak = 0;
                while !done.load(Ordering::SeqCst) {
                    peak = peak.max(q.len());
                    thread::yield_now();
                }
                peak
            })
        };

        let producers: Vec<_> = (0..4)
            .map(|_| {
                let q = Arc::clone(&q);
                thread::spawn(move || {
                    for i in 0..2_000 {
                        q.put(i).unwrap();
                    }
                })
            })
            .collect();
        let consumer = {
            let q = Arc::clone(&q);
            thread::spawn(move || {
                let mut n = 0;
                while q.take().is_ok() {
                    n += 1;
                    if n % 100 == 0 {
                        // Let producers pile up against the bound
                        thread::sleep(Duration::from_millis(1));
                    }
                }
                n
            })
        };

        for producer in producers {
            producer.join().unwrap();
        }
        q.close();
        assert_eq!(consumer.join().unwrap(), 8_000, "{strategy}");

        done.store(true, Ordering::SeqCst);
        let peak = monitor.join().unwrap();
        assert!(peak <= CAPACITY, "{strategy}: peak {peak}");
        assert!(q.len() <= q.capacity());
    }
}

#[test]
fn test_drop_releases_buffered_items() {
    for strategy in Strategy::ALL {
        let marker = Arc::new(());
        {
            let q = queue::<Arc<()>>(strategy, 4);
            q.put(Arc::clone(&marker)).unwrap();
            q.put(Arc::clone(&marker)).unwrap();
            q.close();
            assert_eq!(Arc::strong_count(&marker), 3);
        }
        assert_eq!(Arc::strong_count(&marker), 1, "{strategy}");
    }
}
