//! boundq - bounded blocking queue for handing items between threads
//!
//! Design:
//! - Fixed capacity: one allocation at construction, none afterwards
//! - Blocking put/take: waiters sleep on a condition, never spin
//! - Graceful shutdown: `close` fails producers, lets consumers drain
//! - Two strategies: lock + two conditions, or three counting permits
//!
//! ```
//! use std::sync::Arc;
//! use std::thread;
//! use boundq::{BoundedQueue, TakeError};
//!
//! let queue = Arc::new(BoundedQueue::new(5).unwrap());
//!
//! let producer = {
//!     let queue = Arc::clone(&queue);
//!     thread::spawn(move || {
//!         for i in 0..10 {
//!             queue.put(i).unwrap();
//!         }
//!         queue.close();
//!     })
//! };
//!
//! let mut taken = Vec::new();
//! loop {
//!     match queue.take() {
//!         Ok(item) => taken.push(item),
//!         Err(TakeError::Closed) => break,
//!         Err(err) => panic!("{err}"),
//!     }
//! }
//! producer.join().unwrap();
//! assert_eq!(taken, (0..10).collect::<Vec<_>>());
//! ```

pub mod queue;
pub mod sync;
pub mod workload;

pub use queue::{
    BlockingQueue, BoundedQueue, CondvarQueue, InvalidCapacity, PutError, SemaphoreQueue,
    Strategy, TakeError,
};
pub use workload::{Item, Workload, WorkloadError, WorkloadReport};
