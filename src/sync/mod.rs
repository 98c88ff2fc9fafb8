//! Blocking primitives used by the queue strategies.

mod semaphore;

pub use semaphore::Semaphore;
