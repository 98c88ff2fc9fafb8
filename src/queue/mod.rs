//! Bounded Blocking Queue
//!
//! Dua strategi dengan kontrak yang sama:
//! - [`CondvarQueue`]: satu lock, dua condition variable (default)
//! - [`SemaphoreQueue`]: tiga counting permit dengan poison-on-close
//!
//! Keduanya bisa dipakai lewat trait [`BlockingQueue`], dan
//! [`Strategy::build`] memilih salah satu saat runtime.

mod condvar;
mod error;
mod ring_buffer;
mod semaphore;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

pub use condvar::CondvarQueue;
pub use error::{InvalidCapacity, PutError, TakeError};
pub use semaphore::SemaphoreQueue;

/// Strategi default.
pub type BoundedQueue<T> = CondvarQueue<T>;

/// Kontrak bersama untuk semua strategi queue.
///
/// Setiap wait mengecek ulang predikatnya setelah bangun, jadi spurious
/// wakeup atau wake yang "dicuri" thread lain tidak pernah lolos.
pub trait BlockingQueue<T>: Send + Sync {
    /// Block sampai ada slot kosong atau queue closed.
    fn put(&self, item: T) -> Result<(), PutError<T>>;

    /// Tidak pernah block; `Full` jika tidak ada slot kosong.
    fn try_put(&self, item: T) -> Result<(), PutError<T>>;

    /// Block paling lama `timeout`; `Timeout` jika slot tidak kunjung kosong.
    fn put_timeout(&self, item: T, timeout: Duration) -> Result<(), PutError<T>>;

    /// Block sampai ada item, atau queue closed dan sudah kosong.
    fn take(&self) -> Result<T, TakeError>;

    /// Tidak pernah block; `Empty` jika buffer kosong dan queue masih open.
    fn try_take(&self) -> Result<T, TakeError>;

    /// Block paling lama `timeout`; `Timeout` jika tidak ada item masuk.
    fn take_timeout(&self, timeout: Duration) -> Result<T, TakeError>;

    /// Idempotent. Membangunkan semua producer dan consumer yang block.
    fn close(&self);

    fn is_closed(&self) -> bool;

    /// Snapshot jumlah item di buffer (advisory).
    fn len(&self) -> usize;

    fn capacity(&self) -> usize;

    /// Strategi sinkronisasi di balik queue ini.
    fn strategy(&self) -> Strategy;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_full(&self) -> bool {
        self.len() >= self.capacity()
    }
}

/// Strategi sinkronisasi di balik sebuah queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Lock + condition variable `not_full` / `not_empty`.
    #[default]
    Condvar,
    /// Permit pool slot kosong dan slot terisi + binary lock.
    Semaphore,
}

impl Strategy {
    pub const ALL: [Strategy; 2] = [Strategy::Condvar, Strategy::Semaphore];

    /// Membuat queue yang bisa di-share dengan kapasitas `capacity`.
    pub fn build<T: Send + 'static>(
        self,
        capacity: usize,
    ) -> Result<Arc<dyn BlockingQueue<T>>, InvalidCapacity> {
        let queue: Arc<dyn BlockingQueue<T>> = match self {
            Strategy::Condvar => Arc::new(CondvarQueue::new(capacity)?),
            Strategy::Semaphore => Arc::new(SemaphoreQueue::new(capacity)?),
        };
        Ok(queue)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Strategy::Condvar => "condvar",
            Strategy::Semaphore => "semaphore",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Nama strategi tidak dikenal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown strategy {0:?} (expected \"condvar\" or \"semaphore\")")]
pub struct UnknownStrategy(pub String);

impl FromStr for Strategy {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "condvar" | "cv" => Ok(Strategy::Condvar),
            "semaphore" | "sem" => Ok(Strategy::Semaphore),
            _ => Err(UnknownStrategy(s.to_string())),
        }
    }
}
