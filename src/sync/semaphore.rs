//! Counting semaphore on top of `parking_lot`.
//!
//! A permit pool that blocks acquirers on a condition variable while the
//! pool is empty. Waiters never spin; every wait sits in a recheck loop so a
//! wake that finds the pool drained again simply goes back to sleep.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Counting permit pool.
pub struct Semaphore {
    permits: Mutex<usize>,
    available: Condvar,
}

impl Semaphore {
    pub fn new(permits: usize) -> Self {
        Self {
            permits: Mutex::new(permits),
            available: Condvar::new(),
        }
    }

    /// Takes one permit, blocking while none are available.
    pub fn acquire(&self) {
        let mut permits = self.permits.lock();
        while *permits == 0 {
            self.available.wait(&mut permits);
        }
        *permits -= 1;
    }

    /// Takes one permit if one is available right now.
    pub fn try_acquire(&self) -> bool {
        let mut permits = self.permits.lock();
        if *permits == 0 {
            return false;
        }
        *permits -= 1;
        true
    }

    /// Takes one permit, giving up at `deadline`.
    ///
    /// Returns `false` if the deadline passed with no permit available.
    pub fn acquire_until(&self, deadline: Instant) -> bool {
        let mut permits = self.permits.lock();
        while *permits == 0 {
            if self.available.wait_until(&mut permits, deadline).timed_out() && *permits == 0 {
                return false;
            }
        }
        *permits -= 1;
        true
    }

    /// Takes one permit, giving up after `timeout`.
    pub fn acquire_timeout(&self, timeout: Duration) -> bool {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.acquire_until(deadline),
            // Deadline beyond the clock's range: wait indefinitely
            None => {
                self.acquire();
                true
            }
        }
    }

    /// Returns one permit to the pool and wakes one waiter.
    pub fn release(&self) {
        let mut permits = self.permits.lock();
        *permits += 1;
        drop(permits);
        self.available.notify_one();
    }

    /// Snapshot of the pool size. Stale as soon as it returns.
    pub fn available_permits(&self) -> usize {
        *self.permits.lock()
    }
}

impl std::fmt::Debug for Semaphore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Semaphore")
            .field("permits", &self.available_permits())
            .finish()
    }
}
