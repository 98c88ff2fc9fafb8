//! Queue berbasis tiga counting permit (semaphore).
//!
//! `empty` menghitung slot kosong, mulai dari `capacity`; `filled` menghitung
//! item yang sedang di-buffer, mulai dari nol. Ring dan flag `closed` ada di
//! balik satu `Mutex`, yang berperan sebagai binary permit.
//!
//! ```text
//! producer: empty.acquire -> lock -> write -> unlock -> filled.release
//! consumer: filled.acquire -> lock -> read -> unlock -> empty.release
//! ```
//!
//! Permit pool tidak punya konsep "closed", jadi `close` memasang poison flag
//! di bawah lock lalu menambah satu permit ekstra ke tiap pool. Thread yang
//! mendapat permit lalu melihat poison mengembalikan permit itu sebelum gagal,
//! sehingga wake berantai ke semua thread yang sedang blocked.
//!
//! Setelah closed, pool tidak lagi dipakai: setiap operasi cek flag dulu di
//! bawah lock, dan operasi yang gagal dapat permit cek ulang flag sebelum
//! melaporkan `Full`/`Empty`/`Timeout`. Permit poison bisa sedang dipegang
//! thread lain, jadi hasil pool saja tidak cukup untuk memutuskan.

use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, trace};

use super::error::{InvalidCapacity, PutError, TakeError};
use super::ring_buffer::RingBuffer;
use super::{BlockingQueue, Strategy};
use crate::sync::Semaphore;

struct Slots<T> {
    ring: RingBuffer<T>,
    closed: bool,
}

/// Bounded blocking queue dari counting semaphore.
pub struct SemaphoreQueue<T> {
    // Binary permit: menjaga ring + flag closed
    slots: Mutex<Slots<T>>,
    // Slot kosong
    empty: Semaphore,
    // Slot terisi
    filled: Semaphore,
    capacity: usize,
}

impl<T> SemaphoreQueue<T> {
    pub fn new(capacity: usize) -> Result<Self, InvalidCapacity> {
        if capacity == 0 {
            return Err(InvalidCapacity(capacity));
        }

        Ok(Self {
            slots: Mutex::new(Slots {
                ring: RingBuffer::with_capacity(capacity),
                closed: false,
            }),
            empty: Semaphore::new(capacity),
            filled: Semaphore::new(0),
            capacity,
        })
    }

    /// Tunggu permit slot kosong, lalu insert `item`.
    ///
    /// Queue yang sudah closed langsung gagal tanpa menyentuh pool.
    pub fn put(&self, item: T) -> Result<(), PutError<T>> {
        if self.is_closed() {
            return Err(PutError::Closed(item));
        }
        self.empty.acquire();
        self.insert(item)
    }

    pub fn try_put(&self, item: T) -> Result<(), PutError<T>> {
        if self.is_closed() {
            return Err(PutError::Closed(item));
        }
        if !self.empty.try_acquire() {
            // Close bisa terjadi setelah cek di atas, dan permit poison
            // mungkin sedang dipegang thread lain.
            return Err(if self.is_closed() {
                PutError::Closed(item)
            } else {
                PutError::Full(item)
            });
        }
        self.insert(item)
    }

    pub fn put_timeout(&self, item: T, timeout: Duration) -> Result<(), PutError<T>> {
        if self.is_closed() {
            return Err(PutError::Closed(item));
        }
        if !self.empty.acquire_timeout(timeout) {
            if self.is_closed() {
                return Err(PutError::Closed(item));
            }
            trace!(?timeout, "put timed out");
            return Err(PutError::Timeout(item));
        }
        self.insert(item)
    }

    /// Tunggu permit slot terisi, lalu ambil item paling lama.
    pub fn take(&self) -> Result<T, TakeError> {
        if let Some(result) = self.take_closed() {
            return result;
        }
        self.filled.acquire();
        self.remove()
    }

    pub fn try_take(&self) -> Result<T, TakeError> {
        if let Some(result) = self.take_closed() {
            return result;
        }
        if !self.filled.try_acquire() {
            return self.take_closed().unwrap_or(Err(TakeError::Empty));
        }
        self.remove()
    }

    pub fn take_timeout(&self, timeout: Duration) -> Result<T, TakeError> {
        if let Some(result) = self.take_closed() {
            return result;
        }
        if !self.filled.acquire_timeout(timeout) {
            if let Some(result) = self.take_closed() {
                return result;
            }
            trace!(?timeout, "take timed out");
            return Err(TakeError::Timeout);
        }
        self.remove()
    }

    /// Pasang poison dan mulai wake berantai di kedua pool.
    pub fn close(&self) {
        let mut slots = self.slots.lock();
        if slots.closed {
            return;
        }
        slots.closed = true;
        let remaining = slots.ring.len();
        drop(slots);

        self.empty.release();
        self.filled.release();

        debug!(capacity = self.capacity, remaining, "queue closed");
    }

    pub fn is_closed(&self) -> bool {
        self.slots.lock().closed
    }

    /// Jumlah item di buffer. Hanya snapshot, bisa basi saat return.
    pub fn len(&self) -> usize {
        self.slots.lock().ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.lock().ring.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.slots.lock().ring.is_full()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    // Jalur tanpa permit untuk queue yang sudah closed: sisa item tetap
    // dibagikan, lalu `Closed`. `None` selama queue masih open.
    fn take_closed(&self) -> Option<Result<T, TakeError>> {
        let mut slots = self.slots.lock();
        if !slots.closed {
            return None;
        }
        Some(slots.ring.pop().ok_or(TakeError::Closed))
    }

    // Caller memegang satu permit `empty`.
    fn insert(&self, item: T) -> Result<(), PutError<T>> {
        let mut slots = self.slots.lock();
        if slots.closed {
            drop(slots);
            self.empty.release();
            return Err(PutError::Closed(item));
        }

        debug_assert!(!slots.ring.is_full(), "empty permit held but ring is full");
        if let Err(item) = slots.ring.push(item) {
            drop(slots);
            self.empty.release();
            return Err(PutError::Full(item));
        }
        drop(slots);

        self.filled.release();
        Ok(())
    }

    // Caller memegang satu permit `filled`.
    fn remove(&self) -> Result<T, TakeError> {
        let mut slots = self.slots.lock();
        match slots.ring.pop() {
            Some(item) => {
                drop(slots);
                self.empty.release();
                Ok(item)
            }
            None => {
                // Ring kosong dengan permit di tangan hanya mungkin setelah close.
                debug_assert!(slots.closed, "filled permit held but ring is empty");
                drop(slots);
                self.filled.release();
                Err(TakeError::Closed)
            }
        }
    }
}

impl<T: Send> BlockingQueue<T> for SemaphoreQueue<T> {
    fn put(&self, item: T) -> Result<(), PutError<T>> {
        SemaphoreQueue::put(self, item)
    }

    fn try_put(&self, item: T) -> Result<(), PutError<T>> {
        SemaphoreQueue::try_put(self, item)
    }

    fn put_timeout(&self, item: T, timeout: Duration) -> Result<(), PutError<T>> {
        SemaphoreQueue::put_timeout(self, item, timeout)
    }

    fn take(&self) -> Result<T, TakeError> {
        SemaphoreQueue::take(self)
    }

    fn try_take(&self) -> Result<T, TakeError> {
        SemaphoreQueue::try_take(self)
    }

    fn take_timeout(&self, timeout: Duration) -> Result<T, TakeError> {
        SemaphoreQueue::take_timeout(self, timeout)
    }

    fn close(&self) {
        SemaphoreQueue::close(self)
    }

    fn is_closed(&self) -> bool {
        SemaphoreQueue::is_closed(self)
    }

    fn len(&self) -> usize {
        SemaphoreQueue::len(self)
    }

    fn capacity(&self) -> usize {
        SemaphoreQueue::capacity(self)
    }

    fn strategy(&self) -> Strategy {
        Strategy::Semaphore
    }
}

impl<T> std::fmt::Debug for SemaphoreQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slots = self.slots.lock();
        f.debug_struct("SemaphoreQueue")
            .field("capacity", &self.capacity)
            .field("len", &slots.ring.len())
            .field("closed", &slots.closed)
            .field("empty", &self.empty)
            .field("filled", &self.filled)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_permits_track_slots() {
        let q = SemaphoreQueue::new(3).unwrap();
        q.put(1).unwrap();
        q.put(2).unwrap();
        assert_eq!(q.empty.available_permits(), 1);
        assert_eq!(q.filled.available_permits(), 2);

        assert_eq!(q.take(), Ok(1));
        assert_eq!(q.empty.available_permits(), 2);
        assert_eq!(q.filled.available_permits(), 1);
    }

    #[test]
    fn test_closed_queue_bypasses_permit_pools() {
        let q = SemaphoreQueue::new(2).unwrap();
        q.put('x').unwrap();
        q.put('y').unwrap();
        q.close();

        // Full queue: the only empty permit is the poison one
        assert_eq!(q.empty.available_permits(), 1);
        assert_eq!(q.put('z'), Err(PutError::Closed('z')));
        assert_eq!(q.empty.available_permits(), 1);

        assert_eq!(q.take(), Ok('x'));
        assert_eq!(q.take(), Ok('y'));
        assert_eq!(q.take(), Err(TakeError::Closed));
        assert_eq!(q.take(), Err(TakeError::Closed));
        // Draining after close never consumes filled permits
        assert_eq!(q.filled.available_permits(), 3);
    }

    #[test]
    fn test_closed_while_poison_permit_is_held() {
        let q = SemaphoreQueue::new(1).unwrap();
        q.put(7).unwrap();
        q.close();

        // Another thread is mid-cascade holding the only empty permit
        assert!(q.empty.try_acquire());
        assert_eq!(q.try_put(8), Err(PutError::Closed(8)));
        assert_eq!(q.put_timeout(9, Duration::ZERO), Err(PutError::Closed(9)));
        assert_eq!(q.put(10), Err(PutError::Closed(10)));

        // Same on the filled side once the buffer is drained
        assert_eq!(q.take(), Ok(7));
        while q.filled.try_acquire() {}
        assert_eq!(q.try_take(), Err(TakeError::Closed));
        assert_eq!(q.take_timeout(Duration::ZERO), Err(TakeError::Closed));
        assert_eq!(q.take(), Err(TakeError::Closed));
    }

    #[test]
    fn test_close_cascades_to_every_blocked_consumer() {
        let q = Arc::new(SemaphoreQueue::<u32>::new(1).unwrap());

        let consumers: Vec<_> = (0..4)
            .map(|_| {
                let q = Arc::clone(&q);
                thread::spawn(move || q.take())
            })
            .collect();

        thread::sleep(Duration::from_millis(30));
        q.close();

        for consumer in consumers {
            assert_eq!(consumer.join().unwrap(), Err(TakeError::Closed));
        }
    }

    #[test]
    fn test_close_cascades_to_every_blocked_producer() {
        let q = Arc::new(SemaphoreQueue::new(1).unwrap());
        q.put(0).unwrap();

        let producers: Vec<_> = (1..=4)
            .map(|i| {
                let q = Arc::clone(&q);
                thread::spawn(move || q.put(i))
            })
            .collect();

        thread::sleep(Duration::from_millis(30));
        q.close();

        for producer in producers {
            assert!(producer.join().unwrap().unwrap_err().is_closed());
        }
        assert_eq!(q.take(), Ok(0));
        assert_eq!(q.take(), Err(TakeError::Closed));
    }
}
