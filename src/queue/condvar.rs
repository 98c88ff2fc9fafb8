//! Queue berbasis lock + dua condition variable.
//!
//! Satu `Mutex` menjaga ring dan flag closed. Producer tidur di `not_full`
//! dan dibangunkan consumer setelah take; consumer tidur di `not_empty` dan
//! dibangunkan producer setelah put. Wait melepas lock secara atomic dan
//! mengambilnya lagi saat bangun, lalu predikat dicek ulang.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::{debug, trace};

use super::error::{InvalidCapacity, PutError, TakeError};
use super::ring_buffer::RingBuffer;
use super::{BlockingQueue, Strategy};

struct State<T> {
    ring: RingBuffer<T>,
    closed: bool,
}

impl<T> State<T> {
    /// Producer boleh berhenti menunggu: ada slot, atau tidak akan pernah ada.
    #[inline]
    fn put_ready(&self) -> bool {
        !self.ring.is_full() || self.closed
    }

    /// Consumer boleh berhenti menunggu: ada item, atau tidak akan pernah ada.
    #[inline]
    fn take_ready(&self) -> bool {
        !self.ring.is_empty() || self.closed
    }
}

/// Bounded blocking queue dari satu lock dan dua condition variable.
pub struct CondvarQueue<T> {
    state: Mutex<State<T>>,
    not_full: Condvar,
    not_empty: Condvar,
    capacity: usize,
}

impl<T> CondvarQueue<T> {
    pub fn new(capacity: usize) -> Result<Self, InvalidCapacity> {
        if capacity == 0 {
            return Err(InvalidCapacity(capacity));
        }

        Ok(Self {
            state: Mutex::new(State {
                ring: RingBuffer::with_capacity(capacity),
                closed: false,
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
            capacity,
        })
    }

    /// Block sampai ada slot kosong, lalu insert `item`.
    ///
    /// Gagal dengan [`PutError::Closed`] jika queue closed sebelum atau saat
    /// menunggu; item dikembalikan ke caller.
    pub fn put(&self, item: T) -> Result<(), PutError<T>> {
        let mut state = self.state.lock();
        while !state.put_ready() {
            self.not_full.wait(&mut state);
        }
        self.insert(state, item)
    }

    /// Insert `item` hanya jika ada slot kosong saat ini juga.
    pub fn try_put(&self, item: T) -> Result<(), PutError<T>> {
        let state = self.state.lock();
        if !state.put_ready() {
            return Err(PutError::Full(item));
        }
        self.insert(state, item)
    }

    /// Like [`put`](Self::put), but gives up with [`PutError::Timeout`] once
    /// `timeout` has elapsed without a free slot.
    pub fn put_timeout(&self, item: T, timeout: Duration) -> Result<(), PutError<T>> {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return self.put(item);
        };

        let mut state = self.state.lock();
        while !state.put_ready() {
            if self.not_full.wait_until(&mut state, deadline).timed_out() && !state.put_ready() {
                trace!(?timeout, "put timed out");
                return Err(PutError::Timeout(item));
            }
        }
        self.insert(state, item)
    }

    /// Block sampai ada item, lalu return item tersebut.
    ///
    /// Setelah closed, sisa item tetap dibagikan; sesudah itu setiap call
    /// gagal dengan [`TakeError::Closed`].
    pub fn take(&self) -> Result<T, TakeError> {
        let mut state = self.state.lock();
        while !state.take_ready() {
            self.not_empty.wait(&mut state);
        }
        self.remove(state)
    }

    /// Ambil item hanya jika ada saat ini juga.
    pub fn try_take(&self) -> Result<T, TakeError> {
        let state = self.state.lock();
        if !state.take_ready() {
            return Err(TakeError::Empty);
        }
        self.remove(state)
    }

    /// Like [`take`](Self::take), but gives up with [`TakeError::Timeout`]
    /// once `timeout` has elapsed without an item.
    pub fn take_timeout(&self, timeout: Duration) -> Result<T, TakeError> {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return self.take();
        };

        let mut state = self.state.lock();
        while !state.take_ready() {
            if self.not_empty.wait_until(&mut state, deadline).timed_out() && !state.take_ready()
            {
                trace!(?timeout, "take timed out");
                return Err(TakeError::Timeout);
            }
        }
        self.remove(state)
    }

    /// Tutup queue dan bangunkan semua producer dan consumer yang menunggu.
    ///
    /// Close kedua kali tidak berefek apa-apa.
    pub fn close(&self) {
        let mut state = self.state.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        let remaining = state.ring.len();
        drop(state);

        self.not_full.notify_all();
        self.not_empty.notify_all();

        debug!(capacity = self.capacity, remaining, "queue closed");
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Jumlah item di buffer. Hanya snapshot, bisa basi saat return.
    pub fn len(&self) -> usize {
        self.state.lock().ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().ring.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.state.lock().ring.is_full()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    // Caller memegang lock dan sudah melihat `put_ready`.
    fn insert(&self, mut state: MutexGuard<'_, State<T>>, item: T) -> Result<(), PutError<T>> {
        if state.closed {
            return Err(PutError::Closed(item));
        }
        state.ring.push(item).map_err(PutError::Full)?;
        drop(state);

        self.not_empty.notify_one();
        Ok(())
    }

    // Caller memegang lock dan sudah melihat `take_ready`.
    fn remove(&self, mut state: MutexGuard<'_, State<T>>) -> Result<T, TakeError> {
        let item = state.ring.pop().ok_or(TakeError::Closed)?;
        drop(state);

        self.not_full.notify_one();
        Ok(item)
    }
}

impl<T: Send> BlockingQueue<T> for CondvarQueue<T> {
    fn put(&self, item: T) -> Result<(), PutError<T>> {
        CondvarQueue::put(self, item)
    }

    fn try_put(&self, item: T) -> Result<(), PutError<T>> {
        CondvarQueue::try_put(self, item)
    }

    fn put_timeout(&self, item: T, timeout: Duration) -> Result<(), PutError<T>> {
        CondvarQueue::put_timeout(self, item, timeout)
    }

    fn take(&self) -> Result<T, TakeError> {
        CondvarQueue::take(self)
    }

    fn try_take(&self) -> Result<T, TakeError> {
        CondvarQueue::try_take(self)
    }

    fn take_timeout(&self, timeout: Duration) -> Result<T, TakeError> {
        CondvarQueue::take_timeout(self, timeout)
    }

    fn close(&self) {
        CondvarQueue::close(self)
    }

    fn is_closed(&self) -> bool {
        CondvarQueue::is_closed(self)
    }

    fn len(&self) -> usize {
        CondvarQueue::len(self)
    }

    fn capacity(&self) -> usize {
        CondvarQueue::capacity(self)
    }

    fn strategy(&self) -> Strategy {
        Strategy::Condvar
    }
}

impl<T> std::fmt::Debug for CondvarQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("CondvarQueue")
            .field("capacity", &self.capacity)
            .field("len", &state.ring.len())
            .field("closed", &state.closed)
            .finish()
    }
}
