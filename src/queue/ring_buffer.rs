//! Ring Buffer dengan kapasitas tetap
//!
//! Ring ini tidak melakukan sinkronisasi sendiri. Setiap strategi queue
//! menyimpannya di balik lock masing-masing, jadi semua method memakai
//! `&mut self` dan cursor cukup integer biasa.
//! Tidak ada alokasi setelah inisialisasi ([`RingBuffer::with_capacity`]).

use std::mem::MaybeUninit;

/// Circular buffer berisi `capacity` slot.
///
/// Tepat `len` slot mulai dari `read` (wrapping) yang terinisialisasi;
/// slot lain dianggap kosong.
pub(crate) struct RingBuffer<T> {
    slots: Box<[MaybeUninit<T>]>,
    // Slot berikutnya untuk dibaca
    read: usize,
    // Slot berikutnya untuk ditulis
    write: usize,
    len: usize,
}

impl<T> RingBuffer<T> {
    /// Alokasi `capacity` slot kosong. Caller yang memvalidasi `capacity >= 1`.
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        debug_assert!(capacity > 0, "ring capacity must be non-zero");

        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, MaybeUninit::uninit);

        Self {
            slots: slots.into_boxed_slice(),
            read: 0,
            write: 0,
            len: 0,
        }
    }

    /// Simpan `value` di write slot. Value dikembalikan jika buffer penuh.
    #[inline]
    pub(crate) fn push(&mut self, value: T) -> Result<(), T> {
        if self.is_full() {
            return Err(value);
        }

        self.slots[self.write].write(value);
        self.write = self.advance(self.write);
        self.len += 1;

        Ok(())
    }

    /// Ambil value paling lama, atau `None` jika kosong.
    #[inline]
    pub(crate) fn pop(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }

        // SAFETY: len > 0, jadi read slot sudah ditulis oleh `push` dan belum
        // dibaca. Geser `read` di bawah menandai slot kosong lagi.
        let value = unsafe { self.slots[self.read].assume_init_read() };
        self.read = self.advance(self.read);
        self.len -= 1;

        Some(value)
    }

    #[inline]
    fn advance(&self, index: usize) -> usize {
        let next = index + 1;
        if next == self.slots.len() {
            0
        } else {
            next
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub(crate) fn is_full(&self) -> bool {
        self.len == self.slots.len()
    }
}

impl<T> Drop for RingBuffer<T> {
    fn drop(&mut self) {
        // Slot yang terisi masih memiliki value-nya
        while self.pop().is_some() {}
    }
}
