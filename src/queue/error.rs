use thiserror::Error;

/// Kapasitas nol ditolak saat konstruksi.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid queue capacity {0}: must be at least 1")]
pub struct InvalidCapacity(pub usize);

/// `put` yang gagal insert. Item dikembalikan ke caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PutError<T> {
    /// The queue has been closed; no put will ever succeed again.
    #[error("queue closed")]
    Closed(T),
    /// The queue is full (`try_put` only).
    #[error("queue full")]
    Full(T),
    /// No slot freed up before the deadline (`put_timeout` only).
    #[error("timed out waiting for a free slot")]
    Timeout(T),
}

impl<T> PutError<T> {
    /// Ambil kembali item yang tidak jadi di-insert.
    pub fn into_inner(self) -> T {
        match self {
            PutError::Closed(item) | PutError::Full(item) | PutError::Timeout(item) => item,
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, PutError::Closed(_))
    }
}

/// `take` yang tidak mendapat item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TakeError {
    /// The queue is closed and drained; no item will ever arrive.
    #[error("queue closed and drained")]
    Closed,
    /// The queue is empty (`try_take` only).
    #[error("queue empty")]
    Empty,
    /// No item arrived before the deadline (`take_timeout` only).
    #[error("timed out waiting for an item")]
    Timeout,
}

impl TakeError {
    pub fn is_closed(&self) -> bool {
        matches!(self, TakeError::Closed)
    }
}
