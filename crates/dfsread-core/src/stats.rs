//! Read statistics shared between a client and its streams.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Cheap cloneable handle onto shared read counters.
#[derive(Debug, Clone, Default)]
pub struct ReadStatistics {
    inner: Arc<Counters>,
}

#[derive(Debug, Default)]
struct Counters {
    bytes_read: AtomicU64,
    read_ops: AtomicU64,
}

impl ReadStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_bytes_read(&self, n: u64) {
        self.inner.bytes_read.fetch_add(n, Ordering::Relaxed);
    }

    pub fn increment_read_ops(&self, n: u64) {
        self.inner.read_ops.fetch_add(n, Ordering::Relaxed);
    }

    pub fn bytes_read(&self) -> u64 {
        self.inner.bytes_read.load(Ordering::Relaxed)
    }

    pub fn read_ops(&self) -> u64 {
        self.inner.read_ops.load(Ordering::Relaxed)
    }
}
