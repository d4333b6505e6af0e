//! Accumulating set of data-node identities to avoid on reconnect.

use std::sync::{Arc, Mutex};

/// Append-only list of `host:port` identities that failed for one stream.
///
/// Shared by handle between a stream and every request it issues, so a
/// failure recorded mid-read is visible to the next URL build. Serialized as
/// one comma-joined query value; entries may repeat and are never removed
/// for the lifetime of the stream.
#[derive(Debug, Clone, Default)]
pub struct ExcludeNodes {
    inner: Arc<Mutex<Vec<String>>>,
}

impl ExcludeNodes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failed node. Duplicates are kept.
    pub fn record(&self, authority: String) {
        self.inner.lock().unwrap().push(authority);
    }

    /// Comma-joined query value, or `None` while nothing has failed.
    pub fn as_value(&self) -> Option<String> {
        let nodes = self.inner.lock().unwrap();
        if nodes.is_empty() {
            None
        } else {
            Some(nodes.join(","))
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
