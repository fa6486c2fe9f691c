//! Correlation ids for outgoing commands.
//!
//! Ids are unique within one process run only. They start again at 1 after
//! a restart, so the broker must not treat them as globally unique.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic id source.
#[derive(Debug)]
pub struct IdGenerator {
    last: AtomicU64,
}

impl IdGenerator {
    /// Create a generator whose first id is 1.
    pub const fn new() -> Self {
        Self {
            last: AtomicU64::new(0),
        }
    }

    /// Next id, strictly greater than every id returned before.
    #[inline]
    pub fn next_id(&self) -> u64 {
        self.last.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

static PROCESS_IDS: IdGenerator = IdGenerator::new();

/// Next id from the process-wide generator shared by all connections.
///
/// Not reset when the connection is re-established.
pub fn next_id() -> u64 {
    PROCESS_IDS.next_id()
}
