use std::sync::atomic::{AtomicU64, Ordering};

pub type AccountId = u64;
pub type CustomerId = u64;
pub type TransactionId = u64;

/// Source of unique, positive identifiers shared by every entity kind.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> u64;
}

/// Monotonic counter. Ids are never reused while the generator lives.
#[derive(Debug)]
pub struct SequentialIdGenerator {
    next: AtomicU64,
}

impl SequentialIdGenerator {
    /// `seed` of zero is bumped to one, ids are always positive.
    pub fn starting_at(seed: u64) -> Self {
        Self {
            next: AtomicU64::new(seed.max(1)),
        }
    }
}

impl Default for SequentialIdGenerator {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}
