use crate::blocks::BlockId;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Mints fresh block ids. Injected wherever blocks are created so tests can
/// supply deterministic ids.
pub trait IdAllocator: Send + Sync {
    fn next_id(&self) -> BlockId;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIds;

impl IdAllocator for UuidIds {
    fn next_id(&self) -> BlockId {
        BlockId::new(Uuid::new_v4().to_string())
    }
}

/// Monotonic ids of the form `{prefix}{n}`, starting at 1.
#[derive(Debug)]
pub struct SequentialIds {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::new("b")
    }
}

impl IdAllocator for SequentialIds {
    fn next_id(&self) -> BlockId {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        BlockId::new(format!("{}{n}", self.prefix))
    }
}
