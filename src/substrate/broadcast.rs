use std::ops::Deref;
use std::sync::Arc;

/// Read-only value shared by every worker of a job.
///
/// Built once by the coordinator and never mutated afterwards, so it needs no
/// lock; cloning the handle shares the same allocation.
#[derive(Debug)]
pub struct Broadcast<T> {
    value: Arc<T>,
}

impl<T> Broadcast<T> {
    pub fn new(value: T) -> Self {
        Self {
            value: Arc::new(value),
        }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    /// Number of live handles to the shared value
    pub fn handles(&self) -> usize {
        Arc::strong_count(&self.value)
    }
}

impl<T> Clone for Broadcast<T> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
        }
    }
}

impl<T> Deref for Broadcast<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}
