use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Arrival counter gating when a UI section has enough data to show
///
/// Each section seeds one counter with the number of bootstrap replies it
/// needs and tags those requests with it. Clones share the same count.
///
/// ```
/// use nixielink_client::LoadCounter;
///
/// let counter = LoadCounter::new(2);
/// counter.increment();
/// assert!(!counter.is_ready());
/// counter.increment();
/// assert!(counter.is_ready());
/// ```
#[derive(Debug, Clone, Default)]
pub struct LoadCounter {
    count: Arc<AtomicUsize>,
    threshold: usize,
}

impl LoadCounter {
    pub fn new(threshold: usize) -> Self {
        Self {
            count: Arc::new(AtomicUsize::new(0)),
            threshold,
        }
    }

    pub fn increment(&self) {
        self.count.fetch_add(1, Ordering::AcqRel);
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn is_ready(&self) -> bool {
        self.count() >= self.threshold
    }

    /// Re-arms the gate, typically at the start of each `on_loaded` cycle
    pub fn reset(&self) {
        self.count.store(0, Ordering::Release);
    }
}
