use std::sync::atomic::{AtomicUsize, Ordering};

/// A counter that can be bumped from any thread.
#[derive(Default)]
pub struct SynchronizedCounter {
    count: AtomicUsize,
}

impl SynchronizedCounter {
    pub const fn new() -> Self {
        SynchronizedCounter {
            count: AtomicUsize::new(0),
        }
    }

    pub fn reset(&self) -> usize {
        self.count.swap(0, Ordering::Relaxed)
    }

    pub fn increment(&self) {
        debug_assert!(self.count.load(Ordering::Acquire) != usize::MAX);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, n: usize) {
        self.count.fetch_add(n, Ordering::Relaxed);
    }

    pub fn peek(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }
}
