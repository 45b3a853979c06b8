use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Read access to the number of batches still awaiting an outcome.
///
/// The checkpoint barrier only needs this capability, which keeps it
/// testable against a fake counter.
pub trait PendingCount: Send + Sync {
    fn current(&self) -> i64;
}

/// Count of batches handed to the producer whose outcome has not yet been
/// observed by the completion callback.
///
/// Cloning shares the underlying counter. The submission path calls
/// [`increment`](Self::increment) once per accepted batch, the completion
/// callback calls [`decrement`](Self::decrement) exactly once per batch.
#[derive(Clone, Debug, Default)]
pub struct PendingWrites {
    count: Arc<AtomicI64>,
}

impl PendingWrites {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self) {
        self.count.fetch_add(1, Ordering::AcqRel);
    }

    pub fn decrement(&self) {
        let previous = self.count.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous > 0, "pending write count went negative");
    }

    pub fn current(&self) -> i64 {
        self.count.load(Ordering::Acquire)
    }
}

impl PendingCount for PendingWrites {
    fn current(&self) -> i64 {
        PendingWrites::current(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interleaved_updates_track_outstanding_batches() {
        let pending = PendingWrites::new();
        let shared = pending.clone();

        for _ in 0..5 {
            pending.increment();
        }
        shared.decrement();
        assert_eq!(pending.current(), 4);
        pending.increment();
        shared.decrement();
        shared.decrement();
        assert_eq!(shared.current(), 3);
    }

    #[test]
    fn concurrent_increments_and_decrements_settle_to_zero() {
        let pending = PendingWrites::new();
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let pending = pending.clone();
                std::thread::spawn(move || {
                    for _ in 0..1_000 {
                        pending.increment();
                        pending.decrement();
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(pending.current(), 0);
    }
}
