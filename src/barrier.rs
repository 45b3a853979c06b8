use crate::tracker::{PendingCount, PendingWrites};
use std::sync::Arc;
use tokio::time::{sleep, Duration, Instant};
use tracing::{debug, info, warn};

/// Interval between two polls of the pending count.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarrierOutcome {
    /// No producer exists, nothing was waited for.
    Skipped,
    /// Every submitted batch reached an outcome.
    Drained,
    /// The flush timeout elapsed with batches still outstanding.
    TimedOut,
}

/// Result of one checkpoint wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarrierWaitState {
    pub outcome: BarrierOutcome,
    pub elapsed: Duration,
    /// Pending count observed by the last poll.
    pub pending: i64,
}

impl BarrierWaitState {
    pub fn skipped() -> Self {
        Self {
            outcome: BarrierOutcome::Skipped,
            elapsed: Duration::ZERO,
            pending: 0,
        }
    }
}

/// Wait until `pending` reaches zero or `flush_timeout` elapses.
///
/// Returns immediately without sleeping when nothing is pending. A timeout
/// is reported as a warning and in the returned state; it never fails
/// the checkpoint.
pub async fn drain(
    pending: &dyn PendingCount,
    flush_timeout: Duration,
    poll_interval: Duration,
) -> BarrierWaitState {
    let begin_at = Instant::now();
    loop {
        let elapsed = begin_at.elapsed();
        let current = pending.current();
        if current <= 0 {
            info!(used_ms = elapsed.as_millis() as u64, "snapshot state succeeded");
            return BarrierWaitState {
                outcome: BarrierOutcome::Drained,
                elapsed,
                pending: current,
            };
        }
        if elapsed >= flush_timeout {
            warn!(
                timeout_ms = flush_timeout.as_millis() as u64,
                pending = current,
                "wait for snapshot state timed out"
            );
            return BarrierWaitState {
                outcome: BarrierOutcome::TimedOut,
                elapsed,
                pending: current,
            };
        }
        debug!(
            pending = current,
            sleep_ms = poll_interval.as_millis() as u64,
            "waiting for outstanding batches to flush"
        );
        sleep(poll_interval).await;
    }
}

/// Shareable handle to run the checkpoint wait from any task.
#[derive(Clone)]
pub struct CheckpointBarrier {
    pending: Arc<dyn PendingCount>,
    flush_timeout: Duration,
    poll_interval: Duration,
}

impl CheckpointBarrier {
    pub fn new(pending: PendingWrites, flush_timeout: Duration, poll_interval: Duration) -> Self {
        Self::with_counter(Arc::new(pending), flush_timeout, poll_interval)
    }

    pub fn with_counter(
        pending: Arc<dyn PendingCount>,
        flush_timeout: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            pending,
            flush_timeout,
            poll_interval,
        }
    }

    pub fn flush_timeout(&self) -> Duration {
        self.flush_timeout
    }

    pub async fn wait(&self) -> BarrierWaitState {
        drain(&*self.pending, self.flush_timeout, self.poll_interval).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

    /// Counter that reports `initial` until polled `settle_after` times.
    struct FakeCounter {
        value: AtomicI64,
        polls: AtomicUsize,
        settle_after: usize,
    }

    impl FakeCounter {
        fn new(initial: i64, settle_after: usize) -> Self {
            Self {
                value: AtomicI64::new(initial),
                polls: AtomicUsize::new(0),
                settle_after,
            }
        }
    }

    impl PendingCount for FakeCounter {
        fn current(&self) -> i64 {
            let polls = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
            if polls > self.settle_after {
                self.value.store(0, Ordering::SeqCst);
            }
            self.value.load(Ordering::SeqCst)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn returns_immediately_when_nothing_is_pending() {
        let counter = FakeCounter::new(0, 0);
        let state = drain(&counter, Duration::from_secs(10), DEFAULT_POLL_INTERVAL).await;
        assert_eq!(state.outcome, BarrierOutcome::Drained);
        assert_eq!(state.elapsed, Duration::ZERO);
        assert_eq!(counter.polls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn polls_until_the_count_settles() {
        let counter = FakeCounter::new(2, 3);
        let state = drain(&counter, Duration::from_secs(5), DEFAULT_POLL_INTERVAL).await;
        assert_eq!(state.outcome, BarrierOutcome::Drained);
        assert!(state.elapsed >= Duration::from_millis(300));
        assert!(state.elapsed < Duration::from_millis(400));
        assert_eq!(state.pending, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_without_failing() {
        let counter = FakeCounter::new(1, usize::MAX);
        let state = drain(&counter, Duration::from_millis(200), DEFAULT_POLL_INTERVAL).await;
        assert_eq!(state.outcome, BarrierOutcome::TimedOut);
        assert!(state.elapsed >= Duration::from_millis(200));
        assert!(state.elapsed < Duration::from_millis(300));
        assert_eq!(state.pending, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn barrier_handle_observes_shared_tracker() {
        let pending = PendingWrites::new();
        pending.increment();
        let barrier = CheckpointBarrier::new(
            pending.clone(),
            Duration::from_secs(5),
            DEFAULT_POLL_INTERVAL,
        );

        let settle = pending.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(250)).await;
            settle.decrement();
        });

        let state = barrier.wait().await;
        assert_eq!(state.outcome, BarrierOutcome::Drained);
        assert!(state.elapsed >= Duration::from_millis(250));
        assert!(state.elapsed < Duration::from_secs(1));
    }
}
