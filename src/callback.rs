use crate::error::ProducerError;
use crate::producer::SendHandle;
use crate::record::SendResult;
use crate::tracker::PendingWrites;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};
use tracing::{debug, error, warn};

/// Terminal outcome of one submitted batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The handle resolved. The service may still have rejected the batch,
    /// see [`SendResult::successful`].
    Success(SendResult),
    Failure(ProducerError),
}

impl From<Result<SendResult, ProducerError>> for Completion {
    fn from(res: Result<SendResult, ProducerError>) -> Self {
        match res {
            Ok(result) => Completion::Success(result),
            Err(e) => Completion::Failure(e),
        }
    }
}

/// Completion callback: settle the pending count first, then report.
///
/// Failures are only logged; they never reach the record path.
pub fn on_completion(pending: &PendingWrites, completion: Completion) {
    pending.decrement();
    match completion {
        Completion::Success(result) if !result.successful => {
            error!(
                code = result.error_code.as_deref().unwrap_or(""),
                error_message = result.error_message.as_deref().unwrap_or(""),
                retries = result.attempt_count,
                "send logs failed"
            );
        }
        Completion::Success(_) => {}
        Completion::Failure(e) => {
            error!(error = %e, "send logs failed");
        }
    }
}

/// Dedicated task that runs every completion callback.
///
/// Each attached [`SendHandle`] is awaited by a small forwarding task which
/// hands the outcome over a channel to the single worker task, so
/// callbacks run one at a time and never on the submitting task.
pub struct CallbackWorker {
    pending: PendingWrites,
    sender: Option<mpsc::UnboundedSender<Completion>>,
    handle: Option<JoinHandle<()>>,
}

impl CallbackWorker {
    /// Spawn the worker task on the current tokio runtime.
    pub fn start(pending: PendingWrites) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Completion>();
        let pending_bg = pending.clone();

        let handle = tokio::spawn(async move {
            while let Some(completion) = rx.recv().await {
                on_completion(&pending_bg, completion);
            }
            debug!("callback worker drained");
        });

        Self {
            pending,
            sender: Some(tx),
            handle: Some(handle),
        }
    }

    /// Run the completion callback for `send` once it resolves.
    ///
    /// The caller must already have counted the batch as pending. The
    /// forwarding task only holds a weak sender while it waits, so an
    /// unresolved batch never keeps the worker alive during shutdown.
    pub fn attach(&self, send: SendHandle) {
        let pending = self.pending.clone();
        let sender = self.sender.as_ref().map(|tx| tx.downgrade());
        tokio::spawn(async move {
            let completion = Completion::from(send.await);
            let undelivered = match sender.and_then(|weak| weak.upgrade()) {
                Some(tx) => tx.send(completion).err().map(|e| e.0),
                None => Some(completion),
            };
            // Worker already gone: settle here so the count stays exact.
            if let Some(completion) = undelivered {
                on_completion(&pending, completion);
            }
        });
    }

    /// Stop accepting callbacks and wait for queued ones to finish.
    ///
    /// Outcomes already handed to the worker are processed; batches that
    /// resolve later are settled by their forwarding task. Waits up to
    /// `grace` for the worker to drain, then aborts it and waits up to
    /// `grace` again. Never fails; a worker that does not stop is logged.
    pub async fn shutdown(&mut self, grace: Duration) {
        self.sender = None;
        let Some(mut handle) = self.handle.take() else {
            return;
        };

        if timeout(grace, &mut handle).await.is_ok() {
            return;
        }
        warn!(
            grace_ms = grace.as_millis() as u64,
            pending = self.pending.current(),
            "callback worker did not drain in time, aborting"
        );
        handle.abort();
        if timeout(grace, handle).await.is_err() {
            warn!("stop callback worker failed");
        }
    }
}

impl Drop for CallbackWorker {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tracing::{Event, Subscriber};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
    use tracing_subscriber::Registry;

    /// Records the pending count at the moment each event is emitted.
    struct CountAtEvent {
        pending: PendingWrites,
        seen: Arc<Mutex<Vec<i64>>>,
    }

    impl<S: Subscriber> Layer<S> for CountAtEvent {
        fn on_event(&self, _event: &Event<'_>, _ctx: Context<'_, S>) {
            self.seen.lock().unwrap().push(self.pending.current());
        }
    }

    async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn callback_decrements_on_every_outcome() {
        let pending = PendingWrites::new();
        for _ in 0..3 {
            pending.increment();
        }

        on_completion(&pending, Completion::Success(SendResult::success(1)));
        on_completion(
            &pending,
            Completion::Success(SendResult::failure(3, "WriteQuotaExceed", "quota exceeded")),
        );
        on_completion(&pending, Completion::Failure(ProducerError::Transport("reset".into())));

        assert_eq!(pending.current(), 0);
    }

    #[test]
    fn callback_decrements_before_it_logs() {
        let pending = PendingWrites::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let subscriber = Registry::default().with(CountAtEvent {
            pending: pending.clone(),
            seen: Arc::clone(&seen),
        });

        tracing::subscriber::with_default(subscriber, || {
            pending.increment();
            pending.increment();
            on_completion(
                &pending,
                Completion::Success(SendResult::failure(2, "Unauthorized", "bad key")),
            );
            on_completion(
                &pending,
                Completion::Failure(ProducerError::Rejected {
                    code: "ShardWriteQuotaExceed".into(),
                    message: "shard quota exceeded".into(),
                }),
            );
        });

        assert_eq!(*seen.lock().unwrap(), vec![1, 0]);
    }

    #[tokio::test]
    async fn worker_runs_callbacks_for_attached_handles() {
        let pending = PendingWrites::new();
        let mut worker = CallbackWorker::start(pending.clone());

        let (first, first_handle) = SendHandle::channel();
        let (second, second_handle) = SendHandle::channel();
        pending.increment();
        worker.attach(first_handle);
        pending.increment();
        worker.attach(second_handle);

        second.resolve(Err(ProducerError::BufferFull));
        first.resolve(Ok(SendResult::success(1)));

        worker.shutdown(Duration::from_secs(3)).await;
        settle().await;
        assert_eq!(pending.current(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_does_not_wait_for_unresolved_handles() {
        let pending = PendingWrites::new();
        let mut worker = CallbackWorker::start(pending.clone());

        let (_resolver, handle) = SendHandle::channel();
        pending.increment();
        worker.attach(handle);

        let begin = tokio::time::Instant::now();
        worker.shutdown(Duration::from_secs(3)).await;
        assert!(begin.elapsed() < Duration::from_secs(3));
        assert_eq!(pending.current(), 1);
    }

    #[tokio::test]
    async fn handles_resolving_after_shutdown_still_decrement() {
        let pending = PendingWrites::new();
        let mut worker = CallbackWorker::start(pending.clone());

        let (resolver, handle) = SendHandle::channel();
        pending.increment();
        worker.attach(handle);
        worker.shutdown(Duration::from_millis(10)).await;

        drop(resolver);
        settle().await;
        assert_eq!(pending.current(), 0);
    }
}
