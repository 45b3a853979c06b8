use crate::error::ProducerError;
use crate::producer::{LogProducer, SendHandle};
use crate::record::{LogRequest, SendResult};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};

/// A producer that acknowledges every batch immediately and drops it.
///
/// Useful for measuring the overhead of the sink itself without any
/// external I/O, and for tests that don't care about delivery.
#[derive(Default)]
pub struct NoopProducer {
    closed: AtomicBool,
}

#[async_trait]
impl LogProducer for NoopProducer {
    async fn send(&self, _request: LogRequest) -> Result<SendHandle, ProducerError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ProducerError::Closed);
        }
        Ok(SendHandle::ready(Ok(SendResult::success(1))))
    }

    async fn close(&self) -> Result<(), ProducerError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}
