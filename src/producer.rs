use crate::error::ProducerError;
use crate::record::{LogRequest, SendResult};
use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// Asynchronous batching client for the log service.
///
/// Implementations own batching, retries and transport. The sink only
/// hands over one [`LogRequest`] at a time and observes its outcome
/// through the returned [`SendHandle`].
#[async_trait]
pub trait LogProducer: Send + Sync {
    /// Accept a batch for delivery.
    ///
    /// **Returns**
    /// - `Ok(handle)` once the batch is buffered; the handle resolves when
    ///   the producer reaches a terminal outcome for it.
    /// - `Err(..)` if the batch was not accepted (buffer saturated, timed
    ///   out waiting for space, producer closed). No handle exists then.
    ///
    /// May wait while the producer applies backpressure.
    async fn send(&self, request: LogRequest) -> Result<SendHandle, ProducerError>;

    /// Flush what can be flushed and release resources. Handles that are
    /// still open afterwards must resolve (a dropped resolver counts).
    async fn close(&self) -> Result<(), ProducerError>;
}

/// Future side of a submitted batch. Resolves at most once.
pub struct SendHandle {
    receiver: oneshot::Receiver<Result<SendResult, ProducerError>>,
}

/// Producer side of a [`SendHandle`]; consumed when the outcome is delivered.
pub struct SendResolver {
    sender: oneshot::Sender<Result<SendResult, ProducerError>>,
}

impl SendHandle {
    pub fn channel() -> (SendResolver, SendHandle) {
        let (sender, receiver) = oneshot::channel();
        (SendResolver { sender }, SendHandle { receiver })
    }

    /// A handle that is already resolved with `outcome`.
    pub fn ready(outcome: Result<SendResult, ProducerError>) -> Self {
        let (resolver, handle) = Self::channel();
        resolver.resolve(outcome);
        handle
    }
}

impl SendResolver {
    pub fn resolve(self, outcome: Result<SendResult, ProducerError>) {
        // The sink may already have given up on the handle.
        let _ = self.sender.send(outcome);
    }
}

impl Future for SendHandle {
    type Output = Result<SendResult, ProducerError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|res| res.unwrap_or(Err(ProducerError::Dropped)))
    }
}

/// Tunables of the batching client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProducerConfig {
    pub linger_ms: u64,
    pub retries: u32,
    pub base_retry_backoff_ms: u64,
    pub max_retry_backoff_ms: u64,
    pub max_block_ms: u64,
    pub io_thread_count: usize,
    pub buckets: u32,
    pub total_size_in_bytes: u64,
    pub adjust_shard_hash: bool,
}

impl ProducerConfig {
    pub const DEFAULT_LINGER_MS: u64 = 2_000;
    pub const DEFAULT_RETRIES: u32 = 10;
    pub const DEFAULT_BASE_RETRY_BACKOFF_MS: u64 = 100;
    pub const DEFAULT_MAX_RETRY_BACKOFF_MS: u64 = 50_000;
    pub const DEFAULT_MAX_BLOCK_MS: u64 = 60_000;
    pub const DEFAULT_BUCKETS: u32 = 64;
    pub const DEFAULT_TOTAL_SIZE_IN_BYTES: u64 = 100 * 1024 * 1024;

    pub fn default_io_thread_count() -> usize {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            linger_ms: Self::DEFAULT_LINGER_MS,
            retries: Self::DEFAULT_RETRIES,
            base_retry_backoff_ms: Self::DEFAULT_BASE_RETRY_BACKOFF_MS,
            max_retry_backoff_ms: Self::DEFAULT_MAX_RETRY_BACKOFF_MS,
            max_block_ms: Self::DEFAULT_MAX_BLOCK_MS,
            io_thread_count: Self::default_io_thread_count(),
            buckets: Self::DEFAULT_BUCKETS,
            total_size_in_bytes: Self::DEFAULT_TOTAL_SIZE_IN_BYTES,
            adjust_shard_hash: true,
        }
    }
}

/// Where and as whom the producer writes.
#[derive(Clone, PartialEq, Eq)]
pub struct ProjectConfig {
    pub project: String,
    pub endpoint: String,
    pub access_key_id: String,
    pub access_key: String,
}

impl std::fmt::Debug for ProjectConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectConfig")
            .field("project", &self.project)
            .field("endpoint", &self.endpoint)
            .field("access_key_id", &self.access_key_id)
            .field("access_key", &"<redacted>")
            .finish()
    }
}

/// Builds the producer when the sink is opened.
pub trait ProducerFactory: Send + Sync {
    fn create(
        &self,
        producer: &ProducerConfig,
        project: &ProjectConfig,
    ) -> Result<Arc<dyn LogProducer>, ProducerError>;
}

impl<F> ProducerFactory for F
where
    F: Fn(&ProducerConfig, &ProjectConfig) -> Result<Arc<dyn LogProducer>, ProducerError>
        + Send
        + Sync,
{
    fn create(
        &self,
        producer: &ProducerConfig,
        project: &ProjectConfig,
    ) -> Result<Arc<dyn LogProducer>, ProducerError> {
        self(producer, project)
    }
}

/// Factory that hands out one already-built producer on every `open`.
#[derive(Clone)]
pub struct SharedProducer(pub Arc<dyn LogProducer>);

impl SharedProducer {
    pub fn new<P: LogProducer + 'static>(producer: P) -> Self {
        Self(Arc::new(producer))
    }
}

impl ProducerFactory for SharedProducer {
    fn create(
        &self,
        _producer: &ProducerConfig,
        _project: &ProjectConfig,
    ) -> Result<Arc<dyn LogProducer>, ProducerError> {
        Ok(Arc::clone(&self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn handle_resolves_with_delivered_outcome() {
        let (resolver, handle) = SendHandle::channel();
        resolver.resolve(Ok(SendResult::success(2)));
        assert_eq!(handle.await, Ok(SendResult::success(2)));
    }

    #[tokio::test]
    async fn dropped_resolver_resolves_as_failure() {
        let (resolver, handle) = SendHandle::channel();
        drop(resolver);
        assert_eq!(handle.await, Err(ProducerError::Dropped));
    }

    #[test]
    fn project_config_debug_hides_access_key() {
        let project = ProjectConfig {
            project: "p".into(),
            endpoint: "e".into(),
            access_key_id: "id".into(),
            access_key: "secret".into(),
        };
        assert!(!format!("{project:?}").contains("secret"));
    }
}
