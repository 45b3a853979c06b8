use crate::barrier::BarrierWaitState;
use crate::error::SinkError;
use async_trait::async_trait;

/// Position of this sink instance among its parallel siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeContext {
    pub index: usize,
    pub parallelism: usize,
}

impl RuntimeContext {
    pub fn new(index: usize, parallelism: usize) -> Self {
        Self { index, parallelism }
    }
}

impl Default for RuntimeContext {
    fn default() -> Self {
        Self::new(0, 1)
    }
}

/// Lifecycle a stream-processing host drives a checkpointed sink through.
///
/// The host calls `open` once, then `invoke` for every element from a
/// single task, `snapshot_state` whenever a checkpoint is taken, and
/// finally `close`.
#[async_trait]
pub trait CheckpointedSink<T: Send + Sync>: Send {
    async fn open(&mut self, ctx: RuntimeContext) -> Result<(), SinkError>;

    /// Restore hook. Sinks that keep no state ignore it.
    async fn initialize_state(&mut self) -> Result<(), SinkError> {
        Ok(())
    }

    /// Write one element.
    ///
    /// **Returns**
    /// - `Err(..)` is fatal: the host is expected to fail the task.
    async fn invoke(&mut self, element: &T) -> Result<(), SinkError>;

    /// Called when a checkpoint is taken; must not return before in-flight
    /// writes settled or the flush timeout elapsed.
    async fn snapshot_state(&mut self) -> Result<BarrierWaitState, SinkError>;

    async fn close(&mut self) -> Result<(), SinkError>;
}
