use crate::barrier::{BarrierWaitState, CheckpointBarrier};
use crate::callback::CallbackWorker;
use crate::config::SinkConfig;
use crate::error::SinkError;
use crate::partitioner::LogPartitioner;
use crate::producer::{LogProducer, ProducerFactory};
use crate::record::LogRequest;
use crate::schema::LogSerializationSchema;
use crate::sink::{CheckpointedSink, RuntimeContext};
use crate::tracker::PendingWrites;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Sink that ships every element to a log service through a
/// [`LogProducer`] and holds checkpoints until submitted batches settle.
///
/// Submission never waits for delivery: each accepted batch is counted
/// in [`PendingWrites`] and settled by the completion callback on a
/// dedicated worker task. [`snapshot_state`](CheckpointedSink::snapshot_state)
/// waits for that count to reach zero, bounded by the flush timeout.
pub struct LogProducerSink<T> {
    schema: Box<dyn LogSerializationSchema<T>>,
    partitioner: Option<Box<dyn LogPartitioner<T>>>,
    config: SinkConfig,
    factory: Arc<dyn ProducerFactory>,
    producer: Option<Arc<dyn LogProducer>>,
    worker: Option<CallbackWorker>,
    pending: PendingWrites,
}

impl<T> LogProducerSink<T> {
    /// Build a sink from a flat property map.
    ///
    /// **Returns**
    /// - `Err(SinkError::Config)` if a required option is missing or a
    ///   value cannot be parsed.
    pub fn new<S, F>(
        schema: S,
        props: &HashMap<String, String>,
        factory: F,
    ) -> Result<Self, SinkError>
    where
        S: LogSerializationSchema<T> + 'static,
        F: ProducerFactory + 'static,
    {
        let config = SinkConfig::from_properties(props)?;
        Ok(Self::with_config(schema, config, factory))
    }

    pub fn with_config<S, F>(schema: S, config: SinkConfig, factory: F) -> Self
    where
        S: LogSerializationSchema<T> + 'static,
        F: ProducerFactory + 'static,
    {
        Self {
            schema: Box::new(schema),
            partitioner: None,
            config,
            factory: Arc::new(factory),
            producer: None,
            worker: None,
            pending: PendingWrites::new(),
        }
    }

    /// Install a partitioner. Takes effect on the next `open`.
    pub fn set_partitioner<P>(&mut self, partitioner: P)
    where
        P: LogPartitioner<T> + 'static,
    {
        self.partitioner = Some(Box::new(partitioner));
    }

    pub fn config(&self) -> &SinkConfig {
        &self.config
    }

    /// Number of submitted batches still waiting for an outcome.
    pub fn pending(&self) -> i64 {
        self.pending.current()
    }

    /// Barrier over this sink's pending count, for hosts that trigger
    /// checkpoints from another task.
    ///
    /// Unlike [`snapshot_state`](CheckpointedSink::snapshot_state) the handle
    /// does not know whether a producer exists: on an unopened or closed
    /// sink it never reports `Skipped`, and a count left behind by a forced
    /// shutdown makes it wait out the full flush timeout.
    pub fn barrier(&self) -> CheckpointBarrier {
        CheckpointBarrier::new(
            self.pending.clone(),
            self.config.flush_timeout,
            self.config.poll_interval,
        )
    }

    pub fn is_open(&self) -> bool {
        self.producer.is_some()
    }
}

#[async_trait]
impl<T: Send + Sync> CheckpointedSink<T> for LogProducerSink<T> {
    async fn open(&mut self, ctx: RuntimeContext) -> Result<(), SinkError> {
        if let Some(partitioner) = self.partitioner.as_mut() {
            partitioner.initialize(ctx.index, ctx.parallelism);
        }
        if self.producer.is_none() {
            let producer = self
                .factory
                .create(&self.config.producer, &self.config.project)
                .map_err(SinkError::ProducerInit)?;
            self.producer = Some(producer);
        }
        if self.worker.is_none() {
            self.worker = Some(CallbackWorker::start(self.pending.clone()));
        }
        info!(
            project = %self.config.project.project,
            logstore = %self.config.logstore,
            index = ctx.index,
            parallelism = ctx.parallelism,
            "log producer sink opened"
        );
        Ok(())
    }

    async fn invoke(&mut self, element: &T) -> Result<(), SinkError> {
        let (Some(producer), Some(worker)) = (self.producer.as_ref(), self.worker.as_ref()) else {
            return Err(SinkError::NotOpened);
        };

        let Some(group) = self.schema.serialize(element) else {
            debug!("serialized log group is empty, nothing sent");
            return Ok(());
        };
        let items = LogRequest::items_from_group(&group);
        if items.is_empty() {
            return Ok(());
        }
        let shard_hash_key = self
            .partitioner
            .as_ref()
            .and_then(|p| p.hash_key(element));

        let request = LogRequest {
            project: self.config.project.project.clone(),
            logstore: self.config.logstore.clone(),
            topic: group.topic,
            source: group.source,
            shard_hash_key,
            items,
        };

        let handle = producer.send(request).await.map_err(|e| {
            error!(error = %e, "error while sending logs");
            SinkError::Submit(e)
        })?;
        self.pending.increment();
        worker.attach(handle);
        Ok(())
    }

    async fn snapshot_state(&mut self) -> Result<BarrierWaitState, SinkError> {
        if self.producer.is_none() {
            return Ok(BarrierWaitState::skipped());
        }
        Ok(self.barrier().wait().await)
    }

    /// Close the producer, then stop the callback worker. Batches that are
    /// still unresolved do not hold up shutdown; they are settled whenever
    /// their handle resolves.
    async fn close(&mut self) -> Result<(), SinkError> {
        if let Some(producer) = self.producer.take() {
            if let Err(e) = producer.close().await {
                warn!(error = %e, "error while closing log producer");
            }
        }
        if let Some(mut worker) = self.worker.take() {
            worker.shutdown(self.config.shutdown_grace).await;
        }
        info!(pending = self.pending.current(), "log producer sink has been closed");
        Ok(())
    }
}
