use std::collections::HashMap;

use async_trait::async_trait;
use tokio::time::{sleep, Duration};
use tracing::info;

use log_producer_sink::config::{
    FLUSH_TIMEOUT_MS, LOG_ACCESS_KEY, LOG_ACCESS_KEY_ID, LOG_ENDPOINT, LOG_LOGSTORE, LOG_PROJECT,
};
use log_producer_sink::init::init_logging;
use log_producer_sink::producer::{LogProducer, SendHandle, SharedProducer};
use log_producer_sink::record::{LogRequest, RawLog, RawLogGroup, SendResult};
use log_producer_sink::{CheckpointedSink, LogProducerSink, ProducerError, RuntimeContext};

/// Example of plugging in a custom batching client by implementing
/// `LogProducer` directly. Imagine this talks to a proprietary log
/// service; here every batch is printed and acknowledged after a delay.
struct DelayedPrintProducer {
    delay: Duration,
}

#[async_trait]
impl LogProducer for DelayedPrintProducer {
    async fn send(&self, request: LogRequest) -> Result<SendHandle, ProducerError> {
        let (resolver, handle) = SendHandle::channel();
        let delay = self.delay;
        tokio::spawn(async move {
            sleep(delay).await;
            println!(
                "[my-log-service] {}/{} topic={} items={}",
                request.project,
                request.logstore,
                request.topic,
                request.items.len()
            );
            resolver.resolve(Ok(SendResult::success(1)));
        });
        Ok(handle)
    }

    async fn close(&self) -> Result<(), ProducerError> {
        Ok(())
    }
}

fn to_group(line: &String) -> Option<RawLogGroup> {
    let mut group = RawLogGroup::new("orders", "custom_producer");
    group.push(RawLog::now().with_field("message", line.clone()));
    Some(group)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_logging()?;

    let props: HashMap<String, String> = [
        (LOG_PROJECT, "my-project"),
        (LOG_LOGSTORE, "orders"),
        (LOG_ENDPOINT, "localhost"),
        (LOG_ACCESS_KEY_ID, "id"),
        (LOG_ACCESS_KEY, "key"),
        (FLUSH_TIMEOUT_MS, "5000"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    let producer = SharedProducer::new(DelayedPrintProducer {
        delay: Duration::from_millis(300),
    });
    let mut sink = LogProducerSink::<String>::new(to_group, &props, producer)?;
    sink.open(RuntimeContext::default()).await?;

    for i in 0..5 {
        sink.invoke(&format!("order {i} failed")).await?;
    }
    info!(pending = sink.pending(), "taking checkpoint");

    // Blocks until the delayed acknowledgements arrived.
    let state = sink.snapshot_state().await?;
    info!(outcome = ?state.outcome, elapsed_ms = state.elapsed.as_millis() as u64, "checkpoint done");

    sink.close().await?;
    Ok(())
}
