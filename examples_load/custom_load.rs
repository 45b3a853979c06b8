use std::time::Instant;

use serde::Serialize;
use tokio::time::Duration;
use tracing::Level;

use log_producer_sink::config::SinkConfig;
use log_producer_sink::env::properties_from_lookup;
use log_producer_sink::init::init_logging_with_level;
use log_producer_sink::noop_producer::NoopProducer;
use log_producer_sink::partitioner::SubtaskHashPartitioner;
use log_producer_sink::producer::SharedProducer;
use log_producer_sink::schema::JsonLogSchema;
use log_producer_sink::{CheckpointedSink, LogProducerSink, RuntimeContext};

#[derive(Serialize)]
struct Request {
    ts: u64,
    path: &'static str,
    status: u16,
    latency_ms: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_logging_with_level(Level::WARN)?;

    // Options as they would arrive through the environment.
    let props = properties_from_lookup(|name| {
        let value = match name {
            "LOG_PROJECT" => "load-test",
            "LOG_LOGSTORE" => "requests",
            "LOG_ENDPOINT" => "localhost",
            "LOG_ACCESS_KEY_ID" => "id",
            "LOG_ACCESS_KEY" => "key",
            "LOG_PRODUCER_FLUSH_TIMEOUT_MS" => "2000",
            "LOG_PRODUCER_IO_THREAD_COUNT" => "4",
            _ => return None,
        };
        Some(value.to_string())
    });
    let config = SinkConfig::from_properties(&props)?
        .with_poll_interval(Duration::from_millis(20))
        .with_shutdown_grace(Duration::from_secs(1));

    let schema = JsonLogSchema::new("http", "custom_load").with_time_field("ts");
    let mut sink = LogProducerSink::<Request>::with_config(
        schema,
        config,
        SharedProducer::new(NoopProducer::default()),
    );
    sink.set_partitioner(SubtaskHashPartitioner::new());
    sink.open(RuntimeContext::new(3, 8)).await?;

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        let request = Request {
            ts: 1_700_000_000 + i,
            path: "/api/orders",
            status: if i % 100 == 0 { 500 } else { 200 },
            latency_ms: (i % 250) as u32,
        };
        sink.invoke(&request).await?;
    }

    let elapsed = start.elapsed();
    println!("custom config: sent {} elements in {:?} (~{:.0} el/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    let state = sink.snapshot_state().await?;
    println!("checkpoint: {:?} after {:?}", state.outcome, state.elapsed);

    sink.close().await?;
    Ok(())
}
