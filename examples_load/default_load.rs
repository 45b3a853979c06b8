use std::collections::HashMap;
use std::time::Instant;

use log_producer_sink::config::{
    LOG_ACCESS_KEY, LOG_ACCESS_KEY_ID, LOG_ENDPOINT, LOG_LOGSTORE, LOG_PROJECT,
};
use log_producer_sink::init::init_logging;
use log_producer_sink::noop_producer::NoopProducer;
use log_producer_sink::producer::SharedProducer;
use log_producer_sink::record::{RawLog, RawLogGroup};
use log_producer_sink::{CheckpointedSink, LogProducerSink, RuntimeContext};

fn to_group(i: &u64) -> Option<RawLogGroup> {
    let mut group = RawLogGroup::new("load", "default_load");
    group.push(RawLog::now().with_field("iteration", i.to_string()));
    Some(group)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_logging()?;

    let props: HashMap<String, String> = [
        (LOG_PROJECT, "load-test"),
        (LOG_LOGSTORE, "default"),
        (LOG_ENDPOINT, "localhost"),
        (LOG_ACCESS_KEY_ID, "id"),
        (LOG_ACCESS_KEY, "key"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    let mut sink = LogProducerSink::<u64>::new(
        to_group,
        &props,
        SharedProducer::new(NoopProducer::default()),
    )?;
    sink.open(RuntimeContext::default()).await?;

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        sink.invoke(&i).await?;
    }

    let elapsed = start.elapsed();
    println!("default config: sent {} elements in {:?} (~{:.0} el/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    let state = sink.snapshot_state().await?;
    println!("checkpoint: {:?} after {:?}", state.outcome, state.elapsed);

    sink.close().await?;
    Ok(())
}
