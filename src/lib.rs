pub mod record;
pub mod error;
pub mod tracker;
pub mod producer;
pub mod noop_producer;
pub mod callback;
pub mod barrier;
pub mod config;
pub mod env;
pub mod schema;
pub mod partitioner;
pub mod sink;
pub mod producer_sink;

pub mod init;

pub use barrier::{BarrierOutcome, BarrierWaitState, CheckpointBarrier};
pub use error::{ConfigError, ProducerError, SinkError};
pub use producer_sink::LogProducerSink;
pub use sink::{CheckpointedSink, RuntimeContext};
