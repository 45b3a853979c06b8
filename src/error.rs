/// Error type returned when the sink configuration cannot be parsed.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required option `{0}`")]
    Missing(String),

    #[error("invalid value `{value}` for option `{key}`: {reason}")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },
}

/// Errors reported by a [`LogProducer`](crate::producer::LogProducer),
/// either synchronously from `send` or as the failed outcome of a
/// [`SendHandle`](crate::producer::SendHandle).
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ProducerError {
    /// The producer's internal buffer is saturated.
    #[error("producer buffer is full")]
    BufferFull,

    /// Waiting for buffer space exceeded the configured max block time.
    #[error("timed out after {0}ms waiting for buffer space")]
    Timeout(u64),

    #[error("producer is closed")]
    Closed,

    /// The resolver side of a handle went away without delivering an outcome.
    #[error("send handle was dropped before it resolved")]
    Dropped,

    /// For producers that surface a service rejection as a failed handle
    /// instead of a [`SendResult`](crate::record::SendResult) with
    /// `successful == false`.
    #[error("batch rejected by the log service: {code}: {message}")]
    Rejected { code: String, message: String },

    #[error("transport error: {0}")]
    Transport(String),
}

/// Errors surfaced by [`LogProducerSink`](crate::producer_sink::LogProducerSink)
/// to the host engine.
#[derive(thiserror::Error, Debug)]
pub enum SinkError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("log producer sink has not been opened yet")]
    NotOpened,

    /// A batch could not be handed to the producer. Fatal to the record path.
    #[error("error while sending logs: {0}")]
    Submit(#[source] ProducerError),

    #[error("failed to create log producer: {0}")]
    ProducerInit(#[source] ProducerError),
}
