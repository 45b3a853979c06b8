use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;

/// One log produced by a [`LogSerializationSchema`](crate::schema::LogSerializationSchema).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RawLog {
    /// Unix time in seconds.
    pub time: u32,
    pub contents: BTreeMap<String, String>,
}

impl RawLog {
    pub fn new(time: u32) -> Self {
        Self {
            time,
            contents: BTreeMap::new(),
        }
    }

    /// A log stamped with the current wall-clock time.
    pub fn now() -> Self {
        Self::new(unix_seconds_now())
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.contents.insert(key.into(), value.into());
        self
    }
}

/// Logs that share one topic and source and are shipped as one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RawLogGroup {
    pub logs: Vec<RawLog>,
    pub topic: String,
    pub source: String,
}

impl RawLogGroup {
    pub fn new(topic: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            logs: Vec::new(),
            topic: topic.into(),
            source: source.into(),
        }
    }

    pub fn push(&mut self, log: RawLog) {
        self.logs.push(log);
    }
}

/// Flattened entry handed to the producer: a timestamp and ordered fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogItem {
    pub time: u32,
    pub contents: Vec<(String, String)>,
}

impl LogItem {
    pub fn from_raw(raw: &RawLog) -> Self {
        Self {
            time: raw.time,
            contents: raw
                .contents
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}

/// A batch addressed to one project/logstore, ready for submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogRequest {
    pub project: String,
    pub logstore: String,
    pub topic: String,
    pub source: String,
    pub shard_hash_key: Option<String>,
    pub items: Vec<LogItem>,
}

impl LogRequest {
    /// Flatten every log of `group` into [`LogItem`]s, preserving order.
    pub fn items_from_group(group: &RawLogGroup) -> Vec<LogItem> {
        group.logs.iter().map(LogItem::from_raw).collect()
    }
}

/// Resolved outcome of a submitted batch as reported by the log service.
///
/// A resolved handle can still carry `successful == false` when the
/// service rejected the batch after the producer exhausted its retries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendResult {
    pub successful: bool,
    pub attempt_count: u32,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
}

impl SendResult {
    pub fn success(attempt_count: u32) -> Self {
        Self {
            successful: true,
            attempt_count,
            error_code: None,
            error_message: None,
        }
    }

    pub fn failure(
        attempt_count: u32,
        error_code: impl Into<String>,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            successful: false,
            attempt_count,
            error_code: Some(error_code.into()),
            error_message: Some(error_message.into()),
        }
    }
}

pub(crate) fn unix_seconds_now() -> u32 {
    u32::try_from(Utc::now().timestamp()).unwrap_or(0)
}
