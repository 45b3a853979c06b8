use crate::barrier::DEFAULT_POLL_INTERVAL;
use crate::error::ConfigError;
use crate::producer::{ProducerConfig, ProjectConfig};
use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;
use tokio::time::Duration;

pub const LOG_PROJECT: &str = "log.project";
pub const LOG_LOGSTORE: &str = "log.logstore";
pub const LOG_ENDPOINT: &str = "log.endpoint";
pub const LOG_ACCESS_KEY_ID: &str = "log.access-key-id";
pub const LOG_ACCESS_KEY: &str = "log.access-key";

/// Producer linger time before a partial batch is sent.
pub const FLUSH_INTERVAL_MS: &str = "log.producer.linger-ms";
pub const MAX_RETRIES: &str = "log.producer.max-retries";
pub const BASE_RETRY_BACKOFF_MS: &str = "log.producer.base-retry-backoff-ms";
pub const MAX_RETRY_BACKOFF_MS: &str = "log.producer.max-retry-backoff-ms";
/// How long `send` may wait for buffer space.
pub const MAX_BLOCK_MS: &str = "log.producer.max-block-ms";
pub const IO_THREAD_COUNT: &str = "log.producer.io-thread-count";
pub const BUCKETS: &str = "log.producer.buckets";
pub const TOTAL_SIZE_IN_BYTES: &str = "log.producer.total-size-in-bytes";
pub const ADJUST_SHARD_HASH: &str = "log.producer.adjust-shard-hash";
/// Upper bound for the checkpoint wait on outstanding batches.
pub const FLUSH_TIMEOUT_MS: &str = "log.producer.flush-timeout-ms";

/// Every option understood by [`SinkConfig::from_properties`].
pub const ALL_KEYS: &[&str] = &[
    LOG_PROJECT,
    LOG_LOGSTORE,
    LOG_ENDPOINT,
    LOG_ACCESS_KEY_ID,
    LOG_ACCESS_KEY,
    FLUSH_INTERVAL_MS,
    MAX_RETRIES,
    BASE_RETRY_BACKOFF_MS,
    MAX_RETRY_BACKOFF_MS,
    MAX_BLOCK_MS,
    IO_THREAD_COUNT,
    BUCKETS,
    TOTAL_SIZE_IN_BYTES,
    ADJUST_SHARD_HASH,
    FLUSH_TIMEOUT_MS,
];

pub const DEFAULT_FLUSH_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(3);

/// Typed lookups over a flat string property map.
pub struct ConfigParser<'a> {
    props: &'a HashMap<String, String>,
}

impl<'a> ConfigParser<'a> {
    pub fn new(props: &'a HashMap<String, String>) -> Self {
        Self { props }
    }

    /// Value for `key`, with surrounding whitespace removed. Blank counts as absent.
    pub fn get(&self, key: &str) -> Option<&'a str> {
        self.props
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn require_string(&self, key: &str) -> Result<String, ConfigError> {
        self.get(key)
            .map(str::to_string)
            .ok_or_else(|| ConfigError::Missing(key.to_string()))
    }

    pub fn parse_or<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.get(key) {
            Some(raw) => raw.parse::<T>().map_err(|e| ConfigError::Invalid {
                key: key.to_string(),
                value: raw.to_string(),
                reason: e.to_string(),
            }),
            None => Ok(default),
        }
    }

    /// Accepts `true`/`false` in any case.
    pub fn bool_or(&self, key: &str, default: bool) -> Result<bool, ConfigError> {
        match self.get(key) {
            Some(raw) if raw.eq_ignore_ascii_case("true") => Ok(true),
            Some(raw) if raw.eq_ignore_ascii_case("false") => Ok(false),
            Some(raw) => Err(ConfigError::Invalid {
                key: key.to_string(),
                value: raw.to_string(),
                reason: "expected `true` or `false`".to_string(),
            }),
            None => Ok(default),
        }
    }
}

/// Fully parsed sink configuration.
#[derive(Clone, Debug)]
pub struct SinkConfig {
    pub logstore: String,
    pub project: ProjectConfig,
    pub producer: ProducerConfig,
    /// How long a checkpoint waits for outstanding batches.
    pub flush_timeout: Duration,
    pub poll_interval: Duration,
    /// Grace window for each shutdown phase of the callback worker.
    pub shutdown_grace: Duration,
}

impl SinkConfig {
    /// Parse the property map, failing on the first missing or invalid option.
    pub fn from_properties(props: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let parser = ConfigParser::new(props);

        let project = ProjectConfig {
            project: parser.require_string(LOG_PROJECT)?,
            endpoint: parser.require_string(LOG_ENDPOINT)?,
            access_key_id: parser.require_string(LOG_ACCESS_KEY_ID)?,
            access_key: parser.require_string(LOG_ACCESS_KEY)?,
        };
        let logstore = parser.require_string(LOG_LOGSTORE)?;

        let producer = ProducerConfig {
            linger_ms: parser.parse_or(FLUSH_INTERVAL_MS, ProducerConfig::DEFAULT_LINGER_MS)?,
            retries: parser.parse_or(MAX_RETRIES, ProducerConfig::DEFAULT_RETRIES)?,
            base_retry_backoff_ms: parser.parse_or(
                BASE_RETRY_BACKOFF_MS,
                ProducerConfig::DEFAULT_BASE_RETRY_BACKOFF_MS,
            )?,
            max_retry_backoff_ms: parser.parse_or(
                MAX_RETRY_BACKOFF_MS,
                ProducerConfig::DEFAULT_MAX_RETRY_BACKOFF_MS,
            )?,
            max_block_ms: parser.parse_or(MAX_BLOCK_MS, ProducerConfig::DEFAULT_MAX_BLOCK_MS)?,
            io_thread_count: parser
                .parse_or(IO_THREAD_COUNT, ProducerConfig::default_io_thread_count())?,
            buckets: parser.parse_or(BUCKETS, ProducerConfig::DEFAULT_BUCKETS)?,
            total_size_in_bytes: parser.parse_or(
                TOTAL_SIZE_IN_BYTES,
                ProducerConfig::DEFAULT_TOTAL_SIZE_IN_BYTES,
            )?,
            adjust_shard_hash: parser.bool_or(ADJUST_SHARD_HASH, true)?,
        };

        if producer.base_retry_backoff_ms > producer.max_retry_backoff_ms {
            return Err(ConfigError::Invalid {
                key: BASE_RETRY_BACKOFF_MS.to_string(),
                value: producer.base_retry_backoff_ms.to_string(),
                reason: format!(
                    "must not exceed {MAX_RETRY_BACKOFF_MS} ({})",
                    producer.max_retry_backoff_ms
                ),
            });
        }
        if producer.io_thread_count == 0 {
            return Err(ConfigError::Invalid {
                key: IO_THREAD_COUNT.to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let flush_timeout_ms = parser.parse_or(FLUSH_TIMEOUT_MS, DEFAULT_FLUSH_TIMEOUT_MS)?;

        Ok(Self {
            logstore,
            project,
            producer,
            flush_timeout: Duration::from_millis(flush_timeout_ms),
            poll_interval: DEFAULT_POLL_INTERVAL,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        })
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_shutdown_grace(mut self, shutdown_grace: Duration) -> Self {
        self.shutdown_grace = shutdown_grace;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn required() -> HashMap<String, String> {
        [
            (LOG_PROJECT, "demo-project"),
            (LOG_LOGSTORE, "app-logs"),
            (LOG_ENDPOINT, "cn-hangzhou.log.example.com"),
            (LOG_ACCESS_KEY_ID, "id"),
            (LOG_ACCESS_KEY, "secret"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn defaults_apply_when_options_are_absent() {
        let cfg = SinkConfig::from_properties(&required()).unwrap();
        assert_eq!(cfg.logstore, "app-logs");
        assert_eq!(cfg.project.project, "demo-project");
        assert_eq!(cfg.producer.linger_ms, 2_000);
        assert_eq!(cfg.producer.retries, 10);
        assert_eq!(cfg.producer.total_size_in_bytes, 100 * 1024 * 1024);
        assert!(cfg.producer.adjust_shard_hash);
        assert!(cfg.producer.io_thread_count >= 1);
        assert_eq!(cfg.flush_timeout, Duration::from_millis(10_000));
        assert_eq!(cfg.poll_interval, Duration::from_millis(100));
        assert_eq!(cfg.shutdown_grace, Duration::from_secs(3));
    }

    #[test]
    fn explicit_options_override_defaults() {
        let mut props = required();
        props.insert(FLUSH_TIMEOUT_MS.into(), "500".into());
        props.insert(MAX_RETRIES.into(), " 3 ".into());
        props.insert(ADJUST_SHARD_HASH.into(), "FALSE".into());
        props.insert(IO_THREAD_COUNT.into(), "2".into());

        let cfg = SinkConfig::from_properties(&props).unwrap();
        assert_eq!(cfg.flush_timeout, Duration::from_millis(500));
        assert_eq!(cfg.producer.retries, 3);
        assert!(!cfg.producer.adjust_shard_hash);
        assert_eq!(cfg.producer.io_thread_count, 2);
    }

    #[test]
    fn missing_required_option_fails_fast() {
        let mut props = required();
        props.remove(LOG_LOGSTORE);
        assert_eq!(
            SinkConfig::from_properties(&props).unwrap_err(),
            ConfigError::Missing(LOG_LOGSTORE.to_string())
        );

        let mut props = required();
        props.insert(LOG_ENDPOINT.into(), "   ".into());
        assert_eq!(
            SinkConfig::from_properties(&props).unwrap_err(),
            ConfigError::Missing(LOG_ENDPOINT.to_string())
        );
    }

    #[test]
    fn unparsable_values_are_rejected() {
        let mut props = required();
        props.insert(MAX_BLOCK_MS.into(), "soon".into());
        assert!(matches!(
            SinkConfig::from_properties(&props),
            Err(ConfigError::Invalid { key, .. }) if key == MAX_BLOCK_MS
        ));

        let mut props = required();
        props.insert(ADJUST_SHARD_HASH.into(), "yes".into());
        assert!(matches!(
            SinkConfig::from_properties(&props),
            Err(ConfigError::Invalid { key, .. }) if key == ADJUST_SHARD_HASH
        ));
    }

    #[test]
    fn backoff_bounds_must_be_ordered() {
        let mut props = required();
        props.insert(BASE_RETRY_BACKOFF_MS.into(), "5000".into());
        props.insert(MAX_RETRY_BACKOFF_MS.into(), "1000".into());
        assert!(matches!(
            SinkConfig::from_properties(&props),
            Err(ConfigError::Invalid { key, .. }) if key == BASE_RETRY_BACKOFF_MS
        ));
    }
}
