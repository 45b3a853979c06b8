use crate::record::RawLogGroup;

/// Converts one stream element into the logs that should be shipped for it.
///
/// Returning `None`, or a group without logs, means the element produces
/// no batch at all.
pub trait LogSerializationSchema<T>: Send + Sync {
    fn serialize(&self, element: &T) -> Option<RawLogGroup>;
}

impl<T, F> LogSerializationSchema<T> for F
where
    F: Fn(&T) -> Option<RawLogGroup> + Send + Sync,
{
    fn serialize(&self, element: &T) -> Option<RawLogGroup> {
        self(element)
    }
}

#[cfg(feature = "json")]
pub use json::JsonLogSchema;

#[cfg(feature = "json")]
mod json {
    use super::LogSerializationSchema;
    use crate::record::{unix_seconds_now, RawLog, RawLogGroup};
    use serde::Serialize;
    use serde_json::Value;
    use std::marker::PhantomData;
    use tracing::warn;

    /// Field used for values that do not serialize to a JSON object.
    pub const CONTENT_FIELD: &str = "content";

    /// Flattens any `Serialize` element into a single log.
    ///
    /// Top-level object fields become log fields: strings are copied
    /// verbatim, nulls are skipped and every other value is rendered as
    /// compact JSON. Any other value is stored under [`CONTENT_FIELD`].
    pub struct JsonLogSchema<T> {
        topic: String,
        source: String,
        time_field: Option<String>,
        _element: PhantomData<fn(&T)>,
    }

    impl<T> JsonLogSchema<T> {
        pub fn new(topic: impl Into<String>, source: impl Into<String>) -> Self {
            Self {
                topic: topic.into(),
                source: source.into(),
                time_field: None,
                _element: PhantomData,
            }
        }

        /// Use an integer field (unix seconds) as the log time. The field is
        /// removed from the log contents; a value that is not a valid u32
        /// stays as an ordinary field.
        pub fn with_time_field(mut self, field: impl Into<String>) -> Self {
            self.time_field = Some(field.into());
            self
        }

        fn to_log(&self, value: Value) -> RawLog {
            let mut log = RawLog::new(unix_seconds_now());
            match value {
                Value::Object(mut map) => {
                    if let Some(field) = &self.time_field {
                        if let Some(time) = map
                            .get(field)
                            .and_then(Value::as_u64)
                            .and_then(|t| u32::try_from(t).ok())
                        {
                            log.time = time;
                            map.remove(field);
                        }
                    }
                    for (key, value) in map {
                        match value {
                            Value::Null => {}
                            Value::String(s) => {
                                log.contents.insert(key, s);
                            }
                            other => {
                                log.contents.insert(key, other.to_string());
                            }
                        }
                    }
                }
                Value::String(s) => {
                    log.contents.insert(CONTENT_FIELD.to_string(), s);
                }
                Value::Null => {}
                other => {
                    log.contents.insert(CONTENT_FIELD.to_string(), other.to_string());
                }
            }
            log
        }
    }

    impl<T: Serialize> LogSerializationSchema<T> for JsonLogSchema<T> {
        fn serialize(&self, element: &T) -> Option<RawLogGroup> {
            let value = match serde_json::to_value(element) {
                Ok(v) => v,
                Err(e) => {
                    warn!(error = %e, "failed to serialize element, skipping");
                    return None;
                }
            };
            let mut group = RawLogGroup::new(self.topic.clone(), self.source.clone());
            group.push(self.to_log(value));
            Some(group)
        }
    }

}
