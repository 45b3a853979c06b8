//! Helpers for configuring the sink from environment variables.
//!
//! Every option key in [`crate::config`] maps to one variable: the key
//! upper-cased with `.` and `-` replaced by `_`, e.g. `log.project`
//! becomes `LOG_PROJECT` and `log.producer.flush-timeout-ms` becomes
//! `LOG_PRODUCER_FLUSH_TIMEOUT_MS`. The sink itself never reads the
//! environment.

use crate::config::ALL_KEYS;
use std::collections::HashMap;

/// Environment variable name for a configuration key.
pub fn env_var_name(key: &str) -> String {
    key.chars()
        .map(|c| match c {
            '.' | '-' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect()
}

/// Collect every known option that is set in the environment.
pub fn properties_from_env() -> HashMap<String, String> {
    properties_from_lookup(|name| std::env::var(name).ok())
}

/// Same as [`properties_from_env`] but with a custom variable lookup.
pub fn properties_from_lookup<F>(lookup: F) -> HashMap<String, String>
where
    F: Fn(&str) -> Option<String>,
{
    ALL_KEYS
        .iter()
        .filter_map(|key| lookup(&env_var_name(key)).map(|v| (key.to_string(), v)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FLUSH_TIMEOUT_MS, LOG_ACCESS_KEY_ID, LOG_PROJECT};

    #[test]
    fn keys_map_to_upper_snake_case() {
        assert_eq!(env_var_name(LOG_PROJECT), "LOG_PROJECT");
        assert_eq!(env_var_name(LOG_ACCESS_KEY_ID), "LOG_ACCESS_KEY_ID");
        assert_eq!(env_var_name(FLUSH_TIMEOUT_MS), "LOG_PRODUCER_FLUSH_TIMEOUT_MS");
    }

    #[test]
    fn only_known_and_set_variables_are_collected() {
        let props = properties_from_lookup(|name| match name {
            "LOG_PROJECT" => Some("demo".to_string()),
            "LOG_PRODUCER_FLUSH_TIMEOUT_MS" => Some("250".to_string()),
            "UNRELATED" => Some("x".to_string()),
            _ => None,
        });
        assert_eq!(props.len(), 2);
        assert_eq!(props[LOG_PROJECT], "demo");
        assert_eq!(props[FLUSH_TIMEOUT_MS], "250");
    }
}
