//! Worker configuration, read from `CUBE_*` environment variables.

use std::{str::FromStr, time::Duration};

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq)]
pub struct WorkerConfig {
    /// Name used to identify the worker in logs.
    pub name: String,
    /// Address the monitoring API binds to.
    pub address: String,
    pub port: u16,
    /// How long the dispatch loop waits when its queue is empty.
    pub dispatch_interval: Duration,
    /// Period of the host statistics log line.
    pub stats_interval: Duration,
    /// Enqueue a demo task at startup, standing in for a manager.
    pub demo_task: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            name: "worker-1".to_string(),
            address: "127.0.0.1".to_string(),
            port: 5556,
            dispatch_interval: Duration::from_secs(5),
            stats_interval: Duration::from_secs(15),
            demo_task: false,
        }
    }
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from `lookup`, falling back to defaults for unset keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Ok(Self {
            name: lookup("CUBE_WORKER_NAME").unwrap_or(defaults.name),
            address: lookup("CUBE_WORKER_ADDR").unwrap_or(defaults.address),
            port: parse(&lookup, "CUBE_WORKER_PORT")?.unwrap_or(defaults.port),
            dispatch_interval: parse(&lookup, "CUBE_DISPATCH_INTERVAL_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.dispatch_interval),
            stats_interval: parse(&lookup, "CUBE_STATS_INTERVAL_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.stats_interval),
            demo_task: parse(&lookup, "CUBE_DEMO_TASK")?.unwrap_or(defaults.demo_task),
        })
    }
}

fn parse<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| {
            raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("{raw:?}: {e}"),
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn unset_keys_use_defaults() {
        let config = WorkerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, WorkerConfig::default());
    }

    #[test]
    fn reads_overrides() {
        let config = WorkerConfig::from_lookup(lookup(&[
            ("CUBE_WORKER_NAME", "edge-7"),
            ("CUBE_WORKER_PORT", "8080"),
            ("CUBE_DISPATCH_INTERVAL_SECS", " 1 "),
            ("CUBE_DEMO_TASK", "true"),
        ]))
        .unwrap();

        assert_eq!(config.name, "edge-7");
        assert_eq!(config.port, 8080);
        assert_eq!(config.dispatch_interval, Duration::from_secs(1));
        assert_eq!(config.stats_interval, Duration::from_secs(15));
        assert!(config.demo_task);
    }

    #[test]
    fn rejects_bad_numbers() {
        let err = WorkerConfig::from_lookup(lookup(&[("CUBE_WORKER_PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "CUBE_WORKER_PORT"));
    }
}
