//! The broker process's configuration surface, loaded through
//! `broker_common::config`, which layers a TOML file under
//! environment overrides.

use broker_common::config::{load_config, TracingConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BrokerServiceConfig {
    pub tracing: TracingConfig,
    pub http_port: u16,

    /// CLI/config surface.
    pub database_uri: String,
    pub database_name: String,
    pub offline: bool,
    pub max_workers: u32,
    pub test_task_redelivery: bool,

    /// The "~1s" poll sleep hint a worker should honor, surfaced
    /// as config rather than hardcoded in the worker.
    pub poll_sleep_hint_ms: u64,

    /// Tunable timeouts, made configurable rather than hardcoded.
    #[serde(with = "humantime_serde")]
    pub worker_liveness_window: Duration,
    #[serde(with = "humantime_serde")]
    pub worker_startup_cooldown: Duration,
    #[serde(with = "humantime_serde")]
    pub default_redelivery_timeout: Duration,

    /// Where the reference `MultiOriginAssembler`/`LocalFileStorage`
    /// implementations keep their working files.
    pub work_dir: PathBuf,
    pub storage_dir: PathBuf,
}

impl Default for BrokerServiceConfig {
    fn default() -> Self {
        Self {
            tracing: TracingConfig::local_dev("broker_service"),
            http_port: 8080,
            database_uri: String::new(),
            database_name: String::new(),
            offline: false,
            max_workers: 500,
            test_task_redelivery: false,
            poll_sleep_hint_ms: 1_000,
            worker_liveness_window: Duration::from_secs(60),
            worker_startup_cooldown: Duration::from_secs(60 * 60),
            default_redelivery_timeout: Duration::from_secs(5 * 60),
            work_dir: PathBuf::from("./data/broker-work"),
            storage_dir: PathBuf::from("./data/broker-storage"),
        }
    }
}

/// `database_uri`/`database_name` are logged but otherwise unused by the
/// in-memory reference implementation (external persistence is out of scope;
/// a real deployment would hand these to an external job-history store).
pub fn load(path: impl AsRef<Path>) -> Result<BrokerServiceConfig, figment::Error> {
    load_config(path, "BROKER__")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_override_wins_when_no_file_is_present() {
        std::env::set_var("BROKER__HTTP_PORT", "9123");
        std::env::set_var("BROKER__DATABASE_URI", "postgres://example");
        std::env::set_var("BROKER__DATABASE_NAME", "broker");
        std::env::set_var("BROKER__OFFLINE", "true");
        std::env::set_var("BROKER__MAX_WORKERS", "10");
        std::env::set_var("BROKER__TEST_TASK_REDELIVERY", "false");
        std::env::set_var("BROKER__POLL_SLEEP_HINT_MS", "1000");
        std::env::set_var("BROKER__WORKER_LIVENESS_WINDOW", "60s");
        std::env::set_var("BROKER__WORKER_STARTUP_COOLDOWN", "1h");
        std::env::set_var("BROKER__DEFAULT_REDELIVERY_TIMEOUT", "5m");
        std::env::set_var("BROKER__WORK_DIR", "/tmp/broker-work");
        std::env::set_var("BROKER__STORAGE_DIR", "/tmp/broker-storage");
        std::env::set_var("BROKER__TRACING__FORMAT", "compact");
        std::env::set_var("BROKER__TRACING__FILTER", "info");

        let config = load("/nonexistent/broker.toml").expect("env-only config loads");
        assert_eq!(config.http_port, 9123);
        assert!(config.offline);
        assert_eq!(config.max_workers, 10);

        for key in [
            "HTTP_PORT",
            "DATABASE_URI",
            "DATABASE_NAME",
            "OFFLINE",
            "MAX_WORKERS",
            "TEST_TASK_REDELIVERY",
            "POLL_SLEEP_HINT_MS",
            "WORKER_LIVENESS_WINDOW",
            "WORKER_STARTUP_COOLDOWN",
            "DEFAULT_REDELIVERY_TIMEOUT",
            "WORK_DIR",
            "STORAGE_DIR",
            "TRACING__FORMAT",
            "TRACING__FILTER",
        ] {
            std::env::remove_var(format!("BROKER__{key}"));
        }
    }
}
