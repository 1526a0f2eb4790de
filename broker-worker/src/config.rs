//! The worker process's configuration surface, loaded through
//! `broker_common::config` the same way `broker-service` does.

use broker_common::config::{load_config, TracingConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkerServiceConfig {
    pub tracing: TracingConfig,

    pub broker_url: String,
    /// `WorkerCategory` this worker advertises — the network it has
    /// (notionally) pre-loaded and the software version it was built at.
    pub network_id: String,
    pub software_version: String,

    pub max_tasks_requested: u32,
    pub single_point_capable: bool,

    /// The "~1s" poll sleep hint honored between polls that
    /// returned no work.
    #[serde(with = "humantime_serde")]
    pub poll_sleep: Duration,
}

impl Default for WorkerServiceConfig {
    fn default() -> Self {
        Self {
            tracing: TracingConfig::local_dev("broker_worker"),
            broker_url: "http://localhost:8080".to_string(),
            network_id: "default-network".to_string(),
            software_version: broker_common::VERSION.to_string(),
            max_tasks_requested: 16,
            single_point_capable: false,
            poll_sleep: Duration::from_secs(1),
        }
    }
}

pub fn load(path: impl AsRef<Path>) -> Result<WorkerServiceConfig, figment::Error> {
    load_config(path, "WORKER__")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_override_wins_when_no_file_is_present() {
        std::env::set_var("WORKERCFG__BROKER_URL", "http://example.invalid:9000");
        std::env::set_var("WORKERCFG__NETWORK_ID", "seattle-2024");
        std::env::set_var("WORKERCFG__SOFTWARE_VERSION", "1.2.3");
        std::env::set_var("WORKERCFG__MAX_TASKS_REQUESTED", "8");
        std::env::set_var("WORKERCFG__SINGLE_POINT_CAPABLE", "true");
        std::env::set_var("WORKERCFG__POLL_SLEEP", "1s");
        std::env::set_var("WORKERCFG__TRACING__FORMAT", "compact");
        std::env::set_var("WORKERCFG__TRACING__FILTER", "info");

        let config: WorkerServiceConfig =
            load_config("/nonexistent/worker.toml", "WORKERCFG__").expect("env-only config loads");
        assert_eq!(config.broker_url, "http://example.invalid:9000");
        assert_eq!(config.max_tasks_requested, 8);
        assert!(config.single_point_capable);

        for key in [
            "BROKER_URL",
            "NETWORK_ID",
            "SOFTWARE_VERSION",
            "MAX_TASKS_REQUESTED",
            "SINGLE_POINT_CAPABLE",
            "POLL_SLEEP",
            "TRACING__FORMAT",
            "TRACING__FILTER",
        ] {
            std::env::remove_var(format!("WORKERCFG__{key}"));
        }
    }
}
