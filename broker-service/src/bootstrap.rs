//! Wires a [`Broker`] from [`BrokerServiceConfig`], assembling its
//! trait-object collaborators from config before the HTTP layer ever
//! sees them.

use crate::config::BrokerServiceConfig;
use broker_common::events::TracingEventBus;
use broker_core::assembler::LocalFileStorage;
use broker_core::catalog::WorkerCatalog;
use broker_core::clock::SystemClock;
use broker_core::launcher::NoopWorkerLauncher;
use broker_core::{Broker, BrokerConfig};
use std::sync::Arc;

/// Builds the broker with the reference collaborator implementations
/// (`WorkerLauncher`/`FileStorage` are out-of-scope abstractions here; a
/// production deployment would inject a cloud-provisioning launcher and
/// an object-storage client instead).
pub fn build_broker(config: &BrokerServiceConfig) -> std::io::Result<Arc<Broker>> {
    std::fs::create_dir_all(&config.work_dir)?;
    std::fs::create_dir_all(&config.storage_dir)?;

    let broker_config = BrokerConfig {
        offline: config.offline,
        max_workers: config.max_workers,
        worker_startup_cooldown: config.worker_startup_cooldown,
    };

    Ok(Arc::new(Broker::new(
        broker_config,
        WorkerCatalog::new(config.worker_liveness_window),
        Arc::new(SystemClock),
        Arc::new(NoopWorkerLauncher),
        Arc::new(LocalFileStorage::new(config.storage_dir.clone())),
        Arc::new(TracingEventBus),
    )))
}
