//! `WorkerLauncher`: cloud VM provisioning is out of scope here; this
//! crate only depends on the abstraction.

use async_trait::async_trait;
use broker_common::ids::WorkerCategory;

#[async_trait]
pub trait WorkerLauncher: Send + Sync {
    /// Best-effort, fire-and-forget, never blocks the broker; no ack.
    async fn launch(
        &self,
        category: &WorkerCategory,
        tags: &[String],
        n_on_demand: u32,
        n_spot: u32,
    );
}

/// Used when running offline or in tests:
/// records what it would have launched instead of calling out.
#[derive(Default)]
pub struct NoopWorkerLauncher;

#[async_trait]
impl WorkerLauncher for NoopWorkerLauncher {
    async fn launch(
        &self,
        category: &WorkerCategory,
        _tags: &[String],
        n_on_demand: u32,
        n_spot: u32,
    ) {
        tracing::debug!(%category, n_on_demand, n_spot, "offline launcher: no-op");
    }
}
