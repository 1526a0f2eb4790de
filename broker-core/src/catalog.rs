//! `WorkerCatalog`: who's out there, grouped by network affinity,
//! with stale entries lazily swept on access rather than on a timer.

use crate::clock::Clock;
use broker_common::ids::{WorkerCategory, WorkerId};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

const DEFAULT_LIVENESS_WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct WorkerObservation {
    pub worker_id: WorkerId,
    pub category: WorkerCategory,
    pub last_seen: Instant,
    pub tasks_in_flight: u32,
    pub single_point_capable: bool,
}

/// Everything a poll reports about a worker (the `WorkerStatus` wire
/// shape, minus the HTTP envelope).
#[derive(Debug, Clone)]
pub struct WorkerStatus {
    pub worker_id: WorkerId,
    pub category: WorkerCategory,
    pub max_tasks_requested: u32,
    pub tasks_in_flight: u32,
    pub single_point_capable: bool,
}

struct CatalogState {
    observations: HashMap<WorkerId, WorkerObservation>,
    by_category: HashMap<WorkerCategory, Vec<WorkerId>>,
}

/// Independently lock-protected from the broker's own state: a
/// catalog access never blocks on, or is blocked by, job bookkeeping.
pub struct WorkerCatalog {
    state: Mutex<CatalogState>,
    liveness_window: Duration,
}

impl WorkerCatalog {
    pub fn new(liveness_window: Duration) -> Self {
        Self {
            state: Mutex::new(CatalogState {
                observations: HashMap::new(),
                by_category: HashMap::new(),
            }),
            liveness_window,
        }
    }

    /// Upserts an observation, stamping `now()`.
    pub fn catalog(&self, status: WorkerStatus, clock: &dyn Clock) {
        let now = clock.now();
        let mut state = self.state.lock().unwrap();
        sweep_stale(&mut state, now, self.liveness_window);

        let is_new = !state.observations.contains_key(&status.worker_id);
        state.observations.insert(
            status.worker_id,
            WorkerObservation {
                worker_id: status.worker_id,
                category: status.category.clone(),
                last_seen: now,
                tasks_in_flight: status.tasks_in_flight,
                single_point_capable: status.single_point_capable,
            },
        );
        if is_new {
            state
                .by_category
                .entry(status.category)
                .or_default()
                .push(status.worker_id);
        }
    }

    /// `activeWorkersPerJob()`: counts of fresh observations by category.
    pub fn active_workers_per_category(
        &self,
        clock: &dyn Clock,
    ) -> HashMap<WorkerCategory, u32> {
        let now = clock.now();
        let mut state = self.state.lock().unwrap();
        sweep_stale(&mut state, now, self.liveness_window);

        let mut counts = HashMap::new();
        for observation in state.observations.values() {
            *counts.entry(observation.category.clone()).or_insert(0u32) += 1;
        }
        counts
    }

    pub fn workers_in_category(&self, category: &WorkerCategory, clock: &dyn Clock) -> u32 {
        self.active_workers_per_category(clock)
            .get(category)
            .copied()
            .unwrap_or(0)
    }

    /// `noWorkersAvailable(category)`.
    pub fn no_workers_available(&self, category: &WorkerCategory, clock: &dyn Clock) -> bool {
        self.workers_in_category(category, clock) == 0
    }

    /// `getSinglePointWorkerAddressForCategory`: any fresh, capable
    /// worker's id in that category, or `None`.
    pub fn single_point_worker_for_category(
        &self,
        category: &WorkerCategory,
        clock: &dyn Clock,
    ) -> Option<WorkerId> {
        let now = clock.now();
        let mut state = self.state.lock().unwrap();
        sweep_stale(&mut state, now, self.liveness_window);

        state
            .by_category
            .get(category)?
            .iter()
            .filter_map(|id| state.observations.get(id))
            .find(|observation| observation.single_point_capable)
            .map(|observation| observation.worker_id)
    }
}

fn sweep_stale(state: &mut CatalogState, now: Instant, liveness_window: Duration) {
    let stale: Vec<WorkerId> = state
        .observations
        .iter()
        .filter(|(_, observation)| now.duration_since(observation.last_seen) > liveness_window)
        .map(|(id, _)| *id)
        .collect();

    for id in stale {
        if let Some(observation) = state.observations.remove(&id) {
            if let Some(ids) = state.by_category.get_mut(&observation.category) {
                ids.retain(|candidate| candidate != &id);
                if ids.is_empty() {
                    state.by_category.remove(&observation.category);
                }
            }
        }
    }
}

impl Default for WorkerCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_LIVENESS_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn status(id: WorkerId, category: WorkerCategory) -> WorkerStatus {
        WorkerStatus {
            worker_id: id,
            category,
            max_tasks_requested: 16,
            tasks_in_flight: 0,
            single_point_capable: false,
        }
    }

    #[test]
    fn fresh_observation_counts_toward_its_category() {
        let catalog = WorkerCatalog::default();
        let clock = ManualClock::new();
        let category = WorkerCategory::new("seattle", "1.0");
        catalog.catalog(status(WorkerId::new(), category.clone()), &clock);

        assert_eq!(catalog.workers_in_category(&category, &clock), 1);
        assert!(!catalog.no_workers_available(&category, &clock));
    }

    #[test]
    fn stale_observations_are_swept_on_access() {
        let catalog = WorkerCatalog::new(Duration::from_secs(60));
        let clock = ManualClock::new();
        let category = WorkerCategory::new("seattle", "1.0");
        catalog.catalog(status(WorkerId::new(), category.clone()), &clock);

        clock.advance(Duration::from_secs(61));
        assert!(catalog.no_workers_available(&category, &clock));
    }

    #[test]
    fn single_point_lookup_ignores_non_capable_workers() {
        let catalog = WorkerCatalog::default();
        let clock = ManualClock::new();
        let category = WorkerCategory::new("seattle", "1.0");
        let mut regular = status(WorkerId::new(), category.clone());
        regular.single_point_capable = false;
        let mut capable = status(WorkerId::new(), category.clone());
        capable.single_point_capable = true;

        catalog.catalog(regular, &clock);
        catalog.catalog(capable.clone(), &clock);

        assert_eq!(
            catalog.single_point_worker_for_category(&category, &clock),
            Some(capable.worker_id)
        );
    }
}
