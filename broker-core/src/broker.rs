//! `Broker`: the central scheduler. Owns the job multimap, the
//! assembler map, and the worker-request cooldown map behind a single
//! lock; delegates worker bookkeeping to [`crate::catalog::WorkerCatalog`],
//! which is independently synchronized.

use crate::assembler::{FileStorage, MultiOriginAssembler};
use crate::catalog::{WorkerCatalog, WorkerStatus};
use crate::clock::Clock;
use crate::dispatch::RegionalTask;
use crate::error::BrokerError;
use crate::job::Job;
use crate::launcher::WorkerLauncher;
use broker_common::events::{BrokerEvent, EventBus, RegionalAnalysisEvent, WorkerEvent, WorkerRole};
use broker_common::ids::{JobId, WorkerCategory};
use broker_propagator::RegionalWorkResult;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// `min(maxRequested, MAX_TASKS_PER_WORKER)` per poll.
pub const MAX_TASKS_PER_WORKER: u32 = 16;
/// The early-milestone task whose completion triggers the autoscale
/// decision for a job.
pub const AUTO_START_SPOT_INSTANCES_AT_TASK: u32 = 42;
const TARGET_TASKS_PER_WORKER_TRANSIT: u32 = 800;
const TARGET_TASKS_PER_WORKER_NONTRANSIT: u32 = 4000;
const MAX_WORKERS_PER_CATEGORY: u32 = 250;
const ORIGIN_POINT_SET_WORKER_CAP: u32 = 80;
const PATH_RESULTS_WORKER_CAP: u32 = 20;
/// "WORKER_STARTUP_TIME": one pending launch request per category.
pub const DEFAULT_WORKER_STARTUP_COOLDOWN: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub offline: bool,
    pub max_workers: u32,
    pub worker_startup_cooldown: Duration,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            offline: false,
            max_workers: 500,
            worker_startup_cooldown: DEFAULT_WORKER_STARTUP_COOLDOWN,
        }
    }
}

/// Read-only snapshot for job listing/admin surfaces: a status view
/// alongside `getAllJobStatuses`, `findJob`, `anyJobsActive`.
#[derive(Debug, Clone, PartialEq)]
pub struct JobStatus {
    pub job_id: JobId,
    pub category: WorkerCategory,
    pub n_tasks_total: u32,
    pub n_delivered: u32,
    pub n_completed: u32,
    pub errors: Vec<String>,
    pub active: bool,
    pub errored: bool,
    pub complete: bool,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
}

impl From<&Job> for JobStatus {
    fn from(job: &Job) -> Self {
        Self {
            job_id: job.job_id,
            category: job.category.clone(),
            n_tasks_total: job.n_tasks_total,
            n_delivered: job.delivered_count() as u32,
            n_completed: job.completed_count() as u32,
            errors: job.errors().to_vec(),
            active: job.is_active(),
            errored: job.is_errored(),
            complete: job.is_complete(),
            submitted_at: job.submitted_at,
        }
    }
}

/// Outcome of a `create_workers_in_category` call (the independent
/// rules, each a distinct error kind or a genuine launch).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutoscaleOutcome {
    Launched { on_demand: u32, spot: u32 },
    Offline,
    Rejected,
    CapacityExceeded,
    CooldownActive,
}

struct BrokerState {
    jobs: HashMap<JobId, Job>,
    assemblers: HashMap<JobId, Arc<MultiOriginAssembler>>,
    /// The category multimap: which jobs a category's workers
    /// may be handed tasks from. Insertion order is preserved so
    /// `get_some_work` is deterministic rather than hash-order dependent.
    jobs_by_category: HashMap<WorkerCategory, Vec<JobId>>,
    recently_requested_workers: HashMap<WorkerCategory, std::time::Instant>,
}

pub struct Broker {
    state: Mutex<BrokerState>,
    catalog: WorkerCatalog,
    clock: Arc<dyn Clock>,
    launcher: Arc<dyn WorkerLauncher>,
    storage: Arc<dyn FileStorage>,
    events: Arc<dyn EventBus>,
    config: BrokerConfig,
}

impl Broker {
    pub fn new(
        config: BrokerConfig,
        catalog: WorkerCatalog,
        clock: Arc<dyn Clock>,
        launcher: Arc<dyn WorkerLauncher>,
        storage: Arc<dyn FileStorage>,
        events: Arc<dyn EventBus>,
    ) -> Self {
        Self {
            state: Mutex::new(BrokerState {
                jobs: HashMap::new(),
                assemblers: HashMap::new(),
                jobs_by_category: HashMap::new(),
                recently_requested_workers: HashMap::new(),
            }),
            catalog,
            clock,
            launcher,
            storage,
            events,
            config,
        }
    }

    pub fn catalog(&self) -> &WorkerCatalog {
        &self.catalog
    }

    /// Registers the job, fires `STARTED`, and launches one
    /// on-demand worker if the category currently has none. Fails if
    /// `job_id` is already present.
    pub async fn enqueue_regional_job(
        &self,
        job: Job,
        assembler: MultiOriginAssembler,
    ) -> Result<(), BrokerError> {
        let job_id = job.job_id;
        let category = job.category.clone();
        let tags = job.worker_tags.clone();

        {
            let mut state = self.state.lock().unwrap();
            if state.jobs.contains_key(&job_id) {
                return Err(BrokerError::JobAlreadyExists(job_id));
            }
            state.jobs.insert(job_id, job);
            state.assemblers.insert(job_id, Arc::new(assembler));
            state
                .jobs_by_category
                .entry(category.clone())
                .or_default()
                .push(job_id);
        }

        self.events.send(BrokerEvent::Regional {
            job_id,
            category: category.clone(),
            event: RegionalAnalysisEvent::Started,
        });

        if self.catalog.no_workers_available(&category, &*self.clock) {
            self.create_workers_in_category(&category, &tags, 1, 0).await;
        }

        Ok(())
    }

    /// Hands out up to `min(max_requested, MAX_TASKS_PER_WORKER)` tasks from
    /// an active job matching `category` (or, offline, from any active
    /// job), undelivered tasks and overdue redeliveries first.
    pub fn get_some_work(&self, category: &WorkerCategory, max_requested: u32) -> Vec<RegionalTask> {
        let now = self.clock.now();
        let k = max_requested.min(MAX_TASKS_PER_WORKER);
        if k == 0 {
            return Vec::new();
        }

        let mut state = self.state.lock().unwrap();
        let offline = self.config.offline;
        let candidate_job_ids: Vec<JobId> = if offline {
            state.jobs.keys().copied().collect()
        } else {
            state
                .jobs_by_category
                .get(category)
                .cloned()
                .unwrap_or_default()
        };

        let mut tasks = Vec::new();
        let mut remaining = k;
        for job_id in candidate_job_ids {
            if remaining == 0 {
                break;
            }
            let Some(job) = state.jobs.get_mut(&job_id) else {
                continue;
            };
            if !job.is_active() || !job.has_tasks_to_deliver(now) {
                continue;
            }
            for task_id in job.generate_some_tasks_to_deliver(remaining, now) {
                tasks.push(RegionalTask {
                    job_id,
                    task_id,
                    origin: job.origins[task_id as usize],
                    template: job.template.clone(),
                });
            }
            remaining = k - tasks.len() as u32;
        }
        tasks
    }

    /// Looks up job & assembler under the broker lock, marks
    /// completion there (so the final-completion observation can't race
    /// the assembler's finalize), then do the slow I/O and autoscale
    /// work outside the critical section.
    pub async fn handle_regional_work_result(
        &self,
        result: RegionalWorkResult,
    ) -> Result<(), BrokerError> {
        let job_id = result.job_id;
        let task_id = result.task_id;

        struct Accepted {
            assembler: Arc<MultiOriginAssembler>,
            final_candidate: bool,
            autoscale: Option<AutoscaleInputs>,
        }

        let accepted = {
            let mut state = self.state.lock().unwrap();
            let Some(job) = state.jobs.get_mut(&job_id) else {
                return Err(BrokerError::UnknownJob(job_id));
            };
            if !job.is_active() {
                return Err(BrokerError::UnknownJob(job_id));
            }

            if let Some(message) = &result.error {
                job.append_error(format!("task {task_id}: {message}"));
                return Err(BrokerError::WorkerReportedError {
                    job_id,
                    task_id,
                    message: message.clone(),
                });
            }

            let transitioned = job.mark_task_completed(task_id);
            let final_candidate = transitioned && job.is_complete();
            let autoscale = (transitioned && task_id == AUTO_START_SPOT_INSTANCES_AT_TASK)
                .then(|| AutoscaleInputs::from_job(job));

            let Some(assembler) = state.assemblers.get(&job_id).cloned() else {
                return Err(BrokerError::UnknownJob(job_id));
            };

            Accepted {
                assembler,
                final_candidate,
                autoscale,
            }
        };

        if let Err(err) = accepted.assembler.handle_message(&result) {
            let mut state = self.state.lock().unwrap();
            if let Some(job) = state.jobs.get_mut(&job_id) {
                job.append_error(err.to_string());
            }
            return Err(err);
        }

        if accepted.final_candidate {
            self.finalize_job(job_id, &accepted.assembler).await?;
        }

        if let Some(inputs) = accepted.autoscale {
            self.autoscale_job(inputs).await;
        }

        Ok(())
    }

    async fn finalize_job(
        &self,
        job_id: JobId,
        assembler: &MultiOriginAssembler,
    ) -> Result<(), BrokerError> {
        let files = assembler.finalize().map_err(|err| BrokerError::AssemblerIoError {
            job_id,
            reason: err.to_string(),
        })?;

        for (key, path) in &files {
            if let Err(reason) = self.storage.move_into_storage(key, path).await {
                let mut state = self.state.lock().unwrap();
                if let Some(job) = state.jobs.get_mut(&job_id) {
                    job.append_error(reason.clone());
                }
                return Err(BrokerError::AssemblerIoError { job_id, reason });
            }
        }

        let category = {
            let mut state = self.state.lock().unwrap();
            let category = state.jobs.get(&job_id).map(|job| job.category.clone());
            state.jobs.remove(&job_id);
            state.assemblers.remove(&job_id);
            if let Some(category) = &category {
                if let Some(ids) = state.jobs_by_category.get_mut(category) {
                    ids.retain(|id| id != &job_id);
                }
            }
            category
        };

        if let Some(category) = category {
            self.events.send(BrokerEvent::Regional {
                job_id,
                category,
                event: RegionalAnalysisEvent::Completed,
            });
        }
        Ok(())
    }

    async fn autoscale_job(&self, inputs: AutoscaleInputs) {
        let target = compute_target_workers(
            inputs.n_tasks_total,
            inputs.has_transit,
            inputs.zoom,
            inputs.origin_point_set,
            inputs.include_path_results,
        );
        let current = self.catalog.workers_in_category(&inputs.category, &*self.clock);
        let deficit = target as i64 - current as i64;
        if deficit > 0 {
            self.create_workers_in_category(&inputs.category, &inputs.worker_tags, 0, deficit)
                .await;
        }
    }

    /// The independent rules applied on every launch request,
    /// shared by the initial-worker path and the autoscale path.
    pub async fn create_workers_in_category(
        &self,
        category: &WorkerCategory,
        tags: &[String],
        n_on_demand: i64,
        n_spot: i64,
    ) -> AutoscaleOutcome {
        if self.config.offline {
            return AutoscaleOutcome::Offline;
        }
        if n_on_demand < 0 || n_spot < 0 {
            return AutoscaleOutcome::Rejected;
        }

        let now = self.clock.now();
        let current_total: u32 = self
            .catalog
            .active_workers_per_category(&*self.clock)
            .values()
            .sum();

        // Zeno's guard: never let one launch request close more than
        // half the remaining gap to the hard cap.
        let max_to_start = self.config.max_workers.saturating_sub(current_total) / 2;
        if max_to_start == 0 {
            return AutoscaleOutcome::CapacityExceeded;
        }

        let mut on_demand = n_on_demand as u32;
        let mut spot = n_spot as u32;
        if on_demand + spot > max_to_start {
            spot = max_to_start;
            on_demand = 0;
        }

        // Hard cap backstop, independent of the guard above.
        let headroom = self.config.max_workers.saturating_sub(current_total);
        if on_demand + spot > headroom {
            spot = headroom.saturating_sub(on_demand);
        }

        {
            let mut state = self.state.lock().unwrap();
            if let Some(&requested_at) = state.recently_requested_workers.get(category) {
                if now.duration_since(requested_at) < self.config.worker_startup_cooldown {
                    return AutoscaleOutcome::CooldownActive;
                }
            }
            state
                .recently_requested_workers
                .insert(category.clone(), now);
        }

        self.launcher.launch(category, tags, on_demand, spot).await;
        if on_demand > 0 {
            self.events.send(BrokerEvent::Worker {
                category: category.clone(),
                event: WorkerEvent::Requested {
                    role: WorkerRole::OnDemand,
                    count: on_demand,
                },
            });
        }
        if spot > 0 {
            self.events.send(BrokerEvent::Worker {
                category: category.clone(),
                event: WorkerEvent::Requested {
                    role: WorkerRole::Spot,
                    count: spot,
                },
            });
        }
        AutoscaleOutcome::Launched { on_demand, spot }
    }

    pub fn record_worker_observation(&self, status: WorkerStatus) {
        self.catalog.catalog(status, &*self.clock);
    }

    /// Removes the job, terminates its assembler
    /// (releasing temporary files), fires `CANCELED`.
    pub fn delete_job(&self, job_id: JobId) -> Result<(), BrokerError> {
        let (category, assembler) = {
            let mut state = self.state.lock().unwrap();
            let job = state.jobs.remove(&job_id).ok_or(BrokerError::UnknownJob(job_id))?;
            let assembler = state.assemblers.remove(&job_id);
            if let Some(ids) = state.jobs_by_category.get_mut(&job.category) {
                ids.retain(|id| id != &job_id);
            }
            (job.category, assembler)
        };

        if let Some(assembler) = assembler {
            assembler.terminate();
        }
        self.events.send(BrokerEvent::Regional {
            job_id,
            category,
            event: RegionalAnalysisEvent::Canceled,
        });
        Ok(())
    }

    pub fn get_all_job_statuses(&self) -> Vec<JobStatus> {
        self.state
            .lock()
            .unwrap()
            .jobs
            .values()
            .map(JobStatus::from)
            .collect()
    }

    pub fn find_job(&self, job_id: JobId) -> Option<JobStatus> {
        self.state.lock().unwrap().jobs.get(&job_id).map(JobStatus::from)
    }

    pub fn any_jobs_active(&self) -> bool {
        self.state.lock().unwrap().jobs.values().any(Job::is_active)
    }
}

struct AutoscaleInputs {
    category: WorkerCategory,
    worker_tags: Vec<String>,
    n_tasks_total: u32,
    has_transit: bool,
    zoom: u32,
    origin_point_set: bool,
    include_path_results: bool,
}

impl AutoscaleInputs {
    fn from_job(job: &Job) -> Self {
        Self {
            category: job.category.clone(),
            worker_tags: job.worker_tags.clone(),
            n_tasks_total: job.n_tasks_total,
            has_transit: job.has_transit,
            zoom: job.zoom,
            origin_point_set: job.origin_point_set,
            include_path_results: job.include_path_results,
        }
    }
}

/// The autoscale target formula, in integer arithmetic throughout
/// (small jobs legitimately target zero additional
/// workers and proceed on whatever is already available).
fn compute_target_workers(
    n_tasks_total: u32,
    has_transit: bool,
    zoom: u32,
    origin_point_set: bool,
    include_path_results: bool,
) -> u32 {
    let mut target = if has_transit {
        (n_tasks_total / TARGET_TASKS_PER_WORKER_TRANSIT) * (9 / zoom.max(1))
    } else {
        n_tasks_total / TARGET_TASKS_PER_WORKER_NONTRANSIT
    };
    target = target.min(MAX_WORKERS_PER_CATEGORY);
    if origin_point_set {
        target = target.min(ORIGIN_POINT_SET_WORKER_CAP);
    }
    if include_path_results {
        target = target.min(PATH_RESULTS_WORKER_CAP);
    }
    target
}
