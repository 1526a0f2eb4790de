//! The broker-to-worker wire shape (`RegionalTask` row, `POST
//! /poll` response): just enough to let a worker run its own (out of
//! scope) street routing and RAPTOR before ever touching the propagator.

use broker_common::ids::{JobId, TaskId};
use broker_propagator::TaskTemplate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OriginCoordinates {
    pub lat: f64,
    pub lon: f64,
}

/// One unit of dispatched work. Created lazily when delivered — the
/// broker never materializes one until a poll asks for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionalTask {
    pub job_id: JobId,
    pub task_id: TaskId,
    pub origin: OriginCoordinates,
    pub template: TaskTemplate,
}

/// `WorkerStatus` request body for `POST /poll`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PollRequest {
    pub worker_id: broker_common::ids::WorkerId,
    pub category: broker_common::ids::WorkerCategory,
    pub max_tasks_requested: u32,
    pub tasks_in_flight: u32,
    pub single_point_capable: bool,
}
