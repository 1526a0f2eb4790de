//! Error kinds, one variant per distinct failure mode the broker
//! must recognize. Nothing in [`crate::broker::Broker::handle_regional_work_result`]
//! is allowed to propagate a panic; every fallible step returns one of
//! these instead.

use broker_common::ids::JobId;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BrokerError {
    /// Result (or deletion/lookup) for a job that is gone or never
    /// existed. Silently discarded by callers; not logged as a failure.
    #[error("job {0} is unknown")]
    UnknownJob(JobId),

    /// The worker attached a non-null error to its result.
    #[error("worker reported error for job {job_id} task {task_id}: {message}")]
    WorkerReportedError {
        job_id: JobId,
        task_id: u32,
        message: String,
    },

    /// Shape mismatch: wrong percentile count or destination count.
    #[error("malformed result for job {job_id} task {task_id}: {reason}")]
    MalformedResult {
        job_id: JobId,
        task_id: u32,
        reason: String,
    },

    /// The assembler failed to write to disk.
    #[error("assembler I/O error for job {job_id}: {reason}")]
    AssemblerIoError { job_id: JobId, reason: String },

    /// Autoscale path: no capacity to launch more workers.
    #[error("capacity exceeded for category, no workers launched")]
    CapacityExceeded,

    /// Autoscale path: a launch request for this category is already
    /// in flight. Not an error, a no-op.
    #[error("worker launch cooldown active for category")]
    CooldownActive,

    /// The job already exists (`enqueueRegionalJob` contract).
    #[error("job {0} already exists")]
    JobAlreadyExists(JobId),
}
