//! Admin/UI surface for submitting and managing regional jobs. Not part
//! of the worker-facing contract, but the only way a job enters the
//! broker for workers to poll for, plus listing and deletion: an
//! errored job remains listable until an operator explicitly deletes it.

use crate::api::ApiTags;
use crate::error::ApiError;
use crate::config::BrokerServiceConfig;
use crate::model::{ErrorBody, JobStatusDto, SubmitJobDto, SubmitJobResponseDto};
use broker_common::ids::JobId;
use broker_core::{Broker, Job, MultiOriginAssembler};
use poem_openapi::param::Path;
use poem_openapi::payload::Json;
use poem_openapi::{ApiResponse, OpenApi};
use std::str::FromStr;
use std::sync::Arc;

pub struct JobsApi {
    broker: Arc<Broker>,
    work_dir: std::path::PathBuf,
    redelivery_timeout: std::time::Duration,
}

impl JobsApi {
    pub fn new(broker: Arc<Broker>, config: &BrokerServiceConfig) -> Self {
        Self {
            broker,
            work_dir: config.work_dir.clone(),
            redelivery_timeout: config.default_redelivery_timeout,
        }
    }
}

#[derive(ApiResponse, Debug, Clone)]
pub enum DeleteJobResult {
    #[oai(status = 204)]
    Deleted,
    #[oai(status = 404)]
    NotFound(Json<ErrorBody>),
}

type Result<T> = std::result::Result<T, ApiError>;

#[OpenApi(prefix_path = "/jobs", tag = ApiTags::Jobs)]
impl JobsApi {
    #[oai(path = "/", method = "post", operation_id = "submit_job")]
    async fn submit(&self, body: Json<SubmitJobDto>) -> Result<Json<SubmitJobResponseDto>> {
        let dto = body.0;
        let job_id = JobId::new();
        let template = dto.template.into();
        let origins: Vec<_> = dto.origins.into_iter().map(Into::into).collect();
        let n_tasks_total = origins.len() as u32;

        let mut job = Job::new(
            job_id,
            dto.category.into(),
            dto.worker_tags,
            template,
            origins,
            dto.has_transit,
            dto.zoom.max(1),
            self.redelivery_timeout,
        );
        job.include_path_results = dto.include_path_results;
        job.origin_point_set = dto.origin_point_set;

        let assembler = MultiOriginAssembler::create(
            job_id,
            &job.template,
            n_tasks_total,
            &self.work_dir,
            dto.wants_travel_times,
            true,
        )
        .map_err(|err| broker_core::BrokerError::AssemblerIoError {
            job_id,
            reason: err.to_string(),
        })?;

        self.broker.enqueue_regional_job(job, assembler).await?;
        Ok(Json(SubmitJobResponseDto {
            job_id: job_id.to_string(),
        }))
    }

    #[oai(path = "/", method = "get", operation_id = "list_jobs")]
    async fn list(&self) -> Result<Json<Vec<JobStatusDto>>> {
        Ok(Json(
            self.broker
                .get_all_job_statuses()
                .into_iter()
                .map(JobStatusDto::from)
                .collect(),
        ))
    }

    #[oai(path = "/:job_id", method = "get", operation_id = "get_job")]
    async fn get(&self, job_id: Path<String>) -> Result<Json<JobStatusDto>> {
        let job_id = JobId::from_str(&job_id.0)?;
        self.broker
            .find_job(job_id)
            .map(|status| Json(status.into()))
            .ok_or_else(|| broker_core::BrokerError::UnknownJob(job_id).into())
    }

    #[oai(path = "/:job_id", method = "delete", operation_id = "delete_job")]
    async fn delete(&self, job_id: Path<String>) -> std::result::Result<DeleteJobResult, ApiError> {
        let job_id = JobId::from_str(&job_id.0)?;
        match self.broker.delete_job(job_id) {
            Ok(()) => Ok(DeleteJobResult::Deleted),
            Err(broker_core::BrokerError::UnknownJob(_)) => {
                Ok(DeleteJobResult::NotFound(Json(ErrorBody {
                    error: format!("job {job_id} is unknown"),
                })))
            }
            Err(err) => Err(err.into()),
        }
    }
}
