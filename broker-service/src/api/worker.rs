//! Worker-facing surface: `POST /poll` and `POST /results`. The only
//! two endpoints a worker ever calls.

use crate::api::ApiTags;
use crate::error::ApiError;
use crate::model::{RegionalTaskDto, RegionalWorkResultDto, WorkerStatusDto};
use broker_core::Broker;
use poem_openapi::payload::Json;
use poem_openapi::OpenApi;
use std::sync::Arc;

pub struct WorkerApi {
    broker: Arc<Broker>,
}

impl WorkerApi {
    pub fn new(broker: Arc<Broker>) -> Self {
        Self { broker }
    }
}

type Result<T> = std::result::Result<T, ApiError>;

#[OpenApi(prefix_path = "/", tag = ApiTags::Worker)]
impl WorkerApi {
    /// Short-poll for work. Also serves as the worker's heartbeat:
    /// recorded in the catalog before any tasks are handed out.
    #[oai(path = "/poll", method = "post", operation_id = "poll")]
    async fn poll(&self, body: Json<WorkerStatusDto>) -> Result<Json<Vec<RegionalTaskDto>>> {
        let status = body.0.into_domain()?;
        let category = status.category.clone();
        let max_requested = status.max_tasks_requested;
        self.broker.record_worker_observation(status);
        let tasks = self.broker.get_some_work(&category, max_requested);
        Ok(Json(tasks.into_iter().map(RegionalTaskDto::from).collect()))
    }

    /// Accepts a result unconditionally (200 regardless of outcome);
    /// unknown/inactive jobs are discarded silently inside the broker.
    #[oai(path = "/results", method = "post", operation_id = "post_result")]
    async fn post_result(&self, body: Json<RegionalWorkResultDto>) -> Result<Json<()>> {
        let result = body.0.into_domain()?;
        if let Err(err) = self.broker.handle_regional_work_result(result).await {
            tracing::debug!(%err, "result handling reported a non-fatal error");
        }
        Ok(Json(()))
    }
}
