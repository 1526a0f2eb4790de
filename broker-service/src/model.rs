//! Wire DTOs for the worker↔broker HTTP surface and the
//! admin job-listing surface, plus conversions to/from the domain types
//! in `broker-core`/`broker-propagator`. Kept separate from the domain
//! types themselves so the wire format can evolve independently of
//! the services it fronts.

use broker_common::ids::{JobId, TaskId, WorkerCategory, WorkerId};
use broker_core::catalog::WorkerStatus as DomainWorkerStatus;
use broker_core::dispatch::{OriginCoordinates, RegionalTask as DomainRegionalTask};
use broker_core::JobStatus as DomainJobStatus;
use broker_propagator::{AnalysisTask, IterationSource, RegionalWorkResult, TaskTemplate};
use poem_openapi::{Object, Union};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Object)]
#[serde(rename_all = "camelCase")]
#[oai(rename_all = "camelCase")]
pub struct WorkerCategoryDto {
    pub network_id: String,
    pub software_version: String,
}

impl From<WorkerCategoryDto> for WorkerCategory {
    fn from(value: WorkerCategoryDto) -> Self {
        WorkerCategory::new(value.network_id, value.software_version)
    }
}

impl From<WorkerCategory> for WorkerCategoryDto {
    fn from(value: WorkerCategory) -> Self {
        Self {
            network_id: value.network_id,
            software_version: value.software_version,
        }
    }
}

/// `POST /poll` request body.
#[derive(Debug, Clone, Serialize, Deserialize, Object)]
#[serde(rename_all = "camelCase")]
#[oai(rename_all = "camelCase")]
pub struct WorkerStatusDto {
    pub worker_id: String,
    pub category: WorkerCategoryDto,
    pub max_tasks_requested: u32,
    pub tasks_in_flight: u32,
    pub single_point_capable: bool,
}

impl WorkerStatusDto {
    pub fn into_domain(self) -> Result<DomainWorkerStatus, uuid::Error> {
        use std::str::FromStr;
        Ok(DomainWorkerStatus {
            worker_id: WorkerId::from_str(&self.worker_id)?,
            category: self.category.into(),
            max_tasks_requested: self.max_tasks_requested,
            tasks_in_flight: self.tasks_in_flight,
            single_point_capable: self.single_point_capable,
        })
    }
}

/// Tagged union mirror of [`IterationSource`] ("model as a
/// tagged union" note, applied to the one polymorphic field a task
/// carries over the wire). Each variant is a distinct `Object` shape, so
/// `poem_openapi` discriminates on which shape successfully parses.
#[derive(Debug, Clone, Serialize, Deserialize, Union)]
#[oai(discriminator_name = "type", one_of = true)]
#[serde(tag = "type")]
pub enum IterationSourceDto {
    WindowDraws(WindowDrawsDto),
    Headway(HeadwayDto),
    MonteCarlo(MonteCarloDto),
}

#[derive(Debug, Clone, Serialize, Deserialize, Object)]
#[serde(rename_all = "camelCase")]
#[oai(rename_all = "camelCase")]
pub struct WindowDrawsDto {
    pub window_minutes: u32,
    pub draws_per_minute: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Object)]
#[serde(rename_all = "camelCase")]
#[oai(rename_all = "camelCase")]
pub struct HeadwayDto {
    pub window_minutes: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Object)]
#[serde(rename_all = "camelCase")]
#[oai(rename_all = "camelCase")]
pub struct MonteCarloDto {
    pub draws: u32,
}

impl From<IterationSource> for IterationSourceDto {
    fn from(value: IterationSource) -> Self {
        match value {
            IterationSource::WindowDraws {
                window_minutes,
                draws_per_minute,
            } => IterationSourceDto::WindowDraws(WindowDrawsDto {
                window_minutes,
                draws_per_minute,
            }),
            IterationSource::Headway { window_minutes } => {
                IterationSourceDto::Headway(HeadwayDto { window_minutes })
            }
            IterationSource::MonteCarlo { draws } => {
                IterationSourceDto::MonteCarlo(MonteCarloDto { draws })
            }
        }
    }
}

impl From<IterationSourceDto> for IterationSource {
    fn from(value: IterationSourceDto) -> Self {
        match value {
            IterationSourceDto::WindowDraws(d) => IterationSource::WindowDraws {
                window_minutes: d.window_minutes,
                draws_per_minute: d.draws_per_minute,
            },
            IterationSourceDto::Headway(d) => IterationSource::Headway {
                window_minutes: d.window_minutes,
            },
            IterationSourceDto::MonteCarlo(d) => IterationSource::MonteCarlo { draws: d.draws },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Object)]
#[serde(rename_all = "camelCase")]
#[oai(rename_all = "camelCase")]
pub struct AnalysisTaskDto {
    pub percentiles: Vec<u8>,
    pub cutoff_seconds: i32,
    pub iteration_source: IterationSourceDto,
    pub destination_opportunity_counts: Option<Vec<i64>>,
}

impl From<AnalysisTaskDto> for AnalysisTask {
    fn from(value: AnalysisTaskDto) -> Self {
        AnalysisTask {
            percentiles: value.percentiles,
            cutoff_seconds: value.cutoff_seconds,
            iteration_source: value.iteration_source.into(),
            destination_opportunity_counts: value.destination_opportunity_counts,
        }
    }
}

impl From<AnalysisTask> for AnalysisTaskDto {
    fn from(value: AnalysisTask) -> Self {
        Self {
            percentiles: value.percentiles,
            cutoff_seconds: value.cutoff_seconds,
            iteration_source: value.iteration_source.into(),
            destination_opportunity_counts: value.destination_opportunity_counts,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Object)]
#[serde(rename_all = "camelCase")]
#[oai(rename_all = "camelCase")]
pub struct GridDimensionsDto {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Object)]
#[serde(rename_all = "camelCase")]
#[oai(rename_all = "camelCase")]
pub struct TaskTemplateDto {
    pub grid: GridDimensionsDto,
    pub analysis: AnalysisTaskDto,
}

impl From<TaskTemplateDto> for TaskTemplate {
    fn from(value: TaskTemplateDto) -> Self {
        TaskTemplate {
            grid: broker_propagator::GridDimensions {
                width: value.grid.width,
                height: value.grid.height,
            },
            analysis: value.analysis.into(),
        }
    }
}

impl From<TaskTemplate> for TaskTemplateDto {
    fn from(value: TaskTemplate) -> Self {
        Self {
            grid: GridDimensionsDto {
                width: value.grid.width,
                height: value.grid.height,
            },
            analysis: value.analysis.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Object)]
#[serde(rename_all = "camelCase")]
#[oai(rename_all = "camelCase")]
pub struct OriginCoordinatesDto {
    pub lat: f64,
    pub lon: f64,
}

impl From<OriginCoordinatesDto> for OriginCoordinates {
    fn from(value: OriginCoordinatesDto) -> Self {
        OriginCoordinates {
            lat: value.lat,
            lon: value.lon,
        }
    }
}

impl From<OriginCoordinates> for OriginCoordinatesDto {
    fn from(value: OriginCoordinates) -> Self {
        Self {
            lat: value.lat,
            lon: value.lon,
        }
    }
}

/// `POST /poll` response element.
#[derive(Debug, Clone, Serialize, Deserialize, Object)]
#[serde(rename_all = "camelCase")]
#[oai(rename_all = "camelCase")]
pub struct RegionalTaskDto {
    pub job_id: String,
    pub task_id: TaskId,
    pub origin: OriginCoordinatesDto,
    pub template: TaskTemplateDto,
}

impl From<DomainRegionalTask> for RegionalTaskDto {
    fn from(value: DomainRegionalTask) -> Self {
        Self {
            job_id: value.job_id.to_string(),
            task_id: value.task_id,
            origin: value.origin.into(),
            template: value.template.into(),
        }
    }
}

/// `POST /results` request body.
#[derive(Debug, Clone, Serialize, Deserialize, Object)]
#[serde(rename_all = "camelCase")]
#[oai(rename_all = "camelCase")]
pub struct RegionalWorkResultDto {
    pub job_id: String,
    pub task_id: TaskId,
    pub error: Option<String>,
    pub travel_times_by_percentile: Option<Vec<Vec<i32>>>,
    pub accessibility: Option<Vec<Vec<Vec<i64>>>>,
}

impl RegionalWorkResultDto {
    pub fn into_domain(self) -> Result<RegionalWorkResult, uuid::Error> {
        use std::str::FromStr;
        Ok(RegionalWorkResult {
            job_id: JobId::from_str(&self.job_id)?,
            task_id: self.task_id,
            travel_times: self.travel_times_by_percentile,
            accessibility: self.accessibility,
            error: self.error,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Object)]
#[serde(rename_all = "camelCase")]
#[oai(rename_all = "camelCase")]
pub struct JobStatusDto {
    pub job_id: String,
    pub category: WorkerCategoryDto,
    pub n_tasks_total: u32,
    pub n_delivered: u32,
    pub n_completed: u32,
    pub errors: Vec<String>,
    pub active: bool,
    pub errored: bool,
    pub complete: bool,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
}

impl From<DomainJobStatus> for JobStatusDto {
    fn from(value: DomainJobStatus) -> Self {
        Self {
            job_id: value.job_id.to_string(),
            category: value.category.into(),
            n_tasks_total: value.n_tasks_total,
            n_delivered: value.n_delivered,
            n_completed: value.n_completed,
            errors: value.errors,
            active: value.active,
            errored: value.errored,
            complete: value.complete,
            submitted_at: value.submitted_at,
        }
    }
}

/// Admin/UI `POST /jobs` request body — not part of the worker-facing
/// contract, but the only way anything ends up in the broker to poll for.
#[derive(Debug, Clone, Serialize, Deserialize, Object)]
#[serde(rename_all = "camelCase")]
#[oai(rename_all = "camelCase")]
pub struct SubmitJobDto {
    pub category: WorkerCategoryDto,
    #[oai(default)]
    pub worker_tags: Vec<String>,
    pub template: TaskTemplateDto,
    pub origins: Vec<OriginCoordinatesDto>,
    #[oai(default)]
    pub has_transit: bool,
    #[oai(default = "default_zoom")]
    pub zoom: u32,
    #[oai(default)]
    pub include_path_results: bool,
    #[oai(default)]
    pub origin_point_set: bool,
    #[oai(default)]
    pub wants_travel_times: bool,
}

fn default_zoom() -> u32 {
    9
}

#[derive(Debug, Clone, Serialize, Deserialize, Object)]
#[serde(rename_all = "camelCase")]
#[oai(rename_all = "camelCase")]
pub struct SubmitJobResponseDto {
    pub job_id: String,
}

#[derive(Object)]
#[oai(rename_all = "camelCase")]
pub struct ErrorsBody {
    pub errors: Vec<String>,
}

#[derive(Object)]
#[oai(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: String,
}
