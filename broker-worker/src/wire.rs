//! JSON shapes exchanged with the broker's `/poll` and `/results`
//! endpoints. Deliberately independent of
//! `broker_service::model`'s `poem_openapi` types — a worker is a
//! separate process that only needs to agree on the wire format, not
//! share Rust types with the server — but serialized identically
//! (`camelCase`, a `type`-tagged union for `IterationSource`) so the two
//! interoperate.

use broker_propagator::{AnalysisTask, GridDimensions, IterationSource, TaskTemplate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerCategoryWire {
    pub network_id: String,
    pub software_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollRequestWire {
    pub worker_id: String,
    pub category: WorkerCategoryWire,
    pub max_tasks_requested: u32,
    pub tasks_in_flight: u32,
    pub single_point_capable: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginWire {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridDimensionsWire {
    pub width: u32,
    pub height: u32,
}

/// Mirrors `broker_service::model::IterationSourceDto`'s `Union`
/// encoding: an internally-tagged enum keyed on `type`, tag value equal
/// to the variant name verbatim (enum-level `rename_all` would also
/// recase the tag, which the service side does not do).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum IterationSourceWire {
    #[serde(rename_all = "camelCase")]
    WindowDraws {
        window_minutes: u32,
        draws_per_minute: u32,
    },
    #[serde(rename_all = "camelCase")]
    Headway {
        window_minutes: u32,
    },
    MonteCarlo {
        draws: u32,
    },
}

impl From<IterationSourceWire> for IterationSource {
    fn from(value: IterationSourceWire) -> Self {
        match value {
            IterationSourceWire::WindowDraws {
                window_minutes,
                draws_per_minute,
            } => IterationSource::WindowDraws {
                window_minutes,
                draws_per_minute,
            },
            IterationSourceWire::Headway { window_minutes } => {
                IterationSource::Headway { window_minutes }
            }
            IterationSourceWire::MonteCarlo { draws } => IterationSource::MonteCarlo { draws },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisTaskWire {
    pub percentiles: Vec<u8>,
    pub cutoff_seconds: i32,
    pub iteration_source: IterationSourceWire,
    pub destination_opportunity_counts: Option<Vec<i64>>,
}

impl From<AnalysisTaskWire> for AnalysisTask {
    fn from(value: AnalysisTaskWire) -> Self {
        AnalysisTask {
            percentiles: value.percentiles,
            cutoff_seconds: value.cutoff_seconds,
            iteration_source: value.iteration_source.into(),
            destination_opportunity_counts: value.destination_opportunity_counts,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskTemplateWire {
    pub grid: GridDimensionsWire,
    pub analysis: AnalysisTaskWire,
}

impl From<TaskTemplateWire> for TaskTemplate {
    fn from(value: TaskTemplateWire) -> Self {
        TaskTemplate {
            grid: GridDimensions {
                width: value.grid.width,
                height: value.grid.height,
            },
            analysis: value.analysis.into(),
        }
    }
}

/// `POST /poll` response element (mirrors `RegionalTaskDto`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionalTaskWire {
    pub job_id: String,
    pub task_id: u32,
    pub origin: OriginWire,
    pub template: TaskTemplateWire,
}

/// `POST /results` request body (mirrors `RegionalWorkResultDto`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionalWorkResultWire {
    pub job_id: String,
    pub task_id: u32,
    pub error: Option<String>,
    pub travel_times_by_percentile: Option<Vec<Vec<i32>>>,
    pub accessibility: Option<Vec<Vec<Vec<i64>>>>,
}

impl RegionalWorkResultWire {
    pub fn success(
        job_id: String,
        task_id: u32,
        travel_times: Vec<Vec<i32>>,
        accessibility: Option<Vec<Vec<Vec<i64>>>>,
    ) -> Self {
        Self {
            job_id,
            task_id,
            error: None,
            travel_times_by_percentile: Some(travel_times),
            accessibility,
        }
    }

    pub fn failure(job_id: String, task_id: u32, message: impl Into<String>) -> Self {
        Self {
            job_id,
            task_id,
            error: Some(message.into()),
            travel_times_by_percentile: None,
            accessibility: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iteration_source_serializes_with_a_type_tag() {
        let wire = IterationSourceWire::Headway { window_minutes: 10 };
        let json = serde_json::to_value(&wire).unwrap();
        assert_eq!(json["type"], "Headway");
        assert_eq!(json["windowMinutes"], 10);
    }

    #[test]
    fn round_trips_a_regional_task() {
        let json = serde_json::json!({
            "jobId": "00000000-0000-0000-0000-000000000001",
            "taskId": 3,
            "origin": { "lat": 47.6, "lon": -122.3 },
            "template": {
                "grid": { "width": 2, "height": 2 },
                "analysis": {
                    "percentiles": [50],
                    "cutoffSeconds": 600,
                    "iterationSource": { "type": "MonteCarlo", "draws": 10 },
                    "destinationOpportunityCounts": null
                }
            }
        });
        let task: RegionalTaskWire = serde_json::from_value(json).unwrap();
        assert_eq!(task.task_id, 3);
        let template: TaskTemplate = task.template.into();
        assert_eq!(template.analysis.iteration_source.iterations(), 10);
    }
}
