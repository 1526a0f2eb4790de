//! Wire types exchanged between a worker and the broker
//! (`PropagationInput`/`RegionalWorkResult` rows) plus the per-job parameters
//! (`TaskTemplate`, `AnalysisTask`) the [`crate::Propagator`] and
//! [`crate::TravelTimeReducer`] are configured from.

use broker_common::ids::{JobId, TaskId};
use serde::{Deserialize, Serialize};

/// Destination grid shape, shared by every task in a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridDimensions {
    pub width: u32,
    pub height: u32,
}

impl GridDimensions {
    pub fn destination_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }
}

/// How many Monte-Carlo/departure-minute iterations (`I`) a task's
/// travel-time matrix carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IterationSource {
    /// A departure window sampled at `draws_per_minute` draws per minute.
    WindowDraws {
        window_minutes: u32,
        draws_per_minute: u32,
    },
    /// A headway-based window: one iteration per minute of window.
    Headway { window_minutes: u32 },
    /// An in-routing fare calculator configured a fixed draw count.
    MonteCarlo { draws: u32 },
}

impl IterationSource {
    /// `timesPerDestination = I`.
    pub fn iterations(&self) -> u32 {
        match self {
            IterationSource::WindowDraws {
                window_minutes,
                draws_per_minute,
            } => window_minutes * draws_per_minute,
            IterationSource::Headway { window_minutes } => *window_minutes,
            IterationSource::MonteCarlo { draws } => *draws,
        }
    }
}

/// Job-wide parameters that shape every task's reduction step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisTask {
    pub percentiles: Vec<u8>,
    pub cutoff_seconds: i32,
    pub iteration_source: IterationSource,
    /// When set, opportunity counts per destination to accumulate
    /// accessibility against. Absent for travel-time-only jobs.
    pub destination_opportunity_counts: Option<Vec<i64>>,
}

impl AnalysisTask {
    /// `maxTripDurationMinutes` derived from `cutoffSeconds` (this crate's
    /// resolves the two units as the same quantity).
    pub fn max_trip_duration_minutes(&self) -> i64 {
        (self.cutoff_seconds / 60) as i64
    }
}

/// Job-wide geometry, independent of the per-job analysis parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskTemplate {
    pub grid: GridDimensions,
    pub analysis: AnalysisTask,
}

/// A `(stop, distance)` entry of a target's nearby-stops table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NearbyStop {
    pub stop: u32,
    pub distance_mm: u32,
}

/// One unit of work delivered to a worker: everything needed to run the
/// propagator for a single origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropagationInput {
    pub job_id: JobId,
    pub task_id: TaskId,
    pub template: TaskTemplate,
    /// `ttToStops[iter][stop]`.
    pub tt_to_stops: Vec<Vec<i32>>,
    /// `nonTransitToTargets[t]`.
    pub non_transit_to_targets: Vec<i32>,
    /// `nearbyStops[t]`, one sparse table per target.
    pub nearby_stops: Vec<Vec<NearbyStop>>,
    pub walk_speed_mm_per_s: u32,
}

/// What a worker posts back for one delivered task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionalWorkResult {
    pub job_id: JobId,
    pub task_id: TaskId,
    /// `travelTimes[target][percentile]`, absent on error.
    pub travel_times: Option<Vec<Vec<i32>>>,
    /// `accessibilityResult[dataset][cutoff][percentile]`, absent when the
    /// job did not request accessibility.
    pub accessibility: Option<Vec<Vec<Vec<i64>>>>,
    /// Set when the worker failed to process the task; when present the
    /// other fields are ignored by the assembler.
    pub error: Option<String>,
}

impl RegionalWorkResult {
    pub fn success(
        job_id: JobId,
        task_id: TaskId,
        travel_times: Vec<Vec<i32>>,
        accessibility: Option<Vec<Vec<Vec<i64>>>>,
    ) -> Self {
        Self {
            job_id,
            task_id,
            travel_times: Some(travel_times),
            accessibility,
            error: None,
        }
    }

    pub fn failure(job_id: JobId, task_id: TaskId, error: impl Into<String>) -> Self {
        Self {
            job_id,
            task_id,
            travel_times: None,
            accessibility: None,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iteration_counts_match_their_source() {
        assert_eq!(
            IterationSource::WindowDraws {
                window_minutes: 60,
                draws_per_minute: 5
            }
            .iterations(),
            300
        );
        assert_eq!(IterationSource::Headway { window_minutes: 120 }.iterations(), 120);
        assert_eq!(IterationSource::MonteCarlo { draws: 100 }.iterations(), 100);
    }

    #[test]
    fn max_trip_duration_is_cutoff_in_minutes() {
        let task = AnalysisTask {
            percentiles: vec![50],
            cutoff_seconds: 600,
            iteration_source: IterationSource::MonteCarlo { draws: 1 },
            destination_opportunity_counts: None,
        };
        assert_eq!(task.max_trip_duration_minutes(), 10);
    }
}
