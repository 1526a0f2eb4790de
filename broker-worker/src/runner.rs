//! The worker's main loop, worker side of the poll/compute/report cycle: poll,
//! run the propagator for every delivered task, post each result back,
//! sleep the poll hint when idle.

use crate::client::BrokerClient;
use crate::travel_time_source::TravelTimeSource;
use crate::wire::{PollRequestWire, RegionalTaskWire, RegionalWorkResultWire, WorkerCategoryWire};
use broker_propagator::{Propagator, PropagationInput, TravelTimeReducer};
use std::sync::Arc;
use std::time::Duration;

pub struct WorkerRunner {
    client: BrokerClient,
    worker_id: String,
    category: WorkerCategoryWire,
    max_tasks_requested: u32,
    single_point_capable: bool,
    poll_sleep: Duration,
    source: Arc<dyn TravelTimeSource>,
}

impl WorkerRunner {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        client: BrokerClient,
        worker_id: String,
        network_id: String,
        software_version: String,
        max_tasks_requested: u32,
        single_point_capable: bool,
        poll_sleep: Duration,
        source: Arc<dyn TravelTimeSource>,
    ) -> Self {
        Self {
            client,
            worker_id,
            category: WorkerCategoryWire {
                network_id,
                software_version,
            },
            max_tasks_requested,
            single_point_capable,
            poll_sleep,
            source,
        }
    }

    /// Polls once, processes whatever came back, and returns how many
    /// tasks were handled. Exposed separately from [`Self::run_forever`]
    /// so tests can drive a single iteration deterministically.
    pub async fn poll_and_process_once(&self) -> Result<usize, crate::error::WorkerError> {
        let tasks = self
            .client
            .poll(&PollRequestWire {
                worker_id: self.worker_id.clone(),
                category: self.category.clone(),
                max_tasks_requested: self.max_tasks_requested,
                tasks_in_flight: 0,
                single_point_capable: self.single_point_capable,
            })
            .await?;

        let count = tasks.len();
        for task in tasks {
            let result = self.run_task(task);
            if let Err(err) = self.client.post_result(&result).await {
                tracing::warn!(%err, "failed to post result; it will be redelivered");
            }
        }
        Ok(count)
    }

    /// Polls forever, sleeping [`Self::poll_sleep`] between polls,
    /// regardless of whether the last one returned work ("Worker
    /// should sleep ~1s and re-poll").
    pub async fn run_forever(&self) -> ! {
        loop {
            match self.poll_and_process_once().await {
                Ok(n) if n > 0 => tracing::info!(n, "processed tasks"),
                Ok(_) => {}
                Err(err) => tracing::warn!(%err, "poll failed, retrying after sleep"),
            }
            tokio::time::sleep(self.poll_sleep).await;
        }
    }

    fn run_task(&self, task: RegionalTaskWire) -> RegionalWorkResultWire {
        let job_id = task.job_id.clone();
        let task_id = task.task_id;
        let template: broker_propagator::TaskTemplate = task.template.into();
        let routing = self.source.load(task.origin.lat, task.origin.lon, &template);

        let mut reducer = TravelTimeReducer::new(&template.analysis);
        let mut propagator = Propagator::new(
            routing.walk_speed_mm_per_s,
            template.analysis.cutoff_seconds,
            true,
        );
        let input = PropagationInput {
            job_id: broker_common::ids::JobId::new(),
            task_id,
            template,
            tt_to_stops: routing.tt_to_stops,
            non_transit_to_targets: routing.non_transit_to_targets,
            nearby_stops: routing.nearby_stops,
            walk_speed_mm_per_s: routing.walk_speed_mm_per_s,
        };
        propagator.run(&input, &mut reducer);

        RegionalWorkResultWire::success(
            job_id,
            task_id,
            reducer.travel_times().to_vec(),
            reducer.accessibility().cloned(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::SyntheticTravelTimeSource;
    use broker_propagator::{AnalysisTask, GridDimensions, IterationSource, TaskTemplate};

    fn runner() -> WorkerRunner {
        WorkerRunner::new(
            BrokerClient::new("http://localhost:0"),
            "worker-1".to_string(),
            "seattle".to_string(),
            "1.0".to_string(),
            16,
            false,
            Duration::from_millis(1),
            Arc::new(SyntheticTravelTimeSource::default()),
        )
    }

    #[test]
    fn run_task_produces_one_travel_time_row_per_destination() {
        let runner = runner();
        let template = TaskTemplate {
            grid: GridDimensions { width: 2, height: 2 },
            analysis: AnalysisTask {
                percentiles: vec![50, 90],
                cutoff_seconds: 3_600,
                iteration_source: IterationSource::MonteCarlo { draws: 20 },
                destination_opportunity_counts: Some(vec![1, 1, 1, 1]),
            },
        };
        let task = RegionalTaskWire {
            job_id: "00000000-0000-0000-0000-000000000001".to_string(),
            task_id: 0,
            origin: crate::wire::OriginWire { lat: 47.6, lon: -122.3 },
            template: crate::wire::TaskTemplateWire {
                grid: crate::wire::GridDimensionsWire { width: 2, height: 2 },
                analysis: crate::wire::AnalysisTaskWire {
                    percentiles: template.analysis.percentiles.clone(),
                    cutoff_seconds: template.analysis.cutoff_seconds,
                    iteration_source: crate::wire::IterationSourceWire::MonteCarlo { draws: 20 },
                    destination_opportunity_counts: template.analysis.destination_opportunity_counts.clone(),
                },
            },
        };

        let result = runner.run_task(task);
        assert!(result.error.is_none());
        let rows = result.travel_times_by_percentile.unwrap();
        assert_eq!(rows.len(), 4);
        assert!(rows.iter().all(|row| row.len() == 2));
        assert!(result.accessibility.is_some());
    }
}
