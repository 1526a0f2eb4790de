//! The densest algorithmic component: transpose the
//! iteration-by-stop travel time matrix once per task, then for every
//! target walk its nearby-stops table across all iterations to find the
//! fastest arrival, handing the per-iteration result to a
//! [`crate::TravelTimeReducer`].

use crate::message::{NearbyStop, PropagationInput};
use crate::TravelTimeReducer;

/// Runs the propagation kernel for a single [`PropagationInput`]. Owns the
/// scratch buffers the hot loop reuses across targets so a worker
/// processing many origins in a row never re-allocates them.
pub struct Propagator {
    walk_speed_mm_per_s: u32,
    cutoff_seconds: i32,
    /// Whether per-iteration travel times must be tracked precisely, or
    /// only whether each iteration reached within cutoff (accessibility
    /// only).
    saving_times: bool,
    /// `ttAtStop[stop][iter]`, the transpose of the task's `tt_to_stops`.
    tt_at_stop: Vec<Vec<i32>>,
    /// Reused across targets; re-initialized at the top of every
    /// `propagate_target` call instead of reallocated.
    per_iter: Vec<i32>,
}

impl Propagator {
    pub fn new(walk_speed_mm_per_s: u32, cutoff_seconds: i32, saving_times: bool) -> Self {
        Self {
            walk_speed_mm_per_s,
            cutoff_seconds,
            saving_times,
            tt_at_stop: Vec::new(),
            per_iter: Vec::new(),
        }
    }

    /// Step 1: transpose `ttToStops[iter][stop]` into `ttAtStop[stop][iter]`
    /// for cache-friendly per-stop column access in the hot loop.
    fn transpose(&mut self, tt_to_stops: &[Vec<i32>]) {
        let iterations = tt_to_stops.len();
        let stops = tt_to_stops.first().map_or(0, Vec::len);

        if self.tt_at_stop.len() != stops || self.tt_at_stop.first().map_or(0, Vec::len) != iterations
        {
            self.tt_at_stop = vec![vec![0; iterations]; stops];
        }

        for (i, row) in tt_to_stops.iter().enumerate() {
            for (stop, &ts) in row.iter().enumerate() {
                self.tt_at_stop[stop][i] = ts;
            }
        }
    }

    /// Step 2 for one target: reused `per_iter` scratch is filled and
    /// handed to the reducer. Returns the slice so callers needing the
    /// raw values (tests) can inspect it before it's overwritten.
    fn propagate_target(
        &mut self,
        non_transit_time: i32,
        nearby_stops: &[NearbyStop],
        iterations: usize,
    ) -> &[i32] {
        if self.per_iter.len() != iterations {
            self.per_iter = vec![0; iterations];
        }
        self.per_iter.fill(non_transit_time);

        if non_transit_time < self.cutoff_seconds && !self.saving_times {
            // Already reached in every iteration and travel times aren't
            // needed; nothing transit-side can make this worse.
            return &self.per_iter;
        }

        for stop in nearby_stops {
            let egress = (stop.distance_mm / self.walk_speed_mm_per_s) as i32;
            let column = &self.tt_at_stop[stop.stop as usize];

            for i in 0..iterations {
                let ts = column[i];
                if ts > self.cutoff_seconds {
                    continue;
                }
                if self.saving_times && ts > self.per_iter[i] {
                    continue;
                }
                let candidate = ts + egress;
                let improves = if self.saving_times {
                    candidate < self.cutoff_seconds && candidate < self.per_iter[i]
                } else {
                    candidate < self.cutoff_seconds
                };
                if improves {
                    self.per_iter[i] = candidate;
                }
            }
        }

        &self.per_iter
    }

    /// Runs the full task: transposes once, then propagates and reduces
    /// every target in turn. Exactly one `TravelTimeReducer` call per
    /// target, even when unreachable.
    pub fn run(&mut self, task: &PropagationInput, reducer: &mut TravelTimeReducer) {
        self.transpose(&task.tt_to_stops);
        let iterations = task.tt_to_stops.len();

        for (target, nearby) in task.nearby_stops.iter().enumerate() {
            let non_transit = task.non_transit_to_targets[target];
            let per_iter = self.propagate_target(non_transit, nearby, iterations);
            // `per_iter` is always sized to `iterations`, which is what
            // the reducer was constructed from; a length mismatch here
            // would be a bug in this module, not bad input.
            reducer
                .extract_and_record(target as u32, per_iter)
                .expect("propagator always emits one value per iteration");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{AnalysisTask, GridDimensions, IterationSource, TaskTemplate};
    use broker_common::ids::JobId;

    fn template(percentiles: Vec<u8>, cutoff: i32, iterations: u32) -> TaskTemplate {
        TaskTemplate {
            grid: GridDimensions { width: 1, height: 9 },
            analysis: AnalysisTask {
                percentiles,
                cutoff_seconds: cutoff,
                iteration_source: IterationSource::MonteCarlo { draws: iterations },
                destination_opportunity_counts: Some(vec![1; 9]),
            },
        }
    }

    /// Scenario 1: 4 origins, 1 percentile, `timesPerDestination = 1`.
    /// Non-transit times to 9 destinations are 60, 120, ..., 540s;
    /// cutoff 600s. Expected minutes 1..9, accessibility 9 per percentile.
    #[test]
    fn tiny_non_transit_job() {
        let template = template(vec![50], 600, 1);
        let non_transit: Vec<i32> = (1..=9).map(|m| m * 60).collect();

        for _origin in 0..4 {
            let task = PropagationInput {
                job_id: JobId::new(),
                task_id: 0,
                template: template.clone(),
                tt_to_stops: vec![vec![]],
                non_transit_to_targets: non_transit.clone(),
                nearby_stops: vec![vec![]; 9],
                walk_speed_mm_per_s: 1000,
            };

            let mut reducer = TravelTimeReducer::new(&template.analysis);
            let mut propagator = Propagator::new(task.walk_speed_mm_per_s, 600, true);
            propagator.run(&task, &mut reducer);

            let expected_minutes: Vec<i32> = (1..=9).collect();
            assert_eq!(
                reducer
                    .travel_times()
                    .iter()
                    .map(|row| row[0])
                    .collect::<Vec<_>>(),
                expected_minutes
            );
            assert_eq!(reducer.accessibility().unwrap()[0][0][0], 9);
        }
    }

    /// Scenario 6: target reached at iteration 7 with `nonTransitTime =
    /// 600` and via a stop at iteration 7 with `ts=200, egress=300`
    /// (total 500); `per_iter[7]` must end up 500, not 600.
    #[test]
    fn propagator_tie_prefers_transit_over_non_transit() {
        let iterations = 8;
        let mut tt_to_stops = vec![vec![i32::MAX; 1]; iterations];
        tt_to_stops[7][0] = 200;

        let template = template(vec![50], 10_000, iterations as u32);
        let task = PropagationInput {
            job_id: JobId::new(),
            task_id: 0,
            template: template.clone(),
            tt_to_stops,
            non_transit_to_targets: vec![600],
            nearby_stops: vec![vec![NearbyStop {
                stop: 0,
                distance_mm: 300_000,
            }]],
            walk_speed_mm_per_s: 1000,
        };

        let mut reducer = TravelTimeReducer::new(&template.analysis);
        let mut propagator = Propagator::new(task.walk_speed_mm_per_s, 10_000, true);
        propagator.transpose(&task.tt_to_stops);
        let per_iter = propagator.propagate_target(600, &task.nearby_stops[0], iterations);
        assert_eq!(per_iter[7], 500);
        let _ = reducer; // reducer exercised separately in reducer tests
    }

    #[test]
    fn every_target_reduced_even_when_unreachable() {
        let template = template(vec![50], 100, 2);
        let task = PropagationInput {
            job_id: JobId::new(),
            task_id: 0,
            template: template.clone(),
            tt_to_stops: vec![vec![i32::MAX]; 2],
            non_transit_to_targets: vec![i32::MAX, 50],
            nearby_stops: vec![vec![], vec![]],
            walk_speed_mm_per_s: 1000,
        };

        let mut reducer = TravelTimeReducer::new(&template.analysis);
        let mut propagator = Propagator::new(task.walk_speed_mm_per_s, 100, true);
        propagator.run(&task, &mut reducer);

        assert_eq!(reducer.travel_times().len(), 2);
        assert_eq!(reducer.travel_times()[0][0], crate::UNREACHED);
    }
}
