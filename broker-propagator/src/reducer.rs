//! Converts a target's raw per-iteration seconds into percentile-minute
//! travel times and, optionally, accumulates cumulative-opportunity
//! accessibility against a cutoff.

use crate::error::PropagatorError;
use crate::message::AnalysisTask;
use crate::UNREACHED;

pub struct TravelTimeReducer {
    times_per_destination: usize,
    cutoff_seconds: i32,
    max_trip_duration_minutes: i64,
    percentiles: Vec<u8>,
    /// `percentileIndexes[p]`, precomputed once.
    percentile_indexes: Vec<usize>,
    /// `travelTimes[target][percentile]`, pre-sized and filled in place.
    travel_times: Vec<Vec<i32>>,
    /// `accessibilityResult[dataset][cutoff][percentile]`, present only
    /// when the job requested it.
    accessibility: Option<Vec<Vec<Vec<i64>>>>,
    destination_opportunity_counts: Option<Vec<i64>>,
    /// Reused scratch buffer `extract_and_record` sorts into, so the
    /// caller's own per-iteration array is never mutated.
    sort_scratch: Vec<i32>,
}

impl TravelTimeReducer {
    pub fn new(task: &AnalysisTask) -> Self {
        let iterations = task.iteration_source.iterations() as usize;
        let percentile_indexes = task
            .percentiles
            .iter()
            .map(|&p| percentile_index(p, iterations))
            .collect();

        Self {
            times_per_destination: iterations,
            cutoff_seconds: task.cutoff_seconds,
            max_trip_duration_minutes: task.max_trip_duration_minutes(),
            percentiles: task.percentiles.clone(),
            percentile_indexes,
            travel_times: Vec::new(),
            accessibility: task
                .destination_opportunity_counts
                .as_ref()
                .map(|_| vec![vec![vec![0i64; task.percentiles.len()]]]),
            destination_opportunity_counts: task.destination_opportunity_counts.clone(),
            sort_scratch: Vec::new(),
        }
    }

    pub fn travel_times(&self) -> &[Vec<i32>] {
        &self.travel_times
    }

    pub fn accessibility(&self) -> Option<&Vec<Vec<Vec<i64>>>> {
        self.accessibility.as_ref()
    }

    fn ensure_row(&mut self, target: u32) -> usize {
        let target = target as usize;
        while self.travel_times.len() <= target {
            self.travel_times.push(vec![0; self.percentiles.len()]);
        }
        target
    }

    /// `recordUnvarying(target, seconds)`: non-transit-only results fill
    /// every percentile with the same minute value.
    pub fn record_unvarying(&mut self, target: u32, seconds: i32) {
        let minute = self.seconds_to_minute(seconds);
        let row = self.ensure_row(target);
        for p in 0..self.percentiles.len() {
            self.travel_times[row][p] = minute;
        }
        self.accumulate_accessibility(target, row);
    }

    /// `extractAndRecord(target, int[] seconds)`: destructively sorts a
    /// private copy of `seconds`, reads off the precomputed percentile
    /// indexes, and records. Rejects results of the wrong length.
    pub fn extract_and_record(
        &mut self,
        target: u32,
        seconds: &[i32],
    ) -> Result<(), PropagatorError> {
        if seconds.len() != self.times_per_destination {
            return Err(PropagatorError::InvalidInput {
                expected: self.times_per_destination,
                actual: seconds.len(),
            });
        }

        self.sort_scratch.clear();
        self.sort_scratch.extend_from_slice(seconds);
        self.sort_scratch.sort_unstable();

        let row = self.ensure_row(target);
        for (p, &idx) in self.percentile_indexes.iter().enumerate() {
            let minute = self.seconds_to_minute(self.sort_scratch[idx]);
            self.travel_times[row][p] = minute;
        }
        self.accumulate_accessibility(target, row);
        Ok(())
    }

    fn seconds_to_minute(&self, seconds: i32) -> i32 {
        if seconds >= self.cutoff_seconds {
            UNREACHED
        } else {
            seconds / 60
        }
    }

    fn accumulate_accessibility(&mut self, target: u32, row: usize) {
        let Some(accessibility) = self.accessibility.as_mut() else {
            return;
        };
        let opportunity_count = self
            .destination_opportunity_counts
            .as_ref()
            .and_then(|counts| counts.get(target as usize))
            .copied()
            .unwrap_or(0);

        for (p, &minute) in self.travel_times[row].iter().enumerate() {
            if (minute as i64) < self.max_trip_duration_minutes {
                accessibility[0][0][p] += opportunity_count;
            }
        }
    }
}

/// `idx = ceil(p/100 * I) - 1` (non-interpolated Wikipedia definition,
/// each iteration's best time), computed in integer math
/// to avoid floating-point drift between implementations.
fn percentile_index(percentile: u8, iterations: usize) -> usize {
    let numerator = percentile as u64 * iterations as u64;
    let ceil_div = numerator.div_ceil(100);
    (ceil_div.max(1) - 1) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::IterationSource;

    fn analysis_task(percentiles: Vec<u8>, cutoff_seconds: i32, iterations: u32) -> AnalysisTask {
        AnalysisTask {
            percentiles,
            cutoff_seconds,
            iteration_source: IterationSource::MonteCarlo { draws: iterations },
            destination_opportunity_counts: None,
        }
    }

    /// Scenario 5: `I = 100`, percentiles `[5, 50, 95]`, `seconds = [0,
    /// 60, ..., 5940]` → indices `[4, 49, 94]` → minutes `[4, 49, 94]`.
    #[test]
    fn percentile_extraction_matches_worked_example() {
        let task = analysis_task(vec![5, 50, 95], 100_000, 100);
        let mut reducer = TravelTimeReducer::new(&task);
        let seconds: Vec<i32> = (0..100).map(|i| i * 60).collect();
        reducer.extract_and_record(0, &seconds).unwrap();
        assert_eq!(reducer.travel_times()[0], vec![4, 49, 94]);
    }

    #[test]
    fn values_at_or_past_cutoff_clamp_to_unreached() {
        let task = analysis_task(vec![50], 120, 2);
        let mut reducer = TravelTimeReducer::new(&task);
        reducer.extract_and_record(0, &[120, 1000]).unwrap();
        assert_eq!(reducer.travel_times()[0][0], UNREACHED);
    }

    #[test]
    fn wrong_length_input_is_rejected() {
        let task = analysis_task(vec![50], 600, 4);
        let mut reducer = TravelTimeReducer::new(&task);
        let err = reducer.extract_and_record(0, &[1, 2, 3]).unwrap_err();
        assert_eq!(
            err,
            PropagatorError::InvalidInput {
                expected: 4,
                actual: 3
            }
        );
    }

    #[test]
    fn accessibility_uses_strict_less_than_comparison() {
        let mut task = analysis_task(vec![50], 600, 1);
        task.destination_opportunity_counts = Some(vec![3]);
        let mut reducer = TravelTimeReducer::new(&task);
        // minute = 9, maxTripDurationMinutes = 10 -> strictly less, counted.
        reducer.record_unvarying(0, 9 * 60);
        assert_eq!(reducer.accessibility().unwrap()[0][0][0], 3);
    }

    #[test]
    fn accessibility_excludes_unreached_destinations() {
        let mut task = analysis_task(vec![50], 600, 1);
        task.destination_opportunity_counts = Some(vec![3]);
        let mut reducer = TravelTimeReducer::new(&task);
        // seconds == cutoff_seconds clamps to UNREACHED, which is never
        // < maxTripDurationMinutes, so the destination isn't counted.
        reducer.record_unvarying(0, 600);
        assert_eq!(reducer.accessibility().unwrap()[0][0][0], 0);
    }

    #[test]
    fn scenario_one_nine_destinations_all_counted() {
        let mut task = analysis_task(vec![50], 600, 1);
        task.destination_opportunity_counts = Some(vec![1; 9]);
        let mut reducer = TravelTimeReducer::new(&task);
        for (target, minute) in (1..=9).enumerate() {
            reducer.record_unvarying(target as u32, minute * 60);
        }
        assert_eq!(reducer.accessibility().unwrap()[0][0][0], 9);
    }
}
