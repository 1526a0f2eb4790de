//! A deterministic stand-in for [`crate::travel_time_source::TravelTimeSource`]
//! used for demonstration and integration testing, since real street-graph
//! routing and RAPTOR are out of scope here. "Deterministic" means
//! the same origin against the same template always yields the same
//! routing inputs — seeded from the origin coordinates rather than from
//! wall-clock or OS entropy, so test runs and worker restarts agree.

use crate::travel_time_source::{RoutingInputs, TravelTimeSource};
use broker_propagator::{NearbyStop, TaskTemplate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const DEFAULT_WALK_SPEED_MM_PER_S: u32 = 1_400; // ~1.4 m/s, a brisk walk.

pub struct SyntheticTravelTimeSource {
    /// How many distinct transit stops this synthetic network has.
    pub stop_count: usize,
    /// How many nearby stops to generate per destination (bounded by
    /// `stop_count`).
    pub nearby_stops_per_target: usize,
}

impl Default for SyntheticTravelTimeSource {
    fn default() -> Self {
        Self {
            stop_count: 64,
            nearby_stops_per_target: 4,
        }
    }
}

impl TravelTimeSource for SyntheticTravelTimeSource {
    fn load(&self, lat: f64, lon: f64, template: &TaskTemplate) -> RoutingInputs {
        let iterations = template.analysis.iteration_source.iterations() as usize;
        let destination_count = template.grid.destination_count();
        let mut rng = StdRng::seed_from_u64(seed_from_origin(lat, lon));

        let tt_to_stops: Vec<Vec<i32>> = (0..iterations.max(1))
            .map(|_| {
                (0..self.stop_count)
                    .map(|_| rng.random_range(60..=7_200))
                    .collect()
            })
            .collect();

        let non_transit_to_targets: Vec<i32> = (0..destination_count)
            .map(|_| rng.random_range(120..=10_800))
            .collect();

        let nearby_per_target = self.nearby_stops_per_target.min(self.stop_count);
        let nearby_stops: Vec<Vec<NearbyStop>> = (0..destination_count)
            .map(|_| {
                (0..nearby_per_target)
                    .map(|_| NearbyStop {
                        stop: rng.random_range(0..self.stop_count as u32),
                        distance_mm: rng.random_range(50_000..1_200_000),
                    })
                    .collect()
            })
            .collect();

        RoutingInputs {
            tt_to_stops,
            non_transit_to_targets,
            nearby_stops,
            walk_speed_mm_per_s: DEFAULT_WALK_SPEED_MM_PER_S,
        }
    }
}

fn seed_from_origin(lat: f64, lon: f64) -> u64 {
    let mut bits = lat.to_bits() ^ lon.to_bits().rotate_left(32);
    // Fixed-point avalanche so nearby coordinates don't produce
    // near-identical seeds (splitmix64 finalizer).
    bits ^= bits >> 30;
    bits = bits.wrapping_mul(0xbf58476d1ce4e5b9);
    bits ^= bits >> 27;
    bits = bits.wrapping_mul(0x94d049bb133111eb);
    bits ^= bits >> 31;
    bits
}

#[cfg(test)]
mod tests {
    use super::*;
    use broker_propagator::{AnalysisTask, GridDimensions, IterationSource};

    fn template() -> TaskTemplate {
        TaskTemplate {
            grid: GridDimensions { width: 3, height: 3 },
            analysis: AnalysisTask {
                percentiles: vec![50],
                cutoff_seconds: 3_600,
                iteration_source: IterationSource::MonteCarlo { draws: 5 },
                destination_opportunity_counts: None,
            },
        }
    }

    #[test]
    fn same_origin_yields_identical_routing_inputs() {
        let source = SyntheticTravelTimeSource::default();
        let template = template();
        let a = source.load(47.6, -122.3, &template);
        let b = source.load(47.6, -122.3, &template);
        assert_eq!(a.tt_to_stops, b.tt_to_stops);
        assert_eq!(a.non_transit_to_targets, b.non_transit_to_targets);
    }

    #[test]
    fn different_origins_yield_different_routing_inputs() {
        let source = SyntheticTravelTimeSource::default();
        let template = template();
        let a = source.load(47.6, -122.3, &template);
        let b = source.load(47.7, -122.4, &template);
        assert_ne!(a.non_transit_to_targets, b.non_transit_to_targets);
    }

    #[test]
    fn shapes_match_the_template() {
        let source = SyntheticTravelTimeSource::default();
        let template = template();
        let inputs = source.load(47.6, -122.3, &template);
        assert_eq!(inputs.tt_to_stops.len(), 5);
        assert_eq!(inputs.non_transit_to_targets.len(), 9);
        assert_eq!(inputs.nearby_stops.len(), 9);
    }
}
