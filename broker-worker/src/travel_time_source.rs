//! The seam between this worker and the (out-of-scope)
//! street-graph router and RAPTOR transit search: a real worker would
//! compute these arrays from its pre-loaded transport network; this
//! crate only depends on the shape.

use broker_propagator::{NearbyStop, TaskTemplate};

/// Everything [`broker_propagator::Propagator::run`] needs for one
/// origin, beyond the job-wide `TaskTemplate`.
pub struct RoutingInputs {
    /// `ttToStops[iter][stop]`.
    pub tt_to_stops: Vec<Vec<i32>>,
    /// `nonTransitToTargets[t]`.
    pub non_transit_to_targets: Vec<i32>,
    /// `nearbyStops[t]`, one sparse table per destination target.
    pub nearby_stops: Vec<Vec<NearbyStop>>,
    pub walk_speed_mm_per_s: u32,
}

/// Supplies the per-origin routing inputs for a delivered task. Real
/// implementations run street-graph Dijkstra and RAPTOR against a
/// pre-loaded network (out of scope here); this trait is the boundary.
pub trait TravelTimeSource: Send + Sync {
    fn load(&self, lat: f64, lon: f64, template: &TaskTemplate) -> RoutingInputs;
}
