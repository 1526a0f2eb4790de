//! Reference worker-side binary: polls the broker for
//! origin tasks, feeds each one through [`broker_propagator::Propagator`],
//! and posts the reduced result back. Street-graph routing and the RAPTOR
//! transit algorithm are out of scope here; this crate depends on
//! [`travel_time_source::TravelTimeSource`] for the precomputed
//! iteration-by-stop/non-transit arrays a real worker would compute
//! instead, with a deterministic synthetic implementation standing in
//! for demonstration and integration testing.

pub mod client;
pub mod config;
pub mod error;
pub mod runner;
pub mod synthetic;
pub mod travel_time_source;
pub mod wire;

pub const VERSION: &str = broker_common::VERSION;
