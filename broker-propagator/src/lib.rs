// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The per-target propagation kernel a worker runs for every delivered
//! task: combine an iteration-by-stop travel time matrix with a
//! per-target table of nearby stops to produce percentile travel times
//! and, optionally, cumulative-opportunity accessibility.

pub mod error;
pub mod message;
pub mod propagator;
pub mod reducer;

pub use error::PropagatorError;
pub use message::{
    AnalysisTask, GridDimensions, IterationSource, NearbyStop, PropagationInput, RegionalWorkResult,
    TaskTemplate,
};
pub use propagator::Propagator;
pub use reducer::TravelTimeReducer;

/// Sentinel marking "no path within the search horizon".
/// Chosen as `i32::MAX` rather than a narrower cap so any real, reachable
/// time (always `< cutoffSeconds`, itself far below `i32::MAX`) can never
/// collide with it.
pub const UNREACHED: i32 = i32::MAX;
