//! Occupancy map and ray casting
//!
//! The map is a fixed grid of free/obstacle cells shared read-only by the
//! motion validity check and by the simulated range sensor.

pub mod occupancy;
pub mod raycast;

pub use occupancy::*;
pub use raycast::*;
