//! State estimation for the drone
//!
//! - Linear Kalman filter over a Gaussian belief (altitude)
//! - Particle filter over planar poses on an occupancy map
//! - Complementary altitude filter
//! - Accelerometer calibration by linear least squares

pub mod calibration;
pub mod complementary;
pub mod kalman;
pub mod models;
pub mod particle;

pub use calibration::*;
pub use complementary::*;
pub use kalman::*;
pub use models::*;
pub use particle::*;
