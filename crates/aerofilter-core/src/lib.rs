//! # aerofilter core
//!
//! Recursive Bayesian estimators for a simulated drone, together with the
//! small collaborators needed to feed them with data.
//!
//! ## Modules
//!
//! - [`math`]: Angle wrapping, Gaussian densities, log-domain helpers
//! - [`estimation`]: Linear Kalman filter, particle filter, complementary
//!   filter, IMU calibration
//! - [`map`]: Occupancy grid and Bresenham ray casting
//! - [`sensors`]: Range sensor mixture model
//! - [`control`]: Altitude PID controller
//! - [`simulation`]: Ground-truth and sensor simulators

pub mod math;
pub mod estimation;
pub mod map;
pub mod sensors;
pub mod control;
pub mod simulation;

/// Gravity constant [m/s²]
pub const GRAVITY: f64 = 9.81;

pub use estimation::{
    GaussianBelief, KalmanFilter, ParticleFilter, Pose, ResamplingScheme,
};
pub use map::OccupancyMap;
pub use sensors::RangeSensorModel;
