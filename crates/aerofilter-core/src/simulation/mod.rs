//! Simulated collaborators for the estimators
//!
//! Stand-ins for the real drone and its sensors: vertical flight truth,
//! a noisy altimeter and a miscalibrated accelerometer. Planar pose truth
//! uses [`crate::estimation::propagate`] and range readings use
//! [`crate::sensors::RangeSensorModel::measure`].

pub mod config;
pub mod imu;
pub mod vertical;

pub use config::*;
pub use imu::*;
pub use vertical::*;
