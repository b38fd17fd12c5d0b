//! Mathematical utilities
//!
//! Angle wrapping on the circle and the scalar probability densities
//! shared by the sensor models and the estimators.

pub mod angle;
pub mod stats;

pub use angle::*;
pub use stats::*;
