//! Sensor models
//!
//! - [`range`]: Lidar-style range sensor mixture, used both to simulate
//!   readings and to score them

pub mod range;

pub use range::*;
