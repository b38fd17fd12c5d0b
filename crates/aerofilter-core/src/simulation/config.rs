//! Simulated sensor configuration

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Sensor noise and error configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// Altimeter noise std [m]
    pub altimeter_noise_std: f64,
    /// Accelerometer noise std [m/s²]
    pub accel_noise_std: f64,
    /// Accelerometer per-axis scale factor
    pub accel_scale: Vector3<f64>,
    /// Accelerometer per-axis bias [m/s²]
    pub accel_bias: Vector3<f64>,
    /// Process noise on the true vertical velocity [m/s per step]
    pub velocity_noise_std: f64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            altimeter_noise_std: 0.1,
            accel_noise_std: 0.02,
            accel_scale: Vector3::new(1.02, 0.98, 1.01),
            accel_bias: Vector3::new(0.15, -0.08, 0.2),
            velocity_noise_std: 0.0,
        }
    }
}

impl SensorConfig {
    /// Perfect sensors: no noise, unit scale, zero bias
    pub fn ideal() -> Self {
        Self {
            altimeter_noise_std: 0.0,
            accel_noise_std: 0.0,
            accel_scale: Vector3::new(1.0, 1.0, 1.0),
            accel_bias: Vector3::zeros(),
            velocity_noise_std: 0.0,
        }
    }
}
