//! Accelerometer with scale, bias and noise

use nalgebra::Vector3;
use rand::Rng;
use rand_distr::StandardNormal;

use super::SensorConfig;

/// Raw accelerometer model `raw = scale ⊙ f + bias + n`
#[derive(Debug, Clone, PartialEq)]
pub struct Accelerometer {
    pub scale: Vector3<f64>,
    pub bias: Vector3<f64>,
    pub noise_std: f64,
}

impl Accelerometer {
    pub fn from_config(config: &SensorConfig) -> Self {
        Self {
            scale: config.accel_scale,
            bias: config.accel_bias,
            noise_std: config.accel_noise_std.abs(),
        }
    }

    /// Raw reading for a true specific force
    pub fn measure<R: Rng + ?Sized>(&self, specific_force: &Vector3<f64>, rng: &mut R) -> Vector3<f64> {
        let noise = Vector3::from_fn(|_, _| {
            let n: f64 = rng.sample(StandardNormal);
            self.noise_std * n
        });
        specific_force.component_mul(&self.scale) + self.bias + noise
    }
}

/// Specific force seen at rest in the six axis-aligned orientations
pub fn six_position_references(gravity: f64) -> Vec<Vector3<f64>> {
    vec![
        Vector3::new(gravity, 0.0, 0.0),
        Vector3::new(-gravity, 0.0, 0.0),
        Vector3::new(0.0, gravity, 0.0),
        Vector3::new(0.0, -gravity, 0.0),
        Vector3::new(0.0, 0.0, gravity),
        Vector3::new(0.0, 0.0, -gravity),
    ]
}
