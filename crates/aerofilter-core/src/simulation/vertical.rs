//! Vertical flight truth and altimeter

use rand::Rng;
use rand_distr::StandardNormal;

use super::SensorConfig;

/// True vertical state of the simulated drone
///
/// Advanced with the same kinematics the altitude filter assumes:
///
/// ```text
/// v' = v + a·dt + n_v
/// z' = z + v·dt + a·dt²/2
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VerticalTruth {
    pub velocity: f64,
    pub position: f64,
    /// Process noise std on velocity, per step
    pub velocity_noise_std: f64,
}

impl VerticalTruth {
    pub fn new(velocity: f64, position: f64) -> Self {
        Self {
            velocity,
            position,
            velocity_noise_std: 0.0,
        }
    }

    pub fn with_velocity_noise(mut self, std: f64) -> Self {
        self.velocity_noise_std = std;
        self
    }

    pub fn step<R: Rng + ?Sized>(&mut self, acceleration: f64, dt: f64, rng: &mut R) {
        self.position += self.velocity * dt + 0.5 * acceleration * dt * dt;
        self.velocity += acceleration * dt;
        if self.velocity_noise_std > 0.0 {
            let n: f64 = rng.sample(StandardNormal);
            self.velocity += self.velocity_noise_std * n;
        }
    }

    /// State as `[velocity, position]`
    pub fn state(&self) -> [f64; 2] {
        [self.velocity, self.position]
    }
}

/// Altimeter: true altitude plus zero-mean Gaussian noise
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Altimeter {
    noise_std: f64,
}

impl Altimeter {
    pub fn new(noise_std: f64) -> Self {
        Self {
            noise_std: noise_std.abs(),
        }
    }

    pub fn from_config(config: &SensorConfig) -> Self {
        Self::new(config.altimeter_noise_std)
    }

    pub fn noise_std(&self) -> f64 {
        self.noise_std
    }

    pub fn measure<R: Rng + ?Sized>(&self, true_altitude: f64, rng: &mut R) -> f64 {
        let n: f64 = rng.sample(StandardNormal);
        true_altitude + self.noise_std * n
    }
}
