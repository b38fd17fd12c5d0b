//! Planar pose and the noisy bicycle-style motion model

use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use crate::math::wrap_two_pi;

/// State hypothesis `(x, y, heading)` in map cells and radians
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    /// Heading in [0, 2π)
    pub heading: f64,
}

impl Pose {
    pub fn new(x: f64, y: f64, heading: f64) -> Self {
        Self {
            x,
            y,
            heading: wrap_two_pi(heading),
        }
    }

    /// Euclidean distance between the positions of two poses
    pub fn distance_to(&self, other: &Pose) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Control applied during one propagation step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Control {
    /// Steering angle [rad]
    pub steering: f64,
    /// Forward speed [cells/s]
    pub speed: f64,
    /// Time step [s]
    pub dt: f64,
}

impl Control {
    pub fn new(steering: f64, speed: f64, dt: f64) -> Self {
        Self { steering, speed, dt }
    }
}

/// Standard deviations of the zero-mean motion noise
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionNoise {
    /// x noise std [cells]
    pub x_std: f64,
    /// y noise std [cells]
    pub y_std: f64,
    /// Heading noise std [rad]
    pub heading_std: f64,
}

impl Default for MotionNoise {
    fn default() -> Self {
        Self {
            x_std: 1.0,
            y_std: 1.0,
            heading_std: 0.015,
        }
    }
}

impl MotionNoise {
    /// No noise at all; propagation becomes deterministic
    pub fn none() -> Self {
        Self {
            x_std: 0.0,
            y_std: 0.0,
            heading_std: 0.0,
        }
    }

    pub fn is_valid(&self) -> bool {
        [self.x_std, self.y_std, self.heading_std]
            .iter()
            .all(|s| s.is_finite() && *s >= 0.0)
    }
}

/// Advance a pose through the motion model with its own noise draw
///
/// ```text
/// x' = x + v·cos(θ)·dt + n_x
/// y' = y + v·sin(θ)·dt + n_y
/// θ' = θ + v·tan(α)·dt + n_θ
/// ```
pub fn propagate<R: Rng + ?Sized>(
    pose: &Pose,
    control: &Control,
    noise: &MotionNoise,
    rng: &mut R,
) -> Pose {
    let Control {
        steering,
        speed,
        dt,
    } = *control;

    let n_x: f64 = rng.sample(StandardNormal);
    let n_y: f64 = rng.sample(StandardNormal);
    let n_theta: f64 = rng.sample(StandardNormal);

    Pose::new(
        pose.x + speed * pose.heading.cos() * dt + noise.x_std * n_x,
        pose.y + speed * pose.heading.sin() * dt + noise.y_std * n_y,
        pose.heading + speed * steering.tan() * dt + noise.heading_std * n_theta,
    )
}
