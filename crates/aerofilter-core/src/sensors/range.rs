//! Range sensor mixture model
//!
//! A reading is drawn from a three-component mixture:
//!
//! ```text
//! p(z | z*) = 0.95 · N(z; z*, σ_hit)        (hit)
//!           + 0.03 · U(z; 0, z_max)         (random return)
//!           + 0.02 · 𝟙[z = z_max]           (sensor failure, point mass)
//! ```
//!
//! [`RangeSensorModel::measure`] samples exactly this process and
//! [`RangeSensorModel::lookup_prob`] evaluates it, so readings produced by
//! the simulator are scored by their true likelihood.

use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::map::{cast_rays, OccupancyMap};
use crate::math::{gaussian_pdf, uniform_pdf};

/// Mixture weight of the Gaussian hit component
pub const HIT_WEIGHT: f64 = 0.95;
/// Mixture weight of the uniform random-return component
pub const RANDOM_WEIGHT: f64 = 0.03;
/// Mixture weight of the max-range failure point mass
pub const FAILURE_WEIGHT: f64 = 0.02;

#[derive(Debug, Error, PartialEq)]
pub enum SensorError {
    #[error("max range must be positive and finite, got {0}")]
    InvalidMaxRange(f64),
    #[error("hit noise std must be positive and finite, got {0}")]
    InvalidHitStd(f64),
}

/// Range sensor parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RangeSensorModel {
    /// Maximum range [cells]
    pub max_range: f64,
    /// Std of the hit component around the expected range [cells]
    pub hit_std: f64,
}

impl Default for RangeSensorModel {
    fn default() -> Self {
        Self {
            max_range: 200.0,
            hit_std: 1.0,
        }
    }
}

impl RangeSensorModel {
    pub fn new(max_range: f64) -> Result<Self, SensorError> {
        let sensor = Self {
            max_range,
            ..Self::default()
        };
        sensor.validate()?;
        Ok(sensor)
    }

    pub fn with_hit_std(mut self, hit_std: f64) -> Result<Self, SensorError> {
        self.hit_std = hit_std;
        self.validate()?;
        Ok(self)
    }

    /// Check parameters, e.g. after deserializing
    pub fn validate(&self) -> Result<(), SensorError> {
        if !(self.max_range > 0.0) || !self.max_range.is_finite() {
            return Err(SensorError::InvalidMaxRange(self.max_range));
        }
        if !(self.hit_std > 0.0) || !self.hit_std.is_finite() {
            return Err(SensorError::InvalidHitStd(self.hit_std));
        }
        Ok(())
    }

    /// Likelihood of reading `measured` when the true range is `expected`
    pub fn lookup_prob(&self, expected: f64, measured: f64) -> f64 {
        let hit = HIT_WEIGHT * gaussian_pdf(measured, expected, self.hit_std);
        let random = RANDOM_WEIGHT * uniform_pdf(measured, 0.0, self.max_range);
        let failure = if measured == self.max_range {
            FAILURE_WEIGHT
        } else {
            0.0
        };
        hit + random + failure
    }

    /// Draw one reading for a true range of `expected`
    pub fn measure<R: Rng + ?Sized>(&self, expected: f64, rng: &mut R) -> f64 {
        let u: f64 = rng.gen();
        if u < HIT_WEIGHT {
            let n: f64 = rng.sample(StandardNormal);
            expected + self.hit_std * n
        } else if u < HIT_WEIGHT + RANDOM_WEIGHT {
            rng.gen_range(0.0..=self.max_range)
        } else {
            self.max_range
        }
    }

    /// Noise-free ranges of `count` evenly spaced rays from `(x, y, heading)`
    pub fn expected_ranges(
        &self,
        map: &OccupancyMap,
        x: f64,
        y: f64,
        heading: f64,
        count: usize,
    ) -> Vec<f64> {
        cast_rays(map, x, y, heading, count, self.max_range)
    }

    /// Simulated scan: one [`measure`](Self::measure) draw per ray
    pub fn measure_rays<R: Rng + ?Sized>(
        &self,
        map: &OccupancyMap,
        x: f64,
        y: f64,
        heading: f64,
        count: usize,
        rng: &mut R,
    ) -> Vec<f64> {
        self.expected_ranges(map, x, y, heading, count)
            .into_iter()
            .map(|expected| self.measure(expected, rng))
            .collect()
    }
}
