//! Particle filter localization
//!
//! Non-parametric belief over a planar pose, observed through a ray-cast
//! range sensor on an occupancy map. One cycle is
//!
//! ```text
//! propagate (motion + noise) -> weight (scan likelihood) -> resample
//! ```
//!
//! Weights are transient: they are produced by [`sensor_fusion`] and
//! consumed by [`resample`], never stored on the particles.

pub mod pose;
pub mod prior;
pub mod resample;
pub mod weighting;

pub use pose::*;
pub use prior::*;
pub use resample::*;
pub use weighting::*;

use log::{debug, info};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::map::OccupancyMap;
use crate::math::circular_mean;
use crate::sensors::{RangeSensorModel, SensorError};

#[derive(Debug, Error)]
pub enum ParticleError {
    #[error("particle set must not be empty")]
    EmptyParticleSet,
    #[error("map has no free cell to sample particles from")]
    NoFreeCells,
    #[error("scan must contain at least one range")]
    NoMeasurements,
    #[error("expected {expected} weights, found {found}")]
    WeightCount { expected: usize, found: usize },
    #[error("importance weights are all zero or not finite")]
    DegenerateWeights,
    #[error("motion noise std must be finite and non-negative: {0:?}")]
    InvalidNoise(MotionNoise),
    #[error("ray count must be positive")]
    NoRays,
    #[error(transparent)]
    Sensor(#[from] SensorError),
}

/// Particle filter parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleFilterConfig {
    /// Range sensor model
    pub sensor: RangeSensorModel,
    /// Motion noise for particles and for the simulated ground truth
    pub noise: MotionNoise,
    /// Rays per scan
    pub rays: usize,
    /// Resampling scheme
    pub resampling: ResamplingScheme,
}

impl Default for ParticleFilterConfig {
    fn default() -> Self {
        Self {
            sensor: RangeSensorModel::default(),
            noise: MotionNoise::default(),
            rays: 8,
            resampling: ResamplingScheme::Systematic,
        }
    }
}

impl ParticleFilterConfig {
    pub fn validate(&self) -> Result<(), ParticleError> {
        self.sensor.validate()?;
        if !self.noise.is_valid() {
            return Err(ParticleError::InvalidNoise(self.noise));
        }
        if self.rays == 0 {
            return Err(ParticleError::NoRays);
        }
        Ok(())
    }
}

/// Summary of a particle cloud for reporting
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParticleEstimate {
    /// Weighted mean position and circular mean heading
    pub pose: Pose,
    /// Weighted RMS distance of the particles from the mean position
    pub spread: f64,
}

impl ParticleEstimate {
    /// Estimate from a particle set; equal weights when `weights` is `None`
    pub fn from_particles(particles: &[Pose], weights: Option<&[f64]>) -> Result<Self, ParticleError> {
        if particles.is_empty() {
            return Err(ParticleError::EmptyParticleSet);
        }
        let uniform = vec![1.0 / particles.len() as f64; particles.len()];
        let weights = match weights {
            Some(w) if w.len() != particles.len() => {
                return Err(ParticleError::WeightCount {
                    expected: particles.len(),
                    found: w.len(),
                })
            }
            Some(w) => w,
            None => &uniform[..],
        };
        let total: f64 = weights.iter().sum();
        if !(total > 0.0) || !total.is_finite() {
            return Err(ParticleError::DegenerateWeights);
        }

        let (sx, sy) = particles
            .iter()
            .zip(weights)
            .fold((0.0, 0.0), |(sx, sy), (p, w)| (sx + w * p.x, sy + w * p.y));
        let (x, y) = (sx / total, sy / total);

        // Heading is meaningless when headings cancel out; fall back to the
        // heaviest particle's heading
        let heading = circular_mean(particles.iter().zip(weights).map(|(p, w)| (p.heading, *w)))
            .unwrap_or_else(|| {
                particles
                    .iter()
                    .zip(weights)
                    .max_by(|a, b| a.1.total_cmp(b.1))
                    .map(|(p, _)| p.heading)
                    .unwrap_or(0.0)
            });

        let spread = (particles
            .iter()
            .zip(weights)
            .map(|(p, w)| w * ((p.x - x).powi(2) + (p.y - y).powi(2)))
            .sum::<f64>()
            / total)
            .sqrt();

        Ok(Self {
            pose: Pose::new(x, y, heading),
            spread,
        })
    }
}

/// Particle filter bound to a read-only occupancy map
#[derive(Debug, Clone)]
pub struct ParticleFilter<'m> {
    map: &'m OccupancyMap,
    config: ParticleFilterConfig,
    particles: Vec<Pose>,
}

impl<'m> ParticleFilter<'m> {
    /// Filter over an explicit, non-empty particle set
    pub fn new(
        map: &'m OccupancyMap,
        config: ParticleFilterConfig,
        particles: Vec<Pose>,
    ) -> Result<Self, ParticleError> {
        config.validate()?;
        if particles.is_empty() {
            return Err(ParticleError::EmptyParticleSet);
        }
        Ok(Self {
            map,
            config,
            particles,
        })
    }

    /// Filter initialized from the map prior, see [`sample_from_prior`]
    pub fn from_prior<R: Rng + ?Sized>(
        map: &'m OccupancyMap,
        config: ParticleFilterConfig,
        n: usize,
        seed_state: Option<&Pose>,
        rng: &mut R,
    ) -> Result<Self, ParticleError> {
        config.validate()?;
        let particles = sample_from_prior(map, n, seed_state, rng)?;
        Self::new(map, config, particles)
    }

    /// Move every particle through the motion model, each with its own noise
    pub fn propagate<R: Rng + ?Sized>(&mut self, control: &Control, rng: &mut R) {
        let noise = self.config.noise;
        for p in &mut self.particles {
            *p = propagate(p, control, &noise, rng);
        }
    }

    /// Normalized importance weights against a measured scan
    pub fn weigh(&self, measured: &[f64]) -> Result<Vec<f64>, ParticleError> {
        sensor_fusion(self.map, &self.config.sensor, &self.particles, measured)
    }

    /// Replace the particle set by a draw proportional to `weights`
    pub fn resample<R: Rng + ?Sized>(&mut self, weights: &[f64], rng: &mut R) -> Result<(), ParticleError> {
        self.particles = resample(&self.particles, weights, self.config.resampling, rng)?;
        Ok(())
    }

    /// One full propagate, weight, resample cycle
    ///
    /// Returns the weighted estimate taken before resampling. On error the
    /// particles keep their propagated state.
    pub fn step<R: Rng + ?Sized>(
        &mut self,
        control: &Control,
        measured: &[f64],
        rng: &mut R,
    ) -> Result<ParticleEstimate, ParticleError> {
        self.propagate(control, rng);
        let weights = self.weigh(measured)?;
        let estimate = ParticleEstimate::from_particles(&self.particles, Some(&weights))?;
        self.resample(&weights, rng)?;
        Ok(estimate)
    }

    /// Unweighted estimate of the current particle set
    pub fn estimate(&self) -> Result<ParticleEstimate, ParticleError> {
        ParticleEstimate::from_particles(&self.particles, None)
    }

    pub fn particles(&self) -> &[Pose] {
        &self.particles
    }

    pub fn into_particles(self) -> Vec<Pose> {
        self.particles
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn config(&self) -> &ParticleFilterConfig {
        &self.config
    }

    pub fn map(&self) -> &'m OccupancyMap {
        self.map
    }
}

/// Run the filter against a simulated ground truth for `n_timesteps` cycles
///
/// Each cycle propagates the ground truth and the particles with the same
/// control (independent noise draws), takes `config.rays` simulated
/// readings from the ground truth, weights and resamples. Returns the
/// final particle set and the final ground truth.
pub fn particle_filter<R: Rng + ?Sized>(
    map: &OccupancyMap,
    config: &ParticleFilterConfig,
    ground_truth: Pose,
    particles: Vec<Pose>,
    n_timesteps: usize,
    control: &Control,
    rng: &mut R,
) -> Result<(Vec<Pose>, Pose), ParticleError> {
    let mut filter = ParticleFilter::new(map, config.clone(), particles)?;
    let mut truth = ground_truth;

    for t in 0..n_timesteps {
        truth = propagate(&truth, control, &config.noise, rng);
        let measured = config
            .sensor
            .measure_rays(map, truth.x, truth.y, truth.heading, config.rays, rng);

        let estimate = filter.step(control, &measured, rng)?;
        debug!(
            "step {}: truth ({:.1}, {:.1}), estimate ({:.1}, {:.1}), spread {:.2}",
            t,
            truth.x,
            truth.y,
            estimate.pose.x,
            estimate.pose.y,
            estimate.spread
        );
    }

    info!(
        "particle filter finished {} steps with {} particles",
        n_timesteps,
        filter.len()
    );
    Ok((filter.into_particles(), truth))
}
