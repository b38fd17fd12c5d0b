//! Importance weighting of particles against a range scan

use log::{debug, trace};
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::{ParticleError, Pose};
use crate::map::{cast_rays, OccupancyMap};
use crate::math::normalize_log_weights;
use crate::sensors::RangeSensorModel;

/// Expected ranges of `k` evenly spaced rays cast from `state`
///
/// Ray `i` points at `heading + i·2π/k`. Rays that leave the map or reach
/// max range without a hit read `sensor.max_range`.
pub fn shoot_rays(map: &OccupancyMap, sensor: &RangeSensorModel, state: &Pose, k: usize) -> Vec<f64> {
    cast_rays(map, state.x, state.y, state.heading, k, sensor.max_range)
}

/// Likelihood that `state` produced the `measured` scan
///
/// Product of [`RangeSensorModel::lookup_prob`] over rays.
pub fn importance(
    map: &OccupancyMap,
    sensor: &RangeSensorModel,
    state: &Pose,
    measured: &[f64],
) -> f64 {
    shoot_rays(map, sensor, state, measured.len())
        .into_iter()
        .zip(measured)
        .map(|(expected, &z)| sensor.lookup_prob(expected, z))
        .product()
}

/// Natural log of [`importance`]
pub fn log_importance(
    map: &OccupancyMap,
    sensor: &RangeSensorModel,
    state: &Pose,
    measured: &[f64],
) -> f64 {
    shoot_rays(map, sensor, state, measured.len())
        .into_iter()
        .zip(measured)
        .map(|(expected, &z)| sensor.lookup_prob(expected, z).ln())
        .sum()
}

/// Normalized importance weights of every particle
///
/// The per-particle likelihoods are combined in the log domain and shifted
/// by their maximum before normalization, so long scans cannot underflow
/// every weight to zero. The result equals the normalized products.
pub fn sensor_fusion(
    map: &OccupancyMap,
    sensor: &RangeSensorModel,
    particles: &[Pose],
    measured: &[f64],
) -> Result<Vec<f64>, ParticleError> {
    if particles.is_empty() {
        return Err(ParticleError::EmptyParticleSet);
    }
    if measured.is_empty() {
        return Err(ParticleError::NoMeasurements);
    }

    #[cfg(feature = "parallel")]
    let log_weights: Vec<f64> = particles
        .par_iter()
        .map(|p| log_importance(map, sensor, p, measured))
        .collect();
    #[cfg(not(feature = "parallel"))]
    let log_weights: Vec<f64> = particles
        .iter()
        .map(|p| log_importance(map, sensor, p, measured))
        .collect();

    trace!("log-likelihoods: {:?}", log_weights);
    let weights = normalize_log_weights(&log_weights).ok_or(ParticleError::DegenerateWeights)?;
    debug!(
        "sensor fusion over {} particles, {} rays, ess {:.1}",
        particles.len(),
        measured.len(),
        effective_sample_size(&weights)
    );
    Ok(weights)
}

/// Effective sample size `1 / Σ wᵢ²` of normalized weights
pub fn effective_sample_size(weights: &[f64]) -> f64 {
    let sum_sq: f64 = weights.iter().map(|w| w * w).sum();
    if sum_sq > 0.0 {
        1.0 / sum_sq
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_4;

    fn room() -> OccupancyMap {
        let mut map = OccupancyMap::bordered(120, 80).unwrap();
        map.fill_rect(70, 20, 80, 35);
        map
    }

    #[test]
    fn test_shoot_rays_hits_known_obstacle() {
        let mut map = OccupancyMap::empty(800, 800).unwrap();
        map.set_obstacle(435, 500);
        let sensor = RangeSensorModel::new(200.0).unwrap();

        let ranges = shoot_rays(&map, &sensor, &Pose::new(385.0, 450.0, FRAC_PI_4), 1);
        assert_eq!(ranges.len(), 1);
        assert_relative_eq!(ranges[0], 70.71, epsilon = 0.01);
    }

    #[test]
    fn test_importance_matches_log_importance() {
        let map = room();
        let sensor = RangeSensorModel::new(100.0).unwrap();
        let truth = Pose::new(30.0, 40.0, 0.3);
        let measured = shoot_rays(&map, &sensor, &truth, 8);

        let other = Pose::new(50.0, 50.0, 0.3);
        let w = importance(&map, &sensor, &other, &measured);
        assert_relative_eq!(w.ln(), log_importance(&map, &sensor, &other, &measured), epsilon = 1e-9);
        assert!(importance(&map, &sensor, &truth, &measured) > w);
    }

    #[test]
    fn test_sensor_fusion_normalizes() {
        let map = room();
        let sensor = RangeSensorModel::new(100.0).unwrap();
        let truth = Pose::new(30.0, 40.0, 0.0);
        let measured = shoot_rays(&map, &sensor, &truth, 12);
        let particles = vec![
            truth,
            Pose::new(31.0, 40.0, 0.0),
            Pose::new(90.0, 60.0, 2.0),
            Pose::new(10.0, 10.0, 4.0),
        ];

        let weights = sensor_fusion(&map, &sensor, &particles, &measured).unwrap();
        assert_eq!(weights.len(), particles.len());
        assert_relative_eq!(weights.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        assert!(weights.iter().all(|w| *w >= 0.0));
        assert!(weights[0] > weights[2] && weights[0] > weights[3]);
    }

    #[test]
    fn test_sensor_fusion_survives_tiny_likelihoods() {
        let map = room();
        let sensor = RangeSensorModel::new(100.0).unwrap();
        let truth = Pose::new(30.0, 40.0, 0.0);
        // Enough rays that the raw products underflow to zero
        let measured = shoot_rays(&map, &sensor, &truth, 360);
        let particles = vec![Pose::new(90.0, 60.0, 2.0), Pose::new(10.0, 10.0, 4.0)];

        assert_eq!(importance(&map, &sensor, &particles[0], &measured), 0.0);
        let weights = sensor_fusion(&map, &sensor, &particles, &measured).unwrap();
        assert_relative_eq!(weights.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_sensor_fusion_degenerate() {
        let map = room();
        let sensor = RangeSensorModel::new(100.0).unwrap();
        // Readings beyond max range have zero likelihood under every hypothesis
        // far from them
        let measured = vec![1e6; 4];
        let particles = vec![Pose::new(30.0, 40.0, 0.0), Pose::new(50.0, 50.0, 1.0)];

        assert!(matches!(
            sensor_fusion(&map, &sensor, &particles, &measured),
            Err(ParticleError::DegenerateWeights)
        ));
    }

    #[test]
    fn test_sensor_fusion_rejects_empty_inputs() {
        let map = room();
        let sensor = RangeSensorModel::default();
        assert!(matches!(
            sensor_fusion(&map, &sensor, &[], &[1.0]),
            Err(ParticleError::EmptyParticleSet)
        ));
        assert!(matches!(
            sensor_fusion(&map, &sensor, &[Pose::new(5.0, 5.0, 0.0)], &[]),
            Err(ParticleError::NoMeasurements)
        ));
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_fusion_matches_sequential_order() {
        let map = room();
        let sensor = RangeSensorModel::new(100.0).unwrap();
        let measured = shoot_rays(&map, &sensor, &Pose::new(30.0, 40.0, 0.0), 16);
        let particles: Vec<Pose> = (0..64)
            .map(|i| Pose::new(5.0 + (i % 8) as f64 * 12.0, 5.0 + (i / 8) as f64 * 9.0, i as f64 * 0.1))
            .collect();

        let log_weights: Vec<f64> = particles
            .iter()
            .map(|p| log_importance(&map, &sensor, p, &measured))
            .collect();
        let sequential = normalize_log_weights(&log_weights).unwrap();
        let parallel = sensor_fusion(&map, &sensor, &particles, &measured).unwrap();

        assert_eq!(parallel.len(), sequential.len());
        for (p, s) in parallel.iter().zip(&sequential) {
            assert_relative_eq!(*p, *s, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_effective_sample_size() {
        assert_relative_eq!(effective_sample_size(&[0.25; 4]), 4.0, epsilon = 1e-12);
        assert_relative_eq!(effective_sample_size(&[1.0, 0.0, 0.0]), 1.0);
        assert_eq!(effective_sample_size(&[]), 0.0);
    }
}
