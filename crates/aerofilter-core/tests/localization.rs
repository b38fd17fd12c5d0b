//! Particle filter localization tests
//!
//! End-to-end checks of the weighting and full filter cycle on small
//! hand-built occupancy maps:
//! 1. Ray casting against a known obstacle
//! 2. Importance weights concentrate on the colocated particle
//! 3. The filter cloud converges onto the simulated ground truth

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use approx::assert_relative_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;

use aerofilter_core::estimation::{
    particle_filter, sample_from_prior, sensor_fusion, shoot_rays, Control, MotionNoise,
    ParticleEstimate, ParticleFilterConfig, Pose,
};
use aerofilter_core::{OccupancyMap, RangeSensorModel};

/// 600x600 room with a few asymmetric blocks
fn warehouse() -> OccupancyMap {
    let mut map = OccupancyMap::bordered(600, 600).unwrap();
    map.fill_rect(430, 490, 460, 520);
    map.fill_rect(100, 300, 180, 340);
    map.fill_rect(250, 100, 270, 260);
    map.fill_rect(480, 150, 560, 200);
    map
}

/// 120x120 room for the full filter run
fn small_room() -> OccupancyMap {
    let mut map = OccupancyMap::bordered(120, 120).unwrap();
    map.fill_rect(20, 20, 35, 30);
    map.fill_rect(80, 15, 90, 50);
    map.fill_rect(15, 85, 50, 95);
    map.fill_rect(70, 75, 75, 105);
    map
}

mod ray_tests {
    use super::*;

    #[test]
    fn test_diagonal_ray_hits_obstacle() {
        let mut map = OccupancyMap::empty(800, 800).unwrap();
        map.set_obstacle(435, 500);
        let sensor = RangeSensorModel::default();

        let ranges = shoot_rays(&map, &sensor, &Pose::new(385.0, 450.0, FRAC_PI_4), 1);
        assert_relative_eq!(ranges[0], 50.0 * 2f64.sqrt(), epsilon = 1e-3);
    }

    #[test]
    fn test_rays_cover_full_circle() {
        let map = warehouse();
        let sensor = RangeSensorModel::new(1000.0).unwrap();
        let pose = Pose::new(300.0, 400.0, 0.0);

        let ranges = shoot_rays(&map, &sensor, &pose, 4);
        assert_eq!(ranges.len(), 4);
        // East, north (+y), west, south (-y) to the border walls
        assert_relative_eq!(ranges[0], 299.0, epsilon = 1e-2);
        assert_relative_eq!(ranges[1], 199.0, epsilon = 1e-2);
        assert_relative_eq!(ranges[2], 300.0, epsilon = 1e-2);
        assert_relative_eq!(ranges[3], 400.0, epsilon = 1e-2);
    }
}

mod weighting_tests {
    use super::*;

    #[test]
    fn test_colocated_particle_dominates() {
        let map = warehouse();
        let sensor = RangeSensorModel::new(1000.0).unwrap();
        let truth = Pose::new(400.0, 440.0, FRAC_PI_4);
        let measured = shoot_rays(&map, &sensor, &truth, 8);

        let particles = vec![
            Pose::new(120.0, 120.0, 0.0),
            truth,
            Pose::new(520.0, 420.0, PI),
            Pose::new(300.0, 520.0, FRAC_PI_2),
            Pose::new(200.0, 450.0, 3.0 * FRAC_PI_2),
        ];
        let weights = sensor_fusion(&map, &sensor, &particles, &measured).unwrap();

        assert_relative_eq!(weights.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        assert!(weights[1] > 0.99, "colocated weight {}", weights[1]);
        for (i, w) in weights.iter().enumerate().filter(|(i, _)| *i != 1) {
            assert!(*w < 0.01, "particle {} weight {}", i, w);
        }
    }

    #[test]
    fn test_long_scan_does_not_underflow() {
        let map = warehouse();
        let sensor = RangeSensorModel::new(1000.0).unwrap();
        let truth = Pose::new(400.0, 440.0, 0.3);
        let measured = shoot_rays(&map, &sensor, &truth, 360);

        let particles = vec![Pose::new(120.0, 120.0, 0.0), Pose::new(520.0, 420.0, 1.0)];
        let weights = sensor_fusion(&map, &sensor, &particles, &measured).unwrap();

        assert!(weights.iter().all(|w| w.is_finite()));
        assert_relative_eq!(weights.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
    }
}

mod filter_tests {
    use super::*;

    #[test]
    fn test_particle_filter_converges_to_truth() {
        let _ = env_logger::builder().is_test(true).try_init();
        let map = small_room();
        let mut rng = StdRng::seed_from_u64(2024);

        let config = ParticleFilterConfig {
            sensor: RangeSensorModel::default(),
            noise: MotionNoise::default(),
            rays: 16,
            ..Default::default()
        };
        let truth = Pose::new(40.5, 60.5, 0.0);
        let particles = sample_from_prior(&map, 2000, Some(&truth), &mut rng).unwrap();
        let control = Control::new(0.0, 2.0, 1.0);

        let (particles, final_truth) =
            particle_filter(&map, &config, truth, particles, 5, &control, &mut rng).unwrap();

        assert_eq!(particles.len(), 2000);
        let estimate = ParticleEstimate::from_particles(&particles, None).unwrap();
        let error = estimate.pose.distance_to(&final_truth);
        assert!(error < 5.0, "centroid {:?} vs truth {:?}", estimate.pose, final_truth);
    }

    #[test]
    fn test_particle_filter_is_reproducible() {
        let map = small_room();
        let config = ParticleFilterConfig::default();
        let truth = Pose::new(40.5, 60.5, 0.0);
        let control = Control::new(0.05, 1.0, 1.0);

        let run = |seed: u64| {
            let mut rng = StdRng::seed_from_u64(seed);
            let particles = sample_from_prior(&map, 200, Some(&truth), &mut rng).unwrap();
            particle_filter(&map, &config, truth, particles, 3, &control, &mut rng).unwrap()
        };

        assert_eq!(run(7), run(7));
    }
}
