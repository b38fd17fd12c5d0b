//! Scenario runner tests
//!
//! Run the altitude and localization scenarios end to end on seeded
//! simulated data and check the reported summaries.

use std::io::Write;
use std::path::PathBuf;

use approx::assert_relative_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;

use aerofilter_core::estimation::KalmanConfig;
use aerofilter_core::map::MapError;
use aerofilter_sim::config::{AltitudeScenario, LocalizationScenario, PoseConfig, ScenarioConfig};
use aerofilter_sim::{run_altitude, run_localization, ScenarioError};

mod altitude_tests {
    use super::*;

    fn quiet_kalman() -> KalmanConfig {
        KalmanConfig {
            velocity_sigma: 0.05,
            position_sigma: 0.01,
            ..Default::default()
        }
    }

    #[test]
    fn test_altitude_hold_reaches_target() {
        let _ = env_logger::builder().is_test(true).try_init();
        let scenario = AltitudeScenario {
            kalman: quiet_kalman(),
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let run = run_altitude(&scenario, &mut rng).unwrap();

        assert_eq!(run.steps, 300);
        assert_relative_eq!(run.final_altitude, scenario.target_altitude, epsilon = 0.3);
        assert!((run.final_estimate - run.final_altitude).abs() < 0.3);
        assert!(run.kalman_rms < run.altimeter_rms);
        assert!(run.complementary_rms < run.altimeter_rms);
        assert!(run.mean_nis.is_finite() && run.mean_nis > 0.0);
    }

    #[test]
    fn test_calibration_recovers_sensor_errors() {
        let scenario = AltitudeScenario {
            steps: 10,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(2);
        let run = run_altitude(&scenario, &mut rng).unwrap();

        let sensors = &scenario.sensors;
        assert_relative_eq!(run.calibration.x.scale, sensors.accel_scale.x, epsilon = 0.01);
        assert_relative_eq!(run.calibration.z.scale, sensors.accel_scale.z, epsilon = 0.01);
        assert_relative_eq!(run.calibration.y.bias, sensors.accel_bias.y, epsilon = 0.02);
    }

    #[test]
    fn test_calibration_can_be_skipped() {
        let scenario = AltitudeScenario {
            steps: 5,
            calibration_samples: 0,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(3);
        let run = run_altitude(&scenario, &mut rng).unwrap();
        assert_eq!(run.calibration.z.scale, 1.0);
        assert_eq!(run.calibration.z.bias, 0.0);
    }

    #[test]
    fn test_invalid_filter_parameters_are_reported() {
        let scenario = AltitudeScenario {
            complementary_tau: 0.0,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(4);
        assert!(matches!(
            run_altitude(&scenario, &mut rng),
            Err(ScenarioError::Filter(_))
        ));

        let scenario = AltitudeScenario {
            kalman: KalmanConfig {
                sensor_sigma: 0.0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            run_altitude(&scenario, &mut rng),
            Err(ScenarioError::Kalman(_))
        ));
    }
}

mod localization_tests {
    use super::*;

    #[test]
    fn test_default_localization_converges() {
        let _ = env_logger::builder().is_test(true).try_init();
        let scenario = LocalizationScenario::default();
        let mut rng = StdRng::seed_from_u64(42);
        let run = run_localization(&scenario, &mut rng).unwrap();

        assert_eq!(run.errors.len(), scenario.steps);
        assert_eq!(run.particles, scenario.particles);
        assert!(run.final_error() < 5.0, "final error {}", run.final_error());
    }

    #[test]
    fn test_start_inside_wall_is_rejected() {
        let scenario = LocalizationScenario {
            ground_truth: PoseConfig {
                x: 0.5,
                y: 0.5,
                heading_deg: 0.0,
            },
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(5);
        assert!(matches!(
            run_localization(&scenario, &mut rng),
            Err(ScenarioError::InvalidStart { .. })
        ));
    }

    #[test]
    fn test_missing_map_file_is_reported() {
        let scenario = LocalizationScenario {
            map_file: Some(PathBuf::from("/nonexistent/map.csv")),
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(6);
        assert!(matches!(
            run_localization(&scenario, &mut rng),
            Err(ScenarioError::Map(MapError::Io(_)))
        ));
    }

    #[test]
    fn test_zero_particles_is_reported() {
        let scenario = LocalizationScenario {
            particles: 0,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(7);
        assert!(matches!(
            run_localization(&scenario, &mut rng),
            Err(ScenarioError::Particle(_))
        ));
    }
}

#[test]
fn test_config_file_drives_both_scenarios() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "seed: 3\naltitude:\n  steps: 20\nlocalization:\n  particles: 300\n  steps: 2"
    )
    .unwrap();

    let config = ScenarioConfig::load(file.path()).unwrap();
    let mut rng = StdRng::seed_from_u64(config.seed);
    let altitude = run_altitude(&config.altitude, &mut rng).unwrap();
    let localization = run_localization(&config.localization, &mut rng).unwrap();

    assert_eq!(altitude.steps, 20);
    assert_eq!(localization.particles, 300);
    assert_eq!(localization.errors.len(), 2);
}
