//! Simulated scenarios
//!
//! Each scenario wires the core estimators to the simulated collaborators
//! and returns a plain summary for the CLI to report:
//! - altitude: accelerometer calibration, then altitude hold on the
//!   Kalman belief with a complementary filter running alongside
//! - localization: particle filter tracking a pose on an occupancy map

use aerofilter_core::control::AltitudeController;
use aerofilter_core::estimation::{
    propagate, AccelCalibration, AltitudeKalmanFilter, CalibrationError, ComplementaryFilter,
    FilterError, GaussianBelief, KalmanError, ParticleError, ParticleEstimate, ParticleFilter,
    Pose,
};
use aerofilter_core::map::MapError;
use aerofilter_core::simulation::{six_position_references, Accelerometer, Altimeter, SensorConfig, VerticalTruth};
use aerofilter_core::GRAVITY;
use log::{debug, info};
use nalgebra::{DVector, Vector3};
use rand::Rng;
use thiserror::Error;

use crate::config::{AltitudeScenario, ConfigLoadError, LocalizationScenario};

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error(transparent)]
    Config(#[from] ConfigLoadError),
    #[error(transparent)]
    Map(#[from] MapError),
    #[error(transparent)]
    Kalman(#[from] KalmanError),
    #[error(transparent)]
    Particle(#[from] ParticleError),
    #[error(transparent)]
    Filter(#[from] FilterError),
    #[error(transparent)]
    Calibration(#[from] CalibrationError),
    #[error("ground truth ({x}, {y}) is not a free map cell")]
    InvalidStart { x: f64, y: f64 },
}

/// Summary of an altitude run
#[derive(Debug, Clone)]
pub struct AltitudeRun {
    pub steps: usize,
    pub calibration: AccelCalibration,
    pub final_altitude: f64,
    pub final_estimate: f64,
    /// Std of the final Kalman position belief
    pub final_std: f64,
    pub kalman_rms: f64,
    pub complementary_rms: f64,
    pub altimeter_rms: f64,
    /// Mean normalized innovation squared; close to 1 for a consistent filter
    pub mean_nis: f64,
}

/// Summary of a localization run
#[derive(Debug, Clone)]
pub struct LocalizationRun {
    pub steps: usize,
    pub particles: usize,
    pub final_truth: Pose,
    pub estimate: ParticleEstimate,
    /// Weighted estimate error against the truth after every step
    pub errors: Vec<f64>,
}

impl LocalizationRun {
    pub fn final_error(&self) -> f64 {
        self.estimate.pose.distance_to(&self.final_truth)
    }
}

/// Six-position accelerometer calibration
pub fn calibrate_accelerometer<R: Rng + ?Sized>(
    sensors: &SensorConfig,
    samples: usize,
    rng: &mut R,
) -> Result<AccelCalibration, ScenarioError> {
    if samples == 0 {
        return Ok(AccelCalibration::default());
    }
    let accel = Accelerometer::from_config(sensors);

    let mut reference = Vec::new();
    let mut measured = Vec::new();
    for orientation in six_position_references(GRAVITY) {
        for _ in 0..samples {
            reference.push(orientation);
            measured.push(accel.measure(&orientation, rng));
        }
    }

    let calibration = AccelCalibration::fit(&reference, &measured)?;
    info!(
        "accelerometer calibrated from {} samples, worst residual {:.4} m/s²",
        measured.len(),
        calibration.worst_residual()
    );
    Ok(calibration)
}

/// Altitude hold driven by the Kalman belief
///
/// The filter's control input is the calibrated accelerometer reading, its
/// observation the altimeter. The complementary filter blends the same
/// altimeter with the dead-reckoned vertical rate.
pub fn run_altitude<R: Rng + ?Sized>(
    scenario: &AltitudeScenario,
    rng: &mut R,
) -> Result<AltitudeRun, ScenarioError> {
    let calibration = calibrate_accelerometer(&scenario.sensors, scenario.calibration_samples, rng)?;

    let dt = scenario.kalman.dt;
    let accel = Accelerometer::from_config(&scenario.sensors);
    let altimeter = Altimeter::from_config(&scenario.sensors);
    let mut truth = VerticalTruth::new(0.0, scenario.initial_altitude)
        .with_velocity_noise(scenario.sensors.velocity_noise_std);

    let initial = GaussianBelief::from_diagonal(&[0.0, scenario.initial_altitude], &[1.0, 1.0])?;
    let mut kalman = AltitudeKalmanFilter::altitude(&scenario.kalman, initial)?;
    let mut complementary = ComplementaryFilter::new(scenario.complementary_tau, dt, scenario.initial_altitude)?;
    let mut controller = AltitudeController::new(scenario.pid);

    let mut dead_reckoned_rate = 0.0;
    let (mut kalman_sq, mut complementary_sq, mut altimeter_sq, mut nis_sum) = (0.0, 0.0, 0.0, 0.0);

    for k in 0..scenario.steps {
        let command = controller.compute_from_belief(kalman.belief(), scenario.target_altitude, dt)?;
        truth.step(command, dt, rng);

        let raw = accel.measure(&Vector3::new(0.0, 0.0, command + GRAVITY), rng);
        let measured_accel = calibration.apply(&raw).z - GRAVITY;
        let z = altimeter.measure(truth.position, rng);

        kalman.predict_acceleration(measured_accel)?;
        nis_sum += kalman.nis(&DVector::from_element(1, z))?;
        let estimate = kalman.update_altitude(z)?.mean()[1];

        dead_reckoned_rate += measured_accel * dt;
        let blended = complementary.update(dead_reckoned_rate, z);

        kalman_sq += (estimate - truth.position).powi(2);
        complementary_sq += (blended - truth.position).powi(2);
        altimeter_sq += (z - truth.position).powi(2);

        debug!(
            "t={:.2} truth {:.3} altimeter {:.3} kalman {:.3} complementary {:.3}",
            (k + 1) as f64 * dt,
            truth.position,
            z,
            estimate,
            blended
        );
    }

    let n = scenario.steps.max(1) as f64;
    let belief = kalman.belief();
    Ok(AltitudeRun {
        steps: scenario.steps,
        calibration,
        final_altitude: truth.position,
        final_estimate: belief.mean()[1],
        final_std: belief.variance(1).map_or(f64::NAN, f64::sqrt),
        kalman_rms: (kalman_sq / n).sqrt(),
        complementary_rms: (complementary_sq / n).sqrt(),
        altimeter_rms: (altimeter_sq / n).sqrt(),
        mean_nis: nis_sum / n,
    })
}

/// Particle filter tracking a simulated pose
pub fn run_localization<R: Rng + ?Sized>(
    scenario: &LocalizationScenario,
    rng: &mut R,
) -> Result<LocalizationRun, ScenarioError> {
    let map = scenario.build_map()?;
    let mut truth = scenario.ground_truth.to_pose();
    if !map.valid_location(truth.x, truth.y) {
        return Err(ScenarioError::InvalidStart {
            x: truth.x,
            y: truth.y,
        });
    }
    let control = scenario.control.to_control();
    let config = &scenario.filter;

    let seed = scenario.seed_heading.then_some(truth);
    let mut filter = ParticleFilter::from_prior(&map, config.clone(), scenario.particles, seed.as_ref(), rng)?;
    info!(
        "localizing on {}x{} map with {} particles, {} rays",
        map.width(),
        map.height(),
        filter.len(),
        config.rays
    );

    let mut errors = Vec::with_capacity(scenario.steps);
    for k in 0..scenario.steps {
        truth = propagate(&truth, &control, &config.noise, rng);
        let measured = config
            .sensor
            .measure_rays(&map, truth.x, truth.y, truth.heading, config.rays, rng);
        let estimate = filter.step(&control, &measured, rng)?;
        let error = estimate.pose.distance_to(&truth);
        debug!("step {}: error {:.2} cells, spread {:.2}", k, error, estimate.spread);
        errors.push(error);
    }

    Ok(LocalizationRun {
        steps: scenario.steps,
        particles: filter.len(),
        final_truth: truth,
        estimate: filter.estimate()?,
        errors,
    })
}
