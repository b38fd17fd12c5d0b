//! Linear Kalman filter
//!
//! Maintains a Gaussian belief over a linear-Gaussian state and alternates
//! prediction through a [`MotionModel`] with correction through an
//! [`ObservationModel`]. The filter can only be built from a validated
//! initial belief, so it is never in an uninitialized state.

use log::{debug, trace};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::models::{diagonal_noise, ComponentObservation, MotionModel, ObservationModel, VerticalMotion};

/// Relative tolerance for the symmetry and PSD checks
const SYMMETRY_TOL: f64 = 1e-9;

#[derive(Debug, Error, PartialEq)]
pub enum KalmanError {
    #[error("{what} has dimension {found}, expected {expected}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("covariance matrix is not square ({rows}x{cols})")]
    NotSquare { rows: usize, cols: usize },
    #[error("covariance matrix is not symmetric")]
    NotSymmetric,
    #[error("covariance matrix is not positive semidefinite (min eigenvalue {0})")]
    NotPositiveSemidefinite(f64),
    #[error("belief contains non-finite values")]
    NonFinite,
    #[error("innovation covariance is singular")]
    SingularInnovation,
    #[error("observation row {0} does not observe any state component")]
    UnobservedRow(usize),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Gaussian belief: mean and covariance over the same state components
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianBelief {
    mean: DVector<f64>,
    covariance: DMatrix<f64>,
}

impl GaussianBelief {
    /// Validate and build a belief
    ///
    /// The covariance must be square, match the mean's dimension, and be
    /// symmetric positive semidefinite.
    pub fn new(mean: DVector<f64>, covariance: DMatrix<f64>) -> Result<Self, KalmanError> {
        if mean.is_empty() {
            return Err(KalmanError::DimensionMismatch {
                what: "mean",
                expected: 1,
                found: 0,
            });
        }
        let (rows, cols) = covariance.shape();
        if rows != cols {
            return Err(KalmanError::NotSquare { rows, cols });
        }
        if rows != mean.len() {
            return Err(KalmanError::DimensionMismatch {
                what: "covariance",
                expected: mean.len(),
                found: rows,
            });
        }
        if mean.iter().chain(covariance.iter()).any(|v| !v.is_finite()) {
            return Err(KalmanError::NonFinite);
        }

        let scale = covariance.amax().max(1.0);
        if (&covariance - covariance.transpose()).amax() > SYMMETRY_TOL * scale {
            return Err(KalmanError::NotSymmetric);
        }
        let min_eig = covariance.clone().symmetric_eigenvalues().min();
        if min_eig < -SYMMETRY_TOL * scale {
            return Err(KalmanError::NotPositiveSemidefinite(min_eig));
        }

        Ok(Self { mean, covariance })
    }

    /// Belief of a given dimension built from per-component mean and std
    pub fn from_diagonal(mean: &[f64], sigmas: &[f64]) -> Result<Self, KalmanError> {
        Self::new(DVector::from_row_slice(mean), diagonal_noise(sigmas))
    }

    pub fn mean(&self) -> &DVector<f64> {
        &self.mean
    }

    pub fn covariance(&self) -> &DMatrix<f64> {
        &self.covariance
    }

    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    /// Trace of the covariance (total variance)
    pub fn trace(&self) -> f64 {
        self.covariance.trace()
    }

    /// Variance of a single component, `None` past the state dimension
    pub fn variance(&self, index: usize) -> Option<f64> {
        (index < self.dim()).then(|| self.covariance[(index, index)])
    }

    pub fn into_parts(self) -> (DVector<f64>, DMatrix<f64>) {
        (self.mean, self.covariance)
    }
}

/// Parameters of the vertical altitude filter
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KalmanConfig {
    /// Time step [s]
    pub dt: f64,
    /// Process noise std on velocity [m/s]
    pub velocity_sigma: f64,
    /// Process noise std on position [m]
    pub position_sigma: f64,
    /// Altimeter noise std [m]
    pub sensor_sigma: f64,
}

impl Default for KalmanConfig {
    fn default() -> Self {
        Self {
            dt: 0.1,
            velocity_sigma: 0.1,
            position_sigma: 0.1,
            sensor_sigma: 0.1,
        }
    }
}

/// Linear Kalman filter over a motion and an observation model
#[derive(Debug, Clone)]
pub struct KalmanFilter<M, O> {
    motion: M,
    observation: O,
    /// Time step the motion matrices are evaluated at
    dt: f64,
    /// Process noise covariance (Q)
    q: DMatrix<f64>,
    /// Current belief (latest of predicted or corrected)
    belief: GaussianBelief,
    predicted: Option<GaussianBelief>,
    corrected: Option<GaussianBelief>,
}

impl<M, O> KalmanFilter<M, O>
where
    M: MotionModel,
    O: ObservationModel,
{
    /// Create a filter from an initial belief
    pub fn new(
        motion: M,
        observation: O,
        dt: f64,
        q: DMatrix<f64>,
        initial: GaussianBelief,
    ) -> Result<Self, KalmanError> {
        if !(dt > 0.0) || !dt.is_finite() {
            return Err(KalmanError::InvalidParameter(format!("dt must be positive, got {dt}")));
        }
        let n = motion.state_dim();
        check_dim("process noise", n, q.nrows())?;
        check_dim("process noise", n, q.ncols())?;
        // Reuse the belief validation for Q's symmetry and PSD checks
        GaussianBelief::new(DVector::zeros(n), q.clone())?;

        let h = observation.observation_matrix(n);
        check_dim("observation matrix columns", n, h.ncols())?;
        check_dim("observation matrix rows", observation.observation_dim(), h.nrows())?;
        if let Some(row) = (0..h.nrows()).find(|&i| h.row(i).iter().all(|&v| v == 0.0)) {
            return Err(KalmanError::UnobservedRow(row));
        }
        let r = observation.noise_covariance();
        check_dim("observation noise", observation.observation_dim(), r.nrows())?;
        GaussianBelief::new(DVector::zeros(r.nrows()), r)?;

        let b = motion.control_input(dt);
        check_dim("control input matrix rows", n, b.nrows())?;
        check_dim("control input matrix columns", motion.control_dim(), b.ncols())?;

        check_dim("initial mean", n, initial.dim())?;

        Ok(Self {
            motion,
            observation,
            dt,
            q,
            belief: initial,
            predicted: None,
            corrected: None,
        })
    }

    /// Replace the belief with a new initial belief
    pub fn reset(&mut self, initial: GaussianBelief) -> Result<(), KalmanError> {
        check_dim("initial mean", self.motion.state_dim(), initial.dim())?;
        self.belief = initial;
        self.predicted = None;
        self.corrected = None;
        Ok(())
    }

    /// Prediction step
    ///
    /// ```text
    /// x̄ = A·x + B·u
    /// P̄ = A·P·Aᵀ + Q
    /// ```
    pub fn predict(&mut self, control: &DVector<f64>) -> Result<&GaussianBelief, KalmanError> {
        check_dim("control input", self.motion.control_dim(), control.len())?;

        let a = self.transition_matrix();
        let b = self.control_matrix();

        let mean = &a * self.belief.mean() + &b * control;
        let covariance = symmetrize(&a * self.belief.covariance() * a.transpose() + &self.q);
        trace!("kalman predict: mean {:?}", mean.as_slice());

        let predicted = GaussianBelief { mean, covariance };
        self.predicted = Some(predicted.clone());
        self.belief = predicted;
        Ok(&self.belief)
    }

    /// Innovation `ν = z - H·x̄` and its covariance `S = H·P̄·Hᵀ + R`
    pub fn innovation(
        &self,
        observation: &DVector<f64>,
    ) -> Result<(DVector<f64>, DMatrix<f64>), KalmanError> {
        check_dim(
            "observation",
            self.observation.observation_dim(),
            observation.len(),
        )?;
        let h = self.observation_matrix();
        let r = self.observation.noise_covariance();

        let nu = observation - &h * self.belief.mean();
        let s = &h * self.belief.covariance() * h.transpose() + r;
        Ok((nu, s))
    }

    /// Correction step
    ///
    /// ```text
    /// K = P̄·Hᵀ·S⁻¹
    /// x = x̄ + K·ν
    /// P = (I - K·H)·P̄
    /// ```
    ///
    /// The covariance is computed in Joseph form, which equals the line
    /// above for the optimal gain and keeps P symmetric PSD. On a singular
    /// innovation covariance the belief is left untouched.
    pub fn update(&mut self, observation: &DVector<f64>) -> Result<&GaussianBelief, KalmanError> {
        let (nu, s) = self.innovation(observation)?;
        let h = self.observation_matrix();
        let r = self.observation.noise_covariance();
        let p = self.belief.covariance();

        let chol = s.cholesky().ok_or(KalmanError::SingularInnovation)?;
        // K = P Hᵀ S⁻¹ = (S⁻¹ H P)ᵀ since P and S are symmetric
        let k = chol.solve(&(&h * p)).transpose();

        let n = self.belief.dim();
        let i_kh = DMatrix::<f64>::identity(n, n) - &k * &h;
        let covariance = symmetrize(&i_kh * p * i_kh.transpose() + &k * r * k.transpose());
        let mean = self.belief.mean() + &k * nu;
        debug!(
            "kalman update: trace {:.6} -> {:.6}",
            self.belief.trace(),
            covariance.trace()
        );

        let corrected = GaussianBelief { mean, covariance };
        self.corrected = Some(corrected.clone());
        self.belief = corrected;
        Ok(&self.belief)
    }

    /// Predict with `control`, then correct with `observation`
    pub fn step(
        &mut self,
        control: &DVector<f64>,
        observation: &DVector<f64>,
    ) -> Result<&GaussianBelief, KalmanError> {
        self.predict(control)?;
        self.update(observation)
    }

    /// Normalized innovation squared `νᵀ·S⁻¹·ν` against the current belief
    pub fn nis(&self, observation: &DVector<f64>) -> Result<f64, KalmanError> {
        let (nu, s) = self.innovation(observation)?;
        let chol = s.cholesky().ok_or(KalmanError::SingularInnovation)?;
        Ok(nu.dot(&chol.solve(&nu)))
    }

    /// Current belief
    pub fn belief(&self) -> &GaussianBelief {
        &self.belief
    }

    /// Belief produced by the last `predict`, if any since the last reset
    pub fn predicted(&self) -> Option<&GaussianBelief> {
        self.predicted.as_ref()
    }

    /// Belief produced by the last `update`, if any since the last reset
    pub fn corrected(&self) -> Option<&GaussianBelief> {
        self.corrected.as_ref()
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn transition_matrix(&self) -> DMatrix<f64> {
        self.motion.transition(self.dt)
    }

    pub fn control_matrix(&self) -> DMatrix<f64> {
        self.motion.control_input(self.dt)
    }

    pub fn observation_matrix(&self) -> DMatrix<f64> {
        self.observation.observation_matrix(self.motion.state_dim())
    }

    pub fn process_noise(&self) -> &DMatrix<f64> {
        &self.q
    }
}

/// Altitude filter: state `[velocity, position]`, altimeter on position
pub type AltitudeKalmanFilter = KalmanFilter<VerticalMotion, ComponentObservation>;

impl AltitudeKalmanFilter {
    /// Build the altitude filter from its configuration
    ///
    /// `Q = diag(velocity_sigma², position_sigma²)`, `R = sensor_sigma²`.
    pub fn altitude(config: &KalmanConfig, initial: GaussianBelief) -> Result<Self, KalmanError> {
        if !(config.sensor_sigma > 0.0) {
            return Err(KalmanError::InvalidParameter(format!(
                "sensor sigma must be positive, got {}",
                config.sensor_sigma
            )));
        }
        Self::new(
            VerticalMotion,
            ComponentObservation::altimeter(config.sensor_sigma),
            config.dt,
            diagonal_noise(&[config.velocity_sigma, config.position_sigma]),
            initial,
        )
    }

    /// Predict with a scalar vertical acceleration command
    pub fn predict_acceleration(&mut self, acceleration: f64) -> Result<&GaussianBelief, KalmanError> {
        self.predict(&DVector::from_element(1, acceleration))
    }

    /// Correct with a scalar altimeter reading
    pub fn update_altitude(&mut self, altitude: f64) -> Result<&GaussianBelief, KalmanError> {
        self.update(&DVector::from_element(1, altitude))
    }
}

fn check_dim(what: &'static str, expected: usize, found: usize) -> Result<(), KalmanError> {
    if expected == found {
        Ok(())
    } else {
        Err(KalmanError::DimensionMismatch {
            what,
            expected,
            found,
        })
    }
}

fn symmetrize(m: DMatrix<f64>) -> DMatrix<f64> {
    (&m + m.transpose()) * 0.5
}
