//! Linear motion and observation models for the Kalman filter
//!
//! Matrices are pure functions of the time step, so nothing here is
//! cached or mutated after construction.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// Linear motion model `x' = A(dt)·x + B(dt)·u`
pub trait MotionModel {
    /// Dimension of the state vector
    fn state_dim(&self) -> usize;
    /// Dimension of the control vector
    fn control_dim(&self) -> usize;
    /// State transition matrix A
    fn transition(&self, dt: f64) -> DMatrix<f64>;
    /// Control input matrix B
    fn control_input(&self, dt: f64) -> DMatrix<f64>;
}

/// Linear observation model `z = H·x + v`, `v ~ N(0, R)`
pub trait ObservationModel {
    /// Dimension of the observation vector
    fn observation_dim(&self) -> usize;
    /// Observation matrix H for a state of the given dimension
    fn observation_matrix(&self, state_dim: usize) -> DMatrix<f64>;
    /// Sensor noise covariance R
    fn noise_covariance(&self) -> DMatrix<f64>;
}

/// Vertical motion of the drone, state `[velocity, position]`
///
/// Control is the commanded vertical acceleration:
///
/// ```text
/// v' = v + a·dt
/// z' = z + v·dt + a·dt²/2
/// ```
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct VerticalMotion;

impl MotionModel for VerticalMotion {
    fn state_dim(&self) -> usize {
        2
    }

    fn control_dim(&self) -> usize {
        1
    }

    fn transition(&self, dt: f64) -> DMatrix<f64> {
        DMatrix::from_row_slice(2, 2, &[1.0, 0.0, dt, 1.0])
    }

    fn control_input(&self, dt: f64) -> DMatrix<f64> {
        DMatrix::from_row_slice(2, 1, &[dt, 0.5 * dt * dt])
    }
}

/// Observes one component of the state with Gaussian noise
///
/// For [`VerticalMotion`] the altimeter observes index 1 (position).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ComponentObservation {
    /// Observed state index
    pub index: usize,
    /// Sensor noise std
    pub sigma: f64,
}

impl ComponentObservation {
    /// Altimeter reading of the vertical position
    pub fn altimeter(sigma: f64) -> Self {
        Self { index: 1, sigma }
    }
}

impl ObservationModel for ComponentObservation {
    fn observation_dim(&self) -> usize {
        1
    }

    fn observation_matrix(&self, state_dim: usize) -> DMatrix<f64> {
        let mut h = DMatrix::zeros(1, state_dim);
        if self.index < state_dim {
            h[(0, self.index)] = 1.0;
        }
        h
    }

    fn noise_covariance(&self) -> DMatrix<f64> {
        DMatrix::from_element(1, 1, self.sigma.powi(2))
    }
}

/// Diagonal process noise from per-component standard deviations
pub fn diagonal_noise(sigmas: &[f64]) -> DMatrix<f64> {
    DMatrix::from_diagonal(&DVector::from_iterator(
        sigmas.len(),
        sigmas.iter().map(|s| s * s),
    ))
}
