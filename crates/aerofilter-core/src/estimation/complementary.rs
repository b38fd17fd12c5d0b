//! Complementary altitude filter
//!
//! Blends the dead-reckoned altitude (previous estimate advanced by the
//! vertical rate) with the measured altitude:
//!
//! ```text
//! alpha = tau / (tau + dt)
//! z     = alpha·(z_prev + ż·dt) + (1 - alpha)·z_measured
//! ```
//!
//! A large `tau` trusts the integrated rate, a small one the altimeter.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    #[error("time constant must be positive and finite, got {0}")]
    InvalidTimeConstant(f64),
    #[error("time step must be positive and finite, got {0}")]
    InvalidTimeStep(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComplementaryFilter {
    tau: f64,
    dt: f64,
    alpha: f64,
    estimate: f64,
}

impl ComplementaryFilter {
    pub fn new(tau: f64, dt: f64, initial: f64) -> Result<Self, FilterError> {
        if !(tau > 0.0) || !tau.is_finite() {
            return Err(FilterError::InvalidTimeConstant(tau));
        }
        if !(dt > 0.0) || !dt.is_finite() {
            return Err(FilterError::InvalidTimeStep(dt));
        }
        Ok(Self {
            tau,
            dt,
            alpha: tau / (tau + dt),
            estimate: initial,
        })
    }

    /// Fuse one vertical rate and one altitude reading
    pub fn update(&mut self, vertical_rate: f64, measured: f64) -> f64 {
        let predicted = self.estimate + vertical_rate * self.dt;
        self.estimate = self.alpha * predicted + (1.0 - self.alpha) * measured;
        self.estimate
    }

    pub fn reset(&mut self, initial: f64) {
        self.estimate = initial;
    }

    pub fn estimate(&self) -> f64 {
        self.estimate
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn tau(&self) -> f64 {
        self.tau
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }
}
