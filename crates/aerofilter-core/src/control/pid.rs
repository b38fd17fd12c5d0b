//! Altitude controller
//!
//! PID on the altitude error using the filter's belief as feedback.
//! Output is the commanded vertical acceleration, which is what the
//! altitude Kalman filter takes as control input.

use serde::{Deserialize, Serialize};

use crate::estimation::{GaussianBelief, KalmanError};

/// Altitude controller gains
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PidGains {
    /// Proportional gain
    pub kp: f64,
    /// Integral gain
    pub ki: f64,
    /// Derivative gain
    pub kd: f64,
    /// Maximum integral error magnitude
    pub max_integral: f64,
}

impl Default for PidGains {
    fn default() -> Self {
        Self {
            kp: 2.0,
            ki: 0.1,
            kd: 2.5,
            max_integral: 5.0,
        }
    }
}

/// Altitude PID with integral clamp
#[derive(Debug, Clone)]
pub struct AltitudeController {
    pub gains: PidGains,
    /// Integral error accumulator
    integral_error: f64,
}

impl AltitudeController {
    pub fn new(gains: PidGains) -> Self {
        Self {
            gains,
            integral_error: 0.0,
        }
    }

    /// Commanded vertical acceleration
    ///
    /// a_cmd = kp·(z_des - z) + ki·∫(z_des - z) + kd·(ż_des - ż) + a_ff
    pub fn compute(
        &mut self,
        altitude: f64,
        vertical_rate: f64,
        altitude_des: f64,
        vertical_rate_des: f64,
        acc_ff: f64,
        dt: f64,
    ) -> f64 {
        let pos_error = altitude_des - altitude;
        let vel_error = vertical_rate_des - vertical_rate;

        // Anti-windup
        let max_integral = self.gains.max_integral.abs();
        self.integral_error = (self.integral_error + pos_error * dt).clamp(-max_integral, max_integral);

        self.gains.kp * pos_error + self.gains.ki * self.integral_error + self.gains.kd * vel_error + acc_ff
    }

    /// Hold `altitude_des` using a `[velocity, position]` belief as feedback
    ///
    /// Fails without touching the integral when the belief is not two-dimensional.
    pub fn compute_from_belief(
        &mut self,
        belief: &GaussianBelief,
        altitude_des: f64,
        dt: f64,
    ) -> Result<f64, KalmanError> {
        if belief.dim() != 2 {
            return Err(KalmanError::DimensionMismatch {
                what: "altitude belief",
                expected: 2,
                found: belief.dim(),
            });
        }
        let mean = belief.mean();
        Ok(self.compute(mean[1], mean[0], altitude_des, 0.0, 0.0, dt))
    }

    pub fn integral_error(&self) -> f64 {
        self.integral_error
    }

    /// Reset integral accumulator
    pub fn reset(&mut self) {
        self.integral_error = 0.0;
    }
}

impl Default for AltitudeController {
    fn default() -> Self {
        Self::new(PidGains::default())
    }
}
