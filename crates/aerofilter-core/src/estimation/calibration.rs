//! Accelerometer calibration by linear least squares
//!
//! Each axis is modelled as `measured = scale·reference + bias`. With the
//! drone held in known orientations the reference specific force is known,
//! so scale and bias fall out of an overdetermined linear system solved by
//! SVD.

use log::debug;
use nalgebra::{DMatrix, DVector, Vector3, SVD};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Relative singular value threshold below which a direction is treated as null
const RANK_TOLERANCE: f64 = 1e-10;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalibrationError {
    #[error("need at least {needed} samples, got {found}")]
    NotEnoughSamples { needed: usize, found: usize },
    #[error("{what}: expected {expected} rows, found {found}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("design matrix is rank deficient (rank {rank} < {cols})")]
    RankDeficient { rank: usize, cols: usize },
    #[error("fitted scale {0} cannot be inverted")]
    DegenerateScale(f64),
}

/// Minimum-norm least squares solution of `A·x ≈ b` via SVD
///
/// Requires at least as many rows as columns and a full column rank.
pub fn least_squares(a: &DMatrix<f64>, b: &DVector<f64>) -> Result<DVector<f64>, CalibrationError> {
    if a.nrows() != b.len() {
        return Err(CalibrationError::DimensionMismatch {
            what: "right-hand side",
            expected: a.nrows(),
            found: b.len(),
        });
    }
    if a.ncols() == 0 || a.nrows() < a.ncols() {
        return Err(CalibrationError::NotEnoughSamples {
            needed: a.ncols().max(1),
            found: a.nrows(),
        });
    }

    let svd = SVD::new(a.clone(), true, true);
    let largest = svd.singular_values.max();
    let eps = RANK_TOLERANCE * largest.max(f64::MIN_POSITIVE);
    let rank = svd.rank(eps);
    if rank < a.ncols() {
        return Err(CalibrationError::RankDeficient {
            rank,
            cols: a.ncols(),
        });
    }

    svd.solve(b, eps).map_err(|_| CalibrationError::RankDeficient {
        rank,
        cols: a.ncols(),
    })
}

/// Scale and bias of a single sensor axis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisCalibration {
    pub scale: f64,
    pub bias: f64,
    /// RMS of the fit residuals
    pub residual_rms: f64,
}

impl Default for AxisCalibration {
    fn default() -> Self {
        Self {
            scale: 1.0,
            bias: 0.0,
            residual_rms: 0.0,
        }
    }
}

impl AxisCalibration {
    /// Map a raw reading back to the reference frame: `(raw - bias) / scale`
    pub fn correct(&self, raw: f64) -> f64 {
        (raw - self.bias) / self.scale
    }
}

/// Fit `measured = scale·reference + bias` for one axis
pub fn calibrate_axis(reference: &[f64], measured: &[f64]) -> Result<AxisCalibration, CalibrationError> {
    if reference.len() != measured.len() {
        return Err(CalibrationError::DimensionMismatch {
            what: "measured samples",
            expected: reference.len(),
            found: measured.len(),
        });
    }
    if reference.len() < 2 {
        return Err(CalibrationError::NotEnoughSamples {
            needed: 2,
            found: reference.len(),
        });
    }

    let n = reference.len();
    let a = DMatrix::from_fn(n, 2, |i, j| if j == 0 { reference[i] } else { 1.0 });
    let b = DVector::from_column_slice(measured);
    let x = least_squares(&a, &b)?;

    let (scale, bias) = (x[0], x[1]);
    if !scale.is_finite() || scale.abs() < f64::EPSILON {
        return Err(CalibrationError::DegenerateScale(scale));
    }

    let residual = &a * &x - &b;
    let residual_rms = (residual.norm_squared() / n as f64).sqrt();

    Ok(AxisCalibration {
        scale,
        bias,
        residual_rms,
    })
}

/// Per-axis accelerometer calibration
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AccelCalibration {
    pub x: AxisCalibration,
    pub y: AxisCalibration,
    pub z: AxisCalibration,
}

impl AccelCalibration {
    /// Fit all three axes from paired reference/raw samples
    pub fn fit(reference: &[Vector3<f64>], measured: &[Vector3<f64>]) -> Result<Self, CalibrationError> {
        let axis = |i: usize| -> Result<AxisCalibration, CalibrationError> {
            let r: Vec<f64> = reference.iter().map(|v| v[i]).collect();
            let m: Vec<f64> = measured.iter().map(|v| v[i]).collect();
            calibrate_axis(&r, &m)
        };

        let calibration = Self {
            x: axis(0)?,
            y: axis(1)?,
            z: axis(2)?,
        };
        debug!(
            "accelerometer calibration: scale ({:.4}, {:.4}, {:.4}), bias ({:.4}, {:.4}, {:.4})",
            calibration.x.scale,
            calibration.y.scale,
            calibration.z.scale,
            calibration.x.bias,
            calibration.y.bias,
            calibration.z.bias
        );
        Ok(calibration)
    }

    /// Correct a raw accelerometer reading
    pub fn apply(&self, raw: &Vector3<f64>) -> Vector3<f64> {
        Vector3::new(
            self.x.correct(raw.x),
            self.y.correct(raw.y),
            self.z.correct(raw.z),
        )
    }

    /// Largest per-axis residual RMS
    pub fn worst_residual(&self) -> f64 {
        self.x
            .residual_rms
            .max(self.y.residual_rms)
            .max(self.z.residual_rms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_least_squares_exact() {
        let a = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
        let b = DVector::from_vec(vec![2.0, 3.0, 5.0]);
        let x = least_squares(&a, &b).unwrap();
        assert_relative_eq!(x[0], 2.0, epsilon = 1e-10);
        assert_relative_eq!(x[1], 3.0, epsilon = 1e-10);
    }

    #[test]
    fn test_least_squares_overdetermined_line_fit() {
        // Points symmetric about y = 1 + 2t
        let a = DMatrix::from_row_slice(4, 2, &[0.0, 1.0, 1.0, 1.0, 2.0, 1.0, 3.0, 1.0]);
        let b = DVector::from_vec(vec![1.1, 2.9, 5.1, 6.9]);
        let x = least_squares(&a, &b).unwrap();
        assert_relative_eq!(x[0], 1.96, epsilon = 1e-10);
        assert_relative_eq!(x[1], 1.06, epsilon = 1e-10);
    }

    #[test]
    fn test_least_squares_rank_deficient() {
        let a = DMatrix::from_row_slice(3, 2, &[1.0, 2.0, 2.0, 4.0, 3.0, 6.0]);
        let b = DVector::from_vec(vec![1.0, 2.0, 3.0]);
        assert!(matches!(
            least_squares(&a, &b),
            Err(CalibrationError::RankDeficient { rank: 1, cols: 2 })
        ));
    }

    #[test]
    fn test_least_squares_shape_errors() {
        let a = DMatrix::from_row_slice(1, 2, &[1.0, 1.0]);
        let b = DVector::from_vec(vec![1.0]);
        assert!(matches!(
            least_squares(&a, &b),
            Err(CalibrationError::NotEnoughSamples { needed: 2, found: 1 })
        ));

        let b = DVector::from_vec(vec![1.0, 2.0]);
        assert!(matches!(
            least_squares(&a, &b),
            Err(CalibrationError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_calibrate_axis_recovers_scale_and_bias() {
        let reference = [-9.81, 0.0, 9.81, 4.9, -4.9];
        let measured: Vec<f64> = reference.iter().map(|r| 1.02 * r + 0.15).collect();

        let cal = calibrate_axis(&reference, &measured).unwrap();
        assert_relative_eq!(cal.scale, 1.02, epsilon = 1e-10);
        assert_relative_eq!(cal.bias, 0.15, epsilon = 1e-10);
        assert_relative_eq!(cal.residual_rms, 0.0, epsilon = 1e-10);
        assert_relative_eq!(cal.correct(measured[2]), 9.81, epsilon = 1e-10);
    }

    #[test]
    fn test_calibrate_axis_errors() {
        assert!(matches!(
            calibrate_axis(&[1.0], &[1.0]),
            Err(CalibrationError::NotEnoughSamples { needed: 2, found: 1 })
        ));
        // Constant reference cannot separate scale from bias
        assert!(matches!(
            calibrate_axis(&[9.81, 9.81, 9.81], &[9.9, 9.8, 9.85]),
            Err(CalibrationError::RankDeficient { .. })
        ));
        assert!(matches!(
            calibrate_axis(&[1.0, 2.0], &[1.0]),
            Err(CalibrationError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_accel_calibration_apply() {
        let g = 9.81;
        let reference = vec![
            Vector3::new(g, 0.0, 0.0),
            Vector3::new(-g, 0.0, 0.0),
            Vector3::new(0.0, g, 0.0),
            Vector3::new(0.0, -g, 0.0),
            Vector3::new(0.0, 0.0, g),
            Vector3::new(0.0, 0.0, -g),
        ];
        let scale = Vector3::new(0.98, 1.01, 1.03);
        let bias = Vector3::new(0.2, -0.1, 0.05);
        let measured: Vec<Vector3<f64>> = reference
            .iter()
            .map(|r| r.component_mul(&scale) + bias)
            .collect();

        let cal = AccelCalibration::fit(&reference, &measured).unwrap();
        assert_relative_eq!(cal.z.scale, 1.03, epsilon = 1e-10);
        assert_relative_eq!(cal.x.bias, 0.2, epsilon = 1e-10);
        assert!(cal.worst_residual() < 1e-10);

        for (r, m) in reference.iter().zip(&measured) {
            assert_relative_eq!(cal.apply(m), *r, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_default_calibration_is_identity() {
        let raw = Vector3::new(0.1, -0.2, 9.7);
        assert_eq!(AccelCalibration::default().apply(&raw), raw);
    }
}
