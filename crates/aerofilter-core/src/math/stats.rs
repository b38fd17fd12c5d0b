//! Scalar densities and log-domain helpers

use std::f64::consts::TAU;

/// Gaussian probability density N(x; mean, std)
pub fn gaussian_pdf(x: f64, mean: f64, std: f64) -> f64 {
    let z = (x - mean) / std;
    (-0.5 * z * z).exp() / (std * TAU.sqrt())
}

/// Uniform density over [low, high], zero outside
pub fn uniform_pdf(x: f64, low: f64, high: f64) -> f64 {
    if x >= low && x <= high && high > low {
        1.0 / (high - low)
    } else {
        0.0
    }
}

/// Normalize log-weights into probabilities that sum to one
///
/// Shifts by the maximum before exponentiating. Returns `None` if every
/// entry is `-inf` (all likelihoods zero) or any entry is NaN.
pub fn normalize_log_weights(log_weights: &[f64]) -> Option<Vec<f64>> {
    if log_weights.is_empty() || log_weights.iter().any(|l| l.is_nan()) {
        return None;
    }

    let max = log_weights
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return None;
    }

    let shifted: Vec<f64> = log_weights.iter().map(|l| (l - max).exp()).collect();
    let sum: f64 = shifted.iter().sum();
    if !(sum > 0.0) || !sum.is_finite() {
        return None;
    }

    Some(shifted.into_iter().map(|w| w / sum).collect())
}
