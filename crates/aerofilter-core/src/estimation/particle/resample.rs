//! Resampling: draw a new particle population proportional to weight

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::ParticleError;

/// Scheme used to draw indices proportional to weight
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResamplingScheme {
    /// One uniform offset, N evenly spaced pointers through the CDF
    #[default]
    Systematic,
    /// N independent categorical draws
    Multinomial,
}

/// Draw `particles.len()` particles with replacement, proportional to `weights`
///
/// Weights need not be normalized but must be non-negative, finite, and
/// have a positive sum. Only existing particles are returned.
pub fn resample<T, R>(
    particles: &[T],
    weights: &[f64],
    scheme: ResamplingScheme,
    rng: &mut R,
) -> Result<Vec<T>, ParticleError>
where
    T: Clone,
    R: Rng + ?Sized,
{
    if particles.is_empty() {
        return Err(ParticleError::EmptyParticleSet);
    }
    if weights.len() != particles.len() {
        return Err(ParticleError::WeightCount {
            expected: particles.len(),
            found: weights.len(),
        });
    }
    if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return Err(ParticleError::DegenerateWeights);
    }
    let total: f64 = weights.iter().sum();
    if !(total > 0.0) || !total.is_finite() {
        return Err(ParticleError::DegenerateWeights);
    }

    let indices = match scheme {
        ResamplingScheme::Systematic => systematic_indices(weights, total, rng),
        ResamplingScheme::Multinomial => {
            let dist = WeightedIndex::new(weights).map_err(|_| ParticleError::DegenerateWeights)?;
            (0..particles.len()).map(|_| dist.sample(rng)).collect()
        }
    };

    Ok(indices.into_iter().map(|i| particles[i].clone()).collect())
}

fn systematic_indices<R: Rng + ?Sized>(weights: &[f64], total: f64, rng: &mut R) -> Vec<usize> {
    let n = weights.len();
    let step = total / n as f64;
    // Offset in (0, step] so a pointer never lands on a zero-weight prefix
    let offset = (1.0 - rng.gen::<f64>()) * step;
    let last = weights.iter().rposition(|&w| w > 0.0).unwrap_or(n - 1);

    let mut indices = Vec::with_capacity(n);
    let mut i = 0;
    let mut cumulative = weights[0];
    for m in 0..n {
        let pointer = offset + m as f64 * step;
        // Floating error in the running sum can leave the last pointer
        // past the end; it then stays on the last weighted index
        while pointer > cumulative && i < last {
            i += 1;
            cumulative += weights[i];
        }
        indices.push(i);
    }
    indices
}
