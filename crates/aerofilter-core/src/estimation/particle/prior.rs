//! Prior sampling of valid particles over the map

use std::f64::consts::TAU;

use log::debug;
use rand::Rng;
use rand_distr::StandardNormal;

use super::{ParticleError, Pose};
use crate::map::OccupancyMap;

/// Std of the heading prior around a known seed heading (0.5°)
pub const SEEDED_HEADING_STD: f64 = 0.5 * std::f64::consts::PI / 180.0;

/// Draw `n` particles at valid map locations by rejection sampling
///
/// Positions are uniform over the map extents. With a `seed_state` the
/// heading is drawn from a narrow Gaussian around the seed's heading; the
/// seed's position is not used. Without one the heading is uniform.
pub fn sample_from_prior<R: Rng + ?Sized>(
    map: &OccupancyMap,
    n: usize,
    seed_state: Option<&Pose>,
    rng: &mut R,
) -> Result<Vec<Pose>, ParticleError> {
    if n == 0 {
        return Err(ParticleError::EmptyParticleSet);
    }
    if map.free_cell_count() == 0 {
        return Err(ParticleError::NoFreeCells);
    }

    let width = map.width() as f64;
    let height = map.height() as f64;
    let mut particles = Vec::with_capacity(n);
    let mut attempts = 0usize;

    while particles.len() < n {
        attempts += 1;
        let x = rng.gen_range(0.0..width);
        let y = rng.gen_range(0.0..height);
        let heading = match seed_state {
            Some(seed) => {
                let z: f64 = rng.sample(StandardNormal);
                seed.heading + SEEDED_HEADING_STD * z
            }
            None => rng.gen_range(0.0..TAU),
        };

        if map.valid_location(x, y) {
            particles.push(Pose::new(x, y, heading));
        }
    }

    debug!("sampled {} prior particles in {} draws", n, attempts);
    Ok(particles)
}
