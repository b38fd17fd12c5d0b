//! Angle helpers
//!
//! Headings are kept in [0, 2π) throughout the crate.

use std::f64::consts::{PI, TAU};

/// Wrap an angle into [0, 2π)
pub fn wrap_two_pi(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// Wrap an angle into [-π, π)
pub fn wrap_pi(angle: f64) -> f64 {
    wrap_two_pi(angle + PI) - PI
}

/// Signed shortest difference `a - b` on the circle, in [-π, π)
pub fn angle_diff(a: f64, b: f64) -> f64 {
    wrap_pi(a - b)
}

/// Weighted circular mean of a set of angles
///
/// Returns `None` when the resultant vector vanishes (e.g. two opposite
/// headings with equal weight), since no mean direction exists.
pub fn circular_mean<I>(angles_and_weights: I) -> Option<f64>
where
    I: IntoIterator<Item = (f64, f64)>,
{
    let (s, c) = angles_and_weights
        .into_iter()
        .fold((0.0, 0.0), |(s, c), (theta, w)| {
            (s + w * theta.sin(), c + w * theta.cos())
        });

    if s.hypot(c) < 1e-12 {
        None
    } else {
        Some(wrap_two_pi(s.atan2(c)))
    }
}
