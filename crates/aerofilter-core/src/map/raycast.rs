//! Bresenham ray casting against the occupancy map
//!
//! A ray is walked cell by cell from the cell containing the origin to the
//! cell containing the max-range endpoint. The first occupied cell ends the
//! ray; leaving the map or reaching the endpoint yields `max_range`.

use std::f64::consts::TAU;

use super::OccupancyMap;
use crate::math::wrap_two_pi;

/// Integer cells on the Bresenham line between two cells, both ends included
#[derive(Debug, Clone)]
pub struct BresenhamLine {
    x: i64,
    y: i64,
    x1: i64,
    y1: i64,
    dx: i64,
    dy: i64,
    sx: i64,
    sy: i64,
    err: i64,
    done: bool,
}

impl BresenhamLine {
    pub fn new(start: (i64, i64), end: (i64, i64)) -> Self {
        let dx = (end.0 - start.0).abs();
        let dy = (end.1 - start.1).abs();
        Self {
            x: start.0,
            y: start.1,
            x1: end.0,
            y1: end.1,
            dx,
            dy,
            sx: if start.0 < end.0 { 1 } else { -1 },
            sy: if start.1 < end.1 { 1 } else { -1 },
            err: dx - dy,
            done: false,
        }
    }
}

impl Iterator for BresenhamLine {
    type Item = (i64, i64);

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let cell = (self.x, self.y);
        if self.x == self.x1 && self.y == self.y1 {
            self.done = true;
            return Some(cell);
        }

        let e2 = 2 * self.err;
        if e2 > -self.dy {
            self.err -= self.dy;
            self.x += self.sx;
        }
        if e2 < self.dx {
            self.err += self.dx;
            self.y += self.sy;
        }
        Some(cell)
    }
}

/// Distance from `(x, y)` along `bearing` to the first obstacle
///
/// Returns `max_range` when the ray leaves the map or reaches its endpoint
/// without hitting anything. Hits are measured from the origin position to
/// the hit cell's integer coordinates and never exceed `max_range`.
pub fn cast_ray(map: &OccupancyMap, x: f64, y: f64, bearing: f64, max_range: f64) -> f64 {
    let start = (x.floor() as i64, y.floor() as i64);
    let end_x = x + max_range * bearing.cos();
    let end_y = y + max_range * bearing.sin();
    let end = (end_x.floor() as i64, end_y.floor() as i64);

    for (cx, cy) in BresenhamLine::new(start, end) {
        if !map.cell_inbounds(cx, cy) {
            return max_range;
        }
        if map.is_occupied(cx, cy) {
            let distance = (cx as f64 - x).hypot(cy as f64 - y);
            return distance.min(max_range);
        }
    }
    max_range
}

/// Bearings of `count` evenly spaced rays starting at `heading`, in [0, 2π)
pub fn ray_bearings(heading: f64, count: usize) -> impl Iterator<Item = f64> {
    (0..count).map(move |i| wrap_two_pi(heading + i as f64 * TAU / count as f64))
}

/// Cast `count` evenly spaced rays from a pose
pub fn cast_rays(
    map: &OccupancyMap,
    x: f64,
    y: f64,
    heading: f64,
    count: usize,
    max_range: f64,
) -> Vec<f64> {
    ray_bearings(heading, count)
        .map(|bearing| cast_ray(map, x, y, bearing, max_range))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

    #[test]
    fn test_bresenham_diagonal() {
        let cells: Vec<_> = BresenhamLine::new((0, 0), (3, 3)).collect();
        assert_eq!(cells, vec![(0, 0), (1, 1), (2, 2), (3, 3)]);
    }

    #[test]
    fn test_bresenham_shallow_negative() {
        let cells: Vec<_> = BresenhamLine::new((4, 1), (0, 0)).collect();
        assert_eq!(cells.first(), Some(&(4, 1)));
        assert_eq!(cells.last(), Some(&(0, 0)));
        assert_eq!(cells.len(), 5);
    }

    #[test]
    fn test_bresenham_single_cell() {
        let cells: Vec<_> = BresenhamLine::new((2, 2), (2, 2)).collect();
        assert_eq!(cells, vec![(2, 2)]);
    }

    #[test]
    fn test_cast_ray_diagonal_obstacle() {
        let mut map = OccupancyMap::empty(800, 800).unwrap();
        map.set_obstacle(435, 500);

        let d = cast_ray(&map, 385.0, 450.0, FRAC_PI_4, 200.0);
        assert_relative_eq!(d, 70.710_678, epsilon = 1e-4);
    }

    #[test]
    fn test_cast_ray_axis_aligned_walls() {
        let map = OccupancyMap::bordered(100, 50).unwrap();

        assert_relative_eq!(cast_ray(&map, 20.0, 25.0, 0.0, 500.0), 79.0);
        assert_relative_eq!(cast_ray(&map, 20.0, 25.0, PI, 500.0), 20.0);
        assert_relative_eq!(cast_ray(&map, 20.0, 25.0, FRAC_PI_2, 500.0), 24.0);
    }

    #[test]
    fn test_cast_ray_open_space_returns_max_range() {
        let map = OccupancyMap::bordered(100, 100).unwrap();
        assert_eq!(cast_ray(&map, 50.0, 50.0, 0.0, 10.0), 10.0);
    }

    #[test]
    fn test_cast_ray_leaving_map_returns_max_range() {
        let map = OccupancyMap::empty(20, 20).unwrap();
        assert_eq!(cast_ray(&map, 10.0, 10.0, 0.3, 100.0), 100.0);
    }

    #[test]
    fn test_ray_bearings_wrap() {
        let bearings: Vec<f64> = ray_bearings(1.5 * PI, 4).collect();
        let expected = [1.5 * PI, 0.0, 0.5 * PI, PI];
        for (b, e) in bearings.iter().zip(expected) {
            assert!(*b >= 0.0 && *b < TAU);
            assert_relative_eq!(crate::math::angle_diff(*b, e), 0.0, epsilon = 1e-12);
        }
    }
}
