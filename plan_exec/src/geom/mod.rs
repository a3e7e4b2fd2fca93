//! # Geometry and Frenet utilities
//!
//! Pure functions shared by the rest of the planner. The Frenet frame used throughout is
//! index based: `s` is measured in waypoints from the start of the path it was computed on, and
//! `d` is the signed offset along the waypoint normal (positive to the right).

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod interp;
mod spline;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::route::Waypoint;
use nalgebra::Vector2;

pub use interp::{interpolate, InterpError, InterpParams, Interpolated};
pub use spline::CubicSpline;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A position expressed in the Frenet frame of a path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frenet {
    /// Longitudinal position in waypoint indices. Negative behind the first waypoint.
    pub s: f64,

    /// Lateral offset along the waypoint normal, positive to the right.
    pub d: f64,
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Euclidean distance between two points.
pub fn distance(a: &Vector2<f64>, b: &Vector2<f64>) -> f64 {
    (a - b).norm()
}

/// Index of the waypoint closest to `point`, or `None` if the path is empty.
pub fn closest_index(path: &[Waypoint], point: &Vector2<f64>) -> Option<usize> {
    closest_index_in(path, point, 0, path.len())
}

/// Index of the waypoint closest to `point`, searching only the `horizon` waypoints from
/// `start`.
///
/// The returned index is relative to the whole path. Returns `None` if the search range is
/// empty.
pub fn closest_index_in(
    path: &[Waypoint],
    point: &Vector2<f64>,
    start: usize,
    horizon: usize,
) -> Option<usize> {
    let end = start.saturating_add(horizon).min(path.len());

    if start >= end {
        return None;
    }

    let mut best: Option<(usize, f64)> = None;

    for (i, wp) in path[start..end].iter().enumerate() {
        let dist_sq = (wp.position_m - point).norm_squared();

        match best {
            Some((_, d)) if d <= dist_sq => (),
            _ => best = Some((start + i, dist_sq)),
        }
    }

    best.map(|(i, _)| i)
}

/// Index of the first waypoint within `max_dist_m` of `point`, walked forward to the nearest
/// waypoint of that pass.
///
/// Unlike [`closest_index`] this picks the earliest pass of a path that visits the same place
/// more than once, such as a lap with an overlapping tail. Returns `None` if no waypoint is
/// within reach.
pub fn first_closest_within(
    path: &[Waypoint],
    point: &Vector2<f64>,
    max_dist_m: f64,
) -> Option<usize> {
    let max_sq = max_dist_m * max_dist_m;
    let dist_sq = |wp: &Waypoint| (wp.position_m - point).norm_squared();

    let mut idx = path.iter().position(|wp| dist_sq(wp) <= max_sq)?;

    while let Some(next) = path.get(idx + 1) {
        if dist_sq(next) < dist_sq(&path[idx]) {
            idx += 1;
        } else {
            break;
        }
    }

    Some(idx)
}

/// Project a point into the Frenet frame of the given path.
///
/// `s` is the closest waypoint index plus the fractional distance along the neighbouring
/// segment, so waypoint `i` projects to exactly `(i, 0)`. Returns `None` for an empty path.
pub fn project_to_frenet(path: &[Waypoint], point: &Vector2<f64>) -> Option<Frenet> {
    let idx = closest_index(path, point)?;
    let wp = &path[idx];
    let rel = point - wp.position_m;

    let d = rel.dot(&wp.normal);

    // Pick the segment the point lies along. Ahead of the waypoint use the next segment, behind
    // it use the previous one.
    let next_seg = path.get(idx + 1).map(|n| n.position_m - wp.position_m);
    let prev_seg = if idx > 0 {
        Some(wp.position_m - path[idx - 1].position_m)
    } else {
        None
    };

    let frac = match (next_seg, prev_seg) {
        (Some(next), prev) => {
            let along = along_fraction(&rel, &next);
            match prev {
                Some(prev) if along < 0.0 => along_fraction(&rel, &prev),
                _ => along,
            }
        }
        (None, Some(prev)) => along_fraction(&rel, &prev),
        (None, None) => 0.0,
    };

    Some(Frenet {
        s: idx as f64 + frac,
        d,
    })
}

/// Time until the ego vehicle closes the given gap on a lead vehicle.
///
/// Returns `None` when the lead is not slower than the ego, meaning there is no hazard.
pub fn time_to_collision(gap_m: f64, lead_speed_mps: f64, ego_speed_mps: f64) -> Option<f64> {
    let closing_mps = ego_speed_mps - lead_speed_mps;

    if closing_mps > 0.0 {
        Some(gap_m / closing_mps)
    } else {
        None
    }
}

/// Distance needed to stop from the given speed at a constant deceleration.
pub fn stopping_distance(speed_mps: f64, decel_mps2: f64) -> f64 {
    if decel_mps2 <= 0.0 {
        return std::f64::INFINITY;
    }

    speed_mps.powi(2) / (2.0 * decel_mps2)
}

/// Fraction of `seg` covered by the projection of `rel` onto it.
fn along_fraction(rel: &Vector2<f64>, seg: &Vector2<f64>) -> f64 {
    let len_sq = seg.norm_squared();

    if len_sq <= std::f64::EPSILON {
        0.0
    } else {
        rel.dot(seg) / len_sq
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
