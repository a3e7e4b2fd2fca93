//! Path interpolation with curvature and curvature-limited velocity.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::Deserialize;
use util::maths::interp_table;

use super::spline::CubicSpline;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Curvatures below this are treated as straight.
const STRAIGHT_CURVATURE_M: f64 = 1e-9;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters for path interpolation.
#[derive(Debug, Clone, Deserialize)]
pub struct InterpParams {
    /// Distance between resampled points.
    pub spacing_m: f64,

    /// Velocity ceiling used on straights.
    pub max_velocity_mps: f64,

    /// Lookup of maximum lateral acceleration against absolute curvature, as
    /// `(curvature_m, lat_accel_mps2)` pairs in ascending curvature.
    pub lat_accel_map: Vec<(f64, f64)>,
}

/// A densely resampled path.
#[derive(Debug, Clone, Default)]
pub struct Interpolated {
    pub points_m: Vec<Vector2<f64>>,

    /// Signed curvature at each point, positive when turning left.
    pub curvature_m: Vec<f64>,

    /// Curvature-limited velocity at each point.
    pub velocity_mps: Vec<f64>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum InterpError {
    #[error("At least two distinct points are needed to interpolate, found {0}")]
    TooFewPoints(usize),

    #[error("Window too short to plan: {num_samples} samples, at least {min_length} required")]
    TooShort { num_samples: usize, min_length: usize },
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Interpolate the given points with a chord-length parameterised cubic spline.
///
/// The result is resampled every `spacing_m` from the first point. Fewer than `min_length`
/// samples is reported as [`InterpError::TooShort`].
pub fn interpolate(
    points_m: &[Vector2<f64>],
    min_length: usize,
    params: &InterpParams,
) -> Result<Interpolated, InterpError> {
    // Drop repeated points, they would give a zero-length chord
    let mut knots: Vec<Vector2<f64>> = Vec::with_capacity(points_m.len());
    for p in points_m {
        match knots.last() {
            Some(last) if (p - last).norm() <= std::f64::EPSILON => (),
            _ => knots.push(*p),
        }
    }

    if knots.len() < 2 {
        return Err(InterpError::TooFewPoints(knots.len()));
    }

    // Cumulative chord length as the spline parameter
    let mut t = Vec::with_capacity(knots.len());
    t.push(0.0);
    for pair in knots.windows(2) {
        let last = t[t.len() - 1];
        t.push(last + (pair[1] - pair[0]).norm());
    }

    let xs: Vec<f64> = knots.iter().map(|p| p.x).collect();
    let ys: Vec<f64> = knots.iter().map(|p| p.y).collect();

    let (x_spline, y_spline) = match (CubicSpline::new(&t, &xs), CubicSpline::new(&t, &ys)) {
        (Some(x), Some(y)) => (x, y),
        _ => return Err(InterpError::TooFewPoints(knots.len())),
    };

    let total_m = t[t.len() - 1];
    let spacing_m = params.spacing_m.max(std::f64::EPSILON);
    let num_samples = (total_m / spacing_m).floor() as usize + 1;

    if num_samples < min_length {
        return Err(InterpError::TooShort {
            num_samples,
            min_length,
        });
    }

    let mut out = Interpolated {
        points_m: Vec::with_capacity(num_samples),
        curvature_m: Vec::with_capacity(num_samples),
        velocity_mps: Vec::with_capacity(num_samples),
    };

    for i in 0..num_samples {
        let ti = i as f64 * spacing_m;

        let (x, dx, ddx) = x_spline.eval(ti);
        let (y, dy, ddy) = y_spline.eval(ti);

        let speed_sq = dx.powi(2) + dy.powi(2);
        let curv = if speed_sq > std::f64::EPSILON {
            (dx * ddy - dy * ddx) / speed_sq.powf(1.5)
        } else {
            0.0
        };

        out.points_m.push(Vector2::new(x, y));
        out.curvature_m.push(curv);
        out.velocity_mps.push(curvature_velocity(curv, params));
    }

    Ok(out)
}

/// Maximum velocity at which the given curvature can be taken.
pub fn curvature_velocity(curvature_m: f64, params: &InterpParams) -> f64 {
    let abs_curv = curvature_m.abs();

    if abs_curv < STRAIGHT_CURVATURE_M {
        return params.max_velocity_mps;
    }

    let lat_accel = interp_table(&params.lat_accel_map, abs_curv).unwrap_or(0.0);

    (lat_accel / abs_curv).sqrt().min(params.max_velocity_mps)
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Interpolated {
    pub fn len(&self) -> usize {
        self.points_m.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points_m.is_empty()
    }
}

impl Default for InterpParams {
    fn default() -> Self {
        Self {
            spacing_m: 1.0,
            max_velocity_mps: 30.0,
            lat_accel_map: vec![(0.0, 12.0), (0.02, 10.0), (0.1, 6.0)],
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
