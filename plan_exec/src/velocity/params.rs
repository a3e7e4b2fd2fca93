//! Velocity synthesizer parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::Deserialize;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct VelocityParams {
    /// Global velocity cap.
    pub max_velocity_mps: f64,

    /// Period of the execution loop, used for per-cycle rates.
    pub cycle_period_s: f64,

    // ---- FOLLOWING ----
    /// Time headway used for the following safety gap.
    pub follow_time_gap_s: f64,

    /// Lower bound on the following safety gap.
    pub follow_gap_min_m: f64,

    /// Upper bound on the following safety gap.
    pub follow_gap_max_m: f64,

    /// Speed reduction per metre of gap shortfall.
    pub follow_margin_mps_per_m: f64,

    /// Lateral band in which an object is followed.
    pub follow_band_m: f64,

    /// Per-cycle reduction of the held ceiling while no path can be interpolated.
    pub hold_decrement_mps: f64,

    // ---- MODES ----
    /// Ceiling while slowed by race control.
    pub slow_velocity_mps: f64,

    /// Ego speed within this of the slow ceiling counts as converged.
    pub slow_tolerance_mps: f64,

    /// Track features the vehicle may not stop in, such as tunnels.
    #[serde(default)]
    pub no_stop_zones: Vec<NoStopZone>,

    /// Ceiling used when a stop is requested inside a no-stop zone.
    pub no_stop_crawl_mps: f64,

    /// Deceleration used to decide when to start braking for the pit stop.
    pub pit_decel_mps2: f64,

    /// Minimum per-cycle reduction of the pit stop ceiling.
    pub pit_min_step_mps: f64,

    /// Cap while on the first lap.
    #[serde(default)]
    pub first_lap_cap_mps: Option<f64>,

    /// Cap while overtaking.
    #[serde(default)]
    pub lane_change_cap_mps: Option<f64>,

    /// Acceleration allowed against current speed, as `(speed_mps, accel_mps2)` pairs. When set,
    /// increases in the target are limited to this; decreases never are.
    #[serde(default)]
    pub accel_limit_map: Option<Vec<(f64, f64)>>,
}

/// A circular zone in which the vehicle must not be stopped.
#[derive(Debug, Clone, Deserialize)]
pub struct NoStopZone {
    pub centre_m: [f64; 2],
    pub radius_m: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl NoStopZone {
    pub fn contains(&self, point_m: &Vector2<f64>) -> bool {
        (Vector2::new(self.centre_m[0], self.centre_m[1]) - point_m).norm() <= self.radius_m
    }
}

impl Default for VelocityParams {
    fn default() -> Self {
        Self {
            max_velocity_mps: 30.0,
            cycle_period_s: 0.05,
            follow_time_gap_s: 1.5,
            follow_gap_min_m: 20.0,
            follow_gap_max_m: 40.0,
            follow_margin_mps_per_m: 0.5,
            follow_band_m: 1.0,
            hold_decrement_mps: 0.5,
            slow_velocity_mps: 8.0,
            slow_tolerance_mps: 0.5,
            no_stop_zones: Vec::new(),
            no_stop_crawl_mps: 3.0,
            pit_decel_mps2: 3.0,
            pit_min_step_mps: 0.1,
            first_lap_cap_mps: None,
            lane_change_cap_mps: None,
            accel_limit_map: None,
        }
    }
}
