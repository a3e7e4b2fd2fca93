//! # Vehicle and perception feed
//!
//! The snapshot of the ego vehicle and the already-tracked objects around it, as delivered by the
//! localisation and perception stacks each cycle.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A single snapshot of the vehicle feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleState {
    /// Position of the ego vehicle in the track frame.
    pub position_m: Vector2<f64>,

    /// Heading of the ego vehicle, anticlockwise from the track frame x axis.
    pub heading_rad: f64,

    /// Longitudinal speed of the ego vehicle.
    pub speed_mps: f64,

    /// Number of laps completed so far.
    pub lap_count: u32,

    /// Raw race-control signal value, see [`crate::signal::RaceSignal::from_raw`].
    pub race_signal: i32,

    /// Blind spot occupancy flags.
    pub blind_spot: BlindSpot,

    /// Permission to move. While `false` the vehicle must be held stationary.
    pub go: bool,

    /// Objects currently tracked by perception.
    pub objects: Vec<TrackedObject>,
}

/// An object tracked by perception.
///
/// Objects are only valid for the cycle in which they were received.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TrackedObject {
    pub position_m: Vector2<f64>,

    pub heading_rad: f64,

    pub speed_mps: f64,

    /// Longitudinal gap between the ego vehicle and this object, as estimated by perception.
    pub gap_m: f64,
}

/// Blind spot detector flags for each side of the vehicle.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlindSpot {
    pub left: bool,
    pub right: bool,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl VehicleState {
    /// Create a stationary state at the given position with no objects and permission to move.
    pub fn at(position_m: Vector2<f64>, heading_rad: f64) -> Self {
        Self {
            position_m,
            heading_rad,
            speed_mps: 0.0,
            lap_count: 0,
            race_signal: 0,
            blind_spot: BlindSpot::default(),
            go: true,
            objects: Vec::new(),
        }
    }
}
