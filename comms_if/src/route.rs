//! # Route data
//!
//! Waypoints making up a global route, and the tags used to request one.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A single waypoint of a route.
///
/// The normal is a unit vector pointing to the right of the direction of travel, so a positive
/// lateral offset along it moves towards the right-hand track boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub position_m: Vector2<f64>,

    /// Drivable width to the right of the waypoint.
    pub width_right_m: f64,

    /// Drivable width to the left of the waypoint.
    pub width_left_m: f64,

    pub normal: Vector2<f64>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// The kind of route being requested from the route search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteTag {
    /// From wherever the vehicle is to the race start.
    ToGoal,

    /// The racing line.
    Race,

    /// The racing line, paired with a recorded lap driven at reduced speed.
    Slow,

    /// Into the pit lane, ending at the pit stop point.
    PitStop,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Waypoint {
    pub fn new(
        position_m: Vector2<f64>,
        width_right_m: f64,
        width_left_m: f64,
        normal: Vector2<f64>,
    ) -> Self {
        Self {
            position_m,
            width_right_m,
            width_left_m,
            normal,
        }
    }

    /// Position of the point `offset_m` along this waypoint's normal.
    pub fn offset_point(&self, offset_m: f64) -> Vector2<f64> {
        self.position_m + self.normal * offset_m
    }
}

impl RouteTag {
    /// Name used for files and logs.
    pub fn name(&self) -> &'static str {
        match self {
            RouteTag::ToGoal => "to_goal",
            RouteTag::Race => "race",
            RouteTag::Slow => "slow",
            RouteTag::PitStop => "pit_stop",
        }
    }
}

impl std::fmt::Display for RouteTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
