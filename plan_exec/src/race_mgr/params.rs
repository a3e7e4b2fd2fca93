//! Race manager parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct RaceMgrParams {
    /// Race start point, the goal of the initial route.
    pub goal_point_m: [f64; 2],

    /// Point in the pit lane to stop at.
    pub pit_point_m: [f64; 2],

    /// Number of laps after which the vehicle returns to the pit.
    pub max_laps: u32,

    /// A route is only anchored if its closest waypoint is within this distance of the vehicle.
    pub anchor_max_dist_m: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for RaceMgrParams {
    fn default() -> Self {
        Self {
            goal_point_m: [0.0, 0.0],
            pit_point_m: [0.0, 0.0],
            max_laps: 5,
            anchor_max_dist_m: 10.0,
        }
    }
}
