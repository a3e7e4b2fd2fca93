//! Lane change planner parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct LaneChangeParams {
    /// Objects further than this behind the window start are ignored.
    pub consider_behind_s: f64,

    /// Objects with `|d|` below this are in the ego lane.
    pub front_band_m: f64,

    /// Front objects closer than this in `s` put the planner in follow.
    pub follow_range_s: f64,

    /// Time to collision below which an overtake is required.
    pub ttc_threshold_s: f64,

    /// Minimum free width beside the lead object for an overtake on that side.
    pub min_room_m: f64,

    /// Lateral offset applied to the shifted section of the window.
    pub shift_offset_m: f64,

    /// Half length of the shifted section around the lead object, in waypoints.
    pub shift_gap_base_s: f64,

    /// Extra half length per m/s of ego speed.
    pub shift_gap_speed_gain: f64,

    /// Longitudinal range around the lead object checked for other traffic.
    pub adjacent_range_s: f64,

    /// Lateral range beside the lead object checked for other traffic.
    pub adjacent_band_m: f64,

    /// Windows shorter than this are not planned on.
    pub min_points: usize,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for LaneChangeParams {
    fn default() -> Self {
        Self {
            consider_behind_s: 50.0,
            front_band_m: 1.25,
            follow_range_s: 100.0,
            ttc_threshold_s: 5.0,
            min_room_m: 3.0,
            shift_offset_m: 3.0,
            shift_gap_base_s: 15.0,
            shift_gap_speed_gain: 0.2,
            adjacent_range_s: 20.0,
            adjacent_band_m: 4.0,
            min_points: 5,
        }
    }
}
