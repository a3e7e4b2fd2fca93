//! # Published plan
//!
//! The output of each execution cycle, consumed by the tracking controller.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Target velocity published when the vehicle must come to a stop and stay there.
///
/// The tracking controller treats any negative target as a request for full braking.
pub const STOP_SENTINEL_MPS: f64 = -3.0;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A plan published by the execution loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanOutput {
    /// Resampled path for the controller to track. Empty when no path could be produced.
    pub path_m: Vec<Vector2<f64>>,

    /// Signed curvature at each point of `path_m`, positive when turning left.
    pub curvature_m: Vec<f64>,

    /// Commanded speed.
    pub target_velocity_mps: f64,

    pub race_mode: RaceMode,

    pub lane_change: LaneChangeState,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// The race mode held by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RaceMode {
    /// Getting to the start from wherever the vehicle was switched on.
    AcquireRoute,

    Race,

    /// Racing under a reduced speed ceiling.
    SlowOn,

    /// Speed has been resumed with no earlier mode to return to.
    SlowOff,

    /// Stopping on track.
    Stop,

    /// Heading into the pit lane to stop.
    PitStop,
}

/// Lane change decision for the current cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaneChangeState {
    /// Nothing ahead in lane.
    Straight,

    /// Following an object ahead in lane.
    Follow,

    /// Overtaking on the left.
    Left,

    /// Overtaking on the right.
    Right,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl PlanOutput {
    /// `true` if the target velocity asks the vehicle to stop and hold.
    pub fn is_stop(&self) -> bool {
        self.target_velocity_mps < 0.0
    }
}

impl RaceMode {
    /// Modes in which the vehicle is being brought to a permanent halt.
    pub fn is_terminating(&self) -> bool {
        matches!(self, RaceMode::PitStop)
    }
}

impl Default for LaneChangeState {
    fn default() -> Self {
        LaneChangeState::Straight
    }
}

impl std::fmt::Display for RaceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}
