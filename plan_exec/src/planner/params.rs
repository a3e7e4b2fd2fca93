//! Local planner parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

use crate::{
    geom::InterpParams, lane_change::LaneChangeParams, path::WindowParams,
    velocity::VelocityParams,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters for the local planner and all its stages.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    pub window: WindowParams,

    pub interp: InterpParams,

    /// Interpolated paths with fewer samples than this are too short to plan on.
    pub min_interp_samples: usize,

    pub lane_change: LaneChangeParams,

    pub velocity: VelocityParams,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            window: WindowParams::default(),
            interp: InterpParams::default(),
            min_interp_samples: 15,
            lane_change: LaneChangeParams::default(),
            velocity: VelocityParams::default(),
        }
    }
}
