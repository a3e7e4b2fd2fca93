//! # Race-control signals

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A signal issued by race control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RaceSignal {
    /// No signal is being shown.
    None,

    /// Green flag, racing as normal.
    Green,

    /// Reduce speed to the slow ceiling.
    ReduceSpeed,

    /// Resume the speed in use before the last `ReduceSpeed`.
    ResumeSpeed,

    /// Stop on track.
    Stop,

    /// Return to the pit lane and stop there.
    ReturnToPit,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl RaceSignal {
    /// Decode the raw signal value carried by the vehicle feed.
    ///
    /// Values outside the known set return `None` and are expected to be ignored by the caller.
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(RaceSignal::None),
            1 => Some(RaceSignal::Green),
            2 => Some(RaceSignal::ReduceSpeed),
            3 => Some(RaceSignal::ResumeSpeed),
            4 => Some(RaceSignal::Stop),
            5 => Some(RaceSignal::ReturnToPit),
            _ => None,
        }
    }

    /// The raw value of this signal.
    pub fn to_raw(self) -> i32 {
        match self {
            RaceSignal::None => 0,
            RaceSignal::Green => 1,
            RaceSignal::ReduceSpeed => 2,
            RaceSignal::ResumeSpeed => 3,
            RaceSignal::Stop => 4,
            RaceSignal::ReturnToPit => 5,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
