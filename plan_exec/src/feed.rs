//! # Vehicle feed
//!
//! The latest vehicle and perception snapshot, shared between the loops that read it and the
//! client that writes it.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::sync::Mutex;

use comms_if::feed::VehicleState;
use log::warn;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A source of vehicle state.
pub trait VehicleFeed: Send + Sync {
    /// The most recent vehicle state, or `None` if nothing has been received yet.
    fn latest(&self) -> Option<VehicleState>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A feed holding the last state written to it.
#[derive(Debug, Default)]
pub struct SharedFeed {
    state: Mutex<Option<VehicleState>>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SharedFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the held state.
    pub fn update(&self, state: VehicleState) {
        match self.state.lock() {
            Ok(mut s) => *s = Some(state),
            Err(_) => warn!("Vehicle feed lock poisoned, dropping update"),
        }
    }
}

impl VehicleFeed for SharedFeed {
    fn latest(&self) -> Option<VehicleState> {
        match self.state.lock() {
            Ok(s) => s.clone(),
            Err(_) => None,
        }
    }
}
