//! # Communications interface crate.
//!
//! Provides all common interfaces between the planner and its surroundings: the vehicle and
//! perception feed it consumes, the route data it is given and the plan it publishes.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Vehicle state and tracked object feed
pub mod feed;

/// Published plan and the discrete states that go with it
pub mod plan;

/// Route waypoints and route request tags
pub mod route;

/// Race-control signals
pub mod signal;
