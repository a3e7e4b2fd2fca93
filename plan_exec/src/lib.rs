//! # Race local planner library
//!
//! Local planning for an autonomous race vehicle. Each cycle the planner takes the route held by
//! the race manager, trims it to a window ahead of the vehicle, moves it around slower traffic,
//! interpolates it into a fine path and chooses a target velocity.
//!
//! The crate is split into:
//!
//! - [`geom`] - Frenet projection, interpolation and kinematic helpers,
//! - [`path`] - the global route and the advancing local window,
//! - [`lane_change`] - object classification and overtaking,
//! - [`velocity`] - target velocity synthesis and reference laps,
//! - [`race_mgr`] - the race mode state machine,
//! - [`route`] - route search and the route handoff between loops,
//! - [`planner`] - the per-cycle pipeline,
//! - [`loops`] - the route and execution threads,
//! - [`sim_feed`] - a kinematic vehicle simulation for running standalone.

pub mod feed;
pub mod geom;
pub mod lane_change;
pub mod loops;
pub mod params;
pub mod path;
pub mod planner;
pub mod race_mgr;
pub mod route;
pub mod sim_feed;
pub mod velocity;
