//! # Processing loops
//!
//! The planner runs as two threads:
//!
//! - the route loop, which steps the [`crate::race_mgr::RaceMgr`] and publishes routes,
//! - the execution loop, which runs the [`crate::planner::LocalPlanner`] on the latest route and
//!   publishes plans.
//!
//! Both check a shared run flag at the top of every cycle and exit at the next cycle boundary
//! once it is cleared.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod exec;
mod route;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    thread,
    time::{Duration, Instant},
};

use log::warn;

use crate::route::HandoffError;

pub use exec::{ExecLoop, PlanRecord};
pub use route::{RouteCallback, RouteLoop};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum LoopError {
    #[error("Route handoff error: {0}")]
    HandoffError(HandoffError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl From<HandoffError> for LoopError {
    fn from(e: HandoffError) -> Self {
        Self::HandoffError(e)
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Sleep for whatever is left of the cycle, warning if it overran.
pub(crate) fn sleep_remaining(name: &str, cycle_start: Instant, period: Duration) {
    let cycle_dur = Instant::now() - cycle_start;

    match period.checked_sub(cycle_dur) {
        Some(d) => thread::sleep(d),
        None => warn!(
            "{} cycle overran by {:.06} s",
            name,
            cycle_dur.as_secs_f64() - period.as_secs_f64()
        ),
    }
}
