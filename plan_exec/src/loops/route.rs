//! Route loop

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use log::{debug, info};

use super::{sleep_remaining, LoopError};
use crate::{
    feed::VehicleFeed,
    race_mgr::{RaceMgr, RaceMgrOutput},
    route::{RouteHandoff, RouteSearch, RouteSnapshot},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Called with every new route before it is published.
pub type RouteCallback = Box<dyn FnMut(&RouteSnapshot) + Send>;

/// The route loop, owning all writes to the race mode and route.
pub struct RouteLoop {
    pub period: Duration,
    pub race_mgr: RaceMgr,
    pub search: Box<dyn RouteSearch + Send>,
    pub feed: Arc<dyn VehicleFeed>,
    pub handoff: Arc<RouteHandoff>,
    pub running: Arc<AtomicBool>,
    pub on_route: Option<RouteCallback>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl RouteLoop {
    /// Run until the run flag is cleared.
    pub fn run(mut self) -> Result<(), LoopError> {
        info!("Route loop started");

        while self.running.load(Ordering::Relaxed) {
            let cycle_start = Instant::now();

            match self.feed.latest() {
                Some(vehicle) => match self.race_mgr.step(&vehicle, self.search.as_mut()) {
                    RaceMgrOutput::Unchanged | RaceMgrOutput::Pending => (),
                    RaceMgrOutput::Invalidated(mode) => {
                        debug!("Route invalidated for {:?}", mode);
                        self.handoff.invalidate()?;
                    }
                    RaceMgrOutput::Ready(snapshot) => {
                        if let Some(ref mut cb) = self.on_route {
                            cb(&snapshot);
                        }
                        self.handoff.publish(Arc::new(snapshot))?;
                    }
                },
                None => debug!("No vehicle state yet"),
            }

            sleep_remaining("Route loop", cycle_start, self.period);
        }

        // Make sure the execution loop isn't left waiting
        self.handoff.wake_all();

        info!("Route loop stopped");

        Ok(())
    }
}
