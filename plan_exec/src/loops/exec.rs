//! Execution loop

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::Sender,
        Arc,
    },
    time::{Duration, Instant},
};

use comms_if::plan::{LaneChangeState, PlanOutput, RaceMode};
use log::{debug, info, trace, warn};
use serde::Serialize;
use util::{archive::Archiver, module::State, session};

use super::{sleep_remaining, LoopError};
use crate::{
    feed::VehicleFeed,
    planner::{LocalPlanner, PlanInput, StatusReport},
    route::RouteHandoff,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The execution loop, owning the planner and its per-cycle state.
pub struct ExecLoop {
    pub period: Duration,
    pub planner: LocalPlanner,
    pub feed: Arc<dyn VehicleFeed>,
    pub handoff: Arc<RouteHandoff>,
    pub running: Arc<AtomicBool>,
    pub publisher: Sender<PlanOutput>,
    pub archiver: Option<Archiver>,
}

/// One row of the plan archive.
#[derive(Debug, Clone, Serialize)]
pub struct PlanRecord {
    pub time_s: f64,
    pub generation: u64,
    pub race_mode: RaceMode,
    pub lane_change: LaneChangeState,
    pub speed_mps: f64,
    pub target_velocity_mps: f64,
    pub following_mps: Option<f64>,
    pub curvature_mps: Option<f64>,
    pub mode_mps: Option<f64>,
    pub window_start_idx: usize,
    pub window_len: usize,
    pub window_degenerate: bool,
    pub interp_samples: usize,
    pub num_objects: usize,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ExecLoop {
    /// Run until the run flag is cleared, returning the number of plans published.
    pub fn run(mut self) -> Result<u64, LoopError> {
        info!("Execution loop started");

        let mut num_published = 0u64;

        while self.running.load(Ordering::Relaxed) {
            // Block until a route is ready, rechecking the run flag every period
            let snapshot = match self.handoff.wait_ready(self.period)? {
                Some(s) => s,
                None => {
                    trace!("Waiting for a route");
                    continue;
                }
            };

            let cycle_start = Instant::now();

            let vehicle = match self.feed.latest() {
                Some(v) => v,
                None => {
                    debug!("No vehicle state, not planning");
                    sleep_remaining("Execution loop", cycle_start, self.period);
                    continue;
                }
            };
            let speed_mps = vehicle.speed_mps;

            let (output, report) = match self.planner.proc(&PlanInput { snapshot, vehicle }) {
                Ok(r) => r,
                Err(e) => {
                    warn!("Planning failed, no plan published: {}", e);
                    sleep_remaining("Execution loop", cycle_start, self.period);
                    continue;
                }
            };

            // Nothing is published once shutdown has been requested
            if !self.running.load(Ordering::Relaxed) {
                break;
            }

            self.archive(&output, &report, speed_mps);

            if self.publisher.send(output).is_err() {
                warn!("Plan receiver disconnected, stopping execution loop");
                break;
            }
            num_published += 1;

            sleep_remaining("Execution loop", cycle_start, self.period);
        }

        info!("Execution loop stopped after {} plans", num_published);

        Ok(num_published)
    }

    fn archive(&mut self, output: &PlanOutput, report: &StatusReport, speed_mps: f64) {
        let arch = match self.archiver {
            Some(ref mut a) => a,
            None => return,
        };

        let record = PlanRecord {
            time_s: session::get_elapsed_seconds(),
            generation: report.generation,
            race_mode: output.race_mode,
            lane_change: output.lane_change,
            speed_mps,
            target_velocity_mps: output.target_velocity_mps,
            following_mps: report.ceilings.following_mps,
            curvature_mps: report.ceilings.curvature_mps,
            mode_mps: report.ceilings.mode_mps,
            window_start_idx: report.window_start_idx,
            window_len: report.window_len,
            window_degenerate: report.window_degenerate,
            interp_samples: report.interp_samples,
            num_objects: report.num_objects,
        };

        if let Err(e) = arch.serialise(record) {
            warn!("Could not archive plan, archiving disabled: {}", e);
            self.archiver = None;
        }
    }
}
