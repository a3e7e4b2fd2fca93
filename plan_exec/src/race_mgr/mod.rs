//! # Race Manager
//!
//! This module implements the [`RaceMgr`] state machine, which decides the race mode from the
//! lap count and race-control signals and acquires a route for each mode. The modes are:
//!
//! - `AcquireRoute` - Getting to the start line after power on.
//! - `Race` - Racing on the racing line.
//! - `SlowOn` - Racing under a reduced speed ceiling.
//! - `SlowOff` - Speed resumed with no earlier mode to return to, behaves as `Race`.
//! - `Stop` - Stopping on track.
//! - `PitStop` - Heading into the pit lane to stop. Entered on the lap limit or on signal.
//!
//! Any mode change invalidates the current route. No further transitions are considered until a
//! route for the new mode has been found and anchored to the vehicle's position.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod params;
mod transitions;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::sync::Arc;

use comms_if::{feed::VehicleState, plan::RaceMode, route::RouteTag, signal::RaceSignal};
use log::{debug, info, warn};
use nalgebra::Vector2;

use crate::{
    geom::first_closest_within,
    path::GlobalPath,
    route::{RouteResult, RouteSearch, RouteSnapshot},
};

pub use params::RaceMgrParams;
pub use transitions::{route_tag, transition, ModeChange, RaceEvent, Remember};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Race Manager
pub struct RaceMgr {
    params: RaceMgrParams,

    /// Current mode, `None` before the first step.
    mode: Option<RaceMode>,

    /// Mode to return to when speed is resumed.
    remembered: Option<RaceMode>,

    route_ready: bool,

    /// Route found but not yet anchored.
    pending: Option<RouteResult>,

    prev_lap: u32,
    prev_signal: RaceSignal,

    generation: u64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Output of one step of the manager.
#[derive(Debug)]
pub enum RaceMgrOutput {
    /// The current route is still valid.
    Unchanged,

    /// The mode changed, the current route must no longer be used.
    Invalidated(RaceMode),

    /// Waiting for a route to be found or anchored.
    Pending,

    /// A new route is ready.
    Ready(RouteSnapshot),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl RaceMgr {
    pub fn new(params: RaceMgrParams) -> Self {
        Self {
            params,
            mode: None,
            remembered: None,
            route_ready: false,
            pending: None,
            prev_lap: 0,
            prev_signal: RaceSignal::None,
            generation: 0,
        }
    }

    /// The current mode, `None` before the first step.
    pub fn mode(&self) -> Option<RaceMode> {
        self.mode
    }

    pub fn route_ready(&self) -> bool {
        self.route_ready
    }

    /// Step the manager with the latest vehicle state.
    pub fn step(
        &mut self,
        vehicle: &VehicleState,
        search: &mut dyn RouteSearch,
    ) -> RaceMgrOutput {
        let mode = match self.mode {
            Some(m) => m,
            None => {
                info!("Race manager started, acquiring route to the start");
                self.prev_lap = vehicle.lap_count;
                self.enter(RaceMode::AcquireRoute);
                return self.acquire(vehicle, search);
            }
        };

        if !self.route_ready {
            return self.acquire(vehicle, search);
        }

        let mut events = Vec::with_capacity(2);

        if vehicle.lap_count > self.prev_lap {
            info!("Lap {} completed", vehicle.lap_count);
            events.push(RaceEvent::LapCompleted {
                limit_reached: vehicle.lap_count >= self.params.max_laps,
            });
        }
        self.prev_lap = vehicle.lap_count;

        match RaceSignal::from_raw(vehicle.race_signal) {
            Some(sig) if sig != self.prev_signal => {
                info!("Race signal {:?} -> {:?}", self.prev_signal, sig);
                self.prev_signal = sig;
                events.push(RaceEvent::Signal(sig));
            }
            Some(_) => (),
            None => debug!("Ignoring unknown race signal {}", vehicle.race_signal),
        }

        let mut next = mode;
        for event in events {
            if let Some(change) = transition(next, self.remembered, event) {
                match change.remembered {
                    Remember::Keep => (),
                    Remember::Set(m) => self.remembered = Some(m),
                    Remember::Clear => self.remembered = None,
                }
                next = change.next;
                // Laps always refresh the route even if the mode is the same
                self.route_ready = false;
            }
        }

        if self.route_ready {
            RaceMgrOutput::Unchanged
        } else {
            self.enter(next);
            RaceMgrOutput::Invalidated(next)
        }
    }

    fn enter(&mut self, mode: RaceMode) {
        if self.mode != Some(mode) {
            info!("Race mode {:?} -> {:?}", self.mode, mode);
        }

        self.mode = Some(mode);
        self.route_ready = false;
        self.pending = None;
    }

    /// Try to find and anchor a route for the current mode.
    fn acquire(&mut self, vehicle: &VehicleState, search: &mut dyn RouteSearch) -> RaceMgrOutput {
        let mode = match self.mode {
            Some(m) => m,
            None => return RaceMgrOutput::Pending,
        };
        let tag = route_tag(mode);

        let result = match self.pending.take() {
            Some(r) => r,
            None => match search.search(&vehicle.position_m, &self.goal(tag), tag) {
                Ok(r) => r,
                Err(e) => {
                    warn!("Route search for {} failed, retrying: {}", tag, e);
                    return RaceMgrOutput::Pending;
                }
            },
        };

        let anchor_idx = match self.anchor(&result.path, &vehicle.position_m) {
            Some(i) => i,
            None => {
                debug!("Vehicle not yet within reach of the {} route", tag);
                self.pending = Some(result);
                return RaceMgrOutput::Pending;
            }
        };

        self.generation += 1;
        self.route_ready = true;

        info!(
            "Route {} ready for {:?} ({} waypoints, anchored at {})",
            self.generation,
            mode,
            result.path.len(),
            anchor_idx
        );

        RaceMgrOutput::Ready(RouteSnapshot {
            generation: self.generation,
            mode,
            tag,
            path: Arc::new(result.path),
            anchor_idx,
            reference: result.reference,
            stop_point_m: match mode {
                RaceMode::PitStop => Some(to_vec(self.params.pit_point_m)),
                _ => None,
            },
            lap_limit_reached: vehicle.lap_count >= self.params.max_laps,
        })
    }

    /// Anchor on the first pass of the route near the vehicle, so a looping route with an
    /// overlapping tail is anchored at its start rather than in the tail.
    fn anchor(&self, path: &GlobalPath, position_m: &Vector2<f64>) -> Option<usize> {
        first_closest_within(path.waypoints(), position_m, self.params.anchor_max_dist_m)
    }

    fn goal(&self, tag: RouteTag) -> Vector2<f64> {
        match tag {
            RouteTag::PitStop => to_vec(self.params.pit_point_m),
            _ => to_vec(self.params.goal_point_m),
        }
    }
}

fn to_vec(p: [f64; 2]) -> Vector2<f64> {
    Vector2::new(p[0], p[1])
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        geom::test::straight_path,
        route::{CsvRouteStore, RouteSearchError},
    };

    fn store() -> CsvRouteStore {
        let mut s = CsvRouteStore::default();
        for tag in [RouteTag::ToGoal, RouteTag::Race, RouteTag::Slow, RouteTag::PitStop].iter() {
            s.insert_route(*tag, GlobalPath::new(straight_path(300, 4.0, 4.0)));
        }
        s
    }

    /// A search that fails a number of times before delegating.
    struct Flaky {
        failures: usize,
        inner: CsvRouteStore,
    }

    impl RouteSearch for Flaky {
        fn search(
            &mut self,
            start_m: &Vector2<f64>,
            goal_m: &Vector2<f64>,
            tag: RouteTag,
        ) -> Result<RouteResult, RouteSearchError> {
            if self.failures > 0 {
                self.failures -= 1;
                return Err(RouteSearchError::RouteUnavailable(tag));
            }
            self.inner.search(start_m, goal_m, tag)
        }
    }

    fn params() -> RaceMgrParams {
        RaceMgrParams {
            pit_point_m: [200.0, 0.0],
            ..Default::default()
        }
    }

    fn vehicle() -> VehicleState {
        VehicleState::at(Vector2::new(10.0, 0.5), 0.0)
    }

    fn ready(out: RaceMgrOutput) -> RouteSnapshot {
        match out {
            RaceMgrOutput::Ready(s) => s,
            o => panic!("Expected a ready route, got {:?}", o),
        }
    }

    #[test]
    fn test_first_step_acquires() {
        let mut mgr = RaceMgr::new(RaceMgrParams::default());
        let mut search = store();

        let s = ready(mgr.step(&vehicle(), &mut search));
        assert_eq!(s.mode, RaceMode::AcquireRoute);
        assert_eq!(s.tag, RouteTag::ToGoal);
        assert_eq!(s.anchor_idx, 10);
        assert_eq!(s.generation, 1);
        assert!(mgr.route_ready());

        assert!(matches!(mgr.step(&vehicle(), &mut search), RaceMgrOutput::Unchanged));
    }

    #[test]
    fn test_search_retry_and_anchor() {
        let mut mgr = RaceMgr::new(RaceMgrParams::default());
        let mut search = Flaky {
            failures: 2,
            inner: store(),
        };

        assert!(matches!(mgr.step(&vehicle(), &mut search), RaceMgrOutput::Pending));
        assert!(matches!(mgr.step(&vehicle(), &mut search), RaceMgrOutput::Pending));

        // Too far away to anchor, the found route is held until the vehicle arrives
        let far = VehicleState::at(Vector2::new(10.0, 50.0), 0.0);
        assert!(matches!(mgr.step(&far, &mut search), RaceMgrOutput::Pending));
        assert!(!mgr.route_ready());

        let s = ready(mgr.step(&vehicle(), &mut search));
        assert_eq!(s.mode, RaceMode::AcquireRoute);
    }

    #[test]
    fn test_lap_and_signals() {
        let mut mgr = RaceMgr::new(params());
        let mut search = store();
        let mut v = vehicle();

        ready(mgr.step(&v, &mut search));

        // Lap completion moves to race
        v.lap_count = 1;
        assert!(matches!(
            mgr.step(&v, &mut search),
            RaceMgrOutput::Invalidated(RaceMode::Race)
        ));
        let s = ready(mgr.step(&v, &mut search));
        assert_eq!(s.mode, RaceMode::Race);
        assert_eq!(s.tag, RouteTag::Race);
        assert_eq!(s.generation, 2);

        // Unknown signals are ignored
        v.race_signal = 42;
        assert!(matches!(mgr.step(&v, &mut search), RaceMgrOutput::Unchanged));

        // Reduce then resume speed
        v.race_signal = RaceSignal::ReduceSpeed.to_raw();
        assert!(matches!(
            mgr.step(&v, &mut search),
            RaceMgrOutput::Invalidated(RaceMode::SlowOn)
        ));
        assert_eq!(ready(mgr.step(&v, &mut search)).tag, RouteTag::Slow);

        // Signals are edge triggered
        assert!(matches!(mgr.step(&v, &mut search), RaceMgrOutput::Unchanged));

        // A lap while slowed keeps the slow mode
        v.lap_count = 2;
        assert!(matches!(
            mgr.step(&v, &mut search),
            RaceMgrOutput::Invalidated(RaceMode::SlowOn)
        ));
        ready(mgr.step(&v, &mut search));

        v.race_signal = RaceSignal::ResumeSpeed.to_raw();
        assert!(matches!(
            mgr.step(&v, &mut search),
            RaceMgrOutput::Invalidated(RaceMode::Race)
        ));
        ready(mgr.step(&v, &mut search));

        // Pit signal
        v.race_signal = RaceSignal::ReturnToPit.to_raw();
        assert!(matches!(
            mgr.step(&v, &mut search),
            RaceMgrOutput::Invalidated(RaceMode::PitStop)
        ));
        let s = ready(mgr.step(&v, &mut search));
        assert_eq!(s.tag, RouteTag::PitStop);
        assert_eq!(s.stop_point_m, Some(Vector2::new(200.0, 0.0)));
        assert_eq!(s.path.len(), 201);

        // Nothing leaves the pit stop
        v.lap_count = 3;
        v.race_signal = RaceSignal::Stop.to_raw();
        assert!(matches!(mgr.step(&v, &mut search), RaceMgrOutput::Unchanged));
    }

    #[test]
    fn test_lap_limit() {
        let mut mgr = RaceMgr::new(RaceMgrParams {
            max_laps: 2,
            ..params()
        });
        let mut search = store();
        let mut v = vehicle();

        ready(mgr.step(&v, &mut search));
        v.lap_count = 1;
        mgr.step(&v, &mut search);
        ready(mgr.step(&v, &mut search));

        v.lap_count = 2;
        assert!(matches!(
            mgr.step(&v, &mut search),
            RaceMgrOutput::Invalidated(RaceMode::PitStop)
        ));
        let s = ready(mgr.step(&v, &mut search));
        assert!(s.lap_limit_reached);
        assert_eq!(s.mode, RaceMode::PitStop);
    }
}
