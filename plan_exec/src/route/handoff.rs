//! # Route handoff
//!
//! The route loop publishes immutable [`RouteSnapshot`]s, the execution loop takes a reference
//! counted copy of the latest one at the start of each cycle. The slot is only locked long enough
//! to swap or clone the `Arc`, and a condition variable wakes the execution loop as soon as a
//! route becomes ready.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    sync::{Arc, Condvar, Mutex, PoisonError},
    time::Duration,
};

use comms_if::{
    plan::RaceMode,
    route::{RouteTag, Waypoint},
};
use nalgebra::Vector2;
use serde::Serialize;

use crate::{path::GlobalPath, velocity::reference::ReferenceLap};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A route together with the race state it was acquired for.
#[derive(Debug, Clone)]
pub struct RouteSnapshot {
    /// Incremented on every new route, so consumers can tell when the route has changed.
    pub generation: u64,

    pub mode: RaceMode,

    pub tag: RouteTag,

    pub path: Arc<GlobalPath>,

    /// Index of the waypoint the vehicle was anchored to when the route was acquired.
    pub anchor_idx: usize,

    pub reference: Option<ReferenceLap>,

    /// Point the vehicle must come to a stop at, if any.
    pub stop_point_m: Option<Vector2<f64>>,

    pub lap_limit_reached: bool,
}

/// A serialisable record of a snapshot, saved into the session for every route acquired.
#[derive(Debug, Clone, Serialize)]
pub struct RouteSummary {
    pub generation: u64,
    pub mode: RaceMode,
    pub tag: RouteTag,
    pub anchor_idx: usize,
    pub lap_limit_reached: bool,
    pub waypoints: Vec<Waypoint>,
}

/// The shared slot between the two loops.
#[derive(Debug, Default)]
pub struct RouteHandoff {
    slot: Mutex<Slot>,
    ready_cvar: Condvar,
}

#[derive(Debug, Default)]
struct Slot {
    ready: bool,
    snapshot: Option<Arc<RouteSnapshot>>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum HandoffError {
    #[error("Route handoff lock is poisoned")]
    Poisoned,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl RouteSnapshot {
    pub fn summary(&self) -> RouteSummary {
        RouteSummary {
            generation: self.generation,
            mode: self.mode,
            tag: self.tag,
            anchor_idx: self.anchor_idx,
            lap_limit_reached: self.lap_limit_reached,
            waypoints: self.path.waypoints().to_vec(),
        }
    }
}

impl RouteHandoff {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a new route and wake anyone waiting for it.
    pub fn publish(&self, snapshot: Arc<RouteSnapshot>) -> Result<(), HandoffError> {
        let mut slot = self.slot.lock()?;
        slot.snapshot = Some(snapshot);
        slot.ready = true;
        drop(slot);

        self.ready_cvar.notify_all();

        Ok(())
    }

    /// Mark the current route as no longer valid.
    pub fn invalidate(&self) -> Result<(), HandoffError> {
        self.slot.lock()?.ready = false;
        Ok(())
    }

    pub fn is_ready(&self) -> Result<bool, HandoffError> {
        Ok(self.slot.lock()?.ready)
    }

    /// Wait up to `timeout` for a route to be ready.
    ///
    /// Returns `None` if no route became ready in time.
    pub fn wait_ready(&self, timeout: Duration) -> Result<Option<Arc<RouteSnapshot>>, HandoffError> {
        let slot = self.slot.lock()?;
        let (slot, _) = self
            .ready_cvar
            .wait_timeout_while(slot, timeout, |s| !s.ready)?;

        Ok(if slot.ready { slot.snapshot.clone() } else { None })
    }

    /// Wake all waiters without changing the route, used on shutdown.
    pub fn wake_all(&self) {
        self.ready_cvar.notify_all();
    }
}

impl<T> From<PoisonError<T>> for HandoffError {
    fn from(_: PoisonError<T>) -> Self {
        Self::Poisoned
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::thread;
    use std::time::Instant;

    fn snapshot(generation: u64) -> Arc<RouteSnapshot> {
        Arc::new(RouteSnapshot {
            generation,
            mode: RaceMode::Race,
            tag: RouteTag::Race,
            path: Arc::new(GlobalPath::default()),
            anchor_idx: 0,
            reference: None,
            stop_point_m: None,
            lap_limit_reached: false,
        })
    }

    #[test]
    fn test_publish_and_invalidate() {
        let h = RouteHandoff::new();

        assert!(!h.is_ready().unwrap());
        assert!(h.wait_ready(Duration::from_millis(10)).unwrap().is_none());

        h.publish(snapshot(1)).unwrap();
        assert!(h.is_ready().unwrap());
        assert_eq!(h.wait_ready(Duration::from_millis(0)).unwrap().unwrap().generation, 1);

        // An invalidated route is never handed out
        h.invalidate().unwrap();
        assert!(!h.is_ready().unwrap());
        assert!(h.wait_ready(Duration::from_millis(10)).unwrap().is_none());

        h.publish(snapshot(2)).unwrap();
        assert_eq!(h.wait_ready(Duration::from_millis(10)).unwrap().unwrap().generation, 2);
    }

    #[test]
    fn test_waiter_woken_by_publish() {
        let h = Arc::new(RouteHandoff::new());
        let h_pub = h.clone();

        let start = Instant::now();
        let jh = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            h_pub.publish(snapshot(7)).unwrap();
        });

        let s = h.wait_ready(Duration::from_secs(10)).unwrap();
        assert_eq!(s.unwrap().generation, 7);
        assert!(start.elapsed() < Duration::from_secs(10));

        jh.join().unwrap();
    }
}
