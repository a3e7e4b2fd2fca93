//! # Obstacle and Lane Change Planner
//!
//! Classifies tracked objects against the local window, decides whether the ego vehicle should
//! follow or overtake the object ahead of it, and shifts the window sideways when an overtake is
//! both required and safe.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod params;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    feed::{BlindSpot, TrackedObject, VehicleState},
    plan::LaneChangeState,
};
use log::{debug, info};
use ordered_float::OrderedFloat;

use crate::{
    geom::{project_to_frenet, time_to_collision, Frenet},
    path::LocalWindow,
};

pub use params::LaneChangeParams;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// An object which lies on the track within the local window.
#[derive(Debug, Clone, Copy)]
pub struct ClassifiedObject {
    pub object: TrackedObject,

    pub frenet: Frenet,

    /// `true` if the object is in the ego lane.
    pub front: bool,
}

/// Result of one lane change planning cycle.
#[derive(Debug, Clone)]
pub struct LaneChangeOutput {
    pub state: LaneChangeState,

    /// The window, shifted if an overtake was accepted.
    pub window: LocalWindow,

    /// Objects on track in this window.
    pub objects: Vec<ClassifiedObject>,

    /// `false` if the window was too short to plan on and the previous state was kept.
    pub updated: bool,
}

/// The lane change planner.
#[derive(Debug, Clone)]
pub struct LaneChangePlanner {
    params: LaneChangeParams,
    state: LaneChangeState,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Side of the ego lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl LaneChangePlanner {
    pub fn new(params: LaneChangeParams) -> Self {
        Self {
            params,
            state: LaneChangeState::Straight,
        }
    }

    /// State decided on the most recent cycle.
    pub fn state(&self) -> LaneChangeState {
        self.state
    }

    /// Return to driving straight, used when the route changes under the planner.
    pub fn reset(&mut self) {
        self.state = LaneChangeState::Straight;
    }

    /// Plan the lane change for this cycle.
    pub fn plan(&mut self, window: LocalWindow, vehicle: &VehicleState) -> LaneChangeOutput {
        if window.len() < self.params.min_points {
            debug!(
                "Window of {} points too short for lane change planning, keeping {:?}",
                window.len(),
                self.state
            );
            return LaneChangeOutput {
                state: self.state,
                window,
                objects: Vec::new(),
                updated: false,
            };
        }

        let objects = self.classify(&window, &vehicle.objects);

        // Front objects ahead of the ego, nearest first
        let mut ahead: Vec<&ClassifiedObject> = objects
            .iter()
            .filter(|o| o.front && o.frenet.s > 0.0)
            .collect();
        ahead.sort_by_key(|o| OrderedFloat(o.frenet.s));

        let follow = objects
            .iter()
            .any(|o| o.front && o.frenet.s < self.params.follow_range_s);

        let mut state = if follow {
            LaneChangeState::Follow
        } else {
            LaneChangeState::Straight
        };
        let mut window = window;

        if let Some(lead) = ahead.first() {
            let ttc = time_to_collision(lead.object.gap_m, lead.object.speed_mps, vehicle.speed_mps);

            match ttc {
                Some(ttc) if ttc < self.params.ttc_threshold_s => {
                    state = LaneChangeState::Follow;

                    match self.overtake_side(&window, lead, &objects, &vehicle.blind_spot) {
                        Some(side) => {
                            self.shift_window(&mut window, lead.frenet.s, side, vehicle.speed_mps);
                            state = match side {
                                Side::Left => LaneChangeState::Left,
                                Side::Right => LaneChangeState::Right,
                            };
                        }
                        None => debug!("Overtake needed (TTC {:.2} s) but rejected", ttc),
                    }
                }
                _ => (),
            }
        }

        if state != self.state {
            info!("Lane change state {:?} -> {:?}", self.state, state);
        }
        self.state = state;

        LaneChangeOutput {
            state,
            window,
            objects,
            updated: true,
        }
    }

    /// Project the objects onto the window and keep those on the track.
    pub fn classify(&self, window: &LocalWindow, objects: &[TrackedObject]) -> Vec<ClassifiedObject> {
        objects
            .iter()
            .filter_map(|obj| {
                let finite = obj.position_m.iter().all(|v| v.is_finite())
                    && obj.speed_mps.is_finite()
                    && obj.gap_m.is_finite();
                if !finite {
                    debug!("Dropping object with non-finite state {:?}", obj);
                    return None;
                }

                let frenet = project_to_frenet(&window.waypoints, &obj.position_m)?;

                if frenet.s <= -self.params.consider_behind_s {
                    return None;
                }

                let wp = &window.waypoints[nearest_idx(window, frenet.s)];
                if frenet.d < -wp.width_left_m || frenet.d > wp.width_right_m {
                    return None;
                }

                Some(ClassifiedObject {
                    object: *obj,
                    frenet,
                    front: frenet.d.abs() < self.params.front_band_m,
                })
            })
            .collect()
    }

    /// Pick the side to overtake the lead on, if there's enough room and it's clear.
    fn overtake_side(
        &self,
        window: &LocalWindow,
        lead: &ClassifiedObject,
        objects: &[ClassifiedObject],
        blind_spot: &BlindSpot,
    ) -> Option<Side> {
        let wp = &window.waypoints[nearest_idx(window, lead.frenet.s)];

        let room_right = wp.width_right_m - lead.frenet.d;
        let room_left = wp.width_left_m + lead.frenet.d;

        let (side, room) = if room_right >= room_left {
            (Side::Right, room_right)
        } else {
            (Side::Left, room_left)
        };

        if room < self.params.min_room_m {
            debug!("Not enough room to overtake ({:.2} m on the {:?})", room, side);
            return None;
        }

        let blocked_by_bsd = match side {
            Side::Left => blind_spot.left,
            Side::Right => blind_spot.right,
        };
        if blocked_by_bsd {
            debug!("Overtake on the {:?} blocked by blind spot", side);
            return None;
        }

        let sign = side.sign();
        let occupied = objects.iter().any(|o| {
            let ds = o.frenet.s - lead.frenet.s;
            let dd = (o.frenet.d - lead.frenet.d) * sign;

            !std::ptr::eq(o, lead)
                && ds.abs() < self.params.adjacent_range_s
                && dd > 0.0
                && dd <= self.params.adjacent_band_m
        });
        if occupied {
            debug!("Overtake on the {:?} blocked by adjacent traffic", side);
            return None;
        }

        Some(side)
    }

    /// Shift the waypoints around the lead object towards the given side.
    fn shift_window(&self, window: &mut LocalWindow, lead_s: f64, side: Side, ego_speed_mps: f64) {
        let gap = self.params.shift_gap_base_s + ego_speed_mps.max(0.0) * self.params.shift_gap_speed_gain;
        let offset = self.params.shift_offset_m * side.sign();

        for (i, wp) in window.waypoints.iter_mut().enumerate() {
            if (i as f64 - lead_s).abs() <= gap {
                wp.position_m = wp.offset_point(offset);
                wp.width_right_m -= offset;
                wp.width_left_m += offset;
            }
        }
    }
}

impl Side {
    /// Sign of a lateral offset towards this side.
    pub fn sign(&self) -> f64 {
        match self {
            Side::Left => -1.0,
            Side::Right => 1.0,
        }
    }
}

/// Index of the window waypoint nearest the given `s`.
fn nearest_idx(window: &LocalWindow, s: f64) -> usize {
    let last = window.len().saturating_sub(1);

    if s <= 0.0 {
        0
    } else {
        (s.round() as usize).min(last)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::geom::test::straight_path;
    use nalgebra::Vector2;

    fn window(len: usize, right: f64, left: f64) -> LocalWindow {
        LocalWindow {
            start_idx: 0,
            waypoints: straight_path(len, right, left),
        }
    }

    /// An object at the given Frenet position on the straight test path.
    fn object(s: f64, d: f64, speed_mps: f64) -> TrackedObject {
        TrackedObject {
            position_m: Vector2::new(s, -d),
            heading_rad: 0.0,
            speed_mps,
            gap_m: s,
        }
    }

    fn vehicle(speed_mps: f64, objects: Vec<TrackedObject>) -> VehicleState {
        let mut v = VehicleState::at(Vector2::new(0.0, 0.0), 0.0);
        v.speed_mps = speed_mps;
        v.objects = objects;
        v
    }

    #[test]
    fn test_classify() {
        let planner = LaneChangePlanner::new(LaneChangeParams::default());
        let w = window(200, 4.0, 2.0);

        let objs = vec![
            object(10.0, 0.5, 0.0),
            object(20.0, 3.0, 0.0),
            object(30.0, -2.5, 0.0),
            object(-60.0, 0.0, 0.0),
            object(-20.0, 0.0, 0.0),
        ];

        let c = planner.classify(&w, &objs);

        assert_eq!(c.len(), 3);
        assert!(c[0].front);
        assert!(!c[1].front);
        assert!(c[2].front);
        assert!((c[2].frenet.s + 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_classify_drops_non_finite() {
        let mut planner = LaneChangePlanner::new(LaneChangeParams::default());
        let w = window(200, 4.0, 4.0);

        let mut nan_pos = object(10.0, 0.0, 0.0);
        nan_pos.position_m.x = std::f64::NAN;
        let mut inf_speed = object(20.0, 0.0, 0.0);
        inf_speed.speed_mps = std::f64::INFINITY;
        let mut nan_gap = object(30.0, 0.0, 0.0);
        nan_gap.gap_m = std::f64::NAN;

        let objs = vec![nan_pos, inf_speed, nan_gap, object(40.0, 0.0, 20.0)];

        let c = planner.classify(&w, &objs);
        assert_eq!(c.len(), 1);
        assert!((c[0].frenet.s - 40.0).abs() < 1e-9);

        // Only the finite object is considered, and it is not closing
        let out = planner.plan(w, &vehicle(20.0, objs));
        assert_eq!(out.state, LaneChangeState::Follow);
        assert_eq!(out.objects.len(), 1);
    }

    #[test]
    fn test_straight_and_follow() {
        let mut planner = LaneChangePlanner::new(LaneChangeParams::default());

        let out = planner.plan(window(200, 4.0, 4.0), &vehicle(20.0, vec![]));
        assert_eq!(out.state, LaneChangeState::Straight);
        assert!(out.updated);

        // Faster object ahead, no hazard but within follow range
        let out = planner.plan(window(200, 4.0, 4.0), &vehicle(20.0, vec![object(50.0, 0.0, 25.0)]));
        assert_eq!(out.state, LaneChangeState::Follow);

        // Object beyond the follow range
        let out = planner.plan(window(200, 4.0, 4.0), &vehicle(20.0, vec![object(150.0, 0.0, 25.0)]));
        assert_eq!(out.state, LaneChangeState::Straight);
    }

    #[test]
    fn test_overtake_right() {
        let mut planner = LaneChangePlanner::new(LaneChangeParams::default());
        let w = window(300, 6.0, 2.0);
        let original = w.clone();

        let out = planner.plan(w, &vehicle(20.0, vec![object(50.0, 0.0, 5.0)]));

        assert_eq!(out.state, LaneChangeState::Right);

        // Gap is 15 + 20 * 0.2 = 19 waypoints either side of the lead
        for (i, (new, old)) in out.window.waypoints.iter().zip(original.waypoints.iter()).enumerate() {
            if (31..=69).contains(&i) {
                let shift = (new.position_m - old.position_m).dot(&old.normal);
                assert!(shift > 0.0, "waypoint {} not shifted right", i);
            } else {
                assert_eq!(new, old, "waypoint {} should be untouched", i);
            }
        }
    }

    #[test]
    fn test_overtake_left() {
        let mut planner = LaneChangePlanner::new(LaneChangeParams::default());
        let original = window(300, 2.0, 6.0);

        let out = planner.plan(original.clone(), &vehicle(20.0, vec![object(50.0, 0.0, 5.0)]));

        assert_eq!(out.state, LaneChangeState::Left);
        let shift = (out.window.waypoints[50].position_m - original.waypoints[50].position_m)
            .dot(&original.waypoints[50].normal);
        assert!(shift < 0.0);
    }

    #[test]
    fn test_overtake_safety_gate() {
        let mut planner = LaneChangePlanner::new(LaneChangeParams::default());

        // Another car alongside the lead on the right
        let out = planner.plan(
            window(300, 6.0, 2.0),
            &vehicle(20.0, vec![object(50.0, 0.0, 5.0), object(55.0, 3.0, 5.0)]),
        );
        assert_eq!(out.state, LaneChangeState::Follow);
        assert_eq!(out.window.waypoints, window(300, 6.0, 2.0).waypoints);

        // Blind spot on the right
        let mut v = vehicle(20.0, vec![object(50.0, 0.0, 5.0)]);
        v.blind_spot.right = true;
        let out = planner.plan(window(300, 6.0, 2.0), &v);
        assert_eq!(out.state, LaneChangeState::Follow);

        // Blind spot on the other side doesn't matter
        v.blind_spot = BlindSpot { left: true, right: false };
        let out = planner.plan(window(300, 6.0, 2.0), &v);
        assert_eq!(out.state, LaneChangeState::Right);

        // Not enough room either side
        let out = planner.plan(window(300, 2.0, 2.0), &vehicle(20.0, vec![object(50.0, 0.0, 5.0)]));
        assert_eq!(out.state, LaneChangeState::Follow);
    }

    #[test]
    fn test_short_window_keeps_state() {
        let mut planner = LaneChangePlanner::new(LaneChangeParams::default());

        let out = planner.plan(window(300, 6.0, 2.0), &vehicle(20.0, vec![object(50.0, 0.0, 5.0)]));
        assert_eq!(out.state, LaneChangeState::Right);

        let short = window(4, 6.0, 2.0);
        let out = planner.plan(short.clone(), &vehicle(20.0, vec![object(2.0, 0.0, 5.0)]));
        assert_eq!(out.state, LaneChangeState::Right);
        assert!(!out.updated);
        assert_eq!(out.window.waypoints, short.waypoints);
    }
}
