//! # Velocity Profile Synthesizer
//!
//! Each cycle a number of velocity ceilings are computed from independent sources, and the
//! commanded velocity is the lowest of them:
//!
//! - `following` - keeps a safe gap to an object being followed, or holds the previous command
//!   while there is no usable path.
//! - `curvature` - the curvature limited velocity at the start of the interpolated path, bounded
//!   by the recorded reference lap.
//! - `mode` - limits imposed by the current race mode.
//! - the global cap, plus optional first lap and overtaking caps.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod params;
pub mod reference;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    feed::VehicleState,
    plan::{LaneChangeState, RaceMode, STOP_SENTINEL_MPS},
};
use log::{debug, info};
use serde::Serialize;
use util::maths::{clamp, interp_table};

use crate::{
    geom::{stopping_distance, Interpolated},
    lane_change::ClassifiedObject,
};

pub use params::{NoStopZone, VelocityParams};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Everything the synthesizer looks at in one cycle.
#[derive(Debug, Clone, Copy)]
pub struct SynthInput<'a> {
    pub mode: RaceMode,
    pub lane_state: LaneChangeState,
    pub objects: &'a [ClassifiedObject],

    /// The interpolated path, `None` if the window was too short to interpolate.
    pub interp: Option<&'a Interpolated>,

    /// Reference lap velocity at the ego position.
    pub reference_mps: Option<f64>,

    pub vehicle: &'a VehicleState,

    /// Distance left along the route to the point the vehicle must stop at.
    pub remaining_to_stop_m: Option<f64>,

    pub lap_limit_reached: bool,
}

/// Ceilings computed in a cycle, `None` where a source was inactive.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Ceilings {
    pub following_mps: Option<f64>,
    pub curvature_mps: Option<f64>,
    pub mode_mps: Option<f64>,
    pub cap_mps: f64,
    pub target_mps: f64,
}

/// The velocity synthesizer.
#[derive(Debug, Clone)]
pub struct VelocitySynth {
    params: VelocityParams,

    /// Last published target.
    prev_target_mps: f64,

    /// Set once the ego has slowed to the slow ceiling.
    slow_converged: bool,

    /// Set once braking for the pit stop has begun.
    pit_decel: bool,

    pit_ceiling_mps: Option<f64>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl VelocitySynth {
    pub fn new(params: VelocityParams) -> Self {
        Self {
            params,
            prev_target_mps: 0.0,
            slow_converged: false,
            pit_decel: false,
            pit_ceiling_mps: None,
        }
    }

    /// The most recently synthesized target.
    pub fn prev_target_mps(&self) -> f64 {
        self.prev_target_mps
    }

    /// `true` once braking for the pit stop has latched on.
    pub fn pit_decel(&self) -> bool {
        self.pit_decel
    }

    /// Clear the per-mode latches, called whenever a new route is taken on.
    pub fn reset_mode(&mut self) {
        self.slow_converged = false;
        self.pit_decel = false;
        self.pit_ceiling_mps = None;
    }

    /// Compute the target velocity for this cycle.
    pub fn synthesize(&mut self, input: &SynthInput) -> Ceilings {
        let p = &self.params;

        let curvature = input.interp.and_then(|i| i.velocity_mps.first().copied()).map(|v| {
            match input.reference_mps {
                Some(r) => v.min(r),
                None => v,
            }
        });

        let following = match input.interp {
            Some(_) => self.following_ceiling(input, curvature),
            None => Some((self.prev_target_mps - p.hold_decrement_mps).max(STOP_SENTINEL_MPS)),
        };

        let mode = self.mode_ceiling(input);

        let mut ceilings = Ceilings {
            following_mps: following,
            curvature_mps: curvature,
            mode_mps: mode,
            cap_mps: self.params.max_velocity_mps,
            target_mps: 0.0,
        };

        let mut target = [following, curvature, mode]
            .iter()
            .filter_map(|c| *c)
            .fold(ceilings.cap_mps, f64::min);

        if let Some(cap) = self.params.first_lap_cap_mps {
            if input.vehicle.lap_count == 0 {
                target = target.min(cap);
            }
        }

        if let Some(cap) = self.params.lane_change_cap_mps {
            if matches!(input.lane_state, LaneChangeState::Left | LaneChangeState::Right) {
                target = target.min(cap);
            }
        }

        if !input.vehicle.go {
            target = target.min(0.0);
        }

        // Limit increases only, braking is never delayed
        if let Some(ref map) = self.params.accel_limit_map {
            if target > self.prev_target_mps {
                let base = self.prev_target_mps.max(0.0);
                let accel = interp_table(map, base).unwrap_or(0.0);
                target = target.min(base + accel * self.params.cycle_period_s);
            }
        }

        if input.interp.is_none() && (input.lap_limit_reached || input.mode.is_terminating()) {
            debug!("No path in a terminating mode, commanding stop");
            target = STOP_SENTINEL_MPS;
        }

        ceilings.target_mps = target;
        self.prev_target_mps = target;

        ceilings
    }

    fn following_ceiling(&self, input: &SynthInput, curvature: Option<f64>) -> Option<f64> {
        if input.lane_state != LaneChangeState::Follow {
            return None;
        }

        let p = &self.params;

        let lead = input
            .objects
            .iter()
            .filter(|o| o.frenet.s > 0.0 && o.frenet.d.abs() < p.follow_band_m)
            .min_by(|a, b| {
                a.frenet
                    .s
                    .partial_cmp(&b.frenet.s)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

        match lead {
            Some(lead) => {
                let safety_gap_m = clamp(
                    input.vehicle.speed_mps * p.follow_time_gap_s,
                    p.follow_gap_min_m,
                    p.follow_gap_max_m,
                );

                Some(
                    lead.object.speed_mps
                        - (safety_gap_m - lead.object.gap_m) * p.follow_margin_mps_per_m,
                )
            }
            None => curvature,
        }
    }

    fn mode_ceiling(&mut self, input: &SynthInput) -> Option<f64> {
        let p = &self.params;
        let speed_mps = input.vehicle.speed_mps;

        match input.mode {
            RaceMode::Stop => {
                let in_zone = p
                    .no_stop_zones
                    .iter()
                    .any(|z| z.contains(&input.vehicle.position_m));

                if in_zone {
                    Some(p.no_stop_crawl_mps)
                } else {
                    Some(0.0)
                }
            }
            RaceMode::SlowOn => {
                if !self.slow_converged && speed_mps <= p.slow_velocity_mps + p.slow_tolerance_mps {
                    info!("Slowed to {:.2} m/s, following the slow reference", speed_mps);
                    self.slow_converged = true;
                }

                if self.slow_converged {
                    None
                } else {
                    Some(p.slow_velocity_mps)
                }
            }
            RaceMode::PitStop => {
                let remaining_m = match input.remaining_to_stop_m {
                    Some(r) => r,
                    // Keep braking through a cycle with no remaining distance
                    None if self.pit_decel => {
                        let base = self.pit_ceiling_mps.unwrap_or(speed_mps);
                        let ceiling = (base - p.pit_min_step_mps).max(STOP_SENTINEL_MPS);
                        self.pit_ceiling_mps = Some(ceiling);
                        return Some(ceiling);
                    }
                    None => return None,
                };

                if !self.pit_decel && remaining_m < stopping_distance(speed_mps, p.pit_decel_mps2) {
                    info!(
                        "Starting pit stop deceleration, {:.1} m remaining at {:.2} m/s",
                        remaining_m, speed_mps
                    );
                    self.pit_decel = true;
                }

                if !self.pit_decel {
                    return None;
                }

                let step = if remaining_m > std::f64::EPSILON {
                    speed_mps.powi(2) / (2.0 * remaining_m) * p.cycle_period_s
                } else {
                    std::f64::INFINITY
                };

                let base = self.pit_ceiling_mps.unwrap_or(speed_mps);
                let ceiling = (base - step.max(p.pit_min_step_mps)).max(STOP_SENTINEL_MPS);
                self.pit_ceiling_mps = Some(ceiling);

                Some(ceiling)
            }
            RaceMode::AcquireRoute | RaceMode::Race | RaceMode::SlowOff => None,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::geom::{Frenet, InterpParams, interpolate};
    use assert_approx_eq::assert_approx_eq;
    use comms_if::feed::TrackedObject;
    use nalgebra::Vector2;

    fn straight_interp() -> Interpolated {
        let pts: Vec<Vector2<f64>> = (0..100).map(|i| Vector2::new(i as f64, 0.0)).collect();
        interpolate(&pts, 15, &InterpParams::default()).unwrap()
    }

    fn vehicle(speed_mps: f64) -> VehicleState {
        let mut v = VehicleState::at(Vector2::new(0.0, 0.0), 0.0);
        v.speed_mps = speed_mps;
        v.lap_count = 1;
        v
    }

    fn lead(s: f64, d: f64, speed_mps: f64, gap_m: f64) -> ClassifiedObject {
        ClassifiedObject {
            object: TrackedObject {
                position_m: Vector2::new(s, -d),
                heading_rad: 0.0,
                speed_mps,
                gap_m,
            },
            frenet: Frenet { s, d },
            front: d.abs() < 1.25,
        }
    }

    fn input<'a>(
        mode: RaceMode,
        lane_state: LaneChangeState,
        objects: &'a [ClassifiedObject],
        interp: Option<&'a Interpolated>,
        vehicle: &'a VehicleState,
    ) -> SynthInput<'a> {
        SynthInput {
            mode,
            lane_state,
            objects,
            interp,
            reference_mps: None,
            vehicle,
            remaining_to_stop_m: None,
            lap_limit_reached: false,
        }
    }

    #[test]
    fn test_curvature_passthrough() {
        let mut synth = VelocitySynth::new(VelocityParams::default());
        let interp = straight_interp();
        let v = vehicle(20.0);

        let c = synth.synthesize(&input(RaceMode::Race, LaneChangeState::Straight, &[], Some(&interp), &v));

        assert_eq!(c.following_mps, None);
        assert_eq!(c.mode_mps, None);
        assert_eq!(c.curvature_mps, Some(interp.velocity_mps[0]));
        assert_eq!(c.target_mps, interp.velocity_mps[0]);

        // Reference lap bounds the curvature ceiling
        let mut i = input(RaceMode::Race, LaneChangeState::Straight, &[], Some(&interp), &v);
        i.reference_mps = Some(12.0);
        let c = synth.synthesize(&i);
        assert_eq!(c.curvature_mps, Some(12.0));
        assert_eq!(c.target_mps, 12.0);
    }

    #[test]
    fn test_following() {
        let mut synth = VelocitySynth::new(VelocityParams::default());
        let interp = straight_interp();
        let v = vehicle(20.0);

        // Safety gap is clamp(20 * 1.5, 20, 40) = 30 m, lead 10 m short of it
        let objs = [lead(20.0, 0.2, 15.0, 20.0)];
        let c = synth.synthesize(&input(RaceMode::Race, LaneChangeState::Follow, &objs, Some(&interp), &v));
        assert_approx_eq!(c.following_mps.unwrap(), 15.0 - 10.0 * 0.5);
        assert_approx_eq!(c.target_mps, 10.0);

        // Beyond the safety gap the lead can be closed on
        let objs = [lead(50.0, 0.0, 15.0, 50.0)];
        let c = synth.synthesize(&input(RaceMode::Race, LaneChangeState::Follow, &objs, Some(&interp), &v));
        assert_approx_eq!(c.following_mps.unwrap(), 25.0);

        // Objects outside the band fall back to the curvature ceiling
        let objs = [lead(20.0, 1.1, 15.0, 20.0)];
        let c = synth.synthesize(&input(RaceMode::Race, LaneChangeState::Follow, &objs, Some(&interp), &v));
        assert_eq!(c.following_mps, c.curvature_mps);

        // Only active while following
        let objs = [lead(20.0, 0.0, 15.0, 20.0)];
        let c = synth.synthesize(&input(RaceMode::Race, LaneChangeState::Right, &objs, Some(&interp), &v));
        assert_eq!(c.following_mps, None);
    }

    #[test]
    fn test_hold_without_path() {
        let mut synth = VelocitySynth::new(VelocityParams::default());
        let interp = straight_interp();
        let v = vehicle(20.0);

        synth.synthesize(&input(RaceMode::Race, LaneChangeState::Straight, &[], Some(&interp), &v));
        let start = synth.prev_target_mps();

        let c = synth.synthesize(&input(RaceMode::Race, LaneChangeState::Follow, &[], None, &v));
        assert_approx_eq!(c.target_mps, start - 0.5);

        // Decays down to the sentinel and no further
        for _ in 0..200 {
            synth.synthesize(&input(RaceMode::Race, LaneChangeState::Follow, &[], None, &v));
        }
        assert_eq!(synth.prev_target_mps(), STOP_SENTINEL_MPS);
    }

    #[test]
    fn test_ceiling_minimality() {
        let interp = straight_interp();
        let v = vehicle(20.0);
        let objs = [lead(20.0, 0.0, 15.0, 20.0)];

        let modes = [
            RaceMode::AcquireRoute,
            RaceMode::Race,
            RaceMode::SlowOn,
            RaceMode::SlowOff,
            RaceMode::Stop,
        ];

        for mode in modes.iter() {
            for state in [LaneChangeState::Straight, LaneChangeState::Follow].iter() {
                let mut synth = VelocitySynth::new(VelocityParams::default());
                let c = synth.synthesize(&input(*mode, *state, &objs, Some(&interp), &v));

                for active in [c.following_mps, c.curvature_mps, c.mode_mps].iter().filter_map(|c| *c) {
                    assert!(c.target_mps <= active);
                }
                assert!(c.target_mps <= c.cap_mps);
            }
        }
    }

    #[test]
    fn test_stop_mode() {
        let params = VelocityParams {
            no_stop_zones: vec![NoStopZone {
                centre_m: [100.0, 0.0],
                radius_m: 20.0,
            }],
            ..Default::default()
        };
        let mut synth = VelocitySynth::new(params);
        let interp = straight_interp();

        let v = vehicle(20.0);
        let c = synth.synthesize(&input(RaceMode::Stop, LaneChangeState::Straight, &[], Some(&interp), &v));
        assert_eq!(c.target_mps, 0.0);

        let mut v = vehicle(20.0);
        v.position_m = Vector2::new(90.0, 0.0);
        let c = synth.synthesize(&input(RaceMode::Stop, LaneChangeState::Straight, &[], Some(&interp), &v));
        assert_eq!(c.target_mps, 3.0);
    }

    #[test]
    fn test_slow_mode_latch() {
        let mut synth = VelocitySynth::new(VelocityParams::default());
        let interp = straight_interp();

        let fast = vehicle(20.0);
        let c = synth.synthesize(&input(RaceMode::SlowOn, LaneChangeState::Straight, &[], Some(&interp), &fast));
        assert_eq!(c.target_mps, 8.0);

        let slow = vehicle(8.2);
        let c = synth.synthesize(&input(RaceMode::SlowOn, LaneChangeState::Straight, &[], Some(&interp), &slow));
        assert_eq!(c.mode_mps, None);

        // Stays latched even if the ego speeds back up
        let c = synth.synthesize(&input(RaceMode::SlowOn, LaneChangeState::Straight, &[], Some(&interp), &fast));
        assert_eq!(c.mode_mps, None);

        synth.reset_mode();
        let c = synth.synthesize(&input(RaceMode::SlowOn, LaneChangeState::Straight, &[], Some(&interp), &fast));
        assert_eq!(c.mode_mps, Some(8.0));
    }

    #[test]
    fn test_go_and_caps() {
        let params = VelocityParams {
            first_lap_cap_mps: Some(27.0 / 3.6),
            lane_change_cap_mps: Some(10.0 / 3.6),
            ..Default::default()
        };
        let interp = straight_interp();

        let mut synth = VelocitySynth::new(params.clone());
        let mut v = vehicle(5.0);
        v.lap_count = 0;
        let c = synth.synthesize(&input(RaceMode::Race, LaneChangeState::Straight, &[], Some(&interp), &v));
        assert_approx_eq!(c.target_mps, 7.5);

        let c = synth.synthesize(&input(RaceMode::Race, LaneChangeState::Left, &[], Some(&interp), &v));
        assert_approx_eq!(c.target_mps, 10.0 / 3.6);

        v.go = false;
        let c = synth.synthesize(&input(RaceMode::Race, LaneChangeState::Straight, &[], Some(&interp), &v));
        assert_eq!(c.target_mps, 0.0);
    }

    #[test]
    fn test_accel_limit() {
        let params = VelocityParams {
            accel_limit_map: Some(vec![(0.0, 2.0), (20.0, 1.0)]),
            ..Default::default()
        };
        let mut synth = VelocitySynth::new(params);
        let interp = straight_interp();
        let v = vehicle(0.0);

        let c = synth.synthesize(&input(RaceMode::Race, LaneChangeState::Straight, &[], Some(&interp), &v));
        assert_approx_eq!(c.target_mps, 0.1);
        let c = synth.synthesize(&input(RaceMode::Race, LaneChangeState::Straight, &[], Some(&interp), &v));
        assert_approx_eq!(c.target_mps, 0.1 + (2.0 - 0.1 / 20.0) * 0.05);

        // Decreases are immediate
        let c = synth.synthesize(&input(RaceMode::Stop, LaneChangeState::Straight, &[], Some(&interp), &v));
        assert_eq!(c.target_mps, 0.0);
    }

    #[test]
    fn test_pit_stop_decel() {
        let mut synth = VelocitySynth::new(VelocityParams::default());
        let interp = straight_interp();
        let v = vehicle(15.0);

        // Far from the pit, no pit ceiling
        let mut i = input(RaceMode::PitStop, LaneChangeState::Straight, &[], Some(&interp), &v);
        i.remaining_to_stop_m = Some(100.0);
        let c = synth.synthesize(&i);
        assert_eq!(c.mode_mps, None);
        assert!(!synth.pit_decel());

        // Within stopping distance (37.5 m) the ceiling decays every cycle
        let mut remaining = 30.0;
        let mut prev = std::f64::INFINITY;
        let mut reached = false;

        for _ in 0..1000 {
            i.remaining_to_stop_m = Some(remaining);
            let c = synth.synthesize(&i);

            if prev == STOP_SENTINEL_MPS {
                assert_eq!(c.target_mps, STOP_SENTINEL_MPS);
                reached = true;
                break;
            }

            assert!(c.target_mps < prev);
            prev = c.target_mps;
            remaining = (remaining - 15.0 * 0.05).max(0.0);
        }

        assert!(synth.pit_decel());
        assert!(reached);
    }

    #[test]
    fn test_pit_stop_decel_without_remaining() {
        let mut synth = VelocitySynth::new(VelocityParams::default());
        let interp = straight_interp();
        let v = vehicle(15.0);

        // Not latched yet, nothing to brake for
        let mut i = input(RaceMode::PitStop, LaneChangeState::Straight, &[], Some(&interp), &v);
        assert_eq!(synth.synthesize(&i).mode_mps, None);

        i.remaining_to_stop_m = Some(20.0);
        let mut prev = synth.synthesize(&i).target_mps;
        assert!(synth.pit_decel());

        // Once latched the ceiling keeps decaying while the distance is unavailable
        i.remaining_to_stop_m = None;
        for _ in 0..5 {
            let c = synth.synthesize(&i);
            assert!(c.mode_mps.is_some());
            assert!(c.target_mps < prev);
            prev = c.target_mps;
        }

        i.remaining_to_stop_m = Some(15.0);
        assert!(synth.synthesize(&i).target_mps < prev);
    }

    #[test]
    fn test_terminating_without_path() {
        let mut synth = VelocitySynth::new(VelocityParams::default());
        let v = vehicle(10.0);

        let mut i = input(RaceMode::Race, LaneChangeState::Straight, &[], None, &v);
        i.lap_limit_reached = true;
        assert_eq!(synth.synthesize(&i).target_mps, STOP_SENTINEL_MPS);

        let mut synth = VelocitySynth::new(VelocityParams::default());
        let i = input(RaceMode::PitStop, LaneChangeState::Straight, &[], None, &v);
        assert_eq!(synth.synthesize(&i).target_mps, STOP_SENTINEL_MPS);
    }
}
