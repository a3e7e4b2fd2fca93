//! # Local planner
//!
//! The per-cycle execution pipeline. Given the route currently held by the race manager and the
//! latest vehicle state, the local planner:
//!
//! 1. trims the route to a local window ahead of the vehicle,
//! 2. classifies objects against the window and shifts it for an overtake if needed,
//! 3. interpolates the window into a fine path with curvature,
//! 4. combines the velocity ceilings into a single target velocity.
//!
//! Degenerate input never fails the cycle. A window too short to plan on is reported in the
//! [`StatusReport`] and published as an empty path with a held or stopping velocity.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod params;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::sync::Arc;

use comms_if::{feed::VehicleState, plan::PlanOutput};
use log::{debug, info, warn};
use serde::Serialize;
use util::module::State;

use crate::{
    geom::{interpolate, Interpolated},
    lane_change::{ClassifiedObject, LaneChangePlanner},
    path::PathWindow,
    route::RouteSnapshot,
    velocity::{reference::ReferenceLap, reference::ReferenceVelocity, Ceilings, SynthInput, VelocitySynth},
};

pub use params::Params;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The local planner.
pub struct LocalPlanner {
    params: Params,

    window: PathWindow,
    lane_change: LaneChangePlanner,
    synth: VelocitySynth,

    /// Generation of the route currently being driven.
    generation: Option<u64>,

    /// Reference lap of the current route, consumed as the vehicle drives.
    reference: Option<ReferenceLap>,

    /// Set while the window is degenerate, to only warn on the first cycle.
    degenerate: bool,
}

/// Input data to the planner.
#[derive(Debug, Clone)]
pub struct PlanInput {
    pub snapshot: Arc<RouteSnapshot>,
    pub vehicle: VehicleState,
}

/// Status of a planning cycle.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusReport {
    pub generation: u64,

    /// Global index of the first waypoint in the window.
    pub window_start_idx: usize,

    pub window_len: usize,

    /// The window was too short and no path was produced.
    pub window_degenerate: bool,

    /// Number of interpolated samples, 0 if interpolation wasn't possible.
    pub interp_samples: usize,

    /// `false` if the lane change planner kept its previous decision.
    pub lane_change_updated: bool,

    pub num_objects: usize,

    pub remaining_to_stop_m: Option<f64>,

    pub ceilings: Ceilings,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PlannerError {
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Vehicle state is not finite: position {0:?}, speed {1}")]
    InvalidVehicleState([f64; 2], f64),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl LocalPlanner {
    pub fn new(params: Params) -> Result<Self, PlannerError> {
        let mut planner = Self::default();
        planner.init(params)?;
        Ok(planner)
    }

    /// Generation of the route being driven.
    pub fn generation(&self) -> Option<u64> {
        self.generation
    }

    /// Switch to a newly published route.
    fn take_route(&mut self, snapshot: &RouteSnapshot) {
        info!(
            "Planner taking route {} ({:?}, anchored at {})",
            snapshot.generation, snapshot.mode, snapshot.anchor_idx
        );

        self.generation = Some(snapshot.generation);
        self.window.reset(snapshot.anchor_idx);
        self.reference = snapshot.reference.clone();
        self.lane_change.reset();
        self.synth.reset_mode();
        self.degenerate = false;
    }
}

impl Default for LocalPlanner {
    fn default() -> Self {
        let params = Params::default();

        Self {
            window: PathWindow::new(params.window.clone()),
            lane_change: LaneChangePlanner::new(params.lane_change.clone()),
            synth: VelocitySynth::new(params.velocity.clone()),
            params,
            generation: None,
            reference: None,
            degenerate: false,
        }
    }
}

impl State for LocalPlanner {
    type InitData = Params;
    type InitError = PlannerError;

    type InputData = PlanInput;
    type OutputData = PlanOutput;
    type StatusReport = StatusReport;
    type ProcError = PlannerError;

    fn init(&mut self, params: Self::InitData) -> Result<(), Self::InitError> {
        if params.window.min_points < 2 {
            return Err(PlannerError::InvalidParams(
                "window.min_points must be at least 2".into(),
            ));
        }
        if params.window.window_length < params.window.min_points {
            return Err(PlannerError::InvalidParams(
                "window.window_length must be at least window.min_points".into(),
            ));
        }
        if !(params.interp.spacing_m > 0.0) {
            return Err(PlannerError::InvalidParams(
                "interp.spacing_m must be positive".into(),
            ));
        }
        if !(params.velocity.pit_min_step_mps > 0.0) {
            return Err(PlannerError::InvalidParams(
                "velocity.pit_min_step_mps must be positive".into(),
            ));
        }

        self.window = PathWindow::new(params.window.clone());
        self.lane_change = LaneChangePlanner::new(params.lane_change.clone());
        self.synth = VelocitySynth::new(params.velocity.clone());
        self.params = params;
        self.generation = None;
        self.reference = None;
        self.degenerate = false;

        Ok(())
    }

    fn proc(
        &mut self,
        input: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        let vehicle = &input.vehicle;
        let snapshot = &input.snapshot;

        if !(vehicle.position_m.iter().all(|v| v.is_finite()) && vehicle.speed_mps.is_finite()) {
            return Err(PlannerError::InvalidVehicleState(
                [vehicle.position_m.x, vehicle.position_m.y],
                vehicle.speed_mps,
            ));
        }

        if self.generation != Some(snapshot.generation) {
            self.take_route(snapshot);
        }

        let mut report = StatusReport {
            generation: snapshot.generation,
            ..Default::default()
        };

        // ---- PATH WINDOW ----

        let window = match self.window.trim_and_advance(&snapshot.path, &vehicle.position_m) {
            Ok(w) => {
                if self.degenerate {
                    info!("Local window recovered");
                    self.degenerate = false;
                }
                Some(w)
            }
            Err(e) => {
                if !self.degenerate {
                    warn!("Holding, no usable local window: {}", e);
                    self.degenerate = true;
                }
                report.window_degenerate = true;
                None
            }
        };
        report.window_start_idx = self.window.cursor();

        // ---- LANE CHANGE ----

        let lane_out = window.map(|w| self.lane_change.plan(w, vehicle));
        let lane_state = match lane_out {
            Some(ref o) => o.state,
            None => self.lane_change.state(),
        };

        if let Some(ref o) = lane_out {
            report.window_len = o.window.len();
            report.lane_change_updated = o.updated;
            report.num_objects = o.objects.len();
        }

        // ---- INTERPOLATION ----

        let interp: Option<Interpolated> = match lane_out {
            Some(ref o) => {
                match interpolate(&o.window.positions(), self.params.min_interp_samples, &self.params.interp) {
                    Ok(i) => Some(i),
                    Err(e) => {
                        debug!("Cannot interpolate local window: {}", e);
                        None
                    }
                }
            }
            None => None,
        };
        report.interp_samples = interp.as_ref().map(|i| i.len()).unwrap_or(0);

        // ---- VELOCITY ----

        let reference_mps = self
            .reference
            .as_mut()
            .and_then(|r| r.lookup(&vehicle.position_m));

        report.remaining_to_stop_m = snapshot
            .stop_point_m
            .and_then(|p| snapshot.path.remaining_distance(self.window.cursor(), &p));

        let objects: &[ClassifiedObject] = match lane_out {
            Some(ref o) => o.objects.as_slice(),
            None => &[],
        };

        report.ceilings = self.synth.synthesize(&SynthInput {
            mode: snapshot.mode,
            lane_state,
            objects,
            interp: interp.as_ref(),
            reference_mps,
            vehicle,
            remaining_to_stop_m: report.remaining_to_stop_m,
            lap_limit_reached: snapshot.lap_limit_reached,
        });

        let (path_m, curvature_m) = match interp {
            Some(i) => (i.points_m, i.curvature_m),
            None => (Vec::new(), Vec::new()),
        };

        Ok((
            PlanOutput {
                path_m,
                curvature_m,
                target_velocity_mps: report.ceilings.target_mps,
                race_mode: snapshot.mode,
                lane_change: lane_state,
            },
            report,
        ))
    }
}
