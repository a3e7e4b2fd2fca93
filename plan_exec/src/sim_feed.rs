//! # Simulation feed
//!
//! A kinematic stand-in for the vehicle and perception stacks, used to run the planner without a
//! vehicle. The ego vehicle follows the most recent non-empty planned path at a speed that tracks
//! the planned target velocity, limited by the configured acceleration and deceleration. Scripted
//! objects drive along the race route at constant speed, and race signals are raised at scripted
//! times.
//!
//! The simulated world is held in [`SimWorld`], which is stepped either directly (in tests) or by
//! the background thread started by [`SimFeed::start`].

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{Receiver, TryRecvError},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Instant,
};

use comms_if::{
    feed::{BlindSpot, TrackedObject, VehicleState},
    plan::PlanOutput,
};
use log::{debug, info, warn};
use nalgebra::Vector2;
use serde::Deserialize;

use crate::{feed::SharedFeed, geom::distance, loops::sleep_remaining, path::GlobalPath};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters of the simulated scenario.
#[derive(Debug, Clone, Deserialize)]
pub struct SimParams {
    /// Rate at which the simulation is stepped.
    pub rate_hz: f64,

    pub start_position_m: [f64; 2],

    pub start_heading_rad: f64,

    /// Maximum rate of increase of the ego speed.
    pub accel_mps2: f64,

    /// Maximum rate of decrease of the ego speed.
    pub decel_mps2: f64,

    /// Centre of the start/finish line.
    pub lap_line_m: [f64; 2],

    /// A lap is counted when the ego enters this radius of the lap line.
    pub lap_line_radius_m: f64,

    /// Minimum distance travelled between two counted laps.
    pub min_lap_distance_m: f64,

    /// Time after which the go flag is raised.
    pub go_delay_s: f64,

    /// Objects further than this from the ego are not reported.
    pub perception_range_m: f64,

    /// Longitudinal half length of the blind spot zones.
    pub blind_spot_length_m: f64,

    /// Lateral extent of the blind spot zones, measured from the ego centreline.
    pub blind_spot_lat_m: [f64; 2],

    #[serde(default)]
    pub objects: Vec<SimObject>,

    #[serde(default)]
    pub signals: Vec<SignalEvent>,
}

/// A scripted object driving along the race route.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SimObject {
    /// Starting distance along the route.
    pub start_m: f64,

    pub speed_mps: f64,

    /// Lateral offset along the route normal, positive to the right.
    #[serde(default)]
    pub offset_m: f64,
}

/// A race signal raised at a given time.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SignalEvent {
    pub time_s: f64,

    /// Raw signal value, as it would appear on the feed.
    pub signal: i32,
}

/// The simulated vehicle and its surroundings.
pub struct SimWorld {
    params: SimParams,

    /// Positions and normals of one loop of the track.
    track: Vec<(Vector2<f64>, Vector2<f64>)>,

    /// Cumulative distance to each track point, with the closing segment as the last entry.
    track_cumulative_m: Vec<f64>,

    ego: VehicleState,

    path_m: Vec<Vector2<f64>>,
    target_mps: f64,

    objects: Vec<(SimObject, f64)>,

    elapsed_s: f64,
    since_lap_m: f64,
    in_lap_zone: bool,
}

/// Background thread running a [`SimWorld`].
pub struct SimFeed {
    bg_jh: Option<JoinHandle<()>>,
    bg_run: Arc<AtomicBool>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SimFeedError {
    #[error("The track route must contain at least two waypoints")]
    TrackTooShort,

    #[error("Simulation rate must be positive, got {0}")]
    InvalidRate(f64),

    #[error("Could not start the simulation thread: {0}")]
    ThreadError(std::io::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimWorld {
    /// Create a new world, with scripted objects driving along the given track.
    ///
    /// The track loop closes where the route returns to its first waypoint, or at its last
    /// waypoint if it never does.
    pub fn new(params: SimParams, track: &GlobalPath) -> Result<Self, SimFeedError> {
        let wps = track.waypoints();
        if wps.len() < 2 {
            return Err(SimFeedError::TrackTooShort);
        }

        let loop_end = (1..wps.len())
            .find(|&i| distance(&wps[i].position_m, &wps[0].position_m) < 1e-6)
            .unwrap_or(wps.len());

        let track: Vec<_> = wps[..loop_end]
            .iter()
            .map(|w| (w.position_m, w.normal))
            .collect();

        let mut track_cumulative_m = Vec::with_capacity(track.len() + 1);
        let mut total = 0.0;
        track_cumulative_m.push(0.0);
        for i in 0..track.len() {
            total += distance(&track[i].0, &track[(i + 1) % track.len()].0);
            track_cumulative_m.push(total);
        }

        let mut ego = VehicleState::at(
            Vector2::new(params.start_position_m[0], params.start_position_m[1]),
            params.start_heading_rad,
        );
        ego.go = params.go_delay_s <= 0.0;

        let objects = params.objects.iter().map(|o| (*o, o.start_m)).collect();

        let mut world = Self {
            params,
            track,
            track_cumulative_m,
            ego,
            path_m: Vec::new(),
            target_mps: 0.0,
            objects,
            elapsed_s: 0.0,
            since_lap_m: f64::INFINITY,
            in_lap_zone: false,
        };
        world.perceive();

        Ok(world)
    }

    /// The current vehicle feed.
    pub fn state(&self) -> &VehicleState {
        &self.ego
    }

    pub fn elapsed_s(&self) -> f64 {
        self.elapsed_s
    }

    /// Take a new plan to follow.
    ///
    /// Plans without a path only update the target velocity, the ego keeps following the last
    /// path it was given.
    pub fn apply_plan(&mut self, plan: &PlanOutput) {
        if !plan.path_m.is_empty() {
            self.path_m = plan.path_m.clone();
        }
        self.target_mps = plan.target_velocity_mps.max(0.0);
    }

    /// Advance the world by `dt_s` seconds.
    pub fn step(&mut self, dt_s: f64) {
        let prev_elapsed_s = self.elapsed_s;
        self.elapsed_s += dt_s;

        // ---- EGO ----

        let speed = self.ego.speed_mps;
        self.ego.speed_mps = if self.target_mps >= speed {
            (speed + self.params.accel_mps2 * dt_s).min(self.target_mps)
        } else {
            (speed - self.params.decel_mps2 * dt_s).max(self.target_mps)
        };
        if !self.ego.go {
            self.ego.speed_mps = 0.0;
        }

        let step_m = self.ego.speed_mps * dt_s;
        self.advance_ego(step_m);
        self.since_lap_m += step_m;

        // ---- LAPS ----

        let lap_line = Vector2::new(self.params.lap_line_m[0], self.params.lap_line_m[1]);
        let in_zone = distance(&self.ego.position_m, &lap_line) <= self.params.lap_line_radius_m;

        if in_zone && !self.in_lap_zone && self.since_lap_m >= self.params.min_lap_distance_m {
            self.ego.lap_count += 1;
            self.since_lap_m = 0.0;
            info!("Sim: lap {} at {:.02} s", self.ego.lap_count, self.elapsed_s);
        }
        self.in_lap_zone = in_zone;

        // ---- SCRIPT ----

        if !self.ego.go && self.elapsed_s >= self.params.go_delay_s {
            info!("Sim: go");
            self.ego.go = true;
        }

        for event in self.params.signals.iter() {
            if event.time_s > prev_elapsed_s && event.time_s <= self.elapsed_s {
                info!("Sim: raising race signal {}", event.signal);
                self.ego.race_signal = event.signal;
            }
        }

        // ---- OBJECTS ----

        let loop_len = self.loop_length_m();
        for (obj, progress) in self.objects.iter_mut() {
            *progress = (*progress + obj.speed_mps * dt_s).rem_euclid(loop_len);
        }

        self.perceive();
    }

    /// Move the ego along the planned path by the given distance.
    fn advance_ego(&mut self, mut step_m: f64) {
        if self.path_m.len() < 2 || step_m <= 0.0 {
            return;
        }

        let mut idx = self
            .path_m
            .iter()
            .enumerate()
            .map(|(i, p)| (i, (p - self.ego.position_m).norm_squared()))
            .fold((0, f64::INFINITY), |best, cur| if cur.1 < best.1 { cur } else { best })
            .0;

        let mut pos = self.path_m[idx];

        while step_m > 0.0 && idx + 1 < self.path_m.len() {
            let seg = self.path_m[idx + 1] - pos;
            let seg_len = seg.norm();

            if seg_len > 0.0 {
                self.ego.heading_rad = seg.y.atan2(seg.x);
            }

            if seg_len > step_m {
                pos += seg * (step_m / seg_len);
                step_m = 0.0;
            } else {
                pos = self.path_m[idx + 1];
                step_m -= seg_len;
                idx += 1;
            }
        }

        if step_m > 0.0 {
            debug!("Sim: ego ran off the end of the planned path");
        }

        self.ego.position_m = pos;
    }

    /// Recompute the objects, gaps and blind spot flags seen from the ego.
    fn perceive(&mut self) {
        let heading = Vector2::new(self.ego.heading_rad.cos(), self.ego.heading_rad.sin());
        let left = Vector2::new(-heading.y, heading.x);

        let mut objects = Vec::with_capacity(self.objects.len());
        let mut blind_spot = BlindSpot::default();

        for (obj, progress) in self.objects.iter() {
            let (pos, tangent) = self.track_point(*progress, obj.offset_m);
            let rel = pos - self.ego.position_m;

            if rel.norm() > self.params.perception_range_m {
                continue;
            }

            let lon = rel.dot(&heading);
            let lat = rel.dot(&left);

            if lon.abs() <= self.params.blind_spot_length_m
                && lat.abs() >= self.params.blind_spot_lat_m[0]
                && lat.abs() <= self.params.blind_spot_lat_m[1]
            {
                if lat > 0.0 {
                    blind_spot.left = true;
                } else {
                    blind_spot.right = true;
                }
            }

            objects.push(TrackedObject {
                position_m: pos,
                heading_rad: tangent.y.atan2(tangent.x),
                speed_mps: obj.speed_mps,
                gap_m: lon,
            });
        }

        self.ego.objects = objects;
        self.ego.blind_spot = blind_spot;
    }

    fn loop_length_m(&self) -> f64 {
        self.track_cumulative_m
            .last()
            .copied()
            .filter(|l| *l > 0.0)
            .unwrap_or(1.0)
    }

    /// Position and tangent of the point `dist_m` along the track, offset along the normal.
    fn track_point(&self, dist_m: f64, offset_m: f64) -> (Vector2<f64>, Vector2<f64>) {
        let n = self.track.len();
        let dist_m = dist_m.rem_euclid(self.loop_length_m());

        let seg = self
            .track_cumulative_m
            .partition_point(|c| *c <= dist_m)
            .saturating_sub(1)
            .min(n - 1);

        let (a, na) = self.track[seg];
        let (b, nb) = self.track[(seg + 1) % n];
        let seg_len = self.track_cumulative_m[seg + 1] - self.track_cumulative_m[seg];
        let frac = if seg_len > 0.0 {
            (dist_m - self.track_cumulative_m[seg]) / seg_len
        } else {
            0.0
        };

        let normal = na + (nb - na) * frac;
        (a + (b - a) * frac + normal * offset_m, b - a)
    }
}

impl SimFeed {
    /// Start stepping the world in the background, writing each new state into `feed` and
    /// following the plans received on `plans`.
    pub fn start(
        mut world: SimWorld,
        feed: Arc<SharedFeed>,
        plans: Receiver<PlanOutput>,
    ) -> Result<Self, SimFeedError> {
        if !(world.params.rate_hz > 0.0) {
            return Err(SimFeedError::InvalidRate(world.params.rate_hz));
        }
        let period = util::time::period_from_hz(world.params.rate_hz);
        let dt_s = period.as_secs_f64();

        let bg_run = Arc::new(AtomicBool::new(true));
        let bg_run_clone = bg_run.clone();

        feed.update(world.state().clone());

        let bg_jh = thread::Builder::new()
            .name("sim_feed".into())
            .spawn(move || {
                let mut plans_connected = true;

                while bg_run_clone.load(Ordering::Relaxed) {
                    let cycle_start = Instant::now();

                    // Only the most recent plan matters
                    let mut latest = None;
                    while plans_connected {
                        match plans.try_recv() {
                            Ok(p) => latest = Some(p),
                            Err(TryRecvError::Empty) => break,
                            Err(TryRecvError::Disconnected) => {
                                warn!("Sim: plan sender disconnected");
                                plans_connected = false;
                            }
                        }
                    }
                    if let Some(ref p) = latest {
                        world.apply_plan(p);
                    }

                    world.step(dt_s);
                    feed.update(world.state().clone());

                    sleep_remaining("Sim feed", cycle_start, period);
                }
            })
            .map_err(SimFeedError::ThreadError)?;

        Ok(Self {
            bg_jh: Some(bg_jh),
            bg_run,
        })
    }

    /// Stop the background thread and wait for it to exit.
    pub fn stop(&mut self) {
        self.bg_run.store(false, Ordering::Relaxed);

        if let Some(jh) = self.bg_jh.take() {
            if jh.join().is_err() {
                warn!("Sim feed thread panicked");
            }
        }
    }
}

impl Drop for SimFeed {
    fn drop(&mut self) {
        self.stop();
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
