//! Race local planner executable entry point.
//!
//! # Architecture
//!
//! The executable runs the planner against the kinematic simulation feed:
//!
//!     - Initialise the session, logger and parameters
//!     - Load the route store
//!     - Start the simulation feed
//!     - Spawn the route loop and execution loop threads
//!     - Main loop:
//!         - Forward published plans to the simulation
//!         - Stop on Ctrl-C, on reaching the run duration, or once stopped in the pit
//!     - Join all threads and close the session

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{self, RecvTimeoutError},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{error, info, warn};
use structopt::StructOpt;

use comms_if::{plan::RaceMode, route::RouteTag};
use plan_lib::{
    feed::{SharedFeed, VehicleFeed},
    loops::{ExecLoop, RouteLoop},
    params::ExecParams,
    planner::{LocalPlanner, Params},
    race_mgr::{RaceMgr, RaceMgrParams},
    route::{CsvRouteStore, RouteHandoff, RouteSnapshot},
    sim_feed::{SimFeed, SimParams, SimWorld},
};
use util::{
    archive::Archiver,
    host,
    logger::{logger_init, LevelFilter},
    session::Session,
    time::period_from_hz,
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// How long the main loop waits for a plan before rechecking the stop conditions.
const PLAN_RECV_TIMEOUT: Duration = Duration::from_millis(100);

/// Speed below which the vehicle is considered stationary.
const STOPPED_SPEED_MPS: f64 = 0.05;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(name = "plan_exec", about = "Race local planner running on a simulated vehicle")]
struct Opt {
    /// Minimum level of log messages to show (trace, debug or info).
    #[structopt(long, default_value = "debug")]
    log_level: LevelFilter,

    /// Level of log messages from the simulation feed.
    #[structopt(long, default_value = "info")]
    sim_log_level: LevelFilter,

    /// Stop after this many seconds.
    #[structopt(long)]
    duration_s: Option<f64>,
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opt = Opt::from_args();

    // ---- EARLY INITIALISATION ----

    let session = Session::new("plan_exec", "sessions").wrap_err("Failed to create the session")?;

    logger_init(opt.log_level, &[("plan_lib::sim_feed", opt.sim_log_level)], &session)
        .wrap_err("Failed to initialise logging")?;

    info!("Race Local Planner\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let exec_params: ExecParams =
        util::params::load("exec.toml").wrap_err("Could not load exec params")?;
    let planner_params: Params =
        util::params::load("local_planner.toml").wrap_err("Could not load local planner params")?;
    let race_mgr_params: RaceMgrParams =
        util::params::load("race_mgr.toml").wrap_err("Could not load race manager params")?;
    let sim_params: SimParams =
        util::params::load("sim_feed.toml").wrap_err("Could not load sim feed params")?;

    info!("Parameters loaded");

    // ---- ROUTES ----

    let data_dir = host::get_sw_root()
        .wrap_err("Could not find the software root")?
        .join(&exec_params.data_dir);

    let store = CsvRouteStore::load(&data_dir, &exec_params.routes)
        .wrap_err("Could not load the route store")?;

    let track = store
        .route(RouteTag::Race)
        .cloned()
        .ok_or_else(|| eyre!("No race route was loaded, the simulation needs one"))?;

    // ---- SHUTDOWN HANDLER ----

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        ctrlc::set_handler(move || {
            running.store(false, Ordering::Relaxed);
        })
        .wrap_err("Could not set the Ctrl-C handler")?;
    }

    // ---- SIMULATION ----

    let feed = Arc::new(SharedFeed::new());
    let (sim_tx, sim_rx) = mpsc::channel();

    let world = SimWorld::new(sim_params, &track).wrap_err("Could not create the simulation")?;
    let mut sim =
        SimFeed::start(world, feed.clone(), sim_rx).wrap_err("Could not start the simulation")?;

    info!("Simulation feed started");

    // ---- LOOPS ----

    let handoff = Arc::new(RouteHandoff::new());

    let saver = session.saver();
    let route_loop = RouteLoop {
        period: period_from_hz(exec_params.route_loop_rate_hz),
        race_mgr: RaceMgr::new(race_mgr_params),
        search: Box::new(store),
        feed: feed.clone(),
        handoff: handoff.clone(),
        running: running.clone(),
        on_route: Some(Box::new(move |snapshot: &RouteSnapshot| {
            saver.save(
                format!("routes/route_{:03}.json", snapshot.generation),
                snapshot.summary(),
            )
        })),
    };

    let archiver = if exec_params.archive_plans {
        Some(Archiver::from_path(&session, "plans.csv").wrap_err("Could not create the plan archive")?)
    } else {
        None
    };

    let (plan_tx, plan_rx) = mpsc::channel();
    let exec_loop = ExecLoop {
        period: period_from_hz(exec_params.exec_loop_rate_hz),
        planner: LocalPlanner::new(planner_params).wrap_err("Failed to initialise the planner")?,
        feed: feed.clone(),
        handoff: handoff.clone(),
        running: running.clone(),
        publisher: plan_tx,
        archiver,
    };

    let route_jh = thread::Builder::new()
        .name("route_loop".into())
        .spawn(move || route_loop.run())
        .wrap_err("Could not start the route loop")?;
    let exec_jh = thread::Builder::new()
        .name("exec_loop".into())
        .spawn(move || exec_loop.run())
        .wrap_err("Could not start the execution loop")?;

    info!("Loops started\n");

    // ---- MAIN LOOP ----

    let start = Instant::now();
    let mut last_mode: Option<RaceMode> = None;

    while running.load(Ordering::Relaxed) {
        if let Some(d) = opt.duration_s {
            if start.elapsed().as_secs_f64() >= d {
                info!("Run duration of {:.01} s reached", d);
                break;
            }
        }

        let plan = match plan_rx.recv_timeout(PLAN_RECV_TIMEOUT) {
            Ok(p) => p,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                warn!("Execution loop has stopped publishing");
                break;
            }
        };

        if last_mode != Some(plan.race_mode) {
            info!("Now planning in {:?}", plan.race_mode);
            last_mode = Some(plan.race_mode);
        }

        let stopped_in_pit = plan.race_mode.is_terminating()
            && plan.is_stop()
            && feed
                .latest()
                .map(|v| v.speed_mps < STOPPED_SPEED_MPS)
                .unwrap_or(false);

        if sim_tx.send(plan).is_err() {
            warn!("Simulation no longer accepting plans");
            break;
        }

        if stopped_in_pit {
            info!("Vehicle stopped in the pit");
            break;
        }
    }

    // ---- SHUTDOWN ----

    info!("Shutting down");
    running.store(false, Ordering::Relaxed);

    match route_jh.join() {
        Ok(Ok(())) => (),
        Ok(Err(e)) => error!("Route loop failed: {}", e),
        Err(_) => error!("Route loop panicked"),
    }
    match exec_jh.join() {
        Ok(Ok(n)) => info!("{} plans published", n),
        Ok(Err(e)) => error!("Execution loop failed: {}", e),
        Err(_) => error!("Execution loop panicked"),
    }

    sim.stop();

    info!("End of execution");

    session.exit();

    Ok(())
}
