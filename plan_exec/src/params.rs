//! Executable parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

use crate::route::RouteFiles;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters for the `plan_exec` executable.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecParams {
    /// Rate at which the route loop runs.
    pub route_loop_rate_hz: f64,

    /// Rate at which the execution loop runs.
    pub exec_loop_rate_hz: f64,

    /// Directory holding the route files, relative to the software root.
    pub data_dir: String,

    /// Route files to load into the route store.
    pub routes: Vec<RouteFiles>,

    /// If true every published plan is archived into the session.
    #[serde(default)]
    pub archive_plans: bool,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for ExecParams {
    fn default() -> Self {
        Self {
            route_loop_rate_hz: 20.0,
            exec_loop_rate_hz: 20.0,
            data_dir: "data".into(),
            routes: Vec::new(),
            archive_plans: true,
        }
    }
}
