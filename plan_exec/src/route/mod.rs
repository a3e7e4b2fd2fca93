//! # Route search and handoff
//!
//! The route search is an external collaborator, modelled by the [`RouteSearch`] trait. Routes
//! found by it are handed from the route loop to the execution loop through a [`RouteHandoff`].

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod handoff;
mod store;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::route::RouteTag;
use nalgebra::Vector2;

use crate::{path::GlobalPath, velocity::reference::ReferenceLap};

pub use handoff::{HandoffError, RouteHandoff, RouteSnapshot, RouteSummary};
pub use store::{read_reference, read_route, CsvRouteStore, RouteFiles};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Something that can find a route between two points.
pub trait RouteSearch {
    /// Find a route of the given kind from `start_m` to `goal_m`.
    fn search(
        &mut self,
        start_m: &Vector2<f64>,
        goal_m: &Vector2<f64>,
        tag: RouteTag,
    ) -> Result<RouteResult, RouteSearchError>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A route returned by the search.
#[derive(Debug, Clone)]
pub struct RouteResult {
    pub path: GlobalPath,

    /// Recorded lap to use for reference velocities along this route, if there is one.
    pub reference: Option<ReferenceLap>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum RouteSearchError {
    #[error("No route is available for {0}")]
    RouteUnavailable(RouteTag),

    #[error("The route found for {0} is empty")]
    EmptyRoute(RouteTag),

    #[error("Cannot load route file {path}: {source}")]
    LoadError {
        path: std::path::PathBuf,
        source: csv::Error,
    },
}
