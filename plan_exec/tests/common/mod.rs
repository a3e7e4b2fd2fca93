//! Helpers shared by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use comms_if::{plan::RaceMode, route::Waypoint};
use nalgebra::Vector2;
use plan_lib::{path::GlobalPath, race_mgr::route_tag, route::RouteSnapshot};

/// A straight route along the x axis with one waypoint per metre, normals pointing to -y.
pub fn straight_route(num_points: usize, width_right_m: f64, width_left_m: f64) -> GlobalPath {
    (0..num_points)
        .map(|i| {
            Waypoint::new(
                Vector2::new(i as f64, 0.0),
                width_right_m,
                width_left_m,
                Vector2::new(0.0, -1.0),
            )
        })
        .collect::<Vec<_>>()
        .into()
}

pub fn snapshot(generation: u64, mode: RaceMode, path: GlobalPath) -> Arc<RouteSnapshot> {
    Arc::new(RouteSnapshot {
        generation,
        mode,
        tag: route_tag(mode),
        path: Arc::new(path),
        anchor_idx: 0,
        reference: None,
        stop_point_m: None,
        lap_limit_reached: false,
    })
}
