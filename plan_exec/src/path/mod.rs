//! # Path Window Manager
//!
//! A [`GlobalPath`] is the route handed over by the race manager. It is immutable and shared
//! between threads, so consumption is tracked by a [`PathWindow`] cursor owned by the execution
//! loop instead of by removing waypoints from the path. The cursor only ever moves forward, so
//! every waypoint behind it is considered consumed.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::route::Waypoint;
use log::trace;
use nalgebra::Vector2;
use serde::Deserialize;

use crate::geom::{closest_index_in, distance};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A complete route, with the cumulative distance to each waypoint precomputed.
#[derive(Debug, Clone, Default)]
pub struct GlobalPath {
    waypoints: Vec<Waypoint>,
    cumulative_m: Vec<f64>,
}

/// A forward slice of the global path starting at the consumption cursor.
#[derive(Debug, Clone)]
pub struct LocalWindow {
    /// Index in the global path of the first waypoint in this window.
    pub start_idx: usize,

    pub waypoints: Vec<Waypoint>,
}

/// Consumption cursor over a global path.
#[derive(Debug, Clone)]
pub struct PathWindow {
    params: WindowParams,
    cursor: usize,
}

/// Path window parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct WindowParams {
    /// Maximum number of waypoints in a local window.
    pub window_length: usize,

    /// Minimum number of waypoints a window must contain to be planned on.
    pub min_points: usize,

    /// Number of waypoints ahead of the cursor searched for the closest waypoint.
    pub search_horizon: usize,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WindowError {
    #[error("The global path is empty")]
    EmptyPath,

    #[error("Only {remaining} waypoints remain, at least {min} are needed")]
    TooShort { remaining: usize, min: usize },
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl GlobalPath {
    pub fn new(waypoints: Vec<Waypoint>) -> Self {
        let mut cumulative_m = Vec::with_capacity(waypoints.len());
        let mut total = 0.0;

        for (i, wp) in waypoints.iter().enumerate() {
            if i > 0 {
                total += distance(&waypoints[i - 1].position_m, &wp.position_m);
            }
            cumulative_m.push(total);
        }

        Self {
            waypoints,
            cumulative_m,
        }
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Distance along the path between two waypoint indices, `None` if either is out of range.
    pub fn length_between(&self, from_idx: usize, to_idx: usize) -> Option<f64> {
        let from = self.cumulative_m.get(from_idx)?;
        let to = self.cumulative_m.get(to_idx)?;

        Some((to - from).abs())
    }

    /// Distance remaining along the path from `from_idx` to the waypoint closest to `point` at or
    /// after it.
    pub fn remaining_distance(&self, from_idx: usize, point: &Vector2<f64>) -> Option<f64> {
        let target_idx = closest_index_in(&self.waypoints, point, from_idx, self.len())?;

        self.length_between(from_idx, target_idx)
    }

    /// A copy of this path ending at the waypoint closest to `point`.
    pub fn truncated_at(&self, point: &Vector2<f64>) -> Self {
        match crate::geom::closest_index(&self.waypoints, point) {
            Some(idx) => Self::new(self.waypoints[..=idx].to_vec()),
            None => self.clone(),
        }
    }
}

impl From<Vec<Waypoint>> for GlobalPath {
    fn from(waypoints: Vec<Waypoint>) -> Self {
        Self::new(waypoints)
    }
}

impl LocalWindow {
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn positions(&self) -> Vec<Vector2<f64>> {
        self.waypoints.iter().map(|w| w.position_m).collect()
    }
}

impl PathWindow {
    pub fn new(params: WindowParams) -> Self {
        Self { params, cursor: 0 }
    }

    /// Restart consumption from the given anchor on a new path.
    pub fn reset(&mut self, anchor_idx: usize) {
        self.cursor = anchor_idx;
    }

    /// Index of the first unconsumed waypoint.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn params(&self) -> &WindowParams {
        &self.params
    }

    /// Advance the cursor to the waypoint closest to the ego vehicle and return the window ahead
    /// of it.
    ///
    /// The closest waypoint is only searched for ahead of the cursor, and the cursor never moves
    /// backwards, so a window never includes waypoints already consumed.
    pub fn trim_and_advance(
        &mut self,
        path: &GlobalPath,
        ego_position_m: &Vector2<f64>,
    ) -> Result<LocalWindow, WindowError> {
        if path.is_empty() {
            return Err(WindowError::EmptyPath);
        }

        // A cursor past the end (from an anchor on a longer path) is pulled back to the last
        // waypoint, leaving a too-short window
        let start = self.cursor.min(path.len() - 1);
        let horizon = self.params.search_horizon.max(1);

        if let Some(idx) = closest_index_in(path.waypoints(), ego_position_m, start, horizon) {
            if idx > self.cursor {
                trace!("Path cursor advanced {} -> {}", self.cursor, idx);
                self.cursor = idx;
            }
        }

        let start = self.cursor.min(path.len());
        let end = start.saturating_add(self.params.window_length).min(path.len());
        let remaining = end - start;

        if remaining < self.params.min_points {
            return Err(WindowError::TooShort {
                remaining,
                min: self.params.min_points,
            });
        }

        Ok(LocalWindow {
            start_idx: start,
            waypoints: path.waypoints()[start..end].to_vec(),
        })
    }
}

impl Default for WindowParams {
    fn default() -> Self {
        Self {
            window_length: 200,
            min_points: 5,
            search_horizon: 100,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::geom::test::straight_path;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_window_follows_ego() {
        let path = GlobalPath::new(straight_path(500, 3.0, 3.0));
        let mut win = PathWindow::new(WindowParams::default());

        let w = win.trim_and_advance(&path, &Vector2::new(0.0, 0.0)).unwrap();
        assert_eq!(w.start_idx, 0);
        assert_eq!(w.len(), 200);

        let w = win.trim_and_advance(&path, &Vector2::new(42.3, 1.0)).unwrap();
        assert_eq!(w.start_idx, 42);
        assert_eq!(w.waypoints[0].position_m, Vector2::new(42.0, 0.0));

        // Near the end the window shrinks
        let w = win.trim_and_advance(&path, &Vector2::new(120.0, 0.0)).unwrap();
        assert_eq!(w.start_idx, 120);
        let w = win.trim_and_advance(&path, &Vector2::new(210.0, 0.0)).unwrap();
        assert_eq!(w.start_idx, 210);
        let w = win.trim_and_advance(&path, &Vector2::new(305.0, 0.0)).unwrap();
        assert_eq!(w.start_idx, 305);
        assert_eq!(w.len(), 195);
    }

    #[test]
    fn test_monotonic_consumption() {
        let path = GlobalPath::new(straight_path(300, 3.0, 3.0));
        let mut win = PathWindow::new(WindowParams::default());

        let xs = [0.0, 10.0, 5.0, 20.0, -50.0, 18.0, 60.0, 30.0];
        let mut last = 0;

        for x in xs.iter() {
            let w = win.trim_and_advance(&path, &Vector2::new(*x, 0.0)).unwrap();
            assert!(w.start_idx >= last);
            assert_eq!(w.start_idx, win.cursor());
            last = w.start_idx;
        }

        assert_eq!(last, 60);
    }

    #[test]
    fn test_search_horizon() {
        let path = GlobalPath::new(straight_path(300, 3.0, 3.0));
        let mut win = PathWindow::new(WindowParams {
            search_horizon: 10,
            ..Default::default()
        });

        // The ego is far ahead but the cursor can only jump by the horizon each call
        let w = win.trim_and_advance(&path, &Vector2::new(50.0, 0.0)).unwrap();
        assert_eq!(w.start_idx, 9);
        let w = win.trim_and_advance(&path, &Vector2::new(50.0, 0.0)).unwrap();
        assert_eq!(w.start_idx, 18);
    }

    #[test]
    fn test_too_short() {
        let path = GlobalPath::new(straight_path(4, 3.0, 3.0));
        let mut win = PathWindow::new(WindowParams::default());

        assert_eq!(
            win.trim_and_advance(&path, &Vector2::new(0.0, 0.0)).unwrap_err(),
            WindowError::TooShort { remaining: 4, min: 5 }
        );

        let empty = GlobalPath::default();
        assert_eq!(
            win.trim_and_advance(&empty, &Vector2::new(0.0, 0.0)).unwrap_err(),
            WindowError::EmptyPath
        );
    }

    #[test]
    fn test_remaining_distance() {
        let path = GlobalPath::new(straight_path(100, 3.0, 3.0));

        assert_approx_eq!(path.remaining_distance(10, &Vector2::new(60.0, 2.0)).unwrap(), 50.0);
        // Points behind the start are clamped to the start
        assert_approx_eq!(path.remaining_distance(10, &Vector2::new(0.0, 0.0)).unwrap(), 0.0);
        assert_eq!(path.remaining_distance(100, &Vector2::new(0.0, 0.0)), None);

        let cut = path.truncated_at(&Vector2::new(40.2, 0.0));
        assert_eq!(cut.len(), 41);
        assert_approx_eq!(cut.length_between(0, 40).unwrap(), 40.0);
    }
}
