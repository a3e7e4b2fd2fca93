//! # Recorded reference lap
//!
//! Velocities recorded on a previous lap, looked up by position. The table is consumed as the
//! vehicle drives along it, so each lookup only searches a short window at the front of what
//! remains.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::Deserialize;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of entries at the front of the table searched on each lookup.
pub const SEARCH_WINDOW: usize = 45;

/// Entries ahead of the nearest one whose velocity is returned.
pub const LOOKAHEAD: usize = 3;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A source of reference velocities by position.
pub trait ReferenceVelocity {
    /// Velocity recorded near `position_m`, or `None` if no reference is available.
    fn lookup(&mut self, position_m: &Vector2<f64>) -> Option<f64>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A recorded lap.
#[derive(Debug, Clone, Default)]
pub struct ReferenceLap {
    entries: Vec<ReferenceEntry>,
}

/// One row of a recorded lap file.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ReferenceEntry {
    pub x_m: f64,
    pub y_m: f64,
    pub vx_mps: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ReferenceLap {
    pub fn new(entries: Vec<ReferenceEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ReferenceVelocity for ReferenceLap {
    fn lookup(&mut self, position_m: &Vector2<f64>) -> Option<f64> {
        let search = self.entries.len().min(SEARCH_WINDOW);

        let nearest = self.entries[..search]
            .iter()
            .enumerate()
            .map(|(i, e)| (i, (Vector2::new(e.x_m, e.y_m) - position_m).norm_squared()))
            .fold(None, |best: Option<(usize, f64)>, (i, d)| match best {
                Some((_, bd)) if bd <= d => best,
                _ => Some((i, d)),
            })
            .map(|(i, _)| i)?;

        let velocity = self
            .entries
            .get(nearest + LOOKAHEAD)
            .map(|e| e.vx_mps)
            .unwrap_or(0.0);

        // Everything before the nearest entry has been driven past
        self.entries.drain(..nearest);

        Some(velocity)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn lap(len: usize) -> ReferenceLap {
        ReferenceLap::new(
            (0..len)
                .map(|i| ReferenceEntry {
                    x_m: i as f64,
                    y_m: 0.0,
                    vx_mps: 10.0 + i as f64,
                })
                .collect(),
        )
    }

    #[test]
    fn test_lookup_ahead() {
        let mut r = lap(100);

        assert_eq!(r.lookup(&Vector2::new(0.2, 0.0)), Some(13.0));
        assert_eq!(r.lookup(&Vector2::new(10.0, 1.0)), Some(23.0));
        assert_eq!(r.len(), 90);
    }

    #[test]
    fn test_monotonic_truncation() {
        let mut r = lap(100);

        assert_eq!(r.lookup(&Vector2::new(20.0, 0.0)), Some(33.0));

        // Going back doesn't bring consumed entries back
        assert_eq!(r.lookup(&Vector2::new(5.0, 0.0)), Some(33.0));
        assert_eq!(r.len(), 80);

        // Only the search window is considered, so a big jump ahead moves to the window edge
        assert_eq!(r.lookup(&Vector2::new(90.0, 0.0)), Some(20.0 + 44.0 + 10.0 + 3.0));
    }

    #[test]
    fn test_end_of_table() {
        let mut r = lap(5);

        assert_eq!(r.lookup(&Vector2::new(3.0, 0.0)), Some(0.0));
        assert_eq!(r.len(), 2);

        let mut empty = ReferenceLap::default();
        assert_eq!(empty.lookup(&Vector2::new(0.0, 0.0)), None);
    }
}
