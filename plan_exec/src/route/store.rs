//! # CSV route store
//!
//! Routes and reference laps precomputed offline and stored as `;` delimited CSV files. A search
//! returns the stored route for the requested tag, cut at the goal for the pit stop route.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    collections::HashMap,
    io::Read,
    path::Path,
};

use comms_if::route::{RouteTag, Waypoint};
use log::{info, warn};
use nalgebra::Vector2;
use serde::Deserialize;

use super::{RouteResult, RouteSearch, RouteSearchError};
use crate::{
    path::GlobalPath,
    velocity::reference::{ReferenceEntry, ReferenceLap},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Files providing the route for one tag.
#[derive(Debug, Clone, Deserialize)]
pub struct RouteFiles {
    pub tag: RouteTag,

    /// Route file, relative to the data directory.
    pub route_file: String,

    /// Reference lap file, relative to the data directory.
    #[serde(default)]
    pub reference_file: Option<String>,
}

/// Route store backed by CSV files.
#[derive(Debug, Clone, Default)]
pub struct CsvRouteStore {
    routes: HashMap<RouteTag, GlobalPath>,
    references: HashMap<RouteTag, ReferenceLap>,
}

/// One row of a route file.
#[derive(Debug, Deserialize)]
struct RouteRecord {
    x_m: f64,
    y_m: f64,
    w_tr_right_m: f64,
    w_tr_left_m: f64,
    x_normvec_m: f64,
    y_normvec_m: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CsvRouteStore {
    /// Load all the given route files from the data directory.
    pub fn load(data_dir: &Path, files: &[RouteFiles]) -> Result<Self, RouteSearchError> {
        let mut store = Self::default();

        for f in files {
            let route_path = data_dir.join(&f.route_file);
            let path = read_route(std::fs::File::open(&route_path).map_err(|e| {
                RouteSearchError::LoadError {
                    path: route_path.clone(),
                    source: e.into(),
                }
            })?)
            .map_err(|source| RouteSearchError::LoadError {
                path: route_path.clone(),
                source,
            })?;

            info!("Loaded {} route ({} waypoints) from {:?}", f.tag, path.len(), route_path);
            store.insert_route(f.tag, path);

            if let Some(ref reference_file) = f.reference_file {
                let ref_path = data_dir.join(reference_file);
                let lap = read_reference(std::fs::File::open(&ref_path).map_err(|e| {
                    RouteSearchError::LoadError {
                        path: ref_path.clone(),
                        source: e.into(),
                    }
                })?)
                .map_err(|source| RouteSearchError::LoadError {
                    path: ref_path.clone(),
                    source,
                })?;

                info!("Loaded {} reference lap ({} entries)", f.tag, lap.len());
                store.insert_reference(f.tag, lap);
            }
        }

        Ok(store)
    }

    pub fn insert_route(&mut self, tag: RouteTag, path: GlobalPath) {
        self.routes.insert(tag, path);
    }

    pub fn insert_reference(&mut self, tag: RouteTag, lap: ReferenceLap) {
        self.references.insert(tag, lap);
    }

    /// The stored route for a tag, if any.
    pub fn route(&self, tag: RouteTag) -> Option<&GlobalPath> {
        self.routes.get(&tag)
    }
}

impl RouteSearch for CsvRouteStore {
    fn search(
        &mut self,
        _start_m: &Vector2<f64>,
        goal_m: &Vector2<f64>,
        tag: RouteTag,
    ) -> Result<RouteResult, RouteSearchError> {
        let stored = self
            .routes
            .get(&tag)
            .ok_or(RouteSearchError::RouteUnavailable(tag))?;

        let path = match tag {
            RouteTag::PitStop => stored.truncated_at(goal_m),
            _ => stored.clone(),
        };

        if path.is_empty() {
            warn!("Stored {} route is empty", tag);
            return Err(RouteSearchError::EmptyRoute(tag));
        }

        Ok(RouteResult {
            path,
            reference: self.references.get(&tag).cloned(),
        })
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .delimiter(b';')
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_reader(reader)
}

/// Read a route from CSV with the columns `x_m;y_m;w_tr_right_m;w_tr_left_m;x_normvec_m;y_normvec_m`.
pub fn read_route<R: Read>(reader: R) -> Result<GlobalPath, csv::Error> {
    let waypoints = csv_reader(reader)
        .deserialize::<RouteRecord>()
        .map(|r| {
            r.map(|r| {
                Waypoint::new(
                    Vector2::new(r.x_m, r.y_m),
                    r.w_tr_right_m,
                    r.w_tr_left_m,
                    Vector2::new(r.x_normvec_m, r.y_normvec_m),
                )
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(GlobalPath::new(waypoints))
}

/// Read a reference lap from CSV with the columns `x_m;y_m;vx_mps`.
pub fn read_reference<R: Read>(reader: R) -> Result<ReferenceLap, csv::Error> {
    let entries = csv_reader(reader)
        .deserialize::<ReferenceEntry>()
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ReferenceLap::new(entries))
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::velocity::reference::ReferenceVelocity;

    const ROUTE_CSV: &str = "\
# x_m; y_m; w_tr_right_m; w_tr_left_m; x_normvec_m; y_normvec_m
x_m;y_m;w_tr_right_m;w_tr_left_m;x_normvec_m;y_normvec_m
0.0;0.0;4.0;3.0;0.0;-1.0
1.0;0.0;4.0;3.0;0.0;-1.0
2.0;0.0;4.0;3.0;0.0;-1.0
3.0;0.0;4.0;3.0;0.0;-1.0
";

    #[test]
    fn test_read_route() {
        let path = read_route(ROUTE_CSV.as_bytes()).unwrap();

        assert_eq!(path.len(), 4);
        let wp = path.waypoints()[2];
        assert_eq!(wp.position_m, Vector2::new(2.0, 0.0));
        assert_eq!(wp.width_right_m, 4.0);
        assert_eq!(wp.width_left_m, 3.0);
        assert_eq!(wp.normal, Vector2::new(0.0, -1.0));
    }

    #[test]
    fn test_read_reference() {
        let csv = "x_m;y_m;vx_mps\n0.0;0.0;10.0\n1.0;0.0;11.0\n";
        let mut lap = read_reference(csv.as_bytes()).unwrap();

        assert_eq!(lap.len(), 2);
        assert_eq!(lap.lookup(&Vector2::new(0.0, 0.0)), Some(0.0));
    }

    #[test]
    fn test_search() {
        let mut store = CsvRouteStore::default();
        let path = read_route(ROUTE_CSV.as_bytes()).unwrap();
        store.insert_route(RouteTag::Race, path.clone());
        store.insert_route(RouteTag::PitStop, path);

        let origin = Vector2::new(0.0, 0.0);

        let r = store.search(&origin, &Vector2::new(10.0, 0.0), RouteTag::Race).unwrap();
        assert_eq!(r.path.len(), 4);
        assert!(r.reference.is_none());

        // Pit route ends at the goal
        let r = store.search(&origin, &Vector2::new(1.1, 0.5), RouteTag::PitStop).unwrap();
        assert_eq!(r.path.len(), 2);

        match store.search(&origin, &origin, RouteTag::ToGoal) {
            Err(RouteSearchError::RouteUnavailable(RouteTag::ToGoal)) => (),
            r => panic!("Expected the route to be unavailable, got {:?}", r),
        }
    }
}
