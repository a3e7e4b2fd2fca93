//! # Interpolation Benchmark

use criterion::{criterion_group, criterion_main, Criterion};

use comms_if::{feed::VehicleState, route::Waypoint};
use nalgebra::Vector2;
use plan_lib::{
    geom::{interpolate, InterpParams},
    lane_change::{LaneChangeParams, LaneChangePlanner},
    path::LocalWindow,
};

fn interpolate_benchmark(c: &mut Criterion) {
    // ---- Build a window around a 100 m radius corner ----

    let radius_m = 100.0;
    let waypoints: Vec<Waypoint> = (0..200)
        .map(|i| {
            let a = i as f64 / radius_m;
            Waypoint::new(
                Vector2::new(radius_m * a.sin(), radius_m * (1.0 - a.cos())),
                5.0,
                5.0,
                Vector2::new(a.sin(), -a.cos()),
            )
        })
        .collect();
    let positions: Vec<_> = waypoints.iter().map(|w| w.position_m).collect();
    let params = InterpParams::default();

    c.bench_function("interpolate", |b| {
        b.iter(|| interpolate(&positions, 15, &params).unwrap())
    });

    // ---- Lane change with a slow object ahead ----

    let mut vehicle = VehicleState::at(Vector2::new(0.0, 0.0), 0.0);
    vehicle.speed_mps = 25.0;
    vehicle.objects.push(comms_if::feed::TrackedObject {
        position_m: waypoints[40].position_m,
        heading_rad: 0.4,
        speed_mps: 10.0,
        gap_m: 40.0,
    });
    let mut planner = LaneChangePlanner::new(LaneChangeParams::default());

    c.bench_function("LaneChangePlanner::plan", |b| {
        b.iter(|| {
            planner.plan(
                LocalWindow {
                    start_idx: 0,
                    waypoints: waypoints.clone(),
                },
                &vehicle,
            )
        })
    });
}

criterion_group!(benches, interpolate_benchmark);
criterion_main!(benches);
