#![allow(dead_code)]

use chrono::{DateTime, TimeDelta, Utc};
use geo::{Destination, Haversine, Point};
use wayfinder_core::{CampusGraph, EdgeRecord, NodeRecord, PositionSample};

pub const SPACING: f64 = 100.0;

pub fn origin() -> Point<f64> {
    Point::new(116.3264, 40.0036)
}

/// Point `north` and `east` meters away from the origin
pub fn offset(north: f64, east: f64) -> Point<f64> {
    let moved = Haversine.destination(origin(), 0.0, north);
    Haversine.destination(moved, 90.0, east)
}

pub fn record(id: &str, point: Point<f64>) -> NodeRecord {
    NodeRecord::new(id, point.y(), point.x())
}

pub fn grid_id(row: usize, col: usize) -> String {
    format!("n{row:02}_{col:02}")
}

/// Square lattice of `size * size` nodes joined in both directions.
/// Every edge is exactly [`SPACING`] long; `penalty(row, col, horizontal)`
/// decides the accessibility penalty of the edges leaving a node.
pub fn grid_records(
    size: usize,
    penalty: impl Fn(usize, usize, bool) -> f64,
) -> (Vec<NodeRecord>, Vec<EdgeRecord>) {
    let mut nodes = Vec::with_capacity(size * size);
    let mut edges = Vec::new();

    for row in 0..size {
        for col in 0..size {
            let point = offset(row as f64 * SPACING, col as f64 * SPACING);
            nodes.push(record(&grid_id(row, col), point));

            if col + 1 < size {
                let p = penalty(row, col, true);
                edges.push(
                    EdgeRecord::new(grid_id(row, col), grid_id(row, col + 1), SPACING).with_penalty(p),
                );
                edges.push(
                    EdgeRecord::new(grid_id(row, col + 1), grid_id(row, col), SPACING).with_penalty(p),
                );
            }
            if row + 1 < size {
                let p = penalty(row, col, false);
                edges.push(
                    EdgeRecord::new(grid_id(row, col), grid_id(row + 1, col), SPACING).with_penalty(p),
                );
                edges.push(
                    EdgeRecord::new(grid_id(row + 1, col), grid_id(row, col), SPACING).with_penalty(p),
                );
            }
        }
    }
    (nodes, edges)
}

pub fn grid(size: usize, penalty: impl Fn(usize, usize, bool) -> f64) -> CampusGraph {
    let (nodes, edges) = grid_records(size, penalty);
    CampusGraph::load(nodes, edges).unwrap()
}

/// A(0,0), B 100 m north, C 200 m north, both directions
pub fn abc() -> CampusGraph {
    let mut c = record("C", offset(200.0, 0.0));
    c.name = Some("Library".to_string());
    CampusGraph::load(
        vec![
            record("A", offset(0.0, 0.0)),
            record("B", offset(100.0, 0.0)),
            c,
        ],
        vec![
            EdgeRecord::new("A", "B", 100.0),
            EdgeRecord::new("B", "A", 100.0),
            EdgeRecord::new("B", "C", 100.0),
            EdgeRecord::new("C", "B", 100.0),
        ],
    )
    .unwrap()
}

pub fn at(seconds: f64) -> DateTime<Utc> {
    DateTime::from_timestamp(1_750_000_000, 0).unwrap()
        + TimeDelta::milliseconds((seconds * 1000.0) as i64)
}

pub fn sample(north: f64, east: f64, seconds: f64) -> PositionSample {
    PositionSample::at_point(offset(north, east), at(seconds))
}
