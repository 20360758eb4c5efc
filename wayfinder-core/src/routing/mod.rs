//! Accessible path planning over the campus graph

mod dijkstra;
mod planner;
mod route;
mod to_geojson;

pub use planner::{plan, plan_one_to_many};
pub use route::{Route, RouteStep};
