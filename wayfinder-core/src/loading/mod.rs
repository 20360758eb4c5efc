//! This module is responsible for validating externally supplied campus data
//! and building the routing graph from it.

mod builder;
mod config;
mod records;

pub use builder::create_campus_graph;
pub use config::GraphConfig;
pub use records::{EdgeRecord, GraphData, NodeRecord};
