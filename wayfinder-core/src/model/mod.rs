//! Static campus pathway model
//!
//! Nodes and edges live in a petgraph arena addressed by stable indices;
//! identifiers are resolved once through an index map.

pub mod components;
pub mod network;

pub use components::{Edge, Node};
pub use network::{CampusGraph, IndexedPoint};
