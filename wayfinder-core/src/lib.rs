//! Offline route planning and turn-by-turn guidance over a campus pathway graph.
//!
//! The crate is split the same way the data flows: a static [`CampusGraph`]
//! is loaded once, [`plan`] turns it into an immutable [`Route`],
//! [`synthesize`] derives the spoken [`Instruction`]s, and a
//! [`GuidanceTracker`] follows a user along the route from position samples.

pub mod error;
pub mod geometry;
pub mod guidance;
pub mod loading;
pub mod model;
pub mod prelude;
pub mod routing;

pub use error::Error;
pub use guidance::{
    EventSink, GuidanceConfig, GuidanceEvent, GuidanceStatus, GuidanceTracker, Instruction,
    InstructionConfig, NavigationSession, Phase, PositionSample, ReplanContext, TurnKind,
    synthesize, synthesize_with,
};
pub use loading::{EdgeRecord, GraphConfig, GraphData, NodeRecord};
pub use model::{CampusGraph, Edge, Node};
pub use routing::{Route, RouteStep, plan, plan_one_to_many};

/// Distances along the ground, in meters
pub type Meters = f64;
/// Durations, in seconds
pub type Seconds = f64;

/// Tolerance used when comparing path costs and distances
pub const COST_EPSILON: f64 = 1e-6;
