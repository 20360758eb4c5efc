pub use crate::COST_EPSILON;
pub use crate::Error;

// Graph model and loading
pub use crate::loading::{EdgeRecord, GraphConfig, GraphData, NodeRecord, create_campus_graph};
pub use crate::model::{CampusGraph, Edge, Node};

// Planning
pub use crate::routing::{Route, RouteStep, plan, plan_one_to_many};

// Guidance
pub use crate::guidance::{
    GuidanceConfig, GuidanceEvent, GuidanceStatus, GuidanceTracker, Instruction,
    InstructionConfig, NavigationSession, Phase, PositionSample, ReplanContext, TurnKind,
    synthesize, synthesize_with,
};

// Units
pub use crate::Meters;
pub use crate::Seconds;
