mod config;
mod events;
mod instructions;
mod session;
mod state;
mod tracker;

pub use config::{AnnouncementTier, GuidanceConfig, InstructionConfig};
pub use events::{EventSink, GuidanceEvent, PositionSample};
pub use instructions::{AnnouncementStage, Instruction, TurnKind, synthesize, synthesize_with};
pub use session::{NavigationSession, ReplanContext};
pub use state::{GuidanceState, GuidanceStatus, Phase};
pub use tracker::GuidanceTracker;
