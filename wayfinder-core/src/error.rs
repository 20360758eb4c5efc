use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Malformed graph: {0}")]
    MalformedGraph(String),
    #[error("Unknown node: {0}")]
    UnknownNode(String),
    #[error("No path from {from} to {to}")]
    Unreachable { from: String, to: String },
    #[error("Invalid position: {0}")]
    InvalidPosition(String),
    #[error("Cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },
    #[error("Navigation session has stopped")]
    SessionClosed,
    #[error("GeoJSON error: {0}")]
    GeoJsonError(String),
}
