//! Position input and guidance output of the tracker

use chrono::{DateTime, Utc};
use geo::Point;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, error::TrySendError};

use super::instructions::Instruction;
use crate::Meters;

/// Position fix from an external positioning source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    pub lat: f64,
    pub lon: f64,
    pub timestamp: DateTime<Utc>,
    /// Reported horizontal accuracy in meters
    #[serde(default)]
    pub accuracy: Option<Meters>,
}

impl PositionSample {
    pub fn new(lat: f64, lon: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            lat,
            lon,
            timestamp,
            accuracy: None,
        }
    }

    pub fn at_point(point: Point<f64>, timestamp: DateTime<Utc>) -> Self {
        Self::new(point.y(), point.x(), timestamp)
    }

    #[must_use]
    pub fn with_accuracy(mut self, accuracy: Meters) -> Self {
        self.accuracy = Some(accuracy);
        self
    }

    pub fn point(&self) -> Point<f64> {
        Point::new(self.lon, self.lat)
    }
}

/// Notification produced by the tracker for the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "payload")]
pub enum GuidanceEvent {
    /// An announcement is due; `distance` is the remaining distance to its node
    Instruction {
        instruction: Instruction,
        distance: Meters,
    },
    /// The user has left the route
    OffRoute {
        deviation: Meters,
        position: PositionSample,
    },
    /// A new route from `position` to `goal` is needed
    ReplanRequested {
        position: PositionSample,
        goal: String,
    },
    /// Automatic replanning from `start` found no route; it is not retried
    /// until the nearest node changes
    ReplanFailed {
        start: String,
        goal: String,
        reason: String,
    },
    /// The goal was reached
    Arrived { instruction: Instruction },
}

/// Receives events synchronously from inside `update`.
///
/// Implementations must not block: a slow consumer has to buffer or drop.
pub trait EventSink {
    fn emit(&mut self, event: GuidanceEvent);
}

impl EventSink for Vec<GuidanceEvent> {
    fn emit(&mut self, event: GuidanceEvent) {
        self.push(event);
    }
}

/// Bounded channel; events that do not fit are dropped
impl EventSink for mpsc::Sender<GuidanceEvent> {
    fn emit(&mut self, event: GuidanceEvent) {
        match self.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                warn!("Guidance event queue is full, dropping {event:?}");
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Guidance event consumer is gone");
            }
        }
    }
}
