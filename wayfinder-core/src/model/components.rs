//! Campus graph components - locations and walkable connections

use std::collections::BTreeSet;

use geo::Point;
use serde::Serialize;

use crate::{Meters, Seconds};

/// Campus location: building entrance, crossing, junction, etc.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub id: String,
    pub lat: f64,
    pub lon: f64,
    /// Accessibility features present at this location (`ramp`, `elevator`, ...)
    pub tags: BTreeSet<String>,
    pub name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
}

impl Node {
    pub fn geometry(&self) -> Point<f64> {
        Point::new(self.lon, self.lat)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Name to use when talking about this location
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// Directed walkable connection between two locations
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Edge {
    /// Identifier of the node the edge leaves
    pub from: String,
    /// Identifier of the node the edge enters
    pub to: String,
    /// Physical length in meters
    pub distance: Meters,
    /// Time needed to walk the edge in seconds
    pub base_cost: Seconds,
    /// Extra cost applied when the edge lacks required accessibility features
    pub accessibility_penalty: f64,
    /// Replaces the generated text for turns onto this edge
    pub instruction_override: Option<String>,
}

impl Edge {
    /// Cost used by the planner
    pub fn cost(&self, require_accessible: bool) -> f64 {
        if require_accessible {
            self.distance + self.accessibility_penalty
        } else {
            self.distance
        }
    }

    pub fn is_accessible(&self) -> bool {
        self.accessibility_penalty <= crate::COST_EPSILON
    }
}
