//! Raw records handed over by external loaders

use serde::{Deserialize, Serialize};

use crate::{Meters, Seconds};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl NodeRecord {
    pub fn new(id: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            id: id.into(),
            lat,
            lon,
            tags: Vec::new(),
            name: None,
            category: None,
            description: None,
        }
    }
}

/// Directed edge; a two-way path is supplied as two records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub from: String,
    pub to: String,
    pub distance: Meters,
    #[serde(default)]
    pub accessibility_penalty: f64,
    #[serde(default)]
    pub traversal_time: Option<Seconds>,
    #[serde(default)]
    pub instruction_override: Option<String>,
}

impl EdgeRecord {
    pub fn new(from: impl Into<String>, to: impl Into<String>, distance: Meters) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            distance,
            accessibility_penalty: 0.0,
            traversal_time: None,
            instruction_override: None,
        }
    }

    #[must_use]
    pub fn with_penalty(mut self, penalty: f64) -> Self {
        self.accessibility_penalty = penalty;
        self
    }
}

/// Complete campus dataset, e.g. `{ "nodes": [...], "edges": [...] }`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphData {
    pub nodes: Vec<NodeRecord>,
    #[serde(default)]
    pub edges: Vec<EdgeRecord>,
}

impl GraphData {
    /// Parses a dataset from its JSON representation
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if the document does not match the schema
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
