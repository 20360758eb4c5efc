use serde::Deserialize;

/// Options applied while building a [`CampusGraph`](crate::CampusGraph)
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Walking speed in m/s used when an edge has no explicit traversal time
    pub walking_speed: f64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            walking_speed: 1.25,
        }
    }
}
