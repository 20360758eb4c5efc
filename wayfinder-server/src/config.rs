//! Server configuration read from a TOML file.
//!
//! Every key is optional; command-line arguments override the file.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use wayfinder_core::{GraphConfig, GuidanceConfig};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// JSON document with `nodes` and `edges`
    pub graph_path: Option<PathBuf>,
    /// Capacity of each session's event queue
    pub event_capacity: usize,
    /// Default for requests that do not say
    pub require_accessible: bool,
    /// Seconds a finished session stays readable before it is swept
    pub finished_session_ttl_secs: u64,
    pub graph: GraphConfig,
    pub guidance: GuidanceConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            graph_path: None,
            event_capacity: 64,
            require_accessible: true,
            finished_session_ttl_secs: 300,
            graph: GraphConfig::default(),
            guidance: GuidanceConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
        Ok(Self::from_toml_str(&text)?)
    }
}
