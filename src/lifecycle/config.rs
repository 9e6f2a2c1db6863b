//! # Node Configuration
//!
//! A node is configured from a TOML file (or in code). Every field has a default, so an
//! empty file is a valid configuration.
//!
//! ```toml
//! [node]
//! id = 2
//! name = "chat-1"
//! tags = ["chat"]
//!
//! [actor]
//! call_timeout_ms = 1000
//! stop_timeout_ms = 500
//! throughput = 50
//! pool_size = 1000
//! serializer = "json"      # or "bincode"
//! ```

use crate::framework::{Serializer, SystemConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while loading a [`NodeConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub node: NodeSection,
    pub actor: ActorSection,
}

/// Identity of the node inside the cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeSection {
    pub id: u64,
    pub name: String,
    /// Broadcast topics this node subscribes to.
    pub tags: Vec<String>,
}

/// Runtime tuning shared by every actor of the node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActorSection {
    pub call_timeout_ms: u64,
    pub stop_timeout_ms: u64,
    pub throughput: usize,
    pub pool_size: usize,
    pub serializer: Serializer,
}

impl Default for NodeSection {
    fn default() -> Self {
        Self {
            id: 1,
            name: "node-1".to_string(),
            tags: Vec::new(),
        }
    }
}

impl Default for ActorSection {
    fn default() -> Self {
        let system = SystemConfig::default();
        Self {
            call_timeout_ms: system.call_timeout.as_millis() as u64,
            stop_timeout_ms: system.stop_timeout.as_millis() as u64,
            throughput: system.throughput,
            pool_size: system.pool_size,
            serializer: system.serializer,
        }
    }
}

impl NodeConfig {
    /// Reads and parses a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// The runtime settings for this node's [`System`](crate::framework::System).
    pub fn system_config(&self) -> SystemConfig {
        SystemConfig {
            node_id: self.node.id,
            call_timeout: Duration::from_millis(self.actor.call_timeout_ms),
            stop_timeout: Duration::from_millis(self.actor.stop_timeout_ms),
            throughput: self.actor.throughput,
            pool_size: self.actor.pool_size,
            serializer: self.actor.serializer,
        }
    }
}
