//! Node bootstrap: configuration, the running [`Node`], and log setup.

pub mod config;
pub mod node;
pub mod tracing;

pub use config::{ActorSection, ConfigError, NodeConfig, NodeSection};
pub use node::Node;
