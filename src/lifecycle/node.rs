use crate::framework::{ActorError, LocalCluster, System};
use crate::lifecycle::config::{ConfigError, NodeConfig};
use std::path::Path;
use tracing::info;

/// One running node: a [`System`] built from a [`NodeConfig`], optionally joined to a
/// cluster.
///
/// `Node` is responsible for:
/// - **Bootstrap**: Turning the configuration into a running actor system
/// - **Cluster Membership**: Installing the transport and subscribing to the node's tags
/// - **Shutdown**: Stopping every actor and leaving the cluster
///
/// # Example
///
/// ```ignore
/// let cluster = LocalCluster::new();
/// let node = Node::new(NodeConfig::load("node.toml")?);
/// node.join(&cluster);
///
/// let pid = node.system().spawn(ChatRoom::new, (), ActorProcessOptions::new()).await?;
///
/// // Gracefully shut down when done
/// node.shutdown().await;
/// ```
pub struct Node {
    config: NodeConfig,
    system: System,
    cluster: Option<LocalCluster>,
}

impl Node {
    /// Creates the node's actor system. No actor is spawned yet.
    pub fn new(config: NodeConfig) -> Self {
        let system = System::new(config.system_config());
        info!(node = config.node.id, name = %config.node.name, "node started");
        Self {
            config,
            system,
            cluster: None,
        }
    }

    /// Creates a node from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Ok(Self::new(NodeConfig::load(path)?))
    }

    pub fn id(&self) -> u64 {
        self.config.node.id
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn system(&self) -> &System {
        &self.system
    }

    /// Joins `cluster`, subscribing to the configured tags.
    pub fn join(&mut self, cluster: &LocalCluster) {
        let tags: Vec<&str> = self.config.node.tags.iter().map(String::as_str).collect();
        cluster.join(&self.system, &tags);
        self.cluster = Some(cluster.clone());
    }

    /// Gracefully shuts the node down.
    ///
    /// Leaves the cluster first so peers stop routing to this node, then stops every actor
    /// (running their `on_stop`) and closes the worker pool.
    pub async fn shutdown(self) -> Result<(), ActorError> {
        info!(node = self.id(), "Shutting down node...");
        if let Some(cluster) = &self.cluster {
            cluster.leave(self.id());
        }
        self.system.shutdown().await;
        info!(node = self.id(), "Node shutdown complete.");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::{Actor, ActorProcessOptions, Pid, Router};
    use async_trait::async_trait;

    struct Idle;

    #[async_trait]
    impl Actor for Idle {
        fn routes(router: &mut Router<Self>) {
            router.handle_call("Echo", |_idle, _ctx, req: String| Box::pin(async move { Ok(req) }));
        }
    }

    #[tokio::test]
    async fn test_nodes_reach_each_other_through_cluster() {
        let cluster = LocalCluster::new();
        let mut one = Node::new(NodeConfig::from_toml_str("[node]\nid = 1").unwrap());
        let mut two = Node::new(NodeConfig::from_toml_str("[node]\nid = 2").unwrap());
        one.join(&cluster);
        two.join(&cluster);

        let pid = two
            .system()
            .spawn(|| Idle, (), ActorProcessOptions::new().with_name("idle"))
            .await
            .unwrap();
        let reply: String = one.system().call(None, &pid, "Echo", "hi").await.unwrap();
        assert_eq!(reply, "hi");

        two.shutdown().await.unwrap();
        assert_eq!(cluster.node_ids(), vec![1]);
        let gone: Result<String, _> = one.system().call(None, &Pid::new(2, 1), "Echo", "hi").await;
        assert_eq!(gone, Err(ActorError::ProcessNotExist));
        one.shutdown().await.unwrap();
    }
}
