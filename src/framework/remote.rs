//! # Remote Transport
//!
//! The narrow contract the runtime needs from the cluster layer: deliver a message to a
//! pid on another node, perform a call against one, and fan a broadcast out to every node
//! subscribed to a topic.
//!
//! [`LocalCluster`] implements it in memory for several [`System`]s living in one process.
//! Messages still go through their wire form (JSON) on the way, so a responder never
//! crosses nodes: the receiving side installs its own and ships the
//! [`RespondMessage`] back.

use crate::framework::error::ActorError;
use crate::framework::message::{Message, RespondMessage};
use crate::framework::pid::Pid;
use crate::framework::system::{System, WeakSystem};
use async_trait::async_trait;
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

#[async_trait]
pub trait RemoteTransport: Send + Sync {
    /// Delivers `msg` to `to` on its node without waiting for processing.
    async fn remote_send(&self, to: &Pid, msg: Message) -> Result<(), ActorError>;

    /// Delivers `msg` to `to` and waits up to `timeout` for the reply.
    async fn remote_call(&self, to: &Pid, timeout: Duration, msg: Message) -> RespondMessage;

    /// Delivers a broadcast message to the actor named `msg.to.name()` on every node
    /// subscribed to that name.
    async fn broadcast(&self, msg: Message) -> Result<(), ActorError>;
}

struct Member {
    system: WeakSystem,
    tags: Vec<String>,
}

/// In-process cluster joining one [`System`] per node id.
#[derive(Clone, Default)]
pub struct LocalCluster {
    nodes: Arc<DashMap<u64, Member>>,
}

impl LocalCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `system` to the cluster, subscribed to `tags`, and installs the cluster as its
    /// remote transport.
    pub fn join(&self, system: &System, tags: &[&str]) {
        self.nodes.insert(
            system.node_id(),
            Member {
                system: system.downgrade(),
                tags: tags.iter().map(|tag| tag.to_string()).collect(),
            },
        );
        system.set_remote(Arc::new(self.clone()));
        debug!(node = system.node_id(), ?tags, "node joined cluster");
    }

    pub fn leave(&self, node_id: u64) {
        self.nodes.remove(&node_id);
        debug!(node = node_id, "node left cluster");
    }

    pub fn node_ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.nodes.iter().map(|entry| *entry.key()).collect();
        ids.sort_unstable();
        ids
    }

    fn node(&self, node_id: u64) -> Result<System, ActorError> {
        let member = self.nodes.get(&node_id).ok_or(ActorError::ProcessNotExist)?;
        member.system.upgrade().ok_or(ActorError::SystemStopped)
    }

    fn subscribers(&self, tag: &str) -> Vec<System> {
        self.nodes
            .iter()
            .filter(|entry| entry.tags.iter().any(|t| t == tag))
            .filter_map(|entry| entry.system.upgrade())
            .collect()
    }
}

/// Round-trips `msg` through its wire form, dropping any responder.
fn to_wire(msg: &Message) -> Result<Message, ActorError> {
    let frame = serde_json::to_vec(msg).map_err(|e| ActorError::Marshal(e.to_string()))?;
    serde_json::from_slice(&frame).map_err(|e| ActorError::Unmarshal(e.to_string()))
}

fn reply_from_wire(rsp: &RespondMessage) -> RespondMessage {
    serde_json::to_vec(rsp)
        .ok()
        .and_then(|frame| serde_json::from_slice(&frame).ok())
        .unwrap_or_else(|| RespondMessage::error(ActorError::InvalidMessage))
}

#[async_trait]
impl RemoteTransport for LocalCluster {
    async fn remote_send(&self, to: &Pid, msg: Message) -> Result<(), ActorError> {
        let node = self.node(to.node_id())?;
        trace!(%to, method = %msg.method, "cluster send");
        node.post_message(to, to_wire(&msg)?).await
    }

    async fn remote_call(&self, to: &Pid, timeout: Duration, msg: Message) -> RespondMessage {
        let node = match self.node(to.node_id()) {
            Ok(node) => node,
            Err(e) => return RespondMessage::error(e),
        };
        let inbound = match to_wire(&msg) {
            Ok(inbound) => inbound,
            Err(e) => return RespondMessage::error(e),
        };
        trace!(%to, method = %inbound.method, "cluster call");
        reply_from_wire(&node.request(to, inbound, timeout).await)
    }

    async fn broadcast(&self, msg: Message) -> Result<(), ActorError> {
        let to = msg.to.clone().ok_or(ActorError::InvalidMessage)?;
        for node in self.subscribers(to.name()) {
            if let Err(error) = node.post_message(&to, to_wire(&msg)?).await {
                debug!(node = node.node_id(), topic = to.name(), %error, "broadcast not delivered");
            }
        }
        Ok(())
    }
}

impl fmt::Debug for LocalCluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalCluster")
            .field("nodes", &self.node_ids())
            .finish()
    }
}
