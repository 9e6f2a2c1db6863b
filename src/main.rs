//! # Actor Runtime Demo
//!
//! Two in-memory nodes joined by a [`LocalCluster`]:
//!
//! - node 1 hosts the gate of a connected client,
//! - node 2 hosts the `lobby` chat room.
//!
//! The client enters the room and chats through its gate; the room answers and pushes
//! lines back across the cluster. An inner client then talks to the same room by name.

use actor_runtime::clients::{ActorClient, ChatClient, GateClient};
use actor_runtime::framework::{ActorError, LocalCluster, NetworkPacket, Pid};
use actor_runtime::lifecycle::tracing::setup_tracing;
use actor_runtime::lifecycle::{Node, NodeConfig};
use actor_runtime::model::{ChatLine, ClientChat, RoomJoin, RoomSettings, CHAT_NOTIFY, CHAT_REQ, ENTER_REQ};
use std::time::Duration;
use tracing::{info, Instrument};

const GATE_NODE: &str = r#"
[node]
id = 1
name = "gate"
"#;

const CHAT_NODE: &str = r#"
[node]
id = 2
name = "chat"
tags = ["lobby"]

[actor]
call_timeout_ms = 2000
"#;

#[tokio::main]
async fn main() -> Result<(), ActorError> {
    // Setup tracing once for the entire application
    setup_tracing();

    let cluster = LocalCluster::new();
    let mut gate_node = Node::new(NodeConfig::from_toml_str(GATE_NODE).map_err(config_error)?);
    let mut chat_node = Node::new(NodeConfig::from_toml_str(CHAT_NODE).map_err(config_error)?);
    gate_node.join(&cluster);
    chat_node.join(&cluster);

    let settings = RoomSettings {
        history_limit: 50,
        tick: Some(Duration::from_secs(1)),
    };
    let room = ChatClient::open(chat_node.system(), "lobby", settings)
        .await
        .map_err(ActorError::from)?;
    info!(room = %room.pid(), "Lobby open on node 2");

    // A network client connected to node 1
    let gate = GateClient::connect(gate_node.system()).await?;
    let lobby = Pid::named(2, "lobby");
    async {
        gate.packet(&lobby, "Enter", ENTER_REQ, &RoomJoin::new(1, "alice")).await?;
        gate.packet(&lobby, "Chat", CHAT_REQ, &ClientChat { text: "hello from node 1".into() })
            .await
    }
    .instrument(tracing::info_span!("client_session"))
    .await?;

    // Inner callers reach the same room by name from either node
    let remote_room = ChatClient::new(gate_node.system().clone(), lobby.clone());
    remote_room.join(2, "bob").await.map_err(ActorError::from)?;
    let seq = remote_room.say(2, "hi alice").await.map_err(ActorError::from)?;
    info!(seq, "Bob spoke");

    room.notice_cluster("lobby", "maintenance at noon")
        .await
        .map_err(ActorError::from)?;

    let pushed = wait_for_pushes(&gate, 5).await?;
    for packet in &pushed {
        if packet.id == CHAT_NOTIFY {
            let line: ChatLine = gate_node.system().serializer().unmarshal(&packet.data)?;
            info!(from = %line.from, text = %line.text, "Client received line");
        } else {
            info!(id = packet.id, "Client received ack");
        }
    }

    let stats = room.stats().await.map_err(ActorError::from)?;
    info!(?stats, "Lobby stats");

    gate_node.shutdown().await?;
    chat_node.shutdown().await?;
    Ok(())
}

/// Polls the gate until `count` packets arrived or two seconds passed.
async fn wait_for_pushes(gate: &GateClient, count: usize) -> Result<Vec<NetworkPacket>, ActorError> {
    let mut pushed = Vec::new();
    for _ in 0..40 {
        pushed.extend(gate.drain(count - pushed.len()).await?);
        if pushed.len() >= count {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    Ok(pushed)
}

fn config_error(e: actor_runtime::lifecycle::ConfigError) -> ActorError {
    ActorError::application(ActorError::APPLICATION_BASE, e.to_string())
}
