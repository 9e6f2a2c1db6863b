//! Client protocol: packet ids and bodies carried by
//! [`NetworkPacket`](crate::framework::NetworkPacket)s.

use crate::framework::{NetworkPacket, Pid};
use serde::{Deserialize, Serialize};

/// Client enters a room. Body: [`RoomJoin`](super::RoomJoin).
pub const ENTER_REQ: u16 = 101;
/// Client speaks. Body: [`ClientChat`].
pub const CHAT_REQ: u16 = 102;
/// Reply to a request, sent with the request's packet id.
pub const CHAT_ACK: u16 = 103;
/// Server push of a new line. Body: [`ChatLine`](super::ChatLine).
pub const CHAT_NOTIFY: u16 = 104;

/// Body of a [`CHAT_REQ`] packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientChat {
    pub text: String,
}

/// Body of a reply packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatAck {
    pub seq: u64,
}

/// Instruction to a gate: hand `packet` to the `method` of the actor at `to`, as if it
/// had arrived from the gate's client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inbound {
    pub to: Pid,
    pub method: String,
    pub packet: NetworkPacket,
}
