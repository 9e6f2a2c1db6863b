//! # Messages
//!
//! This module defines the unit of communication between actors. A [`Message`] is built
//! by a sender (an actor, the network ingress, or the cluster transport), consumed once by
//! the target actor's router, and discarded afterwards.
//!
//! Messages that expect a reply carry a responder callback. The router invokes it exactly
//! once with a [`RespondMessage`]; the callback is never serialized, so a transport that
//! forwards a call installs its own responder on the receiving side.

use crate::framework::error::ActorError;
use crate::framework::pid::Pid;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Method invoked on an agent actor to forward a packet to its network client.
pub const PUSH_METHOD: &str = "Push";

/// Where a message came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageKind {
    /// Exchanged between actors, locally or across the cluster.
    Inner,
    /// Originated from a network client; carries a [`Session`].
    Network,
    /// Fanned out by the cluster transport to every node subscribed to a topic.
    Broadcast,
}

/// A client-facing packet: protocol message id plus encoded body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkPacket {
    pub id: u16,
    pub data: Bytes,
}

/// Handle to the network client a message came from.
///
/// A session carries only data and the [`Pid`] of the agent actor that owns the client
/// connection. Pushing to the client is an ordinary `Send` to that agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub agent: Pid,
    pub packet: NetworkPacket,
}

/// Payload handed back through a message's responder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RespondMessage {
    pub data: Bytes,
    pub err: Option<ActorError>,
}

impl RespondMessage {
    pub fn ok(data: Bytes) -> Self {
        Self { data, err: None }
    }

    pub fn error(err: ActorError) -> Self {
        Self {
            data: Bytes::new(),
            err: Some(err),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.err.is_none()
    }
}

/// Callback resolving a pending call.
pub type Responder = Box<dyn FnOnce(RespondMessage) -> Result<(), ActorError> + Send + Sync>;

/// The envelope delivered to an actor mailbox.
#[derive(Serialize, Deserialize)]
pub struct Message {
    pub kind: MessageKind,
    pub method: String,
    pub from: Option<Pid>,
    pub to: Option<Pid>,
    pub data: Bytes,
    pub session: Option<Session>,
    #[serde(skip)]
    respond: Option<Responder>,
}

impl Message {
    /// Builds a message exchanged between actors.
    pub fn inner(from: Option<Pid>, to: Pid, method: impl Into<String>, data: Bytes) -> Self {
        Self {
            kind: MessageKind::Inner,
            method: method.into(),
            from,
            to: Some(to),
            data,
            session: None,
            respond: None,
        }
    }

    /// Builds a message for a packet received from a network client. The payload is the
    /// packet body; the session keeps the packet id for replies.
    pub fn network(session: Session, to: Pid, method: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Network,
            method: method.into(),
            from: Some(session.agent.clone()),
            to: Some(to),
            data: session.packet.data.clone(),
            session: Some(session),
            respond: None,
        }
    }

    /// Builds a message fanned out to every node subscribed to `to.name()`.
    pub fn broadcast(from: Option<Pid>, to: Pid, method: impl Into<String>, data: Bytes) -> Self {
        Self {
            kind: MessageKind::Broadcast,
            ..Self::inner(from, to, method, data)
        }
    }

    pub fn is_broadcast(&self) -> bool {
        self.kind == MessageKind::Broadcast
    }

    /// Installs the callback that resolves this message's caller.
    pub fn set_respond<F>(&mut self, respond: F)
    where
        F: FnOnce(RespondMessage) -> Result<(), ActorError> + Send + Sync + 'static,
    {
        self.respond = Some(Box::new(respond));
    }

    pub fn expects_reply(&self) -> bool {
        self.respond.is_some()
    }

    /// Removes the responder, leaving the message reply-less.
    pub fn take_responder(&mut self) -> Option<Responder> {
        self.respond.take()
    }

    /// Answers the caller. Only the first call reaches the responder.
    pub fn respond(&mut self, rsp: RespondMessage) -> Result<(), ActorError> {
        match self.respond.take() {
            Some(respond) => respond(rsp),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("kind", &self.kind)
            .field("method", &self.method)
            .field("from", &self.from)
            .field("to", &self.to)
            .field("len", &self.data.len())
            .field("session", &self.session)
            .field("expects_reply", &self.respond.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_respond_runs_once() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let mut msg = Message::inner(None, Pid::new(1, 1), "Ping", Bytes::new());
        msg.set_respond(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        assert!(msg.expects_reply());
        msg.respond(RespondMessage::ok(Bytes::new())).unwrap();
        msg.respond(RespondMessage::ok(Bytes::new())).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(!msg.expects_reply());
    }

    #[test]
    fn test_wire_shape_drops_responder() {
        let mut msg = Message::inner(
            Some(Pid::new(1, 2)),
            Pid::named(2, "chat"),
            "Join",
            Bytes::from_static(b"{}"),
        );
        msg.set_respond(|_| Ok(()));
        let encoded = serde_json::to_vec(&msg).unwrap();
        let decoded: Message = serde_json::from_slice(&encoded).unwrap();
        assert_eq!(decoded.method, "Join");
        assert_eq!(decoded.to, Some(Pid::named(2, "chat")));
        assert_eq!(decoded.data, Bytes::from_static(b"{}"));
        assert!(!decoded.expects_reply());
    }

    #[test]
    fn test_network_message_carries_packet_body() {
        let session = Session {
            agent: Pid::new(1, 9),
            packet: NetworkPacket {
                id: 7,
                data: Bytes::from_static(b"hi"),
            },
        };
        let msg = Message::network(session, Pid::named(1, "chat"), "Chat");
        assert_eq!(msg.kind, MessageKind::Network);
        assert_eq!(msg.data, Bytes::from_static(b"hi"));
        assert_eq!(msg.from, Some(Pid::new(1, 9)));
    }
}
