//! # Mock Transport
//!
//! Utilities for testing cluster-facing code without a second node.
//!
//! Install a [`MockTransport`] on a [`System`](crate::framework::System) with
//! [`System::set_remote`](crate::framework::System::set_remote), queue the traffic you
//! expect with the fluent builders, exercise the code under test, then call
//! [`MockTransport::verify`].
//!
//! ```ignore
//! let mock = MockTransport::new();
//! mock.expect_call(Pid::new(2, 1)).return_ok(&42);
//! mock.expect_send(Pid::named(2, "chat")).return_ok();
//! system.set_remote(Arc::new(mock.clone()));
//!
//! // ... code under test calls / sends to node 2 ...
//!
//! mock.verify(); // Ensures all expectations were met
//! ```
//!
//! Traffic that does not match the next expectation panics, so a test fails at the first
//! unexpected message.

use crate::framework::error::ActorError;
use crate::framework::message::{Message, MessageKind, RespondMessage};
use crate::framework::pid::Pid;
use crate::framework::remote::RemoteTransport;
use crate::framework::serializer::Serializer;
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

// =============================================================================
// EXPECTATION BUILDER API
// =============================================================================

/// An expected outbound message and the answer to give it.
#[derive(Debug)]
enum Expectation {
    Send {
        to: Pid,
        response: Result<(), ActorError>,
    },
    Call {
        to: Pid,
        response: RespondMessage,
    },
    Broadcast {
        topic: String,
        response: Result<(), ActorError>,
    },
}

/// A message the mock received, without its responder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub kind: MessageKind,
    pub to: Pid,
    pub method: String,
    pub data: Bytes,
}

/// A [`RemoteTransport`] double driven by an expectation queue.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    expectations: Arc<Mutex<VecDeque<Expectation>>>,
    received: Arc<Mutex<Vec<SentMessage>>>,
    serializer: Serializer,
}

impl MockTransport {
    /// Creates a mock with no expectations, encoding replies as JSON.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock encoding replies with `serializer`.
    pub fn with_serializer(serializer: Serializer) -> Self {
        Self {
            serializer,
            ..Self::default()
        }
    }

    /// Expects a `remote_send` to `to`.
    pub fn expect_send(&self, to: Pid) -> SendExpectationBuilder {
        SendExpectationBuilder {
            to,
            expectations: self.expectations.clone(),
        }
    }

    /// Expects a `remote_call` to `to`.
    pub fn expect_call(&self, to: Pid) -> CallExpectationBuilder {
        CallExpectationBuilder {
            to,
            serializer: self.serializer,
            expectations: self.expectations.clone(),
        }
    }

    /// Expects a `broadcast` on `topic`.
    pub fn expect_broadcast(&self, topic: impl Into<String>) -> BroadcastExpectationBuilder {
        BroadcastExpectationBuilder {
            topic: topic.into(),
            expectations: self.expectations.clone(),
        }
    }

    /// Everything received so far, in order.
    pub fn received(&self) -> Vec<SentMessage> {
        self.received.lock().clone()
    }

    /// Verifies that all expectations were met.
    pub fn verify(&self) {
        let exps = self.expectations.lock();
        if !exps.is_empty() {
            panic!("Not all expectations were met. {} remaining", exps.len());
        }
    }

    fn record(&self, to: &Pid, msg: &Message) -> Option<Expectation> {
        self.received.lock().push(SentMessage {
            kind: msg.kind,
            to: to.clone(),
            method: msg.method.clone(),
            data: msg.data.clone(),
        });
        self.expectations.lock().pop_front()
    }
}

#[async_trait]
impl RemoteTransport for MockTransport {
    async fn remote_send(&self, to: &Pid, msg: Message) -> Result<(), ActorError> {
        match self.record(to, &msg) {
            Some(Expectation::Send { to: expected, response }) if expected == *to => response,
            other => panic!("Unexpected request or expectation mismatch: send to {to}, expected {other:?}"),
        }
    }

    async fn remote_call(&self, to: &Pid, _timeout: Duration, msg: Message) -> RespondMessage {
        match self.record(to, &msg) {
            Some(Expectation::Call { to: expected, response }) if expected == *to => response,
            other => panic!("Unexpected request or expectation mismatch: call to {to}, expected {other:?}"),
        }
    }

    async fn broadcast(&self, msg: Message) -> Result<(), ActorError> {
        let to = msg.to.clone().unwrap_or_default();
        match self.record(&to, &msg) {
            Some(Expectation::Broadcast { topic, response }) if topic == to.name() => response,
            other => panic!("Unexpected request or expectation mismatch: broadcast to {to}, expected {other:?}"),
        }
    }
}

/// Builder for `send` expectations.
pub struct SendExpectationBuilder {
    to: Pid,
    expectations: Arc<Mutex<VecDeque<Expectation>>>,
}

impl SendExpectationBuilder {
    /// Accepts the message.
    pub fn return_ok(self) {
        self.expectations.lock().push_back(Expectation::Send {
            to: self.to,
            response: Ok(()),
        });
    }

    /// Rejects the message with `error`.
    pub fn return_err(self, error: ActorError) {
        self.expectations.lock().push_back(Expectation::Send {
            to: self.to,
            response: Err(error),
        });
    }
}

/// Builder for `call` expectations.
pub struct CallExpectationBuilder {
    to: Pid,
    serializer: Serializer,
    expectations: Arc<Mutex<VecDeque<Expectation>>>,
}

impl CallExpectationBuilder {
    /// Replies with `value`, encoded by the mock's serializer.
    pub fn return_ok<T: Serialize + ?Sized>(self, value: &T) {
        let response = match self.serializer.marshal(value) {
            Ok(data) => RespondMessage::ok(data),
            Err(e) => RespondMessage::error(e),
        };
        self.push(response);
    }

    /// Replies with pre-encoded bytes.
    pub fn return_raw(self, data: Bytes) {
        self.push(RespondMessage::ok(data));
    }

    /// Replies with `error`.
    pub fn return_err(self, error: ActorError) {
        self.push(RespondMessage::error(error));
    }

    fn push(self, response: RespondMessage) {
        self.expectations.lock().push_back(Expectation::Call {
            to: self.to,
            response,
        });
    }
}

/// Builder for `broadcast` expectations.
pub struct BroadcastExpectationBuilder {
    topic: String,
    expectations: Arc<Mutex<VecDeque<Expectation>>>,
}

impl BroadcastExpectationBuilder {
    pub fn return_ok(self) {
        self.expectations.lock().push_back(Expectation::Broadcast {
            topic: self.topic,
            response: Ok(()),
        });
    }

    pub fn return_err(self, error: ActorError) {
        self.expectations.lock().push_back(Expectation::Broadcast {
            topic: self.topic,
            response: Err(error),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::system::System;

    #[tokio::test]
    async fn test_mock_transport_with_expectations() {
        let system = System::new(Default::default());
        let mock = MockTransport::new();
        system.set_remote(Arc::new(mock.clone()));

        // Set up expectations
        mock.expect_call(Pid::new(2, 4)).return_ok(&42);
        mock.expect_send(Pid::named(2, "chat")).return_ok();
        mock.expect_call(Pid::new(2, 5)).return_err(ActorError::ActorNotMethod);

        // Execute operations
        let reply: i32 = system.call(None, &Pid::new(2, 4), "Ping", &41).await.unwrap();
        assert_eq!(reply, 42);
        system
            .send(None, &Pid::named(2, "chat"), "Say", "hello")
            .await
            .unwrap();
        let missing: Result<i32, _> = system.call(None, &Pid::new(2, 5), "Nope", &0).await;
        assert_eq!(missing, Err(ActorError::ActorNotMethod));

        // Verify all expectations were met
        mock.verify();
        let methods: Vec<_> = mock.received().into_iter().map(|m| m.method).collect();
        assert_eq!(methods, vec!["Ping", "Say", "Nope"]);
    }

    #[tokio::test]
    #[should_panic(expected = "Unexpected request or expectation mismatch")]
    async fn test_unexpected_traffic_panics() {
        let mock = MockTransport::new();
        mock.expect_send(Pid::new(2, 1)).return_ok();
        let msg = Message::inner(None, Pid::new(3, 1), "Ping", Bytes::new());
        let _ = mock.remote_send(&Pid::new(3, 1), msg).await;
    }
}
