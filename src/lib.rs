//! # Actor Runtime
//!
//! > **Location-transparent actors on a shared worker pool.**
//!
//! This crate runs many isolated actors inside one process, each owning private state and
//! reacting to messages strictly one at a time. An actor is addressed by a [`Pid`] and
//! invoked by method name, and the caller uses the same code path whether the target lives
//! on this node or another one.
//!
//! ## 🚀 Core Concepts
//!
//! ### Messages, not locks
//! Every actor has a mailbox. Any number of tasks may post to it concurrently, but at most
//! one drain runs at a time, so actor methods take `&mut self` and never need a lock.
//! A failing or panicking message is logged and the next one runs.
//!
//! ### Dispatch by name
//! Each actor type fills a [`Router`](framework::Router) once. A message is nothing more
//! than a method name and some bytes, which is what lets it arrive from a client packet or
//! from another node.
//!
//! ### Call with a deadline
//! `call` waits for the reply up to a timeout. An error returned by the callee reaches the
//! caller unchanged; no reply in time is [`CallTimeout`](framework::ActorError::CallTimeout).
//!
//! ### Testing without a cluster
//! [`MockTransport`](framework::mock::MockTransport) stands in for the remote transport with
//! fluent expectations. [`LocalCluster`](framework::LocalCluster) joins several systems in
//! one process when the test needs real nodes.
//!
//! ## 🗺️ Module Tour
//!
//! ### 1. The Engine ([`framework`])
//! Pids, messages, mailboxes, dispatchers, routers and the per-node [`System`](framework::System).
//! - **Key items**: [`System::spawn`](framework::System::spawn),
//!   [`System::call`](framework::System::call), [`Actor`](framework::Actor),
//!   [`Context`](framework::Context).
//!
//! ### 2. The Bootstrap ([`lifecycle`])
//! Builds a node from configuration, joins it to a cluster, shuts it down.
//! - **Key items**: [`NodeConfig`](lifecycle::NodeConfig), [`Node`](lifecycle::Node),
//!   [`setup_tracing`](lifecycle::tracing::setup_tracing).
//!
//! ### 3. The Interface ([`clients`])
//! Typed wrappers so application code never builds raw messages.
//! - **Key items**: [`ChatClient`](clients::ChatClient), [`GateClient`](clients::GateClient).
//!
//! ### 4. The Demo ([`chat_actor`], [`gate_actor`], [`model`])
//! A chat service and the agent actors that own client connections.
//!
//! ## 🚀 Quick Start
//!
//! ```bash
//! # Two nodes, a client talking to a room on the other node
//! RUST_LOG=info cargo run
//!
//! cargo test
//! ```
//!
//! [`Pid`]: framework::Pid

pub mod chat_actor;
pub mod clients;
pub mod framework;
pub mod gate_actor;
pub mod lifecycle;
pub mod model;
