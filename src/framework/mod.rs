//! Location-transparent actor runtime.
//!
//! This module provides the building blocks for running many isolated actors on a shared
//! worker pool, with strictly sequential execution per actor and the same call path for
//! local and remote destinations.
//!
//! # Main Components
//!
//! - [`System`] - Per-node registry: pid allocation, spawn/kill, lookup, routing
//! - [`Actor`] / [`Router`] - Actor contract and per-type method table for dispatch by name
//! - [`Mailbox`] / [`Dispatcher`] - Per-actor queue and the strategy that drains it
//! - [`Process`] / [`Context`] - Registry handle and the actor's view of the runtime
//! - [`Waiter`] - Timeout-bounded rendezvous behind `call`
//! - [`RemoteTransport`] - Contract towards the cluster layer ([`LocalCluster`] in memory)
//! - [`ActorError`] - Numbered error taxonomy
//!
//! # Testing
//!
//! See [`mock`] module for a transport double that checks cluster traffic without a
//! second node.

pub mod actor;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod group;
pub mod mailbox;
pub mod message;
pub mod mock;
pub mod options;
pub mod pid;
pub mod process;
pub mod remote;
pub mod router;
pub mod serializer;
pub mod system;
pub mod waiter;
pub mod workers;

// Re-export core types for convenience
pub use actor::Actor;
pub use context::Context;
pub use dispatcher::{Dispatcher, PooledDispatcher, SynchronizedDispatcher};
pub use error::ActorError;
pub use group::Groups;
pub use mailbox::{DefaultMailbox, Mailbox, MailboxMessage, MailboxStats, MessageInvoker};
pub use message::{Message, MessageKind, NetworkPacket, RespondMessage, Session, PUSH_METHOD};
pub use options::{ActorProcessOptions, SystemConfig};
pub use pid::Pid;
pub use process::{ActorState, Process};
pub use remote::{LocalCluster, RemoteTransport};
pub use router::{ArgShape, ArgValue, MethodDescriptor, MethodFuture, ReturnShape, Router, RouterHub};
pub use serializer::Serializer;
pub use system::{System, WeakSystem};
pub use waiter::{Completer, Waiter};
pub use workers::WorkerPool;
