//! # Observability & Tracing
//!
//! This module provides the tracing infrastructure for the actor runtime.
//!
//! ## Overview
//!
//! The [`setup_tracing`] function initializes structured logging with the `tracing` crate.
//! The runtime itself only emits events; installing a subscriber is the binary's job.
//!
//! ## Configuration
//!
//! The compact format hides the crate/module prefix (`with_target(false)`). Every runtime
//! event carries the fields needed to tell actors apart (`actor`, `pid`, `method`), so the
//! module path adds nothing.
//!
//! ## What Gets Traced
//!
//! | Level | Events |
//! |-------|--------|
//! | `info` | actor spawned / stopped, kill, system and node shutdown |
//! | `warn` | method errors, failed `on_init` / `on_stop`, undeliverable replies |
//! | `error` | panics caught while draining a mailbox |
//! | `debug` | every invoked method, name registration, cluster membership |
//! | `trace` | message delivery, cluster frames, group broadcasts |
//!
//! ## Usage Examples
//!
//! ```bash
//! # Lifecycle only
//! RUST_LOG=info cargo run
//!
//! # Every dispatched message
//! RUST_LOG=debug cargo run
//!
//! # Runtime internals only
//! RUST_LOG=actor_runtime::framework=trace cargo run
//! ```
//!
//! ## Output Example
//!
//! ```text
//! INFO node started node=2 name=chat
//! INFO actor spawned actor=ChatRoom pid=2.1 name=lobby
//! DEBUG invoke actor=ChatRoom method=Say
//! WARN actor method failed actor=ChatRoom method=Say error=[1001] not a member of the room
//! ```
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false) // Events carry actor/pid fields instead
        .compact()
        .init();
}
