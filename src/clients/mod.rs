//! Typed wrappers around [`System`](crate::framework::System) messaging.

pub mod actor_client;
pub mod chat_client;
pub mod gate_client;

pub use actor_client::*;
pub use chat_client::*;
pub use gate_client::*;
