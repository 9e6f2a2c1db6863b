//! Pure data structures exchanged with the chat and gate actors.

pub mod chat;
pub mod packet;

pub use chat::*;
pub use packet::*;
