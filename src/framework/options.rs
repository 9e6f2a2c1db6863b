//! Spawn-time and node-wide settings.

use crate::framework::dispatcher::{Dispatcher, DEFAULT_THROUGHPUT};
use crate::framework::mailbox::Mailbox;
use crate::framework::serializer::Serializer;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Per-spawn configuration. Unset fields fall back to the system's pooled dispatcher and
/// a fresh [`DefaultMailbox`](crate::framework::DefaultMailbox).
#[derive(Clone, Default)]
pub struct ActorProcessOptions {
    pub dispatcher: Option<Arc<dyn Dispatcher>>,
    pub mailbox: Option<Arc<dyn Mailbox>>,
    pub name: Option<String>,
}

impl ActorProcessOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the actor under `name` as part of the spawn.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_dispatcher(mut self, dispatcher: Arc<dyn Dispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    pub fn with_mailbox(mut self, mailbox: Arc<dyn Mailbox>) -> Self {
        self.mailbox = Some(mailbox);
        self
    }
}

impl fmt::Debug for ActorProcessOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorProcessOptions")
            .field("dispatcher", &self.dispatcher)
            .field("custom_mailbox", &self.mailbox.is_some())
            .field("name", &self.name)
            .finish()
    }
}

/// Settings shared by every actor of one node.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemConfig {
    pub node_id: u64,
    /// Default bound for `call`.
    pub call_timeout: Duration,
    /// Bound for waiting on an actor's `on_stop`.
    pub stop_timeout: Duration,
    /// Messages per drain before yielding.
    pub throughput: usize,
    /// Maximum concurrent mailbox drains.
    pub pool_size: usize,
    pub serializer: Serializer,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            node_id: 1,
            call_timeout: Duration::from_secs(1),
            stop_timeout: Duration::from_millis(500),
            throughput: DEFAULT_THROUGHPUT,
            pool_size: 1000,
            serializer: Serializer::Json,
        }
    }
}
