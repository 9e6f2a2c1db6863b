//! # Process Identifiers
//!
//! A [`Pid`] is a location-transparent actor address: the cluster node that hosts the
//! actor, a per-node unique id, and/or a symbolic name. Local actors receive their `Pid`
//! from [`System::next_pid`](crate::framework::System::next_pid); remote or named actors can be
//! addressed by constructing a `Pid` directly.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An immutable actor address. Comparable by value and usable as a map key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pid {
    node_id: u64,
    uniq_id: u64,
    name: String,
}

impl Pid {
    /// Address of a numbered actor on `node_id`.
    pub fn new(node_id: u64, uniq_id: u64) -> Self {
        Self {
            node_id,
            uniq_id,
            name: String::new(),
        }
    }

    /// Address of an actor registered under `name` on `node_id`, not yet resolved
    /// to a unique id.
    pub fn named(node_id: u64, name: impl Into<String>) -> Self {
        Self {
            node_id,
            uniq_id: 0,
            name: name.into(),
        }
    }

    pub fn node_id(&self) -> u64 {
        self.node_id
    }

    pub fn uniq_id(&self) -> u64 {
        self.uniq_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// A pid is valid iff it carries a unique id or a name.
    pub fn is_valid(&self) -> bool {
        self.uniq_id > 0 || !self.name.is_empty()
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.uniq_id == 0 && !self.name.is_empty() {
            write!(f, "{}.{}", self.node_id, self.name)
        } else {
            write!(f, "{}.{}", self.node_id, self.uniq_id)
        }
    }
}
