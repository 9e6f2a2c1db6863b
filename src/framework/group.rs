//! Node-local actor groups: named sets of processes that receive the same message.

use crate::framework::message::Message;
use crate::framework::pid::Pid;
use crate::framework::process::Process;
use bytes::Bytes;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::trace;

#[derive(Debug, Default)]
pub struct Groups {
    dict: DashMap<String, DashMap<Pid, Arc<Process>>>,
}

impl Groups {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, group: &str, process: Arc<Process>) {
        self.dict
            .entry(group.to_string())
            .or_default()
            .insert(process.pid().clone(), process);
    }

    pub fn remove(&self, group: &str, pid: &Pid) {
        if let Some(members) = self.dict.get(group) {
            members.remove(pid);
        }
        self.dict.remove_if(group, |_, members| members.is_empty());
    }

    /// Drops `pid` from every group.
    pub fn remove_all(&self, pid: &Pid) {
        for members in self.dict.iter() {
            members.remove(pid);
        }
        self.dict.retain(|_, members| !members.is_empty());
    }

    pub fn clear(&self) {
        self.dict.clear();
    }

    pub fn members(&self, group: &str) -> Vec<Pid> {
        self.dict
            .get(group)
            .map(|members| members.iter().map(|entry| entry.key().clone()).collect())
            .unwrap_or_default()
    }

    /// Posts `data` to every member, invoking the method named after the group.
    /// Returns how many members accepted the message.
    pub async fn broadcast(&self, group: &str, from: Option<&Pid>, data: Bytes) -> usize {
        let targets: Vec<Arc<Process>> = match self.dict.get(group) {
            Some(members) => members.iter().map(|entry| entry.value().clone()).collect(),
            None => return 0,
        };
        let mut delivered = 0;
        for process in targets {
            let msg = Message::inner(from.cloned(), process.pid().clone(), group, data.clone());
            if process.post_message(msg).await.is_ok() {
                delivered += 1;
            }
        }
        trace!(group, delivered, "group broadcast");
        delivered
    }
}
