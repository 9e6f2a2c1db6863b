use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Request to enter a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomJoin {
    pub user_id: u64,
    pub nickname: String,
}

impl RoomJoin {
    pub fn new(user_id: u64, nickname: impl Into<String>) -> Self {
        Self {
            user_id,
            nickname: nickname.into(),
        }
    }
}

/// A member speaking in a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SayRequest {
    pub user_id: u64,
    pub text: String,
}

/// One line of room history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatLine {
    pub from: String,
    pub text: String,
}

/// Snapshot returned to a member on a synchronous join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomInfo {
    pub room: String,
    pub members: Vec<String>,
    pub history: Vec<ChatLine>,
}

/// Spawn parameters of a chat room.
#[derive(Debug, Clone)]
pub struct RoomSettings {
    /// Lines kept in history; older lines are dropped.
    pub history_limit: usize,
    /// Period of the housekeeping tick, if any.
    pub tick: Option<Duration>,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            history_limit: 100,
            tick: None,
        }
    }
}

/// Counters reported by a room.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomStats {
    pub members: usize,
    pub lines: usize,
    pub ticks: u64,
}
