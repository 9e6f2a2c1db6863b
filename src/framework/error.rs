//! # Runtime Errors
//!
//! This module defines the closed error taxonomy shared by every layer of the runtime.
//! Each variant carries a stable numeric code so an error can cross a process or network
//! boundary as plain data (see [`ActorError::code`] and [`ActorError::from_code`]).
//!
//! | Range | Category |
//! |-------|----------|
//! | 1-9   | Addressing |
//! | 10-19 | Mailbox / lifecycle |
//! | 20-29 | Routing / dispatch |
//! | 30-39 | Serialization |
//! | 40-49 | Call semantics |
//! | 50-59 | Runtime plumbing |
//! | 1000+ | Application errors raised by actor logic |

use serde::{Deserialize, Serialize};

/// Errors that can occur within the actor runtime, or be reported by an actor method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum ActorError {
    // --- Addressing ---
    #[error("pid invalid")]
    InvalidPid,
    #[error("pid is nil")]
    PidIsNil,
    #[error("not local pid")]
    NotLocalPid,
    #[error("process not exist")]
    ProcessNotExist,
    #[error("actor name exist")]
    NameExists,
    #[error("actor name not exist")]
    NameNotExist,

    // --- Mailbox / lifecycle ---
    #[error("mailbox is nil")]
    MailboxNil,
    #[error("actor is stopped")]
    ActorStopped,
    #[error("actor already stopped")]
    AlreadyStopped,
    #[error("mailbox already bound to a process")]
    MailboxInUse,

    // --- Routing / dispatch ---
    #[error("actor has no method")]
    ActorNotMethod,
    #[error("actor args num error")]
    ActorArgsNum,
    #[error("method args num error")]
    MethodArgNum,
    #[error("actor router is nil")]
    ActorRouterIsNil,

    // --- Serialization ---
    #[error("marshal failed: {0}")]
    Marshal(String),
    #[error("unmarshal failed: {0}")]
    Unmarshal(String),

    // --- Call semantics ---
    #[error("actor call timeout")]
    CallTimeout,

    // --- Runtime plumbing ---
    #[error("remote transport is nil")]
    TransportNil,
    #[error("invalid actor message")]
    InvalidMessage,
    #[error("actor system stopped")]
    SystemStopped,

    /// An error raised by actor logic. Codes below [`ActorError::APPLICATION_BASE`]
    /// are reserved for the runtime.
    #[error("[{code}] {message}")]
    Application { code: u32, message: String },
}

impl ActorError {
    /// First code available to application errors.
    pub const APPLICATION_BASE: u32 = 1000;

    /// Builds an application error.
    pub fn application(code: u32, message: impl Into<String>) -> Self {
        ActorError::Application {
            code,
            message: message.into(),
        }
    }

    /// Stable numeric id of this error.
    pub fn code(&self) -> u32 {
        match self {
            ActorError::InvalidPid => 1,
            ActorError::PidIsNil => 2,
            ActorError::NotLocalPid => 3,
            ActorError::ProcessNotExist => 4,
            ActorError::NameExists => 5,
            ActorError::NameNotExist => 6,
            ActorError::MailboxNil => 10,
            ActorError::ActorStopped => 11,
            ActorError::AlreadyStopped => 12,
            ActorError::MailboxInUse => 13,
            ActorError::ActorNotMethod => 20,
            ActorError::ActorArgsNum => 21,
            ActorError::MethodArgNum => 22,
            ActorError::ActorRouterIsNil => 23,
            ActorError::Marshal(_) => 30,
            ActorError::Unmarshal(_) => 31,
            ActorError::CallTimeout => 40,
            ActorError::TransportNil => 50,
            ActorError::InvalidMessage => 51,
            ActorError::SystemStopped => 52,
            ActorError::Application { code, .. } => *code,
        }
    }

    /// Rebuilds an error from its wire form (`code` + `message`).
    ///
    /// Unknown runtime codes and every code at or above [`ActorError::APPLICATION_BASE`]
    /// become [`ActorError::Application`].
    pub fn from_code(code: u32, message: impl Into<String>) -> Self {
        match code {
            1 => ActorError::InvalidPid,
            2 => ActorError::PidIsNil,
            3 => ActorError::NotLocalPid,
            4 => ActorError::ProcessNotExist,
            5 => ActorError::NameExists,
            6 => ActorError::NameNotExist,
            10 => ActorError::MailboxNil,
            11 => ActorError::ActorStopped,
            12 => ActorError::AlreadyStopped,
            13 => ActorError::MailboxInUse,
            20 => ActorError::ActorNotMethod,
            21 => ActorError::ActorArgsNum,
            22 => ActorError::MethodArgNum,
            23 => ActorError::ActorRouterIsNil,
            30 => ActorError::Marshal(message.into()),
            31 => ActorError::Unmarshal(message.into()),
            40 => ActorError::CallTimeout,
            50 => ActorError::TransportNil,
            51 => ActorError::InvalidMessage,
            52 => ActorError::SystemStopped,
            code => ActorError::Application {
                code,
                message: message.into(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_survive_the_wire() {
        let errors = [
            ActorError::InvalidPid,
            ActorError::NameExists,
            ActorError::AlreadyStopped,
            ActorError::ActorArgsNum,
            ActorError::CallTimeout,
            ActorError::Unmarshal("bad json".into()),
            ActorError::application(1042, "room is full"),
        ];
        for err in errors {
            let rebuilt = ActorError::from_code(err.code(), message_of(&err));
            assert_eq!(rebuilt, err);
        }
    }

    #[test]
    fn test_unknown_runtime_code_is_application() {
        let err = ActorError::from_code(77, "mystery");
        assert_eq!(err.code(), 77);
        assert!(matches!(err, ActorError::Application { .. }));
    }

    fn message_of(err: &ActorError) -> String {
        match err {
            ActorError::Marshal(m) | ActorError::Unmarshal(m) => m.clone(),
            ActorError::Application { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}
