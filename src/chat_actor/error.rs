//! Error types for the chat room actor.

use crate::framework::ActorError;
use thiserror::Error;

/// Errors that can occur during chat operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ChatError {
    /// The speaker never joined the room.
    #[error("not a member of the room")]
    NotMember,

    /// Nicknames must contain a visible character.
    #[error("nickname must not be blank")]
    InvalidNickname,

    /// A client-only method was reached by an inner message.
    #[error("request did not come from a client")]
    NoSession,

    /// An error occurred while communicating with the actor system.
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(ActorError),
}

impl ChatError {
    pub const NOT_MEMBER: u32 = ActorError::APPLICATION_BASE + 1;
    pub const INVALID_NICKNAME: u32 = ActorError::APPLICATION_BASE + 2;
    pub const NO_SESSION: u32 = ActorError::APPLICATION_BASE + 3;
}

impl From<ChatError> for ActorError {
    fn from(e: ChatError) -> Self {
        let code = match e {
            ChatError::NotMember => ChatError::NOT_MEMBER,
            ChatError::InvalidNickname => ChatError::INVALID_NICKNAME,
            ChatError::NoSession => ChatError::NO_SESSION,
            ChatError::ActorCommunicationError(inner) => return inner,
        };
        ActorError::application(code, e.to_string())
    }
}

impl From<ActorError> for ChatError {
    fn from(e: ActorError) -> Self {
        match e.code() {
            ChatError::NOT_MEMBER => ChatError::NotMember,
            ChatError::INVALID_NICKNAME => ChatError::InvalidNickname,
            ChatError::NO_SESSION => ChatError::NoSession,
            _ => ChatError::ActorCommunicationError(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_errors_survive_the_runtime() {
        for e in [ChatError::NotMember, ChatError::InvalidNickname, ChatError::NoSession] {
            let wire = ActorError::from(e.clone());
            assert!(wire.code() > ActorError::APPLICATION_BASE);
            assert_eq!(ChatError::from(wire), e);
        }
        let timeout = ChatError::from(ActorError::CallTimeout);
        assert_eq!(timeout, ChatError::ActorCommunicationError(ActorError::CallTimeout));
        assert_eq!(ActorError::from(timeout), ActorError::CallTimeout);
    }
}
