//! # Payload Serialization
//!
//! The router converts between typed arguments and the opaque byte payload carried by a
//! [`Message`](crate::framework::Message) through a [`Serializer`]. The same serializer is
//! used to encode replies, so both ends of a call must agree on it.

use crate::framework::error::ActorError;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Wire codec for actor payloads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Serializer {
    /// Human-readable, the default.
    #[default]
    Json,
    /// Compact binary.
    Bincode,
}

impl Serializer {
    pub fn marshal<T: Serialize + ?Sized>(&self, value: &T) -> Result<Bytes, ActorError> {
        let data = match self {
            Serializer::Json => {
                serde_json::to_vec(value).map_err(|e| ActorError::Marshal(e.to_string()))?
            }
            Serializer::Bincode => {
                bincode::serialize(value).map_err(|e| ActorError::Marshal(e.to_string()))?
            }
        };
        Ok(Bytes::from(data))
    }

    pub fn unmarshal<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ActorError> {
        match self {
            Serializer::Json => {
                serde_json::from_slice(data).map_err(|e| ActorError::Unmarshal(e.to_string()))
            }
            Serializer::Bincode => {
                bincode::deserialize(data).map_err(|e| ActorError::Unmarshal(e.to_string()))
            }
        }
    }
}
