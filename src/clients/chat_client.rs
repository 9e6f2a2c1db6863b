use crate::chat_actor::{ChatError, ChatRoom};
use crate::clients::actor_client::ActorClient;
use crate::framework::{ActorProcessOptions, Message, Pid, System};
use crate::model::{ChatLine, RoomInfo, RoomJoin, RoomSettings, RoomStats, SayRequest};
use bytes::Bytes;
use tracing::{debug, instrument};

/// Client for interacting with a [`ChatRoom`] actor, local or remote.
#[derive(Clone, Debug)]
pub struct ChatClient {
    system: System,
    room: Pid,
}

impl ActorClient for ChatClient {
    type Error = ChatError;

    fn system(&self) -> &System {
        &self.system
    }

    fn pid(&self) -> &Pid {
        &self.room
    }
}

impl ChatClient {
    /// Wraps an existing room, addressed by pid or by name.
    pub fn new(system: System, room: Pid) -> Self {
        Self { system, room }
    }

    /// Spawns a room named `name` on `system`.
    pub async fn open(system: &System, name: &str, settings: RoomSettings) -> Result<Self, ChatError> {
        let room = system
            .spawn(ChatRoom::new, settings, ActorProcessOptions::new().with_name(name))
            .await?;
        Ok(Self::new(system.clone(), room))
    }

    #[instrument(skip(self))]
    pub async fn join(&self, user_id: u64, nickname: &str) -> Result<(), ChatError> {
        self.call("Join", &RoomJoin::new(user_id, nickname)).await
    }

    #[instrument(skip(self))]
    pub async fn sync_join(&self, user_id: u64, nickname: &str) -> Result<RoomInfo, ChatError> {
        self.call("SyncJoin", &RoomJoin::new(user_id, nickname)).await
    }

    /// Returns the sequence number of the new line.
    #[instrument(skip(self))]
    pub async fn say(&self, user_id: u64, text: &str) -> Result<u64, ChatError> {
        let req = SayRequest {
            user_id,
            text: text.to_string(),
        };
        self.call("Say", &req).await
    }

    #[instrument(skip(self))]
    pub async fn history(&self, limit: usize) -> Result<Vec<ChatLine>, ChatError> {
        self.call("History", &limit).await
    }

    /// Writes `text` in every room on the room's node. Returns how many rooms got it.
    #[instrument(skip(self))]
    pub async fn announce(&self, text: &str) -> Result<usize, ChatError> {
        self.call("Announce", text).await
    }

    #[instrument(skip(self))]
    pub async fn stats(&self) -> Result<RoomStats, ChatError> {
        debug!("Sending request");
        let msg = Message::inner(None, self.room.clone(), "Stats", Bytes::new());
        let rsp = self
            .system
            .request(&self.room, msg, self.system.config().call_timeout)
            .await;
        if let Some(e) = rsp.err {
            return Err(e.into());
        }
        Ok(self.system.serializer().unmarshal::<RoomStats>(&rsp.data)?)
    }

    /// Publishes a notice to the room named `tag` on every node subscribed to `tag`.
    #[instrument(skip(self))]
    pub async fn notice_cluster(&self, tag: &str, text: &str) -> Result<(), ChatError> {
        debug!("Broadcasting");
        self.system
            .broadcast(None, tag, "Notice", text)
            .await
            .map_err(ChatError::from)
    }
}

