//! Chat room actor: members, history, client pushes, and room-wide announcements.
//!
//! A room is reachable two ways. Inner callers (other actors, [`ChatClient`]) use the
//! typed methods `Join`, `SyncJoin`, `Say`, `History`, `Announce` and `Stats`. Network
//! clients reach it through their gate with `Enter` and `Chat` packets; the room answers
//! them with [`Context::response`] and fans new lines out with [`Context::push`].
//!
//! [`ChatClient`]: crate::clients::ChatClient

pub mod error;

pub use error::*;

use crate::framework::{Actor, ActorError, Context, Router, Session};
use crate::model::{
    ChatAck, ChatLine, ClientChat, RoomInfo, RoomJoin, RoomSettings, RoomStats, SayRequest,
    CHAT_NOTIFY,
};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{BTreeMap, VecDeque};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Group every room joins on start. Broadcasting to it invokes the method of the same name.
pub const ROOMS_GROUP: &str = "Rooms";

/// Sender shown for lines the room writes itself.
pub const SYSTEM_SENDER: &str = "*";

struct Member {
    nickname: String,
    /// Present when the member joined from a network client.
    session: Option<Session>,
}

#[derive(Default)]
pub struct ChatRoom {
    room: String,
    settings: RoomSettings,
    members: BTreeMap<u64, Member>,
    history: VecDeque<ChatLine>,
    seq: u64,
    ticks: u64,
    timer: Option<JoinHandle<()>>,
}

impl ChatRoom {
    pub fn new() -> Self {
        Self::default()
    }

    async fn join(&mut self, ctx: &mut Context, req: RoomJoin) -> Result<(), ActorError> {
        let nickname = req.nickname.trim();
        if nickname.is_empty() {
            return Err(ChatError::InvalidNickname.into());
        }
        debug!(room = %self.room, user_id = req.user_id, nickname, "join");
        self.members.insert(
            req.user_id,
            Member {
                nickname: nickname.to_string(),
                session: ctx.session().cloned(),
            },
        );
        Ok(())
    }

    async fn sync_join(&mut self, ctx: &mut Context, req: RoomJoin) -> Result<RoomInfo, ActorError> {
        self.join(ctx, req).await?;
        Ok(RoomInfo {
            room: self.room.clone(),
            members: self.members.values().map(|m| m.nickname.clone()).collect(),
            history: self.history.iter().cloned().collect(),
        })
    }

    async fn say(&mut self, ctx: &mut Context, req: SayRequest) -> Result<u64, ActorError> {
        let from = self
            .members
            .get(&req.user_id)
            .map(|m| m.nickname.clone())
            .ok_or(ChatError::NotMember)?;
        self.publish(ctx, ChatLine { from, text: req.text }).await;
        Ok(self.seq)
    }

    /// Network `Enter`: joins with the client's session and acknowledges.
    async fn enter(&mut self, ctx: &mut Context, req: RoomJoin) -> Result<(), ActorError> {
        let session = ctx.session().cloned().ok_or(ChatError::NoSession)?;
        self.join(ctx, req).await?;
        ctx.response(&session, &ChatAck { seq: self.seq }).await
    }

    /// Network `Chat`: the speaker is identified by the gate the packet came through.
    async fn chat(&mut self, ctx: &mut Context, req: ClientChat) -> Result<(), ActorError> {
        let session = ctx.session().cloned().ok_or(ChatError::NoSession)?;
        let from = self
            .members
            .values()
            .find(|m| m.session.as_ref().is_some_and(|s| s.agent == session.agent))
            .map(|m| m.nickname.clone())
            .ok_or(ChatError::NotMember)?;
        self.publish(ctx, ChatLine { from, text: req.text }).await;
        ctx.response(&session, &ChatAck { seq: self.seq }).await
    }

    async fn history(&self, limit: usize) -> Result<Vec<ChatLine>, ActorError> {
        let skip = self.history.len().saturating_sub(limit);
        Ok(self.history.iter().skip(skip).cloned().collect())
    }

    /// Writes `text` in every room of this node, this one included.
    async fn announce(&mut self, ctx: &mut Context, text: String) -> Result<usize, ActorError> {
        ctx.broadcast_group(ROOMS_GROUP, &text).await
    }

    async fn system_line(&mut self, ctx: &mut Context, text: String) -> Result<(), ActorError> {
        let line = ChatLine {
            from: SYSTEM_SENDER.to_string(),
            text,
        };
        self.publish(ctx, line).await;
        Ok(())
    }

    async fn stats(&self, ctx: &Context) -> Result<Bytes, ActorError> {
        ctx.serializer().marshal(&RoomStats {
            members: self.members.len(),
            lines: self.history.len(),
            ticks: self.ticks,
        })
    }

    async fn tick(&mut self, ctx: &mut Context) -> Result<(), ActorError> {
        self.ticks += 1;
        self.arm_timer(ctx)
    }

    fn arm_timer(&mut self, ctx: &Context) -> Result<(), ActorError> {
        if let Some(period) = self.settings.tick {
            let timer = ctx.system()?.add_timer(ctx.self_pid(), period, "Tick")?;
            self.timer = Some(timer);
        }
        Ok(())
    }

    /// Appends `line` to history and pushes it to every client member.
    async fn publish(&mut self, ctx: &Context, line: ChatLine) {
        self.seq += 1;
        if self.history.len() == self.settings.history_limit {
            self.history.pop_front();
        }
        if self.settings.history_limit > 0 {
            self.history.push_back(line.clone());
        }
        for session in self.members.values().filter_map(|m| m.session.as_ref()) {
            if let Err(error) = ctx.push(session, CHAT_NOTIFY, &line).await {
                warn!(room = %self.room, agent = %session.agent, %error, "push failed");
            }
        }
    }
}

#[async_trait]
impl Actor for ChatRoom {
    fn routes(router: &mut Router<Self>) {
        router
            .handle("Join", |room, ctx, req: RoomJoin| Box::pin(room.join(ctx, req)))
            .handle_call("SyncJoin", |room, ctx, req: RoomJoin| Box::pin(room.sync_join(ctx, req)))
            .handle_call("Say", |room, ctx, req: SayRequest| Box::pin(room.say(ctx, req)))
            .handle_call("History", |room, _, limit: usize| Box::pin(room.history(limit)))
            .handle_call("Announce", |room, ctx, text: String| Box::pin(room.announce(ctx, text)))
            .handle(ROOMS_GROUP, |room, ctx, text: String| Box::pin(room.system_line(ctx, text)))
            .handle("Notice", |room, ctx, text: String| Box::pin(room.system_line(ctx, text)))
            .handle("Enter", |room, ctx, req: RoomJoin| Box::pin(room.enter(ctx, req)))
            .handle("Chat", |room, ctx, req: ClientChat| Box::pin(room.chat(ctx, req)))
            .handle_raw_call("Stats", |room, ctx, _| Box::pin(room.stats(ctx)))
            .handle_notify("Tick", |room, ctx| Box::pin(room.tick(ctx)));
    }

    async fn on_init(&mut self, ctx: &mut Context) -> Result<(), ActorError> {
        if let Some(settings) = ctx.init_params::<RoomSettings>() {
            self.settings = settings.clone();
        }
        self.room = match ctx.name() {
            Some(name) => name.to_string(),
            None => ctx.self_pid().to_string(),
        };
        ctx.join_group(ROOMS_GROUP)?;
        self.arm_timer(ctx)?;
        info!(room = %self.room, "room opened");
        Ok(())
    }

    async fn on_stop(&mut self, _ctx: &mut Context) -> Result<(), ActorError> {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        info!(room = %self.room, lines = self.seq, "room closed");
        Ok(())
    }
}
