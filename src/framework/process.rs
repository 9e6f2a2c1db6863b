//! # Process
//!
//! A [`Process`] pairs one actor instance with its mailbox, its shared router, and its
//! [`Pid`]. It is the handle the [`System`](crate::framework::System) stores in its
//! registry and the entry point for posting to, calling, and stopping an actor.
//!
//! ## Lifecycle
//!
//! ```text
//! Spawned --Init--> Initializing --> Running --stop()--> Stopping --Stop--> Stopped
//! ```
//!
//! `stop()` flips the stop flag first, so nothing new is accepted, then queues a Stop
//! signal behind the messages already in the mailbox and waits for `on_stop` to finish.

use crate::framework::actor::Actor;
use crate::framework::context::Context;
use crate::framework::error::ActorError;
use crate::framework::mailbox::{Mailbox, MailboxMessage, MailboxStats, MessageInvoker};
use crate::framework::message::{Message, RespondMessage};
use crate::framework::pid::Pid;
use crate::framework::router::Router;
use crate::framework::waiter::Waiter;
use async_trait::async_trait;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum ActorState {
    Spawned = 0,
    Initializing = 1,
    Running = 2,
    Stopping = 3,
    Stopped = 4,
}

impl ActorState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ActorState::Spawned,
            1 => ActorState::Initializing,
            2 => ActorState::Running,
            3 => ActorState::Stopping,
            _ => ActorState::Stopped,
        }
    }
}

/// Lifecycle state shared between a process and its cell.
#[derive(Debug)]
pub(crate) struct Lifecycle(AtomicU8);

impl Lifecycle {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(ActorState::Spawned as u8))
    }

    pub(crate) fn get(&self) -> ActorState {
        ActorState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Moves `from -> to`; returns false if the state was not `from`.
    pub(crate) fn advance(&self, from: ActorState, to: ActorState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn set(&self, state: ActorState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

struct CellState<A> {
    actor: A,
    ctx: Context,
}

/// The mailbox consumer for one actor: owns the actor value and its context.
///
/// The async mutex is only ever locked by the mailbox drain, which runs one at a time, so
/// it is never contended.
pub(crate) struct ActorCell<A: Actor> {
    state: Mutex<CellState<A>>,
    router: Arc<Router<A>>,
    lifecycle: Arc<Lifecycle>,
}

impl<A: Actor> ActorCell<A> {
    pub(crate) fn new(actor: A, ctx: Context, router: Arc<Router<A>>, lifecycle: Arc<Lifecycle>) -> Self {
        Self {
            state: Mutex::new(CellState { actor, ctx }),
            router,
            lifecycle,
        }
    }
}

#[async_trait]
impl<A: Actor> MessageInvoker for ActorCell<A> {
    async fn invoke(&self, msg: MailboxMessage) -> Result<(), ActorError> {
        let mut guard = self.state.lock().await;
        let CellState { actor, ctx } = &mut *guard;
        // A panicking method unwinds past its own cleanup.
        ctx.clear_message();
        match msg {
            MailboxMessage::Init => {
                if !self.lifecycle.advance(ActorState::Spawned, ActorState::Initializing) {
                    return Ok(());
                }
                let result = actor.on_init(ctx).await;
                self.lifecycle.advance(ActorState::Initializing, ActorState::Running);
                if let Err(error) = &result {
                    warn!(actor = self.router.name(), pid = %ctx.self_pid(), %error, "on_init failed");
                }
                result
            }
            MailboxMessage::Deliver(mut msg) => {
                if self.lifecycle.get() == ActorState::Stopped {
                    let _ = msg.respond(RespondMessage::error(ActorError::ActorStopped));
                    return Err(ActorError::ActorStopped);
                }
                let method = msg.method.clone();
                let result = self.router.call(actor, ctx, msg).await;
                if let Err(error) = &result {
                    warn!(actor = self.router.name(), %method, %error, "actor method failed");
                }
                result
            }
            MailboxMessage::Stop(done) => {
                if self.lifecycle.get() == ActorState::Stopped {
                    done.done(());
                    return Err(ActorError::AlreadyStopped);
                }
                self.lifecycle.set(ActorState::Stopping);
                ctx.teardown();
                let result = actor.on_stop(ctx).await;
                self.lifecycle.set(ActorState::Stopped);
                done.done(());
                info!(actor = self.router.name(), pid = %ctx.self_pid(), "actor stopped");
                result
            }
        }
    }

    fn actor_type(&self) -> &'static str {
        self.router.name()
    }
}

/// Registry handle for one running actor.
pub struct Process {
    pid: Pid,
    actor_type: &'static str,
    mailbox: Arc<dyn Mailbox>,
    lifecycle: Arc<Lifecycle>,
    stopped: AtomicBool,
    call_timeout: Duration,
    stop_timeout: Duration,
}

impl Process {
    pub(crate) fn new(
        pid: Pid,
        actor_type: &'static str,
        mailbox: Arc<dyn Mailbox>,
        lifecycle: Arc<Lifecycle>,
        call_timeout: Duration,
        stop_timeout: Duration,
    ) -> Self {
        Self {
            pid,
            actor_type,
            mailbox,
            lifecycle,
            stopped: AtomicBool::new(false),
            call_timeout,
            stop_timeout,
        }
    }

    pub fn pid(&self) -> &Pid {
        &self.pid
    }

    pub fn actor_type(&self) -> &'static str {
        self.actor_type
    }

    pub fn state(&self) -> ActorState {
        self.lifecycle.get()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    pub fn mailbox_stats(&self) -> MailboxStats {
        self.mailbox.stats()
    }

    /// Queues `msg` for the actor. Never waits for it to be processed.
    pub async fn post_message(&self, msg: Message) -> Result<(), ActorError> {
        if self.is_stopped() {
            return Err(ActorError::ActorStopped);
        }
        self.mailbox.post_message(MailboxMessage::Deliver(msg)).await
    }

    pub(crate) async fn post_init(&self) -> Result<(), ActorError> {
        self.mailbox.post_message(MailboxMessage::Init).await
    }

    /// Posts `msg` with a responder attached and waits for the reply, bounded by the
    /// system call timeout.
    pub async fn post_message_and_wait(&self, msg: Message) -> RespondMessage {
        self.post_message_and_wait_timeout(msg, self.call_timeout).await
    }

    pub async fn post_message_and_wait_timeout(&self, mut msg: Message, timeout: Duration) -> RespondMessage {
        let waiter = Waiter::new(timeout);
        let completer = waiter.completer();
        msg.set_respond(move |rsp| {
            completer.done(rsp);
            Ok(())
        });
        if let Err(e) = self.post_message(msg).await {
            return RespondMessage::error(e);
        }
        match waiter.wait().await {
            Ok(rsp) => rsp,
            Err(e) => {
                debug!(actor = self.actor_type, pid = %self.pid, "call timed out");
                RespondMessage::error(e)
            }
        }
    }

    /// Stops the actor and waits for its `on_stop` hook, bounded by the stop timeout.
    pub async fn stop(&self) -> Result<(), ActorError> {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return Err(ActorError::AlreadyStopped);
        }
        // An actor still waiting for Init keeps its state; Init runs before the queued Stop.
        self.lifecycle.advance(ActorState::Running, ActorState::Stopping);
        let waiter = Waiter::new(self.stop_timeout);
        self.mailbox
            .post_message(MailboxMessage::Stop(waiter.completer()))
            .await?;
        waiter.wait().await
    }
}

impl fmt::Debug for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Process")
            .field("pid", &self.pid)
            .field("actor_type", &self.actor_type)
            .field("state", &self.state())
            .field("mailbox", &self.mailbox.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::options::ActorProcessOptions;
    use crate::framework::system::System;
    use bytes::Bytes;

    struct Sleeper;

    #[async_trait]
    impl Actor for Sleeper {
        fn routes(router: &mut Router<Self>) {
            router
                .handle_notify("Nap", |_, _| {
                    Box::pin(async {
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok(())
                    })
                })
                .handle_call("Hold", |_, _, ms: u64| {
                    Box::pin(async move {
                        tokio::time::sleep(Duration::from_millis(ms)).await;
                        Ok(ms)
                    })
                });
        }
    }

    #[derive(Default)]
    struct HookLog {
        inits: AtomicU8,
        stops: AtomicU8,
        message_at_stop: AtomicBool,
    }

    /// Records its lifecycle hooks; `Boom` panics mid-message.
    struct Hooked(Arc<HookLog>);

    impl Hooked {
        async fn boom(&mut self) -> Result<(), ActorError> {
            panic!("boom")
        }
    }

    #[async_trait]
    impl Actor for Hooked {
        fn routes(router: &mut Router<Self>) {
            router.handle_notify("Boom", |hooked, _| Box::pin(hooked.boom()));
        }

        async fn on_init(&mut self, _ctx: &mut Context) -> Result<(), ActorError> {
            self.0.inits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn on_stop(&mut self, ctx: &mut Context) -> Result<(), ActorError> {
            self.0.stops.fetch_add(1, Ordering::SeqCst);
            self.0.message_at_stop.store(ctx.message().is_some(), Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_stop_before_init_still_runs_both_hooks() {
        let system = System::new(Default::default());
        let log = Arc::new(HookLog::default());
        let hooks = log.clone();
        let pid = system
            .spawn(move || Hooked(hooks), (), ActorProcessOptions::new())
            .await
            .unwrap();
        // Single-threaded runtime: Init is still queued here
        system.kill(&pid).await.unwrap();
        assert_eq!(log.inits.load(Ordering::SeqCst), 1);
        assert_eq!(log.stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_panicked_message_is_not_visible_to_on_stop() {
        let system = System::new(Default::default());
        let log = Arc::new(HookLog::default());
        let hooks = log.clone();
        let pid = system
            .spawn(move || Hooked(hooks), (), ActorProcessOptions::new())
            .await
            .unwrap();
        let process = system.find(&pid).unwrap();
        let boom = Message::inner(None, pid.clone(), "Boom", Bytes::new());
        process.post_message(boom).await.unwrap();
        for _ in 0..100 {
            if system.workers().panics() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(system.workers().panics(), 1);

        system.kill(&pid).await.unwrap();
        assert_eq!(log.stops.load(Ordering::SeqCst), 1);
        assert!(!log.message_at_stop.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_stop_is_idempotent_and_rejects_new_messages() {
        let system = System::new(Default::default());
        let pid = system
            .spawn(|| Sleeper, (), ActorProcessOptions::new())
            .await
            .unwrap();
        let process = system.find(&pid).unwrap();
        assert_eq!(process.stop().await, Ok(()));
        assert_eq!(process.state(), ActorState::Stopped);
        assert_eq!(process.stop().await, Err(ActorError::AlreadyStopped));

        let late = Message::inner(None, pid.clone(), "Nap", Bytes::new());
        assert_eq!(process.post_message(late).await, Err(ActorError::ActorStopped));
    }

    #[tokio::test]
    async fn test_stop_drains_queued_work_first() {
        let system = System::new(Default::default());
        let pid = system
            .spawn(|| Sleeper, (), ActorProcessOptions::new())
            .await
            .unwrap();
        let process = system.find(&pid).unwrap();
        for _ in 0..3 {
            let nap = Message::inner(None, pid.clone(), "Nap", Bytes::new());
            process.post_message(nap).await.unwrap();
        }
        assert_eq!(process.stop().await, Ok(()));
        assert_eq!(process.mailbox_stats().out_count, 5);
    }

    #[tokio::test]
    async fn test_wait_times_out_with_call_timeout() {
        let system = System::new(Default::default());
        let pid = system
            .spawn(|| Sleeper, (), ActorProcessOptions::new())
            .await
            .unwrap();
        let process = system.find(&pid).unwrap();
        let hold = Message::inner(None, pid.clone(), "Hold", Bytes::from_static(b"200"));
        let rsp = process
            .post_message_and_wait_timeout(hold, Duration::from_millis(20))
            .await;
        assert_eq!(rsp.err, Some(ActorError::CallTimeout));
    }
}
