//! # Mailbox
//!
//! A multi-producer, single-consumer queue plus the scheduling guard that gives each actor
//! single-threaded semantics on a shared pool.
//!
//! ## Scheduling
//!
//! Every post pushes first and then tries to flip the status from `IDLE` to `RUNNING`. Only
//! the poster that wins the compare-and-swap schedules a drain, so at most one drain is in
//! flight per mailbox. The drain pops up to `throughput` messages, yields, and keeps going
//! while the queue is non-empty. Before finishing it stores `IDLE` and re-checks the queue:
//! a message that landed between the last pop and the store is picked up either by that
//! re-check or by its own poster's CAS, never stranded.
//!
//! ## Faults
//!
//! Invocation errors are logged and the drain moves on. A panic unwinds out of the drain
//! and is caught by the dispatcher; the recover hook resets the status and reschedules if
//! work remains, so the next message still gets processed.

use crate::framework::dispatcher::Dispatcher;
use crate::framework::error::ActorError;
use crate::framework::message::Message;
use crate::framework::waiter::Completer;
use crate::framework::workers::RecoverFn;
use async_trait::async_trait;
use futures::FutureExt;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use tracing::{error, trace, warn};

const IDLE: u8 = 0;
const RUNNING: u8 = 1;

/// What a mailbox carries: lifecycle signals plus user messages.
#[derive(Debug)]
pub enum MailboxMessage {
    /// Runs the actor's `on_init` hook.
    Init,
    Deliver(Message),
    /// Runs the actor's `on_stop` hook, then resolves the completer.
    Stop(Completer<()>),
}

/// The consumer side of a mailbox, implemented by the process cell.
#[async_trait]
pub trait MessageInvoker: Send + Sync {
    async fn invoke(&self, msg: MailboxMessage) -> Result<(), ActorError>;

    /// Actor type name, for logs.
    fn actor_type(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MailboxStats {
    /// Messages accepted by `post_message`.
    pub in_count: u64,
    /// Messages taken off the queue for processing.
    pub out_count: u64,
    /// Messages currently waiting.
    pub queued: usize,
}

#[async_trait]
pub trait Mailbox: Send + Sync {
    /// Binds the consumer and the dispatcher. A mailbox is bound at most once.
    fn register_handlers(
        &self,
        invoker: Arc<dyn MessageInvoker>,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> Result<(), ActorError>;

    async fn post_message(&self, msg: MailboxMessage) -> Result<(), ActorError>;

    fn stats(&self) -> MailboxStats;
}

type Handlers = (Arc<dyn MessageInvoker>, Arc<dyn Dispatcher>);

/// Unbounded FIFO mailbox.
pub struct DefaultMailbox {
    this: Weak<DefaultMailbox>,
    queue: Mutex<VecDeque<MailboxMessage>>,
    handlers: OnceLock<Handlers>,
    status: AtomicU8,
    in_count: AtomicU64,
    out_count: AtomicU64,
}

impl DefaultMailbox {
    pub fn new() -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            queue: Mutex::new(VecDeque::new()),
            handlers: OnceLock::new(),
            status: AtomicU8::new(IDLE),
            in_count: AtomicU64::new(0),
            out_count: AtomicU64::new(0),
        })
    }

    fn actor_type(&self) -> &'static str {
        self.handlers
            .get()
            .map(|(invoker, _)| invoker.actor_type())
            .unwrap_or("unbound")
    }

    async fn schedule(&self) {
        if self
            .status
            .compare_exchange(IDLE, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        let (Some(this), Some((_, dispatcher))) = (self.this.upgrade(), self.handlers.get())
        else {
            self.status.store(IDLE, Ordering::Release);
            return;
        };
        let run = async move { this.process().await }.boxed();
        if let Err(error) = dispatcher.schedule(run, self.recover_hook()).await {
            self.status.store(IDLE, Ordering::Release);
            error!(actor = self.actor_type(), %error, "failed to schedule mailbox drain");
        }
    }

    async fn process(self: Arc<Self>) {
        loop {
            self.run().await;
            self.status.store(IDLE, Ordering::Release);
            if self.queue.lock().is_empty() {
                break;
            }
            if self
                .status
                .compare_exchange(IDLE, RUNNING, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                // A poster won the flag and owns the next drain.
                break;
            }
        }
    }

    async fn run(&self) {
        let Some((invoker, dispatcher)) = self.handlers.get() else {
            return;
        };
        let throughput = dispatcher.throughput().max(1);
        let mut handled = 0;
        loop {
            if handled == throughput {
                handled = 0;
                tokio::task::yield_now().await;
            }
            let next = self.queue.lock().pop_front();
            let Some(msg) = next else {
                return;
            };
            handled += 1;
            self.out_count.fetch_add(1, Ordering::Relaxed);
            if let Err(error) = invoker.invoke(msg).await {
                warn!(actor = invoker.actor_type(), %error, "message invocation failed");
            }
        }
    }

    fn recover_hook(&self) -> RecoverFn {
        let weak = self.this.clone();
        Arc::new(move |reason: String| {
            let Some(mailbox) = weak.upgrade() else {
                return;
            };
            error!(actor = mailbox.actor_type(), %reason, "actor panicked, resuming mailbox");
            mailbox.status.store(IDLE, Ordering::Release);
            if !mailbox.queue.lock().is_empty() {
                tokio::spawn(async move { mailbox.schedule().await });
            }
        })
    }
}

#[async_trait]
impl Mailbox for DefaultMailbox {
    fn register_handlers(
        &self,
        invoker: Arc<dyn MessageInvoker>,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> Result<(), ActorError> {
        self.handlers
            .set((invoker, dispatcher))
            .map_err(|_| ActorError::MailboxInUse)
    }

    async fn post_message(&self, msg: MailboxMessage) -> Result<(), ActorError> {
        if self.handlers.get().is_none() {
            return Err(ActorError::MailboxNil);
        }
        self.queue.lock().push_back(msg);
        self.in_count.fetch_add(1, Ordering::Relaxed);
        trace!(actor = self.actor_type(), "message queued");
        self.schedule().await;
        Ok(())
    }

    fn stats(&self) -> MailboxStats {
        MailboxStats {
            in_count: self.in_count.load(Ordering::Relaxed),
            out_count: self.out_count.load(Ordering::Relaxed),
            queued: self.queue.lock().len(),
        }
    }
}

impl fmt::Debug for DefaultMailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultMailbox")
            .field("actor", &self.actor_type())
            .field("running", &(self.status.load(Ordering::Relaxed) == RUNNING))
            .field("stats", &self.stats())
            .finish()
    }
}
