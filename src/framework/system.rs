//! # Actor System
//!
//! The per-node registry and the single routing chokepoint of the runtime.
//!
//! ## Registry
//!
//! Two concurrent maps, `uniq_id -> Process` and `name -> Pid`. Entries are added on
//! spawn/register and removed on kill/unregister. Names are unique: registering a taken
//! name is an error, never an overwrite.
//!
//! ## Routing
//!
//! Every outgoing message goes through [`System::post_message`] (or [`System::request`]
//! for calls). A pid on this node resolves to a local [`Process`]; any other node id is
//! handed to the installed [`RemoteTransport`]. Broadcast messages arriving from the
//! transport are delivered by name regardless of node id.
//!
//! ## Ownership
//!
//! `System` is a cheap `Arc` handle. Actors only hold a [`WeakSystem`] through their
//! context, so dropping the last `System` handle ends the node.

use crate::framework::actor::Actor;
use crate::framework::context::Context;
use crate::framework::dispatcher::{Dispatcher, PooledDispatcher, SynchronizedDispatcher};
use crate::framework::error::ActorError;
use crate::framework::group::Groups;
use crate::framework::mailbox::{DefaultMailbox, Mailbox};
use crate::framework::message::{Message, RespondMessage};
use crate::framework::options::{ActorProcessOptions, SystemConfig};
use crate::framework::pid::Pid;
use crate::framework::process::{ActorCell, Lifecycle, Process};
use crate::framework::remote::RemoteTransport;
use crate::framework::router::RouterHub;
use crate::framework::serializer::Serializer;
use crate::framework::workers::WorkerPool;
use bytes::Bytes;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

#[derive(Clone)]
pub struct System {
    inner: Arc<SystemInner>,
}

/// Non-owning handle to a [`System`].
#[derive(Clone, Default)]
pub struct WeakSystem {
    inner: Weak<SystemInner>,
}

impl WeakSystem {
    pub fn upgrade(&self) -> Option<System> {
        self.inner.upgrade().map(|inner| System { inner })
    }
}

impl fmt::Debug for WeakSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakSystem")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

struct SystemInner {
    config: SystemConfig,
    uniq_id: AtomicU64,
    names: DashMap<String, Pid>,
    processes: DashMap<u64, Arc<Process>>,
    routers: RouterHub,
    groups: Groups,
    workers: WorkerPool,
    dispatcher: Arc<dyn Dispatcher>,
    remote: RwLock<Option<Arc<dyn RemoteTransport>>>,
    stopped: AtomicBool,
}

impl System {
    pub fn new(config: SystemConfig) -> Self {
        let workers = WorkerPool::new(config.pool_size);
        let dispatcher = Arc::new(PooledDispatcher::new(workers.clone(), config.throughput));
        Self {
            inner: Arc::new(SystemInner {
                config,
                uniq_id: AtomicU64::new(0),
                names: DashMap::new(),
                processes: DashMap::new(),
                routers: RouterHub::new(),
                groups: Groups::new(),
                workers,
                dispatcher,
                remote: RwLock::new(None),
                stopped: AtomicBool::new(false),
            }),
        }
    }

    pub fn downgrade(&self) -> WeakSystem {
        WeakSystem {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn node_id(&self) -> u64 {
        self.inner.config.node_id
    }

    pub fn config(&self) -> &SystemConfig {
        &self.inner.config
    }

    pub fn serializer(&self) -> Serializer {
        self.inner.config.serializer
    }

    pub fn routers(&self) -> &RouterHub {
        &self.inner.routers
    }

    pub fn groups(&self) -> &Groups {
        &self.inner.groups
    }

    pub fn workers(&self) -> &WorkerPool {
        &self.inner.workers
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::Acquire)
    }

    pub fn is_local_pid(&self, pid: &Pid) -> bool {
        pid.node_id() == self.node_id()
    }

    pub fn process_count(&self) -> usize {
        self.inner.processes.len()
    }

    /// The dispatcher used when a spawn does not name one.
    pub fn pooled_dispatcher(&self) -> Arc<dyn Dispatcher> {
        self.inner.dispatcher.clone()
    }

    /// A dispatcher that drains mailboxes inline on the posting task.
    pub fn synchronized_dispatcher(&self) -> Arc<dyn Dispatcher> {
        Arc::new(SynchronizedDispatcher::new(
            self.inner.workers.clone(),
            self.inner.config.throughput,
        ))
    }

    pub fn set_remote(&self, transport: Arc<dyn RemoteTransport>) {
        *self.inner.remote.write() = Some(transport);
    }

    pub fn remote(&self) -> Result<Arc<dyn RemoteTransport>, ActorError> {
        self.inner.remote.read().clone().ok_or(ActorError::TransportNil)
    }

    /// Allocates a fresh local pid. Ids are never reused.
    pub fn next_pid(&self) -> Pid {
        let uniq = self.inner.uniq_id.fetch_add(1, Ordering::Relaxed) + 1;
        Pid::new(self.node_id(), uniq)
    }

    // =========================================================================
    // Registry
    // =========================================================================

    /// Binds `name` to `pid`. An empty name is accepted and ignored.
    pub fn register_name(&self, name: &str, pid: &Pid) -> Result<(), ActorError> {
        if name.is_empty() {
            return Ok(());
        }
        if !pid.is_valid() {
            return Err(ActorError::PidIsNil);
        }
        match self.inner.names.entry(name.to_string()) {
            Entry::Occupied(_) => Err(ActorError::NameExists),
            Entry::Vacant(slot) => {
                slot.insert(pid.clone());
                debug!(name, %pid, "name registered");
                Ok(())
            }
        }
    }

    pub fn unregister_name(&self, name: &str) -> Result<Pid, ActorError> {
        self.inner
            .names
            .remove(name)
            .map(|(_, pid)| pid)
            .ok_or(ActorError::NameNotExist)
    }

    pub fn lookup_name(&self, name: &str) -> Option<Pid> {
        self.inner.names.get(name).map(|pid| pid.value().clone())
    }

    /// Resolves a pid of this node, by unique id first and then by name. Pids of other
    /// nodes resolve to `None`; check [`System::is_local_pid`] before reading that as
    /// "does not exist".
    pub fn find(&self, pid: &Pid) -> Option<Arc<Process>> {
        if !self.is_local_pid(pid) {
            return None;
        }
        if pid.uniq_id() > 0 {
            if let Some(process) = self.find_by_id(pid.uniq_id()) {
                return Some(process);
            }
        }
        if pid.name().is_empty() {
            return None;
        }
        self.find_by_name(pid.name())
    }

    pub fn find_by_id(&self, uniq_id: u64) -> Option<Arc<Process>> {
        self.inner
            .processes
            .get(&uniq_id)
            .map(|process| process.value().clone())
    }

    pub fn find_by_name(&self, name: &str) -> Option<Arc<Process>> {
        let pid = self.lookup_name(name)?;
        self.find_by_id(pid.uniq_id())
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Creates an actor from `producer`, registers it, and queues its Init message before
    /// returning its pid. A failed spawn leaves no registry entry.
    pub async fn spawn<A, F, P>(
        &self,
        producer: F,
        init_params: P,
        options: ActorProcessOptions,
    ) -> Result<Pid, ActorError>
    where
        A: Actor,
        F: FnOnce() -> A,
        P: Any + Send + Sync,
    {
        if self.is_stopped() {
            return Err(ActorError::SystemStopped);
        }
        let router = self.inner.routers.get_or_build::<A>()?;
        let pid = self.next_pid();
        let name = options.name.unwrap_or_default();
        self.register_name(&name, &pid)?;

        let mut ctx = Context::new(pid.clone(), self, Box::new(init_params));
        if !name.is_empty() {
            ctx.adopt_name(name.clone());
        }
        let lifecycle = Arc::new(Lifecycle::new());
        let actor_type = router.name();
        let cell = Arc::new(ActorCell::new(producer(), ctx, router, lifecycle.clone()));
        let mailbox = options
            .mailbox
            .unwrap_or_else(|| DefaultMailbox::new() as Arc<dyn Mailbox>);
        let dispatcher = options
            .dispatcher
            .unwrap_or_else(|| self.inner.dispatcher.clone());
        if let Err(e) = mailbox.register_handlers(cell, dispatcher) {
            self.inner.names.remove_if(&name, |_, bound| *bound == pid);
            return Err(e);
        }

        let process = Arc::new(Process::new(
            pid.clone(),
            actor_type,
            mailbox,
            lifecycle,
            self.inner.config.call_timeout,
            self.inner.config.stop_timeout,
        ));
        self.inner.processes.insert(pid.uniq_id(), process.clone());
        if let Err(e) = process.post_init().await {
            self.remove_process(&pid);
            return Err(e);
        }
        info!(actor = actor_type, %pid, name = %name, "actor spawned");
        Ok(pid)
    }

    /// Stops a local actor and removes it from the registry.
    ///
    /// Registry entries are removed even when the stop hook times out; the stop error is
    /// still returned.
    pub async fn kill(&self, pid: &Pid) -> Result<(), ActorError> {
        if !pid.is_valid() {
            return Err(ActorError::InvalidPid);
        }
        if !self.is_local_pid(pid) {
            return Err(ActorError::NotLocalPid);
        }
        let process = self.find(pid).ok_or(ActorError::ProcessNotExist)?;
        let result = process.stop().await;
        self.remove_process(process.pid());
        match &result {
            Ok(()) => info!(actor = process.actor_type(), %pid, "actor killed"),
            Err(error) => warn!(actor = process.actor_type(), %pid, %error, "actor killed uncleanly"),
        }
        result
    }

    fn remove_process(&self, pid: &Pid) {
        self.inner.processes.remove(&pid.uniq_id());
        self.inner.names.retain(|_, bound| bound != pid);
        self.inner.groups.remove_all(pid);
    }

    /// Stops every actor and clears the registry. Later spawns fail with
    /// [`ActorError::SystemStopped`].
    pub async fn shutdown(&self) {
        if self.inner.stopped.swap(true, Ordering::AcqRel) {
            return;
        }
        info!(node = self.node_id(), actors = self.process_count(), "shutting down actor system");
        let processes: Vec<Arc<Process>> = self
            .inner
            .processes
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        for process in processes {
            match process.stop().await {
                Ok(()) | Err(ActorError::AlreadyStopped) => {}
                Err(error) => {
                    warn!(actor = process.actor_type(), pid = %process.pid(), %error, "stop failed during shutdown")
                }
            }
        }
        self.inner.processes.clear();
        self.inner.names.clear();
        self.inner.groups.clear();
        self.inner.workers.close();
        info!(node = self.node_id(), "actor system stopped");
    }

    // =========================================================================
    // Messaging
    // =========================================================================

    /// Delivers `msg` to `to`, locally or through the remote transport. Never waits for
    /// the message to be processed.
    pub async fn post_message(&self, to: &Pid, msg: Message) -> Result<(), ActorError> {
        if !to.is_valid() {
            return Err(ActorError::InvalidPid);
        }
        if msg.is_broadcast() {
            let process = self
                .find_by_name(to.name())
                .ok_or(ActorError::ProcessNotExist)?;
            return process.post_message(msg).await;
        }
        if self.is_local_pid(to) {
            trace!(%to, method = %msg.method, "local delivery");
            let process = self.find(to).ok_or(ActorError::ProcessNotExist)?;
            return process.post_message(msg).await;
        }
        trace!(%to, method = %msg.method, "remote delivery");
        self.remote()?.remote_send(to, msg).await
    }

    /// Fire-and-forget: marshals `payload` and posts it to `to.method`.
    pub async fn send<T>(&self, from: Option<Pid>, to: &Pid, method: &str, payload: &T) -> Result<(), ActorError>
    where
        T: Serialize + ?Sized,
    {
        let data = self.serializer().marshal(payload)?;
        self.post_message(to, Message::inner(from, to.clone(), method, data))
            .await
    }

    /// Calls `to.method(req)` and waits for the reply, bounded by the configured call
    /// timeout. A callee error is returned verbatim.
    pub async fn call<Req, Rsp>(&self, from: Option<Pid>, to: &Pid, method: &str, req: &Req) -> Result<Rsp, ActorError>
    where
        Req: Serialize + ?Sized,
        Rsp: DeserializeOwned,
    {
        self.call_with_timeout(from, to, method, req, self.inner.config.call_timeout)
            .await
    }

    pub async fn call_with_timeout<Req, Rsp>(
        &self,
        from: Option<Pid>,
        to: &Pid,
        method: &str,
        req: &Req,
        timeout: Duration,
    ) -> Result<Rsp, ActorError>
    where
        Req: Serialize + ?Sized,
        Rsp: DeserializeOwned,
    {
        let data = self.serializer().marshal(req)?;
        let msg = Message::inner(from, to.clone(), method, data);
        let rsp = self.request(to, msg, timeout).await;
        if let Some(err) = rsp.err {
            return Err(err);
        }
        self.decode_reply(&rsp.data)
    }

    /// Decodes a successful reply. A raw method may answer with no bytes at all, which
    /// reads as the encoded unit.
    fn decode_reply<Rsp: DeserializeOwned>(&self, data: &Bytes) -> Result<Rsp, ActorError> {
        let serializer = self.serializer();
        if data.is_empty() {
            return serializer.unmarshal(&serializer.marshal(&())?);
        }
        serializer.unmarshal(data)
    }

    /// Posts `msg` with a responder attached and waits for the raw reply.
    pub async fn request(&self, to: &Pid, msg: Message, timeout: Duration) -> RespondMessage {
        if !to.is_valid() {
            return RespondMessage::error(ActorError::InvalidPid);
        }
        if self.is_local_pid(to) {
            return match self.find(to) {
                Some(process) => process.post_message_and_wait_timeout(msg, timeout).await,
                None => RespondMessage::error(ActorError::ProcessNotExist),
            };
        }
        match self.remote() {
            Ok(transport) => transport.remote_call(to, timeout, msg).await,
            Err(e) => RespondMessage::error(e),
        }
    }

    /// Publishes `method(payload)` to the actor named `tag` on every node subscribed to
    /// `tag`, this one included.
    pub async fn broadcast<T>(&self, from: Option<Pid>, tag: &str, method: &str, payload: &T) -> Result<(), ActorError>
    where
        T: Serialize + ?Sized,
    {
        let data = self.serializer().marshal(payload)?;
        let msg = Message::broadcast(from, Pid::named(self.node_id(), tag), method, data);
        self.remote()?.broadcast(msg).await
    }

    /// Sends `method` with an empty payload to `pid` after `delay`. Abort the returned
    /// handle to cancel.
    pub fn add_timer(&self, pid: &Pid, delay: Duration, method: &str) -> Result<JoinHandle<()>, ActorError> {
        if !pid.is_valid() {
            return Err(ActorError::PidIsNil);
        }
        let system = self.downgrade();
        let pid = pid.clone();
        let method = method.to_string();
        Ok(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(system) = system.upgrade() else {
                return;
            };
            let msg = Message::inner(Some(pid.clone()), pid.clone(), method.as_str(), Bytes::new());
            if let Err(error) = system.post_message(&pid, msg).await {
                warn!(%pid, %method, %error, "timer delivery failed");
            }
        }))
    }
}

impl fmt::Debug for System {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("System")
            .field("node_id", &self.node_id())
            .field("processes", &self.process_count())
            .field("names", &self.inner.names.len())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::router::Router;
    use async_trait::async_trait;

    struct Idle;

    #[async_trait]
    impl Actor for Idle {
        fn routes(_router: &mut Router<Self>) {}
    }

    #[test]
    fn test_next_pid_is_monotonic() {
        let system = System::new(SystemConfig {
            node_id: 7,
            ..Default::default()
        });
        let a = system.next_pid();
        let b = system.next_pid();
        assert_eq!(a, Pid::new(7, 1));
        assert_eq!(b, Pid::new(7, 2));
    }

    #[test]
    fn test_register_name_rules() {
        let system = System::new(Default::default());
        let (p1, p2) = (system.next_pid(), system.next_pid());
        assert_eq!(system.register_name("", &p1), Ok(()));
        assert_eq!(system.register_name("x", &Pid::default()), Err(ActorError::PidIsNil));
        assert_eq!(system.register_name("x", &p1), Ok(()));
        assert_eq!(system.register_name("x", &p2), Err(ActorError::NameExists));
        assert_eq!(system.lookup_name("x"), Some(p1.clone()));
        assert_eq!(system.unregister_name("x"), Ok(p1));
        assert_eq!(system.unregister_name("x"), Err(ActorError::NameNotExist));
    }

    #[tokio::test]
    async fn test_duplicate_name_spawn_leaves_no_entry() {
        let system = System::new(Default::default());
        let first = system
            .spawn(|| Idle, (), ActorProcessOptions::new().with_name("solo"))
            .await
            .unwrap();
        let second = system
            .spawn(|| Idle, (), ActorProcessOptions::new().with_name("solo"))
            .await;
        assert_eq!(second, Err(ActorError::NameExists));
        assert_eq!(system.process_count(), 1);
        assert_eq!(system.find_by_name("solo").map(|p| p.pid().clone()), Some(first));
    }

    #[tokio::test]
    async fn test_remote_pid_without_transport() {
        let system = System::new(Default::default());
        let remote = Pid::new(2, 1);
        assert!(system.find(&remote).is_none());
        assert_eq!(
            system.send(None, &remote, "Ping", &1).await,
            Err(ActorError::TransportNil)
        );
        assert_eq!(system.kill(&remote).await, Err(ActorError::NotLocalPid));
        assert_eq!(system.kill(&Pid::default()).await, Err(ActorError::InvalidPid));
    }

    #[tokio::test]
    async fn test_shutdown_stops_everything() {
        let system = System::new(Default::default());
        for _ in 0..3 {
            system.spawn(|| Idle, (), ActorProcessOptions::new()).await.unwrap();
        }
        system.shutdown().await;
        assert_eq!(system.process_count(), 0);
        let late = system.spawn(|| Idle, (), ActorProcessOptions::new()).await;
        assert_eq!(late, Err(ActorError::SystemStopped));
    }
}
