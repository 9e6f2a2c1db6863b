//! # Actor Context
//!
//! The per-instance handle through which an actor talks to the runtime: its own [`Pid`],
//! the message currently being processed, the parameters it was spawned with, name
//! registration, group membership, and outgoing `send`/`call`.
//!
//! A context holds only a weak reference to its [`System`], so actors never keep a node
//! alive on their own. Every operation that needs the system fails with
//! [`ActorError::SystemStopped`] once it is gone.

use crate::framework::error::ActorError;
use crate::framework::message::{Message, NetworkPacket, Session, PUSH_METHOD};
use crate::framework::pid::Pid;
use crate::framework::serializer::Serializer;
use crate::framework::system::{System, WeakSystem};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::Any;
use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;
use tracing::debug;

pub struct Context {
    pid: Pid,
    name: Option<String>,
    system: WeakSystem,
    serializer: Serializer,
    init_params: Box<dyn Any + Send + Sync>,
    message: Option<Message>,
    groups: BTreeSet<String>,
}

impl Context {
    pub fn new(pid: Pid, system: &System, init_params: Box<dyn Any + Send + Sync>) -> Self {
        Self {
            pid,
            name: None,
            system: system.downgrade(),
            serializer: system.serializer(),
            init_params,
            message: None,
            groups: BTreeSet::new(),
        }
    }

    /// Own address.
    pub fn self_pid(&self) -> &Pid {
        &self.pid
    }

    /// Name registered through [`Context::register_name`], if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The message being processed. `None` outside a method invocation.
    pub fn message(&self) -> Option<&Message> {
        self.message.as_ref()
    }

    /// Session of the current message, when it came from a network client.
    pub fn session(&self) -> Option<&Session> {
        self.message.as_ref().and_then(|msg| msg.session.as_ref())
    }

    /// The parameters passed to `spawn`, if they are a `T`.
    pub fn init_params<T: 'static>(&self) -> Option<&T> {
        self.init_params.downcast_ref::<T>()
    }

    pub fn serializer(&self) -> Serializer {
        self.serializer
    }

    pub fn system(&self) -> Result<System, ActorError> {
        self.system.upgrade().ok_or(ActorError::SystemStopped)
    }

    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(String::as_str)
    }

    pub(crate) fn set_message(&mut self, msg: Message) {
        self.message = Some(msg);
    }

    pub(crate) fn clear_message(&mut self) {
        self.message = None;
    }

    /// Binds `name` to this actor on its node.
    pub fn register_name(&mut self, name: impl Into<String>) -> Result<(), ActorError> {
        let name = name.into();
        self.system()?.register_name(&name, &self.pid)?;
        self.name = Some(name);
        Ok(())
    }

    /// Records a name already registered by the system at spawn time.
    pub(crate) fn adopt_name(&mut self, name: String) {
        self.name = Some(name);
    }

    /// Releases the registered name.
    pub fn unregister_name(&mut self) -> Result<Pid, ActorError> {
        let name = self.name.take().ok_or(ActorError::NameNotExist)?;
        self.system()?.unregister_name(&name)
    }

    pub async fn send<T>(&self, to: &Pid, method: &str, payload: &T) -> Result<(), ActorError>
    where
        T: Serialize + ?Sized,
    {
        self.system()?
            .send(Some(self.pid.clone()), to, method, payload)
            .await
    }

    pub async fn call<Req, Rsp>(&self, to: &Pid, method: &str, req: &Req) -> Result<Rsp, ActorError>
    where
        Req: Serialize + ?Sized,
        Rsp: DeserializeOwned,
    {
        self.system()?
            .call(Some(self.pid.clone()), to, method, req)
            .await
    }

    pub async fn call_with_timeout<Req, Rsp>(
        &self,
        to: &Pid,
        method: &str,
        req: &Req,
        timeout: Duration,
    ) -> Result<Rsp, ActorError>
    where
        Req: Serialize + ?Sized,
        Rsp: DeserializeOwned,
    {
        self.system()?
            .call_with_timeout(Some(self.pid.clone()), to, method, req, timeout)
            .await
    }

    pub fn join_group(&mut self, group: &str) -> Result<(), ActorError> {
        let system = self.system()?;
        let process = system.find(&self.pid).ok_or(ActorError::ProcessNotExist)?;
        system.groups().add(group, process);
        self.groups.insert(group.to_string());
        Ok(())
    }

    pub fn leave_group(&mut self, group: &str) -> Result<(), ActorError> {
        self.system()?.groups().remove(group, &self.pid);
        self.groups.remove(group);
        Ok(())
    }

    /// Sends `payload` to every member of `group` on this node, invoking the method named
    /// after the group. Returns how many members accepted it.
    pub async fn broadcast_group<T>(&self, group: &str, payload: &T) -> Result<usize, ActorError>
    where
        T: Serialize + ?Sized,
    {
        let data = self.serializer.marshal(payload)?;
        let system = self.system()?;
        Ok(system.groups().broadcast(group, Some(&self.pid), data).await)
    }

    /// Pushes `value` to the network client behind `session` under protocol id `id`.
    pub async fn push<T>(&self, session: &Session, id: u16, value: &T) -> Result<(), ActorError>
    where
        T: Serialize + ?Sized,
    {
        let packet = NetworkPacket {
            id,
            data: self.serializer.marshal(value)?,
        };
        debug!(agent = %session.agent, id, "push");
        self.send(&session.agent, PUSH_METHOD, &packet).await
    }

    /// Answers the client request held by `session`, reusing its protocol id.
    pub async fn response<T>(&self, session: &Session, value: &T) -> Result<(), ActorError>
    where
        T: Serialize + ?Sized,
    {
        self.push(session, session.packet.id, value).await
    }

    /// Leaves every group and releases the registered name. Runs before `on_stop`.
    pub(crate) fn teardown(&mut self) {
        let Ok(system) = self.system() else {
            return;
        };
        for group in std::mem::take(&mut self.groups) {
            system.groups().remove(&group, &self.pid);
        }
        if let Some(name) = self.name.take() {
            let _ = system.unregister_name(&name);
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("pid", &self.pid)
            .field("name", &self.name)
            .field("message", &self.message)
            .field("groups", &self.groups)
            .finish()
    }
}
