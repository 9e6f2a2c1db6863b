use crate::framework::{ActorError, Pid, System};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Trait for actor-specific clients to inherit the standard messaging operations.
///
/// A client is a [`System`] plus the [`Pid`] of the actor it talks to. The target may live
/// on any node; the system picks local delivery or the remote transport.
#[async_trait]
pub trait ActorClient: Send + Sync {
    /// The actor-specific error type.
    type Error: From<ActorError> + Send + Sync;

    fn system(&self) -> &System;

    /// The actor this client talks to.
    fn pid(&self) -> &Pid;

    /// Calls `method` and waits for the reply.
    #[tracing::instrument(skip(self, req))]
    async fn call<Req, Rsp>(&self, method: &str, req: &Req) -> Result<Rsp, Self::Error>
    where
        Req: Serialize + Sync + ?Sized,
        Rsp: DeserializeOwned + Send,
    {
        tracing::debug!(to = %self.pid(), "Sending request");
        self.system()
            .call(None, self.pid(), method, req)
            .await
            .map_err(Self::Error::from)
    }

    /// Sends `method` without waiting for it to run.
    #[tracing::instrument(skip(self, payload))]
    async fn send<T>(&self, method: &str, payload: &T) -> Result<(), Self::Error>
    where
        T: Serialize + Sync + ?Sized,
    {
        tracing::debug!(to = %self.pid(), "Sending message");
        self.system()
            .send(None, self.pid(), method, payload)
            .await
            .map_err(Self::Error::from)
    }

    /// Stops the actor. Only valid on the actor's own node.
    #[tracing::instrument(skip(self))]
    async fn kill(&self) -> Result<(), Self::Error> {
        self.system().kill(self.pid()).await.map_err(Self::Error::from)
    }
}
