use crate::clients::actor_client::ActorClient;
use crate::framework::{ActorError, ActorProcessOptions, NetworkPacket, Pid, System};
use crate::gate_actor::Gate;
use crate::model::Inbound;
use serde::Serialize;
use tracing::instrument;

/// Client for interacting with a [`Gate`] actor: plays the network connection it owns.
#[derive(Clone, Debug)]
pub struct GateClient {
    system: System,
    gate: Pid,
}

impl ActorClient for GateClient {
    type Error = ActorError;

    fn system(&self) -> &System {
        &self.system
    }

    fn pid(&self) -> &Pid {
        &self.gate
    }
}

impl GateClient {
    /// Spawns a gate for a new connection on `system`.
    pub async fn connect(system: &System) -> Result<Self, ActorError> {
        let gate = system
            .spawn(Gate::new, (), ActorProcessOptions::new())
            .await?;
        Ok(Self {
            system: system.clone(),
            gate,
        })
    }

    /// Delivers a client packet `id` with `body` to `method` on `to`, as if read from the
    /// socket. Returns once the gate has forwarded it.
    #[instrument(skip(self, body))]
    pub async fn packet<T>(&self, to: &Pid, method: &str, id: u16, body: &T) -> Result<(), ActorError>
    where
        T: Serialize + ?Sized,
    {
        let inbound = Inbound {
            to: to.clone(),
            method: method.to_string(),
            packet: NetworkPacket {
                id,
                data: self.system.serializer().marshal(body)?,
            },
        };
        self.call("Forward", &inbound).await
    }

    /// Collects up to `max` packets pushed to the client.
    #[instrument(skip(self))]
    pub async fn drain(&self, max: usize) -> Result<Vec<NetworkPacket>, ActorError> {
        self.call("Drain", &max).await
    }
}
