//! Gate actor: the agent owning one network client connection.
//!
//! Inbound, it turns client packets into network messages carrying a [`Session`] that
//! points back at the gate. Outbound, it receives every packet a service pushes on
//! [`PUSH_METHOD`] and keeps them until the connection writer collects them.

use crate::framework::{
    Actor, ActorError, Context, Message, NetworkPacket, Router, Session, PUSH_METHOD,
};
use crate::model::Inbound;
use async_trait::async_trait;
use std::collections::VecDeque;
use tracing::debug;

#[derive(Debug, Default)]
pub struct Gate {
    outbox: VecDeque<NetworkPacket>,
    forwarded: u64,
}

impl Gate {
    pub fn new() -> Self {
        Self::default()
    }

    async fn forward(&mut self, ctx: &mut Context, inbound: Inbound) -> Result<(), ActorError> {
        let session = Session {
            agent: ctx.self_pid().clone(),
            packet: inbound.packet,
        };
        debug!(to = %inbound.to, method = %inbound.method, id = session.packet.id, "forward");
        let msg = Message::network(session, inbound.to.clone(), inbound.method);
        ctx.system()?.post_message(&inbound.to, msg).await?;
        self.forwarded += 1;
        Ok(())
    }

    async fn push(&mut self, packet: NetworkPacket) -> Result<(), ActorError> {
        self.outbox.push_back(packet);
        Ok(())
    }

    /// Removes and returns up to `max` pushed packets, oldest first.
    async fn drain(&mut self, max: usize) -> Result<Vec<NetworkPacket>, ActorError> {
        let n = max.min(self.outbox.len());
        Ok(self.outbox.drain(..n).collect())
    }
}

#[async_trait]
impl Actor for Gate {
    fn routes(router: &mut Router<Self>) {
        router
            .handle("Forward", |gate, ctx, inbound: Inbound| Box::pin(gate.forward(ctx, inbound)))
            .handle(PUSH_METHOD, |gate, _, packet: NetworkPacket| Box::pin(gate.push(packet)))
            .handle_call("Drain", |gate, _, max: usize| Box::pin(gate.drain(max)));
    }

    async fn on_stop(&mut self, ctx: &mut Context) -> Result<(), ActorError> {
        debug!(
            gate = %ctx.self_pid(),
            forwarded = self.forwarded,
            undelivered = self.outbox.len(),
            "gate closed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::{ActorProcessOptions, System};
    use bytes::Bytes;

    #[tokio::test]
    async fn test_pushes_are_drained_in_order() {
        let system = System::new(Default::default());
        let gate = system
            .spawn(Gate::new, (), ActorProcessOptions::new())
            .await
            .unwrap();
        for id in 1..=3u16 {
            let packet = NetworkPacket {
                id,
                data: Bytes::from_static(b"{}"),
            };
            system.send(None, &gate, PUSH_METHOD, &packet).await.unwrap();
        }
        let first: Vec<NetworkPacket> = system.call(None, &gate, "Drain", &2usize).await.unwrap();
        let rest: Vec<NetworkPacket> = system.call(None, &gate, "Drain", &10usize).await.unwrap();
        let ids: Vec<u16> = first.iter().chain(&rest).map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }
}
