//! # Actor Trait
//!
//! The contract every actor type implements. An actor declares its callable methods once
//! per type in [`Actor::routes`]; the runtime then drives it purely through messages, one
//! at a time.
//!
//! The lifecycle hooks are **provided methods**: override them only when the actor needs
//! setup or teardown. `on_init` runs before any delivered message, `on_stop` runs after the
//! last one.

use crate::framework::context::Context;
use crate::framework::error::ActorError;
use crate::framework::router::Router;
use async_trait::async_trait;

#[async_trait]
pub trait Actor: Send + 'static {
    /// Registers the methods callable by name on this actor type.
    fn routes(router: &mut Router<Self>)
    where
        Self: Sized;

    /// Called once, before the first message is processed.
    async fn on_init(&mut self, _ctx: &mut Context) -> Result<(), ActorError> {
        Ok(())
    }

    /// Called once, after group memberships and the registered name were released.
    async fn on_stop(&mut self, _ctx: &mut Context) -> Result<(), ActorError> {
        Ok(())
    }
}
