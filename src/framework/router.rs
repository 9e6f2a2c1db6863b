//! # Router
//!
//! Per-actor-type table mapping a method name to a callable descriptor. It is what lets a
//! message built from a network packet or a cluster frame (nothing more than a method name
//! and some bytes) reach a typed async method on an actor.
//!
//! ## Registration
//!
//! Each actor type fills its table once in [`Actor::routes`]:
//!
//! ```rust,ignore
//! impl Actor for Echo {
//!     fn routes(router: &mut Router<Self>) {
//!         router
//!             .handle_call("Ping", |echo, ctx, req: i32| Box::pin(echo.ping(ctx, req)))
//!             .handle_notify("Tick", |echo, _ctx| Box::pin(echo.tick()));
//!     }
//! }
//! ```
//!
//! | Form | Argument | Reply |
//! |------|----------|-------|
//! | [`Router::handle_call`] | typed, decoded by the serializer | typed value, marshaled |
//! | [`Router::handle`] | typed | error only |
//! | [`Router::handle_raw_call`] | payload bytes, untouched | bytes, untouched |
//! | [`Router::handle_raw`] | payload bytes | error only |
//! | [`Router::handle_notify`] | none (payload must be empty) | error only |
//!
//! Argument decoding is chosen at registration time through [`ArgShape`], so dispatch never
//! inspects types at call time.
//!
//! ## Sharing
//!
//! Routers are built once per type and cached in the [`RouterHub`]; all instances of the
//! type share the same read-only table.

use crate::framework::actor::Actor;
use crate::framework::context::Context;
use crate::framework::error::ActorError;
use crate::framework::message::{Message, RespondMessage};
use crate::framework::serializer::Serializer;
use bytes::Bytes;
use dashmap::DashMap;
use futures::future::{self, BoxFuture};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::{type_name, Any};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Future returned by a registered method.
pub type MethodFuture<'a, T> = BoxFuture<'a, Result<T, ActorError>>;

type DecodeFn = fn(Serializer, &[u8]) -> Result<Box<dyn Any + Send>, ActorError>;

type InvokeFn<A> = Box<
    dyn for<'a> Fn(&'a mut A, &'a mut Context, Vec<ArgValue>, Serializer) -> MethodFuture<'a, Bytes>
        + Send
        + Sync,
>;

/// How a declared argument is rebuilt from the message payload.
#[derive(Clone, Copy)]
pub enum ArgShape {
    /// Passed through without decoding.
    RawBytes,
    /// Decoded into a fresh value of the declared type.
    Typed {
        type_name: &'static str,
        decode: DecodeFn,
    },
}

impl ArgShape {
    pub fn typed<T: DeserializeOwned + Send + 'static>() -> Self {
        ArgShape::Typed {
            type_name: type_name::<T>(),
            decode: decode_as::<T>,
        }
    }
}

impl fmt::Debug for ArgShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgShape::RawBytes => f.write_str("RawBytes"),
            ArgShape::Typed { type_name, .. } => write!(f, "Typed({type_name})"),
        }
    }
}

/// A decoded argument handed to a method's invoker.
pub enum ArgValue {
    Raw(Bytes),
    Typed(Box<dyn Any + Send>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnShape {
    /// `Result<(), ActorError>`: a failure is reported without payload.
    ErrorOnly,
    /// `Result<T, ActorError>`: the value is marshaled into the reply.
    ValueAndError,
}

/// One entry of a router: the method name, its argument and return shapes, and the
/// type-erased invoker.
pub struct MethodDescriptor<A> {
    name: String,
    args: Vec<ArgShape>,
    returns: ReturnShape,
    invoke: InvokeFn<A>,
}

impl<A> MethodDescriptor<A> {
    /// Builds a descriptor by hand. The invoker receives one [`ArgValue`] per declared
    /// argument.
    pub fn new<F>(name: impl Into<String>, args: Vec<ArgShape>, returns: ReturnShape, f: F) -> Self
    where
        F: for<'a> Fn(&'a mut A, &'a mut Context, Vec<ArgValue>, Serializer) -> MethodFuture<'a, Bytes>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            args,
            returns,
            invoke: Box::new(f),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[ArgShape] {
        &self.args
    }

    pub fn returns(&self) -> ReturnShape {
        self.returns
    }

    fn decode_args(&self, data: &Bytes, serializer: Serializer) -> Result<Vec<ArgValue>, ActorError> {
        match self.args.as_slice() {
            [] if data.is_empty() => Ok(Vec::new()),
            [] => Err(ActorError::ActorArgsNum),
            [ArgShape::RawBytes] => Ok(vec![ArgValue::Raw(data.clone())]),
            // Zero-sized values encode to nothing under bincode, so an empty payload is
            // only missing when the declared type cannot decode it.
            [ArgShape::Typed { decode, .. }] => match decode(serializer, data) {
                Ok(value) => Ok(vec![ArgValue::Typed(value)]),
                Err(_) if data.is_empty() => Err(ActorError::ActorArgsNum),
                Err(e) => Err(e),
            },
            _ => Err(ActorError::MethodArgNum),
        }
    }
}

impl<A> fmt::Debug for MethodDescriptor<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("name", &self.name)
            .field("args", &self.args)
            .field("returns", &self.returns)
            .finish()
    }
}

/// Method table for actor type `A`.
pub struct Router<A> {
    name: &'static str,
    methods: HashMap<String, MethodDescriptor<A>>,
}

impl<A: Actor> Router<A> {
    /// Builds the table declared by `A::routes`.
    pub fn build() -> Self {
        let mut router = Self::empty();
        A::routes(&mut router);
        debug!(actor = router.name, methods = router.methods.len(), "router built");
        router
    }
}

impl<A> Router<A> {
    pub fn empty() -> Self {
        Self {
            name: type_name::<A>(),
            methods: HashMap::new(),
        }
    }

    /// Actor type name this router was built for.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn get(&self, method: &str) -> Option<&MethodDescriptor<A>> {
        self.methods.get(method)
    }

    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }

    /// Installs a descriptor, replacing any method with the same name.
    pub fn insert(&mut self, descriptor: MethodDescriptor<A>) -> &mut Self {
        self.methods.insert(descriptor.name.clone(), descriptor);
        self
    }

    /// Registers `name(req: Req) -> Result<Rsp, ActorError>`.
    pub fn handle_call<Req, Rsp, F>(&mut self, name: &str, f: F) -> &mut Self
    where
        Req: DeserializeOwned + Send + 'static,
        Rsp: Serialize + Send + 'static,
        F: for<'a> Fn(&'a mut A, &'a mut Context, Req) -> MethodFuture<'a, Rsp> + Send + Sync + 'static,
    {
        self.insert(MethodDescriptor::new(
            name,
            vec![ArgShape::typed::<Req>()],
            ReturnShape::ValueAndError,
            move |actor, ctx, args, serializer| {
                let pending = match take_typed::<Req>(args) {
                    Ok(req) => f(actor, ctx, req),
                    Err(e) => return Box::pin(future::ready(Err(e))),
                };
                Box::pin(async move { serializer.marshal(&pending.await?) })
            },
        ))
    }

    /// Registers `name(req: Req) -> Result<(), ActorError>`.
    pub fn handle<Req, F>(&mut self, name: &str, f: F) -> &mut Self
    where
        Req: DeserializeOwned + Send + 'static,
        F: for<'a> Fn(&'a mut A, &'a mut Context, Req) -> MethodFuture<'a, ()> + Send + Sync + 'static,
    {
        self.insert(MethodDescriptor::new(
            name,
            vec![ArgShape::typed::<Req>()],
            ReturnShape::ErrorOnly,
            move |actor, ctx, args, serializer| {
                let pending = match take_typed::<Req>(args) {
                    Ok(req) => f(actor, ctx, req),
                    Err(e) => return Box::pin(future::ready(Err(e))),
                };
                Box::pin(async move {
                    pending.await?;
                    serializer.marshal(&())
                })
            },
        ))
    }

    /// Registers a method taking the payload bytes as-is and replying with raw bytes.
    pub fn handle_raw_call<F>(&mut self, name: &str, f: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut A, &'a mut Context, Bytes) -> MethodFuture<'a, Bytes> + Send + Sync + 'static,
    {
        self.insert(MethodDescriptor::new(
            name,
            vec![ArgShape::RawBytes],
            ReturnShape::ValueAndError,
            move |actor, ctx, args, _| {
                let data = match take_raw(args) {
                    Ok(data) => data,
                    Err(e) => return Box::pin(future::ready(Err(e))),
                };
                f(actor, ctx, data)
            },
        ))
    }

    /// Registers a method taking the payload bytes as-is, replying with an error only.
    pub fn handle_raw<F>(&mut self, name: &str, f: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut A, &'a mut Context, Bytes) -> MethodFuture<'a, ()> + Send + Sync + 'static,
    {
        self.insert(MethodDescriptor::new(
            name,
            vec![ArgShape::RawBytes],
            ReturnShape::ErrorOnly,
            move |actor, ctx, args, serializer| {
                let pending = match take_raw(args) {
                    Ok(data) => f(actor, ctx, data),
                    Err(e) => return Box::pin(future::ready(Err(e))),
                };
                Box::pin(async move {
                    pending.await?;
                    serializer.marshal(&())
                })
            },
        ))
    }

    /// Registers a method without argument. Timers target these.
    pub fn handle_notify<F>(&mut self, name: &str, f: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut A, &'a mut Context) -> MethodFuture<'a, ()> + Send + Sync + 'static,
    {
        self.insert(MethodDescriptor::new(
            name,
            Vec::new(),
            ReturnShape::ErrorOnly,
            move |actor, ctx, _, serializer| {
                let pending = f(actor, ctx);
                Box::pin(async move {
                    pending.await?;
                    serializer.marshal(&())
                })
            },
        ))
    }

    /// Dispatches `msg` to its method on `actor`.
    ///
    /// Resolves the message's responder exactly once (with the reply or the error) and
    /// returns the invocation result to the mailbox for logging.
    pub async fn call(&self, actor: &mut A, ctx: &mut Context, mut msg: Message) -> Result<(), ActorError> {
        let responder = msg.take_responder();
        let method = msg.method.clone();
        let result = self.dispatch(actor, ctx, msg).await;

        if let Some(respond) = responder {
            let rsp = match &result {
                Ok(data) => RespondMessage::ok(data.clone()),
                Err(e) => RespondMessage::error(e.clone()),
            };
            if let Err(error) = respond(rsp) {
                warn!(actor = self.name, %method, %error, "respond failed");
            }
        }
        result.map(|_| ())
    }

    async fn dispatch(&self, actor: &mut A, ctx: &mut Context, msg: Message) -> Result<Bytes, ActorError> {
        let descriptor = self
            .methods
            .get(msg.method.as_str())
            .ok_or(ActorError::ActorNotMethod)?;
        let serializer = ctx.serializer();
        let args = descriptor.decode_args(&msg.data, serializer)?;
        debug!(actor = self.name, method = %msg.method, "invoke");

        ctx.set_message(msg);
        let result = (descriptor.invoke)(actor, ctx, args, serializer).await;
        ctx.clear_message();
        result
    }
}

impl<A> fmt::Debug for Router<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("name", &self.name)
            .field("methods", &self.methods.values().collect::<Vec<_>>())
            .finish()
    }
}

fn decode_as<T: DeserializeOwned + Send + 'static>(
    serializer: Serializer,
    data: &[u8],
) -> Result<Box<dyn Any + Send>, ActorError> {
    Ok(Box::new(serializer.unmarshal::<T>(data)?))
}

fn take_typed<T: 'static>(args: Vec<ArgValue>) -> Result<T, ActorError> {
    match args.into_iter().next() {
        Some(ArgValue::Typed(value)) => value
            .downcast::<T>()
            .map(|value| *value)
            .map_err(|_| ActorError::InvalidMessage),
        Some(ArgValue::Raw(_)) => Err(ActorError::InvalidMessage),
        None => Err(ActorError::ActorArgsNum),
    }
}

fn take_raw(args: Vec<ArgValue>) -> Result<Bytes, ActorError> {
    match args.into_iter().next() {
        Some(ArgValue::Raw(data)) => Ok(data),
        Some(ArgValue::Typed(_)) => Err(ActorError::InvalidMessage),
        None => Err(ActorError::ActorArgsNum),
    }
}

/// Process-wide cache of routers, one per actor type.
#[derive(Default)]
pub struct RouterHub {
    dict: DashMap<&'static str, Arc<dyn Any + Send + Sync>>,
}

impl RouterHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the router of `A`, building it on first use.
    pub fn get_or_build<A: Actor>(&self) -> Result<Arc<Router<A>>, ActorError> {
        let router = self
            .dict
            .entry(type_name::<A>())
            .or_insert_with(|| Arc::new(Router::<A>::build()) as Arc<dyn Any + Send + Sync>)
            .value()
            .clone();
        router
            .downcast::<Router<A>>()
            .map_err(|_| ActorError::ActorRouterIsNil)
    }

    /// Installs a hand-built router for `A`, replacing any cached one.
    pub fn set<A: Actor>(&self, router: Router<A>) {
        self.dict.insert(type_name::<A>(), Arc::new(router));
    }

    pub fn len(&self) -> usize {
        self.dict.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dict.is_empty()
    }
}

impl fmt::Debug for RouterHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.dict.iter().map(|entry| *entry.key()).collect();
        f.debug_struct("RouterHub").field("routers", &names).finish()
    }
}
