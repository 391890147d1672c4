//! Route-supplied extension points.
//!
//! Routes loaded from the serialized document carry no code; handlers and
//! rewrite hooks are attached programmatically when the route set is built
//! in memory. All three traits are object-safe so route specs can hold them
//! as `Arc<dyn _>`.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use bytes::Bytes;
use std::future::Future;

use crate::error::HookError;
use crate::http::context::InboundContext;

/// Mutates the outbound proxy request before it is sent upstream.
///
/// The contract is header mutation only; the body is not captured and a
/// hook must not assume it can read it.
pub trait RewriteRequest: Send + Sync {
    fn rewrite(
        &self,
        outbound: &mut Request<Body>,
        inbound: &InboundContext,
    ) -> Result<(), HookError>;
}

/// Mutates the downstream response after the upstream response is received.
///
/// Runs after CORS reflection headers are written. Header mutation only;
/// the body streams through unbuffered.
pub trait RewriteResponse: Send + Sync {
    fn rewrite(
        &self,
        response: &mut Response<Body>,
        inbound: &InboundContext,
    ) -> Result<(), HookError>;
}

/// Computes a response body for routes with a handler target.
///
/// Synchronous handlers are just already-resolved futures; the dispatcher
/// awaits uniformly either way. Errors surface as 502 downstream.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, inbound: &InboundContext) -> Result<Bytes, HookError>;
}

/// Adapter so plain async closures can serve as handlers. The context is
/// passed by value so the closure's future owns everything it needs.
pub struct FnHandler<F>(pub F);

#[async_trait]
impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(InboundContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Bytes, HookError>> + Send,
{
    async fn handle(&self, inbound: &InboundContext) -> Result<Bytes, HookError> {
        (self.0)(inbound.clone()).await
    }
}

impl<F> RewriteRequest for F
where
    F: Fn(&mut Request<Body>, &InboundContext) -> Result<(), HookError> + Send + Sync,
{
    fn rewrite(
        &self,
        outbound: &mut Request<Body>,
        inbound: &InboundContext,
    ) -> Result<(), HookError> {
        self(outbound, inbound)
    }
}

impl<F> RewriteResponse for F
where
    F: Fn(&mut Response<Body>, &InboundContext) -> Result<(), HookError> + Send + Sync,
{
    fn rewrite(
        &self,
        response: &mut Response<Body>,
        inbound: &InboundContext,
    ) -> Result<(), HookError> {
        self(response, inbound)
    }
}
