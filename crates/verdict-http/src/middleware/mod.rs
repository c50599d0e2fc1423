//! Middleware chain with a handle(request, next) pattern.
//!
//! Middlewares run in registration order around a fallible handler; any of
//! them may short-circuit with an error, which the dispatch edge turns into
//! the uniform error response.

mod auth;
mod context;
mod recovery;
mod timeout;
mod trace;

pub use auth::{extract_bearer_token, AuthMiddleware};
pub use context::{
    ContextMiddleware, HEADER_REQUEST_ID, HEADER_X_FORWARDER_FOR, HEADER_X_REAL_IP,
};
pub use recovery::RecoveryMiddleware;
pub use timeout::TimeoutMiddleware;
pub use trace::TraceMiddleware;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use verdict_core::BoxError;

use crate::request::Request;
use crate::response::Response;

/// Boxed future produced by middlewares and the chain continuation.
pub type MiddlewareFuture =
    Pin<Box<dyn Future<Output = Result<Response, BoxError>> + Send + 'static>>;

/// The rest of the middleware chain.
pub struct Next {
    handler: Box<dyn FnOnce(Request) -> MiddlewareFuture + Send>,
}

impl Next {
    pub fn new<F>(handler: F) -> Self
    where
        F: FnOnce(Request) -> MiddlewareFuture + Send + 'static,
    {
        Self {
            handler: Box::new(handler),
        }
    }

    /// Runs the rest of the chain with the given request.
    pub async fn run(self, request: Request) -> Result<Response, BoxError> {
        (self.handler)(request).await
    }
}

pub trait Middleware: Send + Sync + fmt::Debug {
    fn handle(&self, request: Request, next: Next) -> MiddlewareFuture;

    fn name(&self) -> &'static str {
        "Middleware"
    }
}

/// Ordered middleware chain around one handler.
#[derive(Debug, Clone, Default)]
pub struct MiddlewarePipeline {
    middleware: Vec<Arc<dyn Middleware>>,
}

impl MiddlewarePipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    pub fn add_boxed(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middleware.push(middleware);
        self
    }

    /// Appends another pipeline; this pipeline's middleware run first.
    pub fn extend(mut self, other: Self) -> Self {
        self.middleware.extend(other.middleware);
        self
    }

    /// Executes the chain, innermost being `handler`.
    pub async fn execute<F, Fut>(&self, request: Request, handler: F) -> Result<Response, BoxError>
    where
        F: FnOnce(Request) -> Fut + Send + 'static,
        Fut: Future<Output = Result<Response, BoxError>> + Send + 'static,
    {
        let mut chain = Box::new(move |req: Request| Box::pin(handler(req)) as MiddlewareFuture)
            as Box<dyn FnOnce(Request) -> MiddlewareFuture + Send>;

        for middleware in self.middleware.iter().rev() {
            let middleware = middleware.clone();
            let next_handler = chain;
            chain = Box::new(move |req: Request| {
                let next = Next::new(next_handler);
                middleware.handle(req, next)
            });
        }

        chain(request).await
    }

    pub fn len(&self) -> usize {
        self.middleware.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.middleware.iter().map(|m| m.name()).collect()
    }
}
