//! Panic recovery boundary.

use futures::FutureExt;
use std::panic::AssertUnwindSafe;

use verdict_core::AppError;

use crate::middleware::{Middleware, MiddlewareFuture, Next};
use crate::request::Request;

/// The single recovery point of the dispatch chain: a panic anywhere in the
/// downstream middlewares or the handler is caught here, normalized into a
/// panic-kind [`AppError`] with the request context attached, and flows to
/// the dispatch edge like any other error. Handlers never recover
/// individually.
///
/// Registered right after [`ContextMiddleware`](crate::middleware::ContextMiddleware)
/// so the converted error can capture the populated scope.
#[derive(Debug, Default)]
pub struct RecoveryMiddleware;

impl Middleware for RecoveryMiddleware {
    fn handle(&self, request: Request, next: Next) -> MiddlewareFuture {
        Box::pin(async move {
            let scope = request.scope().clone();
            match AssertUnwindSafe(next.run(request)).catch_unwind().await {
                Ok(result) => result,
                Err(payload) => Err(AppError::from_panic(&scope, payload).into()),
            }
        })
    }

    fn name(&self) -> &'static str {
        "RecoveryMiddleware"
    }
}
