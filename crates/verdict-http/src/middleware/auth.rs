//! Bearer token extraction for authenticated routes.

use verdict_core::{AppError, Scope};

use crate::error::err_auth_failed;
use crate::middleware::{Middleware, MiddlewareFuture, Next};
use crate::request::Request;

pub const HEADER_AUTHORIZATION: &str = "authorization";

/// Pulls the bearer token out of the `authorization` header. A missing or
/// malformed header is an authentication failure.
pub fn extract_bearer_token(scope: &Scope, request: &Request) -> Result<String, AppError> {
    let header = request.header(HEADER_AUTHORIZATION).unwrap_or_default();
    if header.is_empty() {
        return Err(err_auth_failed(scope));
    }
    let mut parts = header.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some(_scheme), Some(token)) if !token.is_empty() => Ok(token.to_string()),
        _ => Err(err_auth_failed(scope)),
    }
}

/// Guards authenticated routes: requires an attached request context,
/// extracts the bearer token and hands it to the handler via the request.
/// Token verification itself belongs to the identity adapter behind the
/// controller.
#[derive(Debug, Default)]
pub struct AuthMiddleware;

impl Middleware for AuthMiddleware {
    fn handle(&self, mut request: Request, next: Next) -> MiddlewareFuture {
        Box::pin(async move {
            let scope = request.scope().clone();
            scope.must_request()?;
            let token = extract_bearer_token(&scope, &request)?;
            request.set_bearer_token(token);
            next.run(request).await
        })
    }

    fn name(&self) -> &'static str {
        "AuthMiddleware"
    }
}
