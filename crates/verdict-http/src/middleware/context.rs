//! Context-establishing middleware.

use verdict_core::RequestContext;

use crate::middleware::{Middleware, MiddlewareFuture, Next};
use crate::request::Request;

pub const HEADER_REQUEST_ID: &str = "x-request-id";
pub const HEADER_X_REAL_IP: &str = "x-real-ip";
pub const HEADER_X_FORWARDER_FOR: &str = "x-forwarder-for";

/// Builds the request context for every inbound call and attaches it to the
/// request's scope before anything downstream runs: request id propagated
/// from `x-request-id` or freshly generated, client ip from `x-real-ip`
/// falling back to `x-forwarder-for`, caller tagged as http.
#[derive(Debug, Default)]
pub struct ContextMiddleware;

impl Middleware for ContextMiddleware {
    fn handle(&self, mut request: Request, next: Next) -> MiddlewareFuture {
        Box::pin(async move {
            let mut ctx = RequestContext::new().http();

            ctx = match request.header(HEADER_REQUEST_ID) {
                Some(rid) if !rid.is_empty() => ctx.with_request_id(rid),
                _ => ctx.with_new_request_id(),
            };

            let client_ip = request
                .header(HEADER_X_REAL_IP)
                .filter(|ip| !ip.is_empty())
                .or_else(|| request.header(HEADER_X_FORWARDER_FOR).filter(|ip| !ip.is_empty()))
                .map(str::to_string);
            if let Some(ip) = client_ip {
                ctx = ctx.with_client_ip(ip);
            }

            request.set_scope(ctx.attach());
            next.run(request).await
        })
    }

    fn name(&self) -> &'static str {
        "ContextMiddleware"
    }
}
