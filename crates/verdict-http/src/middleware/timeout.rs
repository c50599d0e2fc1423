//! Request timeout middleware.

use std::time::Duration;

use axum::http::StatusCode;

use crate::middleware::{Middleware, MiddlewareFuture, Next};
use crate::request::Request;
use crate::response::Response;

/// Races the rest of the chain against a timer; on expiry the handler
/// future is dropped and an empty 503 is written.
///
/// Two caveats are inherent and accepted: a handler write that completed
/// just before expiry wins the race and is sent as-is, and the deadline is
/// not propagated into the handler's own downstream calls; those time out
/// only if they observe the same deadline themselves.
#[derive(Debug)]
pub struct TimeoutMiddleware {
    duration: Duration,
}

impl TimeoutMiddleware {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }

    pub fn from_secs(secs: u64) -> Self {
        Self::new(Duration::from_secs(secs))
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl Middleware for TimeoutMiddleware {
    fn handle(&self, request: Request, next: Next) -> MiddlewareFuture {
        let duration = self.duration;
        Box::pin(async move {
            match tokio::time::timeout(duration, next.run(request)).await {
                Ok(result) => result,
                Err(_) => Ok(Response::with_status(StatusCode::SERVICE_UNAVAILABLE)),
            }
        })
    }

    fn name(&self) -> &'static str {
        "TimeoutMiddleware"
    }
}
