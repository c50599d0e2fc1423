//! Request/response trace logging.

use std::sync::Arc;

use axum::http::HeaderMap;
use serde_json::Value;

use verdict_core::{kv, Logger};

use crate::middleware::{Middleware, MiddlewareFuture, Next};
use crate::request::Request;

/// Logs the full request and response (headers and bodies included) at
/// trace level. Enabled through the server's `trace` config option; keep it
/// off outside debugging sessions.
#[derive(Debug)]
pub struct TraceMiddleware {
    logger: Arc<Logger>,
}

impl TraceMiddleware {
    pub fn new(logger: Arc<Logger>) -> Self {
        Self { logger }
    }
}

fn headers_json(headers: &HeaderMap) -> Value {
    let mut map = serde_json::Map::new();
    for (name, value) in headers.iter() {
        map.insert(
            name.to_string(),
            String::from_utf8_lossy(value.as_bytes()).into_owned().into(),
        );
    }
    Value::Object(map)
}

impl Middleware for TraceMiddleware {
    fn handle(&self, request: Request, next: Next) -> MiddlewareFuture {
        let logger = Arc::clone(&self.logger);
        Box::pin(async move {
            let scope = request.scope().clone();
            let body = request
                .body()
                .map(|b| String::from_utf8_lossy(b).into_owned())
                .unwrap_or_default();
            logger
                .scoped()
                .with_scope(&scope)
                .with_fields(kv! {
                    "method" => request.method.as_str(),
                    "url" => request.path(),
                    "headers" => headers_json(&request.headers),
                    "body" => body,
                })
                .trace("request");

            let result = next.run(request).await;

            if let Ok(response) = &result {
                logger
                    .scoped()
                    .with_scope(&scope)
                    .with_fields(kv! {
                        "status" => response.status().as_u16(),
                        "body" => response.body_preview(),
                    })
                    .trace("response");
            }
            result
        })
    }

    fn name(&self) -> &'static str {
        "TraceMiddleware"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, Method};
    use verdict_core::LogConfig;

    use crate::response::Response;

    #[tokio::test]
    async fn passes_request_through_unchanged() {
        let logger = Arc::new(
            Logger::new(LogConfig {
                level: "trace".into(),
                ..LogConfig::default()
            })
            .unwrap(),
        );
        let mut headers = HeaderMap::new();
        headers.insert("x-probe", HeaderValue::from_static("1"));
        let request = Request::new(Method::POST, "/t".parse().unwrap(), headers)
            .with_body(axum::body::Bytes::from_static(b"{\"a\":1}"));

        let next = Next::new(|req: Request| {
            Box::pin(async move {
                assert_eq!(req.header("x-probe"), Some("1"));
                assert_eq!(req.body().unwrap().as_ref(), b"{\"a\":1}");
                Ok(Response::ok().text("done"))
            }) as MiddlewareFuture
        });

        let response = TraceMiddleware::new(logger)
            .handle(request, next)
            .await
            .unwrap();
        assert_eq!(response.body_preview(), "done");
    }

    #[test]
    fn headers_render_as_object() {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("application/json"));
        let rendered = headers_json(&headers);
        assert_eq!(rendered["content-type"], "application/json");
    }
}
