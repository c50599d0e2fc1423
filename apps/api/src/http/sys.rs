//! System endpoints.

use std::sync::Arc;

use serde_json::json;

use verdict_core::BoxError;
use verdict_http::{Request, Response, Route};

pub struct SysController;

impl SysController {
    pub fn new() -> Arc<Self> {
        Arc::new(Self)
    }

    pub async fn health(self: Arc<Self>, _req: Request) -> Result<Response, BoxError> {
        Ok(Response::ok().json(&json!({ "status": "OK" }))?)
    }
}

pub fn routes(controller: &Arc<SysController>) -> Vec<Route> {
    let health = Arc::clone(controller);
    vec![Route::get("/health", move |req| {
        let c = Arc::clone(&health);
        c.health(req)
    })
    .no_auth()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request as TransportRequest, StatusCode};
    use tower::ServiceExt;
    use verdict_core::{LogConfig, Logger};
    use verdict_http::{HttpConfig, Server};

    #[tokio::test]
    async fn health_answers_ok_without_authentication() {
        let logger = Arc::new(Logger::new(LogConfig::default()).unwrap());
        let mut server = Server::new(HttpConfig::default(), logger).unwrap();
        server.register_routes(routes(&SysController::new()));

        let request = TransportRequest::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let response = server.build_router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "OK");
    }
}
