//! Decision endpoints.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use verdict_core::{BoxError, Logger};
use verdict_http::{BaseController, Request, Response, Route};

use crate::domain::{self, DecisionService};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Quality {
    pub id: String,
    pub name: String,
    pub importance: f64,
    pub probability: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProblemOption {
    pub id: String,
    pub name: String,
    pub pros: Vec<Quality>,
    pub cons: Vec<Quality>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Problem {
    pub id: String,
    pub name: String,
    pub options: Vec<ProblemOption>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionResult {
    pub options_rating: std::collections::BTreeMap<String, f64>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub id: String,
    pub problem_id: String,
    pub user_id: String,
    pub result: DecisionResult,
}

fn quality_to_domain(q: &Quality) -> domain::Quality {
    domain::Quality {
        id: q.id.clone(),
        name: q.name.clone(),
        importance: q.importance,
        probability: q.probability,
    }
}

fn problem_to_domain(p: &Problem) -> domain::Problem {
    domain::Problem {
        id: p.id.clone(),
        name: p.name.clone(),
        options: p
            .options
            .iter()
            .map(|o| domain::ProblemOption {
                id: o.id.clone(),
                name: o.name.clone(),
                pros: o.pros.iter().map(quality_to_domain).collect(),
                cons: o.cons.iter().map(quality_to_domain).collect(),
            })
            .collect(),
    }
}

fn decision_from_domain(d: &domain::Decision) -> Decision {
    Decision {
        id: d.id.clone(),
        problem_id: d.problem_id.clone(),
        user_id: d.user_id.clone(),
        result: DecisionResult {
            options_rating: d.result.options_rating.clone(),
        },
    }
}

pub struct DecisionController {
    base: BaseController,
    service: Arc<dyn DecisionService>,
}

impl DecisionController {
    pub fn new(logger: Arc<Logger>, service: Arc<dyn DecisionService>) -> Arc<Self> {
        Arc::new(Self {
            base: BaseController::new(logger),
            service,
        })
    }

    /// POST /users/:userId/decisions
    pub async fn make_decision(self: Arc<Self>, req: Request) -> Result<Response, BoxError> {
        let scope = req.scope().clone();
        let log = self
            .base
            .logger()
            .scoped()
            .component("decision")
            .method("make-decision")
            .with_scope(&scope);
        let user_id = self.base.user_id_var(&scope, &req, "userId")?;
        let problem: Problem = self.base.decode_request(&scope, &req)?;
        let decision = self
            .service
            .make_decision(&scope, &user_id, &problem_to_domain(&problem))
            .await?;
        log.debug("decision made");
        Ok(Response::ok().json(&decision_from_domain(&decision))?)
    }

    /// POST /guests/decisions
    pub async fn make_decision_guest(self: Arc<Self>, req: Request) -> Result<Response, BoxError> {
        let scope = req.scope().clone();
        let problem: Problem = self.base.decode_request(&scope, &req)?;
        let decision = self
            .service
            .make_decision(&scope, "", &problem_to_domain(&problem))
            .await?;
        Ok(Response::ok().json(&decision_from_domain(&decision))?)
    }
}

pub fn routes(controller: &Arc<DecisionController>, timeout: Duration) -> Vec<Route> {
    let guest = Arc::clone(controller);
    let user = Arc::clone(controller);
    vec![
        // non-authorized zone
        Route::post("/guests/decisions", move |req| {
            let c = Arc::clone(&guest);
            c.make_decision_guest(req)
        })
        .no_auth()
        .with_timeout(timeout),
        // authorized zone
        Route::post("/users/:userId/decisions", move |req| {
            let c = Arc::clone(&user);
            c.make_decision(req)
        })
        .with_timeout(timeout),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request as TransportRequest, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use verdict_core::{LogConfig, Logger};
    use verdict_http::{HttpConfig, Server};

    use crate::domain::WeightedDecisionService;

    fn test_server() -> Server {
        let logger = Arc::new(
            Logger::new(LogConfig {
                level: "error".into(),
                ..LogConfig::default()
            })
            .unwrap(),
        );
        let service = WeightedDecisionService::new(Arc::clone(&logger));
        let controller = DecisionController::new(Arc::clone(&logger), service);
        let mut server = Server::new(HttpConfig::default(), logger).unwrap();
        server.register_routes(routes(&controller, Duration::from_secs(10)));
        server
    }

    fn problem_body() -> Value {
        json!({
            "id": "p-1",
            "name": "which laptop",
            "options": [{
                "id": "o-1",
                "name": "the light one",
                "pros": [{"id": "q-1", "name": "battery", "importance": 2.0, "probability": 1.0}],
                "cons": [{"id": "q-2", "name": "price", "importance": 1.0, "probability": 1.0}]
            }]
        })
    }

    async fn send(server: &Server, request: TransportRequest<Body>) -> (StatusCode, Value) {
        let response = server.build_router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn guest_decision_rates_options() {
        let server = test_server();
        let request = TransportRequest::builder()
            .method("POST")
            .uri("/guests/decisions")
            .body(Body::from(problem_body().to_string()))
            .unwrap();
        let (status, body) = send(&server, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["problemId"], "p-1");
        assert_eq!(body["userId"], "");
        assert_eq!(body["result"]["optionsRating"]["o-1"], 2.0);
    }

    #[tokio::test]
    async fn user_decision_requires_token() {
        let server = test_server();
        let request = TransportRequest::builder()
            .method("POST")
            .uri("/users/7c7bb38c-5aca-4da5-b962-16c51c93c378/decisions")
            .body(Body::from(problem_body().to_string()))
            .unwrap();
        let (status, body) = send(&server, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "HTTP-037");
    }

    #[tokio::test]
    async fn user_decision_with_token() {
        let server = test_server();
        let request = TransportRequest::builder()
            .method("POST")
            .uri("/users/7c7bb38c-5aca-4da5-b962-16c51c93c378/decisions")
            .header("authorization", "Bearer tok-1")
            .body(Body::from(problem_body().to_string()))
            .unwrap();
        let (status, body) = send(&server, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["userId"], "7c7bb38c-5aca-4da5-b962-16c51c93c378");
    }

    #[tokio::test]
    async fn malformed_user_id_is_rejected() {
        let server = test_server();
        let request = TransportRequest::builder()
            .method("POST")
            .uri("/users/not-a-uuid/decisions")
            .header("authorization", "Bearer tok-1")
            .body(Body::from(problem_body().to_string()))
            .unwrap();
        let (status, body) = send(&server, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "HTTP-023");
    }

    #[tokio::test]
    async fn malformed_body_is_rejected() {
        let server = test_server();
        let request = TransportRequest::builder()
            .method("POST")
            .uri("/guests/decisions")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(&server, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "HTTP-002");
        assert_eq!(body["translationKey"], "errors.app.code.http.002");
    }

    #[tokio::test]
    async fn empty_problem_surfaces_domain_error() {
        let server = test_server();
        let request = TransportRequest::builder()
            .method("POST")
            .uri("/guests/decisions")
            .body(Body::from(json!({"id": "p-2", "name": "n"}).to_string()))
            .unwrap();
        let (status, body) = send(&server, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "DEC-001");
        assert_eq!(body["type"], "business");
    }
}
