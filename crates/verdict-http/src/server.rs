//! HTTP server: routing contract, per-request dispatch, listen loop.
//!
//! Routes are declared as [`Route`] values and glued onto the underlying
//! router (axum). For every request the server composes the middleware
//! chain (context, recovery, optional trace/timeout/auth) around the
//! handler and serializes any failure as the uniform error body.

use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Path, Query};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, Uri};
use axum::routing::{delete, get, post, put};
use axum::Router;
use tokio::sync::watch;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

use verdict_core::{kv, AppError, Logger};

use crate::config::HttpConfig;
use crate::error::err_srv_listen;
use crate::middleware::{
    AuthMiddleware, ContextMiddleware, Middleware, MiddlewarePipeline, RecoveryMiddleware,
    TimeoutMiddleware, TraceMiddleware,
};
use crate::request::Request;
use crate::response::{ErrorBody, Response};
use crate::{BoxHandler, HandlerFuture};

const LISTEN_RETRY_BACKOFF: Duration = Duration::from_secs(5);

/// One routed endpoint. Routes require authentication unless marked
/// [`Route::no_auth`]; a timeout wraps the handler only when
/// [`Route::with_timeout`] is set.
pub struct Route {
    path: String,
    method: Method,
    handler: BoxHandler,
    auth: bool,
    timeout: Option<Duration>,
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("path", &self.path)
            .field("method", &self.method)
            .field("auth", &self.auth)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Route {
    fn new<F, Fut>(method: Method, path: &str, handler: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<Response, verdict_core::BoxError>>
            + Send
            + 'static,
    {
        Self {
            path: path.to_string(),
            method,
            handler: Arc::new(move |req| Box::pin(handler(req)) as HandlerFuture),
            auth: true,
            timeout: None,
        }
    }

    pub fn get<F, Fut>(path: &str, handler: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<Response, verdict_core::BoxError>>
            + Send
            + 'static,
    {
        Self::new(Method::GET, path, handler)
    }

    pub fn post<F, Fut>(path: &str, handler: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<Response, verdict_core::BoxError>>
            + Send
            + 'static,
    {
        Self::new(Method::POST, path, handler)
    }

    pub fn put<F, Fut>(path: &str, handler: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<Response, verdict_core::BoxError>>
            + Send
            + 'static,
    {
        Self::new(Method::PUT, path, handler)
    }

    pub fn delete<F, Fut>(path: &str, handler: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<Response, verdict_core::BoxError>>
            + Send
            + 'static,
    {
        Self::new(Method::DELETE, path, handler)
    }

    /// Marks the route as public: no token extraction runs.
    pub fn no_auth(mut self) -> Self {
        self.auth = false;
        self
    }

    /// Wraps the handler with a timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn method(&self) -> &Method {
        &self.method
    }
}

/// The HTTP server.
pub struct Server {
    cfg: HttpConfig,
    logger: Arc<Logger>,
    routes: Vec<Route>,
    app_middleware: MiddlewarePipeline,
    shutdown: watch::Sender<bool>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl Server {
    pub fn new(cfg: HttpConfig, logger: Arc<Logger>) -> Result<Self, AppError> {
        cfg.validate()?;
        let (shutdown, _) = watch::channel(false);
        Ok(Self {
            cfg,
            logger,
            routes: Vec::new(),
            app_middleware: MiddlewarePipeline::new(),
            shutdown,
            handle: None,
        })
    }

    pub fn config(&self) -> &HttpConfig {
        &self.cfg
    }

    /// Appends an application middleware. It runs after context and
    /// recovery, before any per-route timeout/auth.
    pub fn use_middleware<M: Middleware + 'static>(&mut self, middleware: M) -> &mut Self {
        self.app_middleware = std::mem::take(&mut self.app_middleware).add(middleware);
        self
    }

    pub fn register_routes(&mut self, routes: Vec<Route>) -> &mut Self {
        self.routes.extend(routes);
        self
    }

    /// The chain composed around one route's handler. Context attachment
    /// strictly precedes everything else; recovery sits directly inside it
    /// so a converted panic can capture the populated scope.
    pub(crate) fn route_pipeline(&self, route: &Route) -> MiddlewarePipeline {
        let mut pipeline = MiddlewarePipeline::new()
            .add(ContextMiddleware)
            .add(RecoveryMiddleware);
        if self.cfg.trace {
            pipeline = pipeline.add(TraceMiddleware::new(Arc::clone(&self.logger)));
        }
        pipeline = pipeline.extend(self.app_middleware.clone());
        if let Some(timeout) = route.timeout {
            pipeline = pipeline.add(TimeoutMiddleware::new(timeout));
        }
        if route.auth {
            pipeline = pipeline.add(AuthMiddleware);
        }
        pipeline
    }

    /// Builds the transport router with all registered routes and CORS.
    pub fn build_router(&self) -> Router {
        let mut router = Router::new();
        for route in &self.routes {
            let logger = Arc::clone(&self.logger);
            let pipeline = self.route_pipeline(route);
            let handler = route.handler.clone();

            let endpoint = move |method: Method,
                                 uri: Uri,
                                 Path(path_params): Path<HashMap<String, String>>,
                                 query: Option<Query<HashMap<String, String>>>,
                                 headers: HeaderMap,
                                 body: Bytes| {
                let logger = Arc::clone(&logger);
                let pipeline = pipeline.clone();
                let handler = handler.clone();
                async move {
                    let request = Request::new(method, uri, headers)
                        .with_path_params(path_params)
                        .with_query_params(query.map(|Query(q)| q).unwrap_or_default())
                        .with_body(body);
                    match pipeline.execute(request, move |req| handler(req)).await {
                        Ok(response) => response.into_axum(),
                        Err(err) => {
                            let err: &(dyn StdError + 'static) = err.as_ref();
                            error_response(&logger, err).into_axum()
                        }
                    }
                }
            };

            let method_router = match route.method {
                Method::GET => get(endpoint),
                Method::POST => post(endpoint),
                Method::PUT => put(endpoint),
                Method::DELETE => delete(endpoint),
                _ => axum::routing::any(endpoint),
            };
            router = router.route(&route.path, method_router);
        }
        router.layer(self.cors_layer())
    }

    fn cors_layer(&self) -> CorsLayer {
        match &self.cfg.cors {
            None => CorsLayer::new().allow_credentials(true),
            Some(cors) => {
                if cors.debug {
                    self.logger
                        .scoped()
                        .component("server")
                        .method("cors")
                        .trace_object("cors", cors);
                }
                let origins: Vec<HeaderValue> = cors
                    .allowed_origins
                    .iter()
                    .filter_map(|o| o.parse().ok())
                    .collect();
                let methods: Vec<Method> = cors
                    .allowed_methods
                    .iter()
                    .filter_map(|m| m.parse().ok())
                    .collect();
                let headers: Vec<HeaderName> = cors
                    .allowed_headers
                    .iter()
                    .filter_map(|h| h.parse().ok())
                    .collect();
                CorsLayer::new()
                    .allow_origin(AllowOrigin::list(origins))
                    .allow_methods(AllowMethods::list(methods))
                    .allow_headers(AllowHeaders::list(headers))
                    .allow_credentials(true)
            }
        }
    }

    /// Starts the single long-lived accept loop in the background. The loop
    /// retries bind/serve with a fixed backoff on unexpected failure and
    /// terminates only on the shutdown signal.
    pub fn listen(&mut self) {
        let router = self.build_router();
        let addr = format!("0.0.0.0:{}", self.cfg.port);
        let logger = Arc::clone(&self.logger);
        let shutdown = self.shutdown.clone();
        let cfg = self.cfg.clone();

        let handle = tokio::spawn(async move {
            let log = logger
                .scoped()
                .protocol("http")
                .component("server")
                .method("listen")
                .with_fields(kv! {
                    "url" => addr.clone(),
                    "read-timeout-sec" => cfg.read_timeout_sec,
                    "write-timeout-sec" => cfg.write_timeout_sec,
                    "read-buffer-size-bytes" => cfg.read_buffer_size_bytes,
                    "write-buffer-size-bytes" => cfg.write_buffer_size_bytes,
                });
            log.info("start listening");

            loop {
                if *shutdown.borrow() {
                    log.debug("server closed");
                    break;
                }

                let listener = match tokio::net::TcpListener::bind(&addr).await {
                    Ok(listener) => listener,
                    Err(e) => {
                        log.clone()
                            .with_error(&err_srv_listen(e))
                            .with_stack()
                            .error("bind failed");
                        if backoff_or_shutdown(&shutdown).await {
                            log.debug("server closed");
                            break;
                        }
                        continue;
                    }
                };

                let mut rx = shutdown.subscribe();
                let graceful = async move {
                    while !*rx.borrow_and_update() {
                        if rx.changed().await.is_err() {
                            break;
                        }
                    }
                };

                match axum::serve(listener, router.clone().into_make_service())
                    .with_graceful_shutdown(graceful)
                    .await
                {
                    Ok(()) => {
                        log.debug("server closed");
                        break;
                    }
                    Err(e) => {
                        log.clone()
                            .with_error(&err_srv_listen(e))
                            .with_stack()
                            .error("serve failed");
                        if backoff_or_shutdown(&shutdown).await {
                            log.debug("server closed");
                            break;
                        }
                    }
                }
            }
        });
        self.handle = Some(handle);
    }

    /// Signals the listen loop to stop accepting and drain.
    pub fn close(&mut self) {
        let _ = self.shutdown.send(true);
    }

    /// Waits for the listen loop to finish after [`Server::close`].
    pub async fn closed(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

/// Sleeps through the retry backoff; true when shutdown was requested.
async fn backoff_or_shutdown(shutdown: &watch::Sender<bool>) -> bool {
    let mut rx = shutdown.subscribe();
    if *rx.borrow_and_update() {
        return true;
    }
    tokio::select! {
        _ = tokio::time::sleep(LISTEN_RETRY_BACKOFF) => *shutdown.borrow(),
        _ = rx.changed() => true,
    }
}

/// The uniform error edge: logs the failure with full context and stack,
/// then shapes the client-facing body. Only this point decides the final
/// status; no intermediate layer writes a response.
pub(crate) fn error_response(
    logger: &Arc<Logger>,
    err: &(dyn StdError + 'static),
) -> Response {
    logger
        .scoped()
        .component("api")
        .protocol("rest")
        .with_error(err)
        .with_stack()
        .error(err.to_string());
    let (status, body) = ErrorBody::from_error(err);
    match Response::with_status(status).json(&body) {
        Ok(response) => response,
        Err(_) => Response::with_status(status),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verdict_core::LogConfig;

    fn logger() -> Arc<Logger> {
        Arc::new(Logger::new(LogConfig::default()).unwrap())
    }

    fn server(cfg: HttpConfig) -> Server {
        Server::new(cfg, logger()).unwrap()
    }

    async fn noop(_req: Request) -> Result<Response, verdict_core::BoxError> {
        Ok(Response::ok())
    }

    #[test]
    fn rejects_invalid_config() {
        let cfg = HttpConfig {
            port: 0,
            ..HttpConfig::default()
        };
        assert!(Server::new(cfg, logger()).is_err());
    }

    #[test]
    fn pipeline_for_public_route() {
        let srv = server(HttpConfig::default());
        let route = Route::get("/health", noop).no_auth();
        let names = srv.route_pipeline(&route).names();
        assert_eq!(names, ["ContextMiddleware", "RecoveryMiddleware"]);
    }

    #[test]
    fn pipeline_for_authenticated_route_with_timeout() {
        let srv = server(HttpConfig {
            trace: true,
            ..HttpConfig::default()
        });
        let route = Route::post("/users/:userId/decisions", noop)
            .with_timeout(Duration::from_secs(10));
        let names = srv.route_pipeline(&route).names();
        assert_eq!(
            names,
            [
                "ContextMiddleware",
                "RecoveryMiddleware",
                "TraceMiddleware",
                "TimeoutMiddleware",
                "AuthMiddleware"
            ]
        );
    }

    #[test]
    fn app_middleware_sits_between_recovery_and_route_guards() {
        #[derive(Debug)]
        struct Custom;
        impl Middleware for Custom {
            fn handle(
                &self,
                request: Request,
                next: crate::middleware::Next,
            ) -> crate::middleware::MiddlewareFuture {
                Box::pin(next.run(request))
            }
            fn name(&self) -> &'static str {
                "Custom"
            }
        }

        let mut srv = server(HttpConfig::default());
        srv.use_middleware(Custom);
        let route = Route::get("/x", noop);
        let names = srv.route_pipeline(&route).names();
        assert_eq!(
            names,
            ["ContextMiddleware", "RecoveryMiddleware", "Custom", "AuthMiddleware"]
        );
    }

    #[test]
    fn route_markers() {
        let route = Route::delete("/x", noop)
            .no_auth()
            .with_timeout(Duration::from_secs(3));
        assert_eq!(route.path(), "/x");
        assert_eq!(route.method(), &Method::DELETE);
        assert!(!route.auth);
        assert_eq!(route.timeout, Some(Duration::from_secs(3)));
    }
}
