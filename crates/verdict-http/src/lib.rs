//! HTTP dispatch chain for the verdict service toolkit.
//!
//! Per inbound request: middleware builds a request context and attaches it
//! to the call scope, optional timeout/auth middlewares wrap the handler,
//! the controller runs, and any failure is classified, logged and
//! serialized as a uniform error body. The routing library (axum) stays an
//! external collaborator behind [`server::Server`].

pub mod config;
pub mod controller;
pub mod error;
pub mod middleware;
pub mod request;
pub mod response;
pub mod server;


pub use config::{CorsConfig, HttpConfig};
pub use controller::BaseController;
pub use middleware::{Middleware, MiddlewarePipeline, Next};
pub use request::Request;
pub use response::{ErrorBody, Response};
pub use server::{Route, Server};

/// Boxed error type handlers and middlewares fail with.
pub use verdict_core::BoxError;

/// Future type returned by handlers.
pub type HandlerFuture = std::pin::Pin<
    Box<dyn std::future::Future<Output = Result<Response, BoxError>> + Send + 'static>,
>;

/// Type-erased request handler.
pub type BoxHandler = std::sync::Arc<dyn Fn(Request) -> HandlerFuture + Send + Sync>;
