//! Framework request passed through the dispatch chain.

use std::collections::HashMap;

use axum::body::Bytes;
use axum::http::{HeaderMap, Method, Uri};

use verdict_core::Scope;

/// One inbound HTTP request, carrying its call [`Scope`] once the context
/// middleware has attached it. The scope is exclusively owned by this
/// request; no two requests ever observe each other's context.
#[derive(Debug)]
pub struct Request {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    path_params: HashMap<String, String>,
    query_params: HashMap<String, String>,
    scope: Scope,
    bearer_token: Option<String>,
    body: Option<Bytes>,
}

impl Request {
    pub fn new(method: Method, uri: Uri, headers: HeaderMap) -> Self {
        Self {
            method,
            uri,
            headers,
            path_params: HashMap::new(),
            query_params: HashMap::new(),
            scope: Scope::root(),
            bearer_token: None,
            body: None,
        }
    }

    pub fn with_path_params(mut self, params: HashMap<String, String>) -> Self {
        self.path_params = params;
        self
    }

    pub fn with_query_params(mut self, params: HashMap<String, String>) -> Self {
        self.query_params = params;
        self
    }

    pub fn with_body(mut self, body: Bytes) -> Self {
        self.body = Some(body);
        self
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Header value as a string; `None` when absent or not valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name).map(String::as_str)
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(String::as_str)
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// The call scope. Empty until the context middleware has run.
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub(crate) fn set_scope(&mut self, scope: Scope) {
        self.scope = scope;
    }

    /// Bearer token extracted by the auth middleware, when the route is
    /// authenticated.
    pub fn bearer_token(&self) -> Option<&str> {
        self.bearer_token.as_deref()
    }

    pub(crate) fn set_bearer_token(&mut self, token: String) {
        self.bearer_token = Some(token);
    }
}
