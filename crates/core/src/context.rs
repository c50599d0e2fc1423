//! Request context propagation.
//!
//! A [`RequestContext`] identifies one inbound call: who is calling, on
//! behalf of which user, from which address, with which request id. The
//! context is assembled by a mutator chain at the edge (middleware, job
//! runner, test harness), attached to a [`Scope`], and read-only for all
//! downstream code in that call. Every mutator consumes the value and
//! returns a new one, so a partially-built context can never be observed
//! by anyone else.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::AppError;
use crate::fields::FieldMap;

/// Metadata key carrying a serialized context across process boundaries.
pub const CONTEXT_METADATA_KEY: &str = "rq-bin";

/// No context is attached to the scope.
pub const ERR_CODE_NO_CONTEXT: &str = "CTX-001";
/// A flat map could not be decoded back into a context.
pub const ERR_CODE_CONTEXT_DECODE: &str = "CTX-002";

/// Who originated a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallerKind {
    Http,
    Job,
    Queue,
    Ws,
    Test,
}

impl CallerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallerKind::Http => "http",
            CallerKind::Job => "job",
            CallerKind::Queue => "queue",
            CallerKind::Ws => "ws",
            CallerKind::Test => "test",
        }
    }
}

/// Per-call identity and metadata bag.
///
/// The serde representation doubles as the flat-map / transport form, keyed
/// by the fixed `_ctx.*` names, so [`RequestContext::to_flat_map`] and
/// [`RequestContext::from_flat_map`] stay inverses by construction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestContext {
    #[serde(rename = "_ctx.rid", default, skip_serializing_if = "String::is_empty")]
    request_id: String,
    #[serde(rename = "_ctx.sid", default, skip_serializing_if = "String::is_empty")]
    session_id: String,
    #[serde(rename = "_ctx.uid", default, skip_serializing_if = "String::is_empty")]
    user_id: String,
    #[serde(rename = "_ctx.un", default, skip_serializing_if = "String::is_empty")]
    username: String,
    #[serde(rename = "_ctx.prj", default, skip_serializing_if = "String::is_empty")]
    project: String,
    #[serde(rename = "_ctx.app", default, skip_serializing_if = "String::is_empty")]
    app: String,
    #[serde(rename = "_ctx.cl", default, skip_serializing_if = "Option::is_none")]
    caller: Option<CallerKind>,
    #[serde(rename = "_ctx.clId", default, skip_serializing_if = "String::is_empty")]
    client_id: String,
    #[serde(rename = "_ctx.clIp", default, skip_serializing_if = "String::is_empty")]
    client_ip: String,
    #[serde(rename = "_ctx.rl", default, skip_serializing_if = "BTreeSet::is_empty")]
    roles: BTreeSet<String>,
    #[serde(rename = "_ctx.ptId", default, skip_serializing_if = "String::is_empty")]
    partner_id: String,
    #[serde(rename = "_ctx.lang", default, skip_serializing_if = "String::is_empty")]
    language: String,
    #[serde(rename = "_ctx.kv", default, skip_serializing_if = "FieldMap::is_empty")]
    extras: FieldMap,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    /// Assigns a freshly generated unique request id.
    pub fn with_new_request_id(self) -> Self {
        self.with_request_id(Uuid::new_v4().to_string())
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>, username: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self.username = username.into();
        self
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = project.into();
        self
    }

    pub fn with_app(mut self, app: impl Into<String>) -> Self {
        self.app = app.into();
        self
    }

    pub fn with_caller(mut self, caller: CallerKind) -> Self {
        self.caller = Some(caller);
        self
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    pub fn with_client_ip(mut self, client_ip: impl Into<String>) -> Self {
        self.client_ip = client_ip.into();
        self
    }

    pub fn with_partner_id(mut self, partner_id: impl Into<String>) -> Self {
        self.partner_id = partner_id.into();
        self
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extras.insert(key.into(), value.into());
        self
    }

    pub fn http(self) -> Self {
        self.with_caller(CallerKind::Http)
    }

    pub fn job(self) -> Self {
        self.with_caller(CallerKind::Job)
    }

    pub fn queue(self) -> Self {
        self.with_caller(CallerKind::Queue)
    }

    pub fn ws(self) -> Self {
        self.with_caller(CallerKind::Ws)
    }

    pub fn test(self) -> Self {
        self.with_caller(CallerKind::Test)
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn app(&self) -> &str {
        &self.app
    }

    pub fn caller(&self) -> Option<CallerKind> {
        self.caller
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_ip(&self) -> &str {
        &self.client_ip
    }

    pub fn roles(&self) -> &BTreeSet<String> {
        &self.roles
    }

    pub fn partner_id(&self) -> &str {
        &self.partner_id
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn extras(&self) -> &FieldMap {
        &self.extras
    }

    /// Attaches this context to a fresh call scope.
    pub fn attach(self) -> Scope {
        Scope::with_request(self)
    }

    /// Flattens the context into a map keyed by the fixed `_ctx.*` field
    /// names. Empty fields are omitted.
    pub fn to_flat_map(&self) -> FieldMap {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => FieldMap::new(),
        }
    }

    /// Inverse of [`RequestContext::to_flat_map`].
    pub fn from_flat_map(map: FieldMap) -> Result<Self, AppError> {
        serde_json::from_value(Value::Object(map)).map_err(|e| {
            AppError::builder(ERR_CODE_CONTEXT_DECODE, "invalid request context map")
                .wrap(e)
                .build()
        })
    }
}

/// One call's execution scope.
///
/// Exactly one [`RequestContext`] may be attached; absence is a
/// distinguishable state, not an empty default. A scope clones cheaply and
/// is handed down the call chain by value or reference.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    request: Option<Arc<RequestContext>>,
}

impl Scope {
    /// A scope with no context attached.
    pub fn root() -> Self {
        Self::default()
    }

    pub fn with_request(ctx: RequestContext) -> Self {
        Self {
            request: Some(Arc::new(ctx)),
        }
    }

    /// The attached context, if any.
    pub fn request(&self) -> Option<&RequestContext> {
        self.request.as_deref()
    }

    /// The attached context, failing loudly when absent. For code paths
    /// that require a populated context (e.g. authenticated endpoints).
    pub fn must_request(&self) -> Result<&RequestContext, AppError> {
        self.request.as_deref().ok_or_else(|| {
            AppError::builder(ERR_CODE_NO_CONTEXT, "no request context attached to call scope")
                .build()
        })
    }

    /// Reconstructs an equivalent context attached to a new, independently
    /// owned scope. Used when forking background work off a request.
    pub fn copy(&self) -> Scope {
        Scope {
            request: self.request.as_deref().cloned().map(Arc::new),
        }
    }

    /// Serializes the attached context into a transport metadata entry
    /// keyed [`CONTEXT_METADATA_KEY`]. Empty when no context is attached.
    pub fn to_metadata(&self) -> HashMap<String, String> {
        let mut md = HashMap::new();
        if let Some(ctx) = self.request() {
            if let Ok(encoded) = serde_json::to_string(ctx) {
                md.insert(CONTEXT_METADATA_KEY.to_string(), encoded);
            }
        }
        md
    }

    /// Decodes a context out of transport metadata and attaches it to a new
    /// scope. Yields an empty scope when the entry is absent or malformed.
    pub fn from_metadata(md: &HashMap<String, String>) -> Scope {
        md.get(CONTEXT_METADATA_KEY)
            .and_then(|raw| serde_json::from_str::<RequestContext>(raw).ok())
            .map(|ctx| ctx.attach())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_context() -> RequestContext {
        RequestContext::new()
            .with_request_id("rid-1")
            .with_session_id("sid-1")
            .with_user("uid-1", "alice")
            .with_project("verdict")
            .with_app("api")
            .http()
            .with_client_id("cl-1")
            .with_client_ip("1.2.3.4")
            .with_roles(["admin", "user"])
            .with_partner_id("pt-1")
            .with_language("en")
            .with_extra("tenant", "t-9")
    }

    #[test]
    fn mutators_are_value_semantics() {
        let base = RequestContext::new().with_request_id("a");
        let derived = base.clone().with_request_id("b");
        assert_eq!(base.request_id(), "a");
        assert_eq!(derived.request_id(), "b");
    }

    #[test]
    fn flat_map_round_trip_full() {
        let ctx = full_context();
        let restored = RequestContext::from_flat_map(ctx.to_flat_map()).unwrap();
        assert_eq!(ctx, restored);
    }

    #[test]
    fn flat_map_round_trip_empty() {
        let ctx = RequestContext::new();
        let map = ctx.to_flat_map();
        assert!(map.is_empty());
        let restored = RequestContext::from_flat_map(map).unwrap();
        assert_eq!(ctx, restored);
    }

    #[test]
    fn flat_map_round_trip_partial() {
        let ctx = RequestContext::new()
            .with_new_request_id()
            .with_client_ip("5.6.7.8")
            .job();
        let restored = RequestContext::from_flat_map(ctx.to_flat_map()).unwrap();
        assert_eq!(ctx, restored);
    }

    #[test]
    fn flat_map_uses_fixed_keys() {
        let map = full_context().to_flat_map();
        assert_eq!(map["_ctx.rid"], "rid-1");
        assert_eq!(map["_ctx.un"], "alice");
        assert_eq!(map["_ctx.cl"], "http");
        assert_eq!(map["_ctx.kv"]["tenant"], "t-9");
    }

    #[test]
    fn from_flat_map_rejects_garbage() {
        let mut map = FieldMap::new();
        map.insert("_ctx.rl".into(), serde_json::json!("not-a-list"));
        let err = RequestContext::from_flat_map(map).unwrap_err();
        assert_eq!(err.code(), ERR_CODE_CONTEXT_DECODE);
    }

    #[test]
    fn scope_distinguishes_absence() {
        let empty = Scope::root();
        assert!(empty.request().is_none());
        let err = empty.must_request().unwrap_err();
        assert_eq!(err.code(), ERR_CODE_NO_CONTEXT);

        let attached = RequestContext::new().with_request_id("r").attach();
        assert_eq!(attached.must_request().unwrap().request_id(), "r");
    }

    #[test]
    fn copy_is_independent() {
        let scope = full_context().attach();
        let copied = scope.copy();
        assert_eq!(scope.request(), copied.request());
        // Distinct allocations: dropping one must not affect the other.
        assert!(!std::ptr::eq(
            scope.request().unwrap(),
            copied.request().unwrap()
        ));
    }

    #[test]
    fn metadata_round_trip() {
        let scope = full_context().attach();
        let md = scope.to_metadata();
        assert!(md.contains_key(CONTEXT_METADATA_KEY));
        let restored = Scope::from_metadata(&md);
        assert_eq!(scope.request(), restored.request());
    }

    #[test]
    fn metadata_absent_yields_empty_scope() {
        let restored = Scope::from_metadata(&HashMap::new());
        assert!(restored.request().is_none());
    }
}
