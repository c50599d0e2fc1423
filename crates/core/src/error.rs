//! Application error taxonomy.
//!
//! Every failure in the system is an [`AppError`]: a stable code, a human
//! message, a classification, a serializable field bag, and optional
//! protocol status hints. Errors are assembled through the fluent
//! [`AppErrorBuilder`] and immutable once built. Layers wrap causes instead
//! of swallowing them; only the transport boundary decides how an error is
//! presented.

use std::any::Any;
use std::backtrace::Backtrace;
use std::error::Error as StdError;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::Scope;
use crate::fields::FieldMap;

/// Fixed code for errors normalized from a recovered panic.
pub const ERR_CODE_PANIC: &str = "PANIC-001";

/// Reserved field key the request-context snapshot is merged under.
pub const CONTEXT_FIELD_KEY: &str = "ctx";

/// Boxed error type flowing through handler and middleware chains.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Error classification, driving default status and client-visibility
/// policy at the transport boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// Client-caused and expected; surfaced with actionable detail.
    Business,
    /// Server-caused; opaque to callers.
    System,
    /// Normalized from a recovered panic; opaque to callers.
    Panic,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Business => "business",
            ErrorKind::System => "system",
            ErrorKind::Panic => "panic",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed, classified, field-carrying error value.
#[derive(Debug)]
pub struct AppError {
    code: String,
    message: String,
    kind: ErrorKind,
    fields: FieldMap,
    http_status: Option<u16>,
    rpc_status: Option<u32>,
    cause: Option<BoxError>,
    backtrace: Backtrace,
}

impl AppError {
    /// Starts building an error with the given stable code and message.
    pub fn builder(code: impl Into<String>, message: impl Into<String>) -> AppErrorBuilder {
        AppErrorBuilder {
            code: code.into(),
            message: message.into(),
            kind: ErrorKind::System,
            fields: FieldMap::new(),
            http_status: None,
            rpc_status: None,
            cause: None,
        }
    }

    /// Shorthand for `builder(code, message).build()`.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> AppError {
        Self::builder(code, message).build()
    }

    /// Normalizes a recovered panic payload into an [`ErrorKind::Panic`]
    /// error with the fixed [`ERR_CODE_PANIC`] code. Accepts whatever
    /// `catch_unwind` yields: a `&str`, a `String`, or anything else.
    pub fn from_panic(scope: &Scope, payload: Box<dyn Any + Send>) -> AppError {
        let cause: BoxError = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).into()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone().into()
        } else {
            "panic".into()
        };
        Self::builder(ERR_CODE_PANIC, "")
            .wrap(cause)
            .with_scope(scope)
            .panic()
            .build()
    }

    /// Finds the first [`AppError`] in an error chain, walking `source()`
    /// links starting at `err` itself.
    pub fn find<'a>(err: &'a (dyn StdError + 'static)) -> Option<&'a AppError> {
        let mut current: Option<&(dyn StdError + 'static)> = Some(err);
        while let Some(e) = current {
            if let Some(app) = e.downcast_ref::<AppError>() {
                return Some(app);
            }
            current = e.source();
        }
        None
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    /// The full message, with the wrapped cause's message embedded.
    pub fn message(&self) -> String {
        match &self.cause {
            Some(cause) if self.message.is_empty() => cause.to_string(),
            Some(cause) => format!("{}: {}", self.message, cause),
            None => self.message.clone(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    pub fn http_status(&self) -> Option<u16> {
        self.http_status
    }

    pub fn rpc_status(&self) -> Option<u32> {
        self.rpc_status
    }

    /// The message with the backtrace collected at build time appended.
    pub fn message_with_stack(&self) -> String {
        format!("{}: {}\n{}", self.code, self.message(), self.backtrace)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message())
    }
}

impl StdError for AppError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

/// Fluent builder for [`AppError`]. Operations may be applied in any order
/// and any number of times; [`AppErrorBuilder::build`] is terminal.
#[derive(Debug)]
pub struct AppErrorBuilder {
    code: String,
    message: String,
    kind: ErrorKind,
    fields: FieldMap,
    http_status: Option<u16>,
    rpc_status: Option<u32>,
    cause: Option<BoxError>,
}

impl AppErrorBuilder {
    /// Snapshots the scope's request context (if any) into the field bag
    /// under the reserved [`CONTEXT_FIELD_KEY`]. No-op when the scope
    /// carries no context.
    pub fn with_scope(mut self, scope: &Scope) -> Self {
        if let Some(ctx) = scope.request() {
            self.fields
                .insert(CONTEXT_FIELD_KEY.into(), Value::Object(ctx.to_flat_map()));
        }
        self
    }

    pub fn with_fields(mut self, fields: FieldMap) -> Self {
        self.fields.extend(fields);
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Hint for the HTTP boundary; 500 is assumed when unset.
    pub fn http_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }

    /// Hint for an RPC boundary.
    pub fn rpc_status(mut self, status: u32) -> Self {
        self.rpc_status = Some(status);
        self
    }

    pub fn business(self) -> Self {
        self.kind(ErrorKind::Business)
    }

    pub fn system(self) -> Self {
        self.kind(ErrorKind::System)
    }

    pub fn panic(self) -> Self {
        self.kind(ErrorKind::Panic)
    }

    pub fn kind(mut self, kind: ErrorKind) -> Self {
        self.kind = kind;
        self
    }

    /// Wraps a cause. The resulting error's message embeds the cause's
    /// message, and an [`AppError`] cause contributes its fields to the
    /// final bag.
    pub fn wrap(mut self, cause: impl Into<BoxError>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// Builds the terminal, immutable error value.
    ///
    /// Fields merge with fixed precedence: the wrapped cause's fields first,
    /// then the builder's own, so caller-supplied fields win on collision.
    pub fn build(self) -> AppError {
        let mut fields = FieldMap::new();
        if let Some(cause) = self.cause.as_deref() {
            let cause: &(dyn StdError + 'static) = cause;
            if let Some(app) = AppError::find(cause) {
                fields.extend(app.fields.clone());
            }
        }
        fields.extend(self.fields);
        AppError {
            code: self.code,
            message: self.message,
            kind: self.kind,
            fields,
            http_status: self.http_status,
            rpc_status: self.rpc_status,
            cause: self.cause,
            backtrace: Backtrace::force_capture(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RequestContext;
    use crate::kv;

    #[test]
    fn defaults_to_system() {
        let err = AppError::new("T-001", "boom");
        assert_eq!(err.kind(), ErrorKind::System);
        assert_eq!(err.code(), "T-001");
        assert_eq!(err.message(), "boom");
        assert_eq!(err.to_string(), "T-001: boom");
        assert!(err.http_status().is_none());
    }

    #[test]
    fn builder_sets_classification_and_statuses() {
        let err = AppError::builder("T-002", "nope")
            .business()
            .http_status(400)
            .rpc_status(3)
            .build();
        assert_eq!(err.kind(), ErrorKind::Business);
        assert_eq!(err.http_status(), Some(400));
        assert_eq!(err.rpc_status(), Some(3));
    }

    #[test]
    fn wrap_embeds_cause_message() {
        let cause = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let err = AppError::builder("T-003", "write failed").wrap(cause).build();
        assert_eq!(err.message(), "write failed: disk on fire");
        assert!(err.source().is_some());
    }

    #[test]
    fn wrap_with_empty_message_uses_cause_alone() {
        let err = AppError::builder("T-004", "").wrap("underlying").build();
        assert_eq!(err.message(), "underlying");
    }

    #[test]
    fn wrapped_app_error_fields_merge_caller_wins() {
        let inner = AppError::builder("T-005", "inner")
            .with_fields(kv! { "a" => 1, "shared" => "inner" })
            .build();
        let outer = AppError::builder("T-006", "outer")
            .with_fields(kv! { "b" => 2, "shared" => "outer" })
            .wrap(inner)
            .build();
        assert_eq!(outer.fields()["a"], 1);
        assert_eq!(outer.fields()["b"], 2);
        assert_eq!(outer.fields()["shared"], "outer");
    }

    #[test]
    fn fields_accumulate_across_calls() {
        let err = AppError::builder("T-007", "x")
            .with_field("first", 1)
            .with_fields(kv! { "second" => 2 })
            .with_field("first", 10)
            .build();
        assert_eq!(err.fields()["first"], 10);
        assert_eq!(err.fields()["second"], 2);
    }

    #[test]
    fn with_scope_snapshots_context() {
        let scope = RequestContext::new()
            .with_request_id("rid-9")
            .with_user("u1", "bob")
            .attach();
        let err = AppError::builder("T-008", "x").with_scope(&scope).build();
        let ctx = err.fields()[CONTEXT_FIELD_KEY].as_object().unwrap();
        assert_eq!(ctx["_ctx.rid"], "rid-9");
        assert_eq!(ctx["_ctx.un"], "bob");
    }

    #[test]
    fn with_scope_is_noop_without_context() {
        let err = AppError::builder("T-009", "x")
            .with_scope(&Scope::root())
            .build();
        assert!(!err.fields().contains_key(CONTEXT_FIELD_KEY));
    }

    #[test]
    fn from_panic_normalizes_str_payload() {
        let err = AppError::from_panic(&Scope::root(), Box::new("it broke"));
        assert_eq!(err.code(), ERR_CODE_PANIC);
        assert_eq!(err.kind(), ErrorKind::Panic);
        assert_eq!(err.message(), "it broke");
    }

    #[test]
    fn from_panic_normalizes_string_payload() {
        let err = AppError::from_panic(&Scope::root(), Box::new(String::from("oops")));
        assert_eq!(err.message(), "oops");
    }

    #[test]
    fn from_panic_normalizes_opaque_payload() {
        let err = AppError::from_panic(&Scope::root(), Box::new(42_u32));
        assert_eq!(err.message(), "panic");
        assert_eq!(err.kind(), ErrorKind::Panic);
    }

    #[test]
    fn find_walks_source_chain() {
        let app = AppError::new("T-010", "root cause");
        let wrapped: BoxError = Box::new(AppError::builder("T-011", "outer").wrap(app).build());
        let wrapped_ref: &(dyn StdError + 'static) = wrapped.as_ref();
        let found = AppError::find(wrapped_ref).unwrap();
        assert_eq!(found.code(), "T-011");

        let plain: BoxError = "not an app error".into();
        let plain_ref: &(dyn StdError + 'static) = plain.as_ref();
        assert!(AppError::find(plain_ref).is_none());
    }

    #[test]
    fn message_with_stack_prefixes_code() {
        let err = AppError::new("T-012", "boom");
        assert!(err.message_with_stack().starts_with("T-012: boom"));
    }
}
