//! Per-execution-unit structured logger.

use std::backtrace::Backtrace;
use std::error::Error as StdError;
use std::fmt;
use std::process;

use serde::Serialize;
use serde_json::Value;
use tracing::Level;

use crate::context::Scope;
use crate::error::AppError;
use crate::fields::FieldMap;
use crate::logging::Logger;

const FIELD_SERVICE: &str = "call.svc";
const FIELD_NODE: &str = "call.node";
const FIELD_COMPONENT: &str = "call.cmp";
const FIELD_METHOD: &str = "call.mth";
const FIELD_PROTOCOL: &str = "call.pr";
const FIELD_ERR_CODE: &str = "err-code";
const FIELD_ERR_TYPE: &str = "error-type";
const FIELD_ERROR: &str = "error";
const FIELD_ERR_STACK: &str = "err-stack";

/// A structured logger bound to one execution unit.
///
/// Not shared across concurrent units: each task owns its handle. To hand a
/// logger across a concurrency boundary, `clone()` it explicitly: the clone
/// carries a snapshot of the accumulated fields and is independent from
/// then on.
#[derive(Debug, Clone)]
pub struct ContextualLogger {
    level: Level,
    include_context: bool,
    include_service: bool,
    fields: FieldMap,
    error: Option<ErrorDetail>,
}

#[derive(Debug, Clone)]
struct ErrorDetail {
    /// Stack rendered by the error itself, when it carries one.
    stack: Option<String>,
}

impl ContextualLogger {
    pub(crate) fn new(logger: &Logger) -> Self {
        Self {
            level: logger.level(),
            include_context: logger.config().context,
            include_service: logger.config().service,
            fields: FieldMap::new(),
            error: None,
        }
    }

    pub fn component(self, name: impl Into<String>) -> Self {
        self.field(FIELD_COMPONENT, name.into())
    }

    pub fn method(self, name: impl Into<String>) -> Self {
        self.field(FIELD_METHOD, name.into())
    }

    pub fn protocol(self, name: impl Into<String>) -> Self {
        self.field(FIELD_PROTOCOL, name.into())
    }

    pub fn service(self, name: impl Into<String>) -> Self {
        if !self.include_service {
            return self;
        }
        self.field(FIELD_SERVICE, name.into())
    }

    pub fn node(self, name: impl Into<String>) -> Self {
        if !self.include_service {
            return self;
        }
        self.field(FIELD_NODE, name.into())
    }

    pub fn with_fields(mut self, fields: FieldMap) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Adds the request-context snapshot (caller kind, request id, username,
    /// session id) when context inclusion is enabled.
    ///
    /// Don't combine with [`ContextualLogger::with_error`] on an error that
    /// already captured its scope, as the context would be logged twice.
    pub fn with_scope(mut self, scope: &Scope) -> Self {
        if !self.include_context {
            return self;
        }
        if let Some(ctx) = scope.request() {
            if let Some(caller) = ctx.caller() {
                self.fields.insert("ctx.cl".into(), caller.as_str().into());
            }
            if !ctx.request_id().is_empty() {
                self.fields
                    .insert("ctx.rid".into(), ctx.request_id().into());
            }
            if !ctx.username().is_empty() {
                self.fields.insert("ctx.un".into(), ctx.username().into());
            }
            if !ctx.session_id().is_empty() {
                self.fields
                    .insert("ctx.sid".into(), ctx.session_id().into());
            }
        }
        self
    }

    /// Attaches an error. An [`AppError`] is decomposed into discrete
    /// fields (code, message, type, its field bag); any other error
    /// contributes its display form only.
    pub fn with_error(mut self, err: &(dyn StdError + 'static)) -> Self {
        if let Some(app) = AppError::find(err) {
            self.fields.insert(FIELD_ERR_CODE.into(), app.code().into());
            self.fields.insert(FIELD_ERROR.into(), app.message().into());
            self.fields
                .insert(FIELD_ERR_TYPE.into(), app.kind().as_str().into());
            for (k, v) in app.fields() {
                self.fields.insert(k.clone(), v.clone());
            }
            self.error = Some(ErrorDetail {
                stack: Some(app.message_with_stack()),
            });
        } else {
            self.fields
                .insert(FIELD_ERROR.into(), err.to_string().into());
            self.error = Some(ErrorDetail { stack: None });
        }
        self
    }

    /// Attaches a stack trace for the attached error: the error's own when
    /// it was built with one, else captured right here. No-op when no error
    /// is attached.
    pub fn with_stack(mut self) -> Self {
        if let Some(detail) = &self.error {
            let stack = detail
                .stack
                .clone()
                .unwrap_or_else(|| Backtrace::force_capture().to_string());
            self.fields.insert(FIELD_ERR_STACK.into(), stack.into());
        }
        self
    }

    /// Snapshot of the accumulated fields.
    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    pub fn trace(&self, msg: impl fmt::Display) {
        self.emit(Level::TRACE, msg.to_string());
    }

    pub fn debug(&self, msg: impl fmt::Display) {
        self.emit(Level::DEBUG, msg.to_string());
    }

    pub fn info(&self, msg: impl fmt::Display) {
        self.emit(Level::INFO, msg.to_string());
    }

    pub fn warn(&self, msg: impl fmt::Display) {
        self.emit(Level::WARN, msg.to_string());
    }

    pub fn error(&self, msg: impl fmt::Display) {
        self.emit(Level::ERROR, msg.to_string());
    }

    /// Emits at error level, then terminates the process.
    pub fn fatal(&self, msg: impl fmt::Display) -> ! {
        self.emit(Level::ERROR, msg.to_string());
        process::exit(1);
    }

    /// Serializes `value` into the entry only when the active level is
    /// trace, so the serialization cost is not paid otherwise. A `None`
    /// value is skipped; tuples serialize several values at once.
    pub fn trace_object<T: Serialize>(&self, label: &str, value: &T) {
        if !self.enabled(Level::TRACE) {
            return;
        }
        match serde_json::to_value(value) {
            Ok(Value::Null) | Err(_) => {}
            Ok(v) => self.emit(Level::TRACE, format!("{label}: {v}")),
        }
    }

    fn enabled(&self, level: Level) -> bool {
        level <= self.level
    }

    fn field(mut self, key: &str, value: String) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    fn emit(&self, level: Level, message: String) {
        if !self.enabled(level) {
            return;
        }
        let mut entry = self.fields.clone();
        entry.insert("message".into(), message.into());
        let rendered = Value::Object(entry).to_string();
        match level {
            Level::TRACE => tracing::trace!(target: "verdict", "{rendered}"),
            Level::DEBUG => tracing::debug!(target: "verdict", "{rendered}"),
            Level::INFO => tracing::info!(target: "verdict", "{rendered}"),
            Level::WARN => tracing::warn!(target: "verdict", "{rendered}"),
            Level::ERROR => tracing::error!(target: "verdict", "{rendered}"),
        }
    }
}
