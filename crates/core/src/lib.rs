//! Core foundation for the verdict service toolkit.
//!
//! Everything a service endpoint builds on lives here: the per-call
//! [`RequestContext`] and its [`Scope`] attachment, the [`AppError`] taxonomy
//! with its fluent builder, the [`ContextualLogger`], plus the config loader
//! and service lifecycle seams.

pub mod config;
pub mod context;
pub mod error;
pub mod fields;
pub mod logging;
pub mod service;

pub use context::{CallerKind, RequestContext, Scope};
pub use error::{AppError, AppErrorBuilder, BoxError, ErrorKind};
pub use fields::FieldMap;
pub use logging::{ContextualLogger, LogConfig, LogFormat, Logger};
pub use service::{Adapter, Service};
