//! Structured, context-aware logging.
//!
//! A [`Logger`] is constructed once at startup from a [`LogConfig`] and
//! passed by reference (dependency injection) to every component that needs
//! it; there is no ambient global. Each execution unit obtains its own
//! [`ContextualLogger`] via [`Logger::scoped`] and accumulates fields on it.

mod contextual;

pub use contextual::ContextualLogger;

use std::io;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::AppError;

/// The configured log level is not recognized.
pub const ERR_CODE_LOG_LEVEL: &str = "LOG-001";
/// The log subscriber could not be installed.
pub const ERR_CODE_LOG_INIT: &str = "LOG-002";

/// Output encoding for the process log sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Plain,
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Minimum emitted level: `trace`, `debug`, `info`, `warn` or `error`.
    pub level: String,
    pub format: LogFormat,
    /// Include the request-context snapshot in entries.
    pub context: bool,
    /// Include service/node identity in entries.
    pub service: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Plain,
            context: true,
            service: true,
        }
    }
}

/// Process-wide logger handle: holds the parsed configuration and hands out
/// per-execution-unit [`ContextualLogger`]s. The sink itself (installed by
/// [`Logger::init_subscriber`]) is append-only and safe for concurrent
/// writers; the scoped loggers are not shared.
#[derive(Debug)]
pub struct Logger {
    cfg: LogConfig,
    level: Level,
}

impl Logger {
    pub fn new(cfg: LogConfig) -> Result<Self, AppError> {
        let level = Level::from_str(&cfg.level).map_err(|e| {
            AppError::builder(ERR_CODE_LOG_LEVEL, "unknown log level")
                .with_field("level", cfg.level.clone())
                .wrap(e)
                .build()
        })?;
        Ok(Self { cfg, level })
    }

    pub fn config(&self) -> &LogConfig {
        &self.cfg
    }

    /// Installs the process log sink. Called once from `main`; environment
    /// filter directives (`RUST_LOG`) override the configured level.
    pub fn init_subscriber(&self) -> Result<(), AppError> {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.cfg.level))
            .map_err(|e| {
                AppError::builder(ERR_CODE_LOG_INIT, "invalid log filter")
                    .wrap(e)
                    .build()
            })?;

        let result = match self.cfg.format {
            LogFormat::Json => tracing_subscriber::registry()
                .with(filter)
                .with(fmt::Layer::new().with_writer(io::stdout).json())
                .try_init(),
            LogFormat::Plain => tracing_subscriber::registry()
                .with(filter)
                .with(fmt::Layer::new().with_writer(io::stdout))
                .try_init(),
        };
        result.map_err(|e| {
            AppError::builder(ERR_CODE_LOG_INIT, "log subscriber init failed")
                .wrap(e)
                .build()
        })
    }

    /// A fresh logger for one execution unit.
    pub fn scoped(&self) -> ContextualLogger {
        ContextualLogger::new(self)
    }

    pub(crate) fn level(&self) -> Level {
        self.level
    }
}
