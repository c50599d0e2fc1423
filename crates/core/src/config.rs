//! Configuration loading.
//!
//! Loads a YAML config file into a caller-supplied struct. The path comes
//! either from the builder directly or from an environment variable;
//! `RUST_LOG`-style overrides stay with the logging layer.

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::AppError;
use crate::kv;
use crate::logging::Logger;

pub const ERR_CODE_CONFIG_ROOT_ENV: &str = "CFG-001";
pub const ERR_CODE_CONFIG_PATH_EMPTY: &str = "CFG-002";
pub const ERR_CODE_CONFIG_NOT_FOUND: &str = "CFG-003";
pub const ERR_CODE_CONFIG_OPEN: &str = "CFG-004";
pub const ERR_CODE_CONFIG_PARSE: &str = "CFG-005";

/// The environment variable naming the service root directory is not set.
pub fn err_env_root_not_set(var: &str) -> AppError {
    AppError::builder(ERR_CODE_CONFIG_ROOT_ENV, "root path env variable isn't set")
        .with_field("var", var)
        .build()
}

/// Loads a config file into a target struct.
pub struct ConfigLoader {
    logger: Arc<Logger>,
    config_path: Option<PathBuf>,
    path_env: Option<String>,
}

impl ConfigLoader {
    pub fn new(logger: Arc<Logger>) -> Self {
        Self {
            logger,
            config_path: None,
            path_env: None,
        }
    }

    /// Explicit path to the config file.
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Environment variable the config path is taken from when no explicit
    /// path is given.
    pub fn with_path_from_env(mut self, var: impl Into<String>) -> Self {
        self.path_env = Some(var.into());
        self
    }

    pub fn load<T>(&self) -> Result<T, AppError>
    where
        T: DeserializeOwned + Serialize + fmt::Debug,
    {
        let path = self.resolve_path()?;
        let log = self
            .logger
            .scoped()
            .component("config-loader")
            .method("load")
            .with_fields(kv! { "cfg-path" => path.display().to_string() });

        if !path.exists() {
            return Err(AppError::builder(ERR_CODE_CONFIG_NOT_FOUND, "config file not found")
                .with_field("path", path.display().to_string())
                .build());
        }
        let raw = std::fs::read_to_string(&path).map_err(|e| {
            AppError::builder(ERR_CODE_CONFIG_OPEN, "config file open")
                .with_field("path", path.display().to_string())
                .wrap(e)
                .build()
        })?;
        let cfg: T = serde_yaml::from_str(&raw).map_err(|e| {
            AppError::builder(ERR_CODE_CONFIG_PARSE, "config file parse")
                .with_field("path", path.display().to_string())
                .wrap(e)
                .build()
        })?;

        log.debug("config file loaded");
        log.trace_object("config", &cfg);
        Ok(cfg)
    }

    fn resolve_path(&self) -> Result<PathBuf, AppError> {
        if let Some(path) = &self.config_path {
            return Ok(path.clone());
        }
        if let Some(var) = &self.path_env {
            let value = env::var(var).unwrap_or_default();
            if !value.is_empty() {
                return Ok(PathBuf::from(value));
            }
        }
        Err(AppError::new(ERR_CODE_CONFIG_PATH_EMPTY, "config path is empty"))
    }
}
