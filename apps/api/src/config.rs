//! Service configuration.

use std::env;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use verdict_core::config::{err_env_root_not_set, ConfigLoader};
use verdict_core::{AppError, LogConfig, Logger};
use verdict_http::HttpConfig;

/// Environment variable naming the service root directory; `config.yml` is
/// expected inside it.
pub const ROOT_ENV: &str = "VERDICT_ROOT";

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log: LogConfig,
    pub http: HttpConfig,
}

pub fn load_config(logger: &Arc<Logger>) -> Result<Config, AppError> {
    let root = env::var(ROOT_ENV).unwrap_or_default();
    if root.is_empty() {
        return Err(err_env_root_not_set(ROOT_ENV));
    }
    let config_path = Path::new(&root).join("config.yml");
    ConfigLoader::new(Arc::clone(logger))
        .with_config_path(config_path)
        .load()
}
