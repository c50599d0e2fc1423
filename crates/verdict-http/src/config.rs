//! HTTP server configuration surface.

use serde::{Deserialize, Serialize};

use verdict_core::AppError;

/// The server configuration failed validation.
pub const ERR_CODE_HTTP_CONFIG: &str = "HTTP-039";

/// Cross-origin resource sharing options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub debug: bool,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HttpConfig {
    pub port: u16,
    pub cors: Option<CorsConfig>,
    /// Enables request/response body logging at trace level.
    pub trace: bool,
    pub write_timeout_sec: u64,
    pub read_timeout_sec: u64,
    pub read_buffer_size_bytes: usize,
    pub write_buffer_size_bytes: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            cors: None,
            trace: false,
            write_timeout_sec: 30,
            read_timeout_sec: 30,
            read_buffer_size_bytes: 4096,
            write_buffer_size_bytes: 4096,
        }
    }
}

impl HttpConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.port == 0 {
            return Err(AppError::builder(ERR_CODE_HTTP_CONFIG, "port must be set").build());
        }
        if self.write_timeout_sec == 0 || self.read_timeout_sec == 0 {
            return Err(
                AppError::builder(ERR_CODE_HTTP_CONFIG, "timeouts must be greater than zero")
                    .build(),
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(HttpConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_zero_port() {
        let cfg = HttpConfig {
            port: 0,
            ..HttpConfig::default()
        };
        assert_eq!(cfg.validate().unwrap_err().code(), ERR_CODE_HTTP_CONFIG);
    }

    #[test]
    fn rejects_zero_timeout() {
        let cfg = HttpConfig {
            write_timeout_sec: 0,
            ..HttpConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn deserializes_camel_case_keys() {
        let raw = r#"
            {"port": 9000, "trace": true, "writeTimeoutSec": 15,
             "cors": {"allowedOrigins": ["https://app.example"], "debug": true}}
        "#;
        let cfg: HttpConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(cfg.port, 9000);
        assert!(cfg.trace);
        assert_eq!(cfg.write_timeout_sec, 15);
        assert_eq!(cfg.read_timeout_sec, 30);
        let cors = cfg.cors.unwrap();
        assert_eq!(cors.allowed_origins, vec!["https://app.example"]);
        assert!(cors.debug);
    }
}
