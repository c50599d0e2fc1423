//! Framework response and the uniform error body.

use std::error::Error as StdError;

use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use verdict_core::{AppError, FieldMap};

use crate::error::ERR_CODE_ENCODE_RESPONSE;

/// Response produced by handlers and middlewares; converted into the
/// transport representation only at the dispatch edge.
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: ResponseBody,
}

#[derive(Debug)]
pub enum ResponseBody {
    Empty,
    Text(String),
    Json(Value),
}

impl Response {
    pub fn ok() -> Self {
        Self::with_status(StatusCode::OK)
    }

    pub fn with_status(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: ResponseBody::Empty,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn json<T: Serialize>(mut self, payload: &T) -> Result<Self, AppError> {
        let value = serde_json::to_value(payload).map_err(|e| {
            AppError::builder(ERR_CODE_ENCODE_RESPONSE, "response encoding failed")
                .wrap(e)
                .build()
        })?;
        self.body = ResponseBody::Json(value);
        Ok(self)
    }

    pub fn json_value(mut self, value: Value) -> Self {
        self.body = ResponseBody::Json(value);
        self
    }

    pub fn text(mut self, content: impl Into<String>) -> Self {
        self.body = ResponseBody::Text(content.into());
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn body(&self) -> &ResponseBody {
        &self.body
    }

    /// Body rendered for trace logging.
    pub fn body_preview(&self) -> String {
        match &self.body {
            ResponseBody::Empty => String::new(),
            ResponseBody::Text(t) => t.clone(),
            ResponseBody::Json(v) => v.to_string(),
        }
    }

    /// Converts into the transport response.
    pub fn into_axum(self) -> axum::response::Response {
        let mut response = match self.body {
            ResponseBody::Empty => self.status.into_response(),
            ResponseBody::Text(t) => (self.status, t).into_response(),
            ResponseBody::Json(v) => {
                let mut rsp = (self.status, v.to_string()).into_response();
                rsp.headers_mut()
                    .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                rsp
            }
        };
        for (name, value) in self.headers.iter() {
            response.headers_mut().insert(name, value.clone());
        }
        response
    }
}

/// Error object returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// Stable code provided by the error producer.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub code: String,
    /// Error classification: panic, system or business.
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    pub message: String,
    pub translation_key: String,
    /// Additional info provided by the error producer.
    #[serde(default, skip_serializing_if = "FieldMap::is_empty")]
    pub details: FieldMap,
}

/// Translation key derived from an error code:
/// lower-cased, `-` replaced by `.`, prefixed `errors.app.code.`.
pub fn translation_key(code: &str) -> String {
    format!("errors.app.code.{}", code.to_lowercase().replace('-', "."))
}

impl ErrorBody {
    /// Classifies an error and derives the response status.
    ///
    /// An [`AppError`] anywhere in the chain yields the full body and its
    /// explicit status hint (500 when unset); anything else yields a
    /// message-only body with status 500. Stack traces and cause chains
    /// never leave the process this way.
    pub fn from_error(err: &(dyn StdError + 'static)) -> (StatusCode, ErrorBody) {
        if let Some(app) = AppError::find(err) {
            let status = app
                .http_status()
                .and_then(|s| StatusCode::from_u16(s).ok())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            let body = ErrorBody {
                code: app.code().to_string(),
                kind: app.kind().as_str().to_string(),
                message: app.message(),
                translation_key: translation_key(app.code()),
                details: app.fields().clone(),
            };
            (status, body)
        } else {
            let body = ErrorBody {
                code: String::new(),
                kind: String::new(),
                message: err.to_string(),
                translation_key: String::new(),
                details: FieldMap::new(),
            };
            (StatusCode::INTERNAL_SERVER_ERROR, body)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verdict_core::kv;

    #[test]
    fn translation_key_derivation() {
        assert_eq!(translation_key("HTTP-003"), "errors.app.code.http.003");
        assert_eq!(translation_key("PANIC-001"), "errors.app.code.panic.001");
    }

    #[test]
    fn app_error_with_status_hint() {
        let err = AppError::builder("HTTP-003", "invalid or empty URL parameter")
            .business()
            .with_fields(kv! { "var" => "userId" })
            .http_status(400)
            .build();
        let (status, body) = ErrorBody::from_error(&err);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.code, "HTTP-003");
        assert_eq!(body.kind, "business");
        assert_eq!(body.translation_key, "errors.app.code.http.003");
        assert_eq!(body.details["var"], "userId");
    }

    #[test]
    fn app_error_without_hint_is_500() {
        let err = AppError::new("SYS-001", "down");
        let (status, body) = ErrorBody::from_error(&err);
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.kind, "system");
    }

    #[test]
    fn plain_error_populates_message_only() {
        let err = std::io::Error::new(std::io::ErrorKind::Other, "broken pipe");
        let (status, body) = ErrorBody::from_error(&err);
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.message, "broken pipe");
        assert!(body.code.is_empty());
        assert!(body.kind.is_empty());
        assert!(body.translation_key.is_empty());
        assert!(body.details.is_empty());
    }

    #[test]
    fn error_body_serialization_shape() {
        let err = AppError::builder("X-001", "m")
            .business()
            .http_status(400)
            .build();
        let (_, body) = ErrorBody::from_error(&err);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["type"], "business");
        assert_eq!(json["translationKey"], "errors.app.code.x.001");
        assert!(json.get("details").is_none());
    }

    #[test]
    fn json_response_sets_content_type() {
        let rsp = Response::ok()
            .json(&serde_json::json!({"status": "OK"}))
            .unwrap()
            .into_axum();
        assert_eq!(rsp.status(), StatusCode::OK);
        assert_eq!(
            rsp.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }

    #[test]
    fn empty_response_has_no_body_preview() {
        let rsp = Response::with_status(StatusCode::SERVICE_UNAVAILABLE);
        assert!(rsp.body_preview().is_empty());
    }
}
