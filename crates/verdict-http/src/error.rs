//! HTTP error catalogue.
//!
//! Stable codes for every failure the dispatch chain and the base
//! controller can produce. Client-caused failures are business errors with
//! a 400 hint; the boundary falls back to 500 for everything else.

use axum::http::StatusCode;

use verdict_core::{AppError, BoxError, Scope};

pub const ERR_CODE_HTTP_SRV_LISTEN: &str = "HTTP-001";
pub const ERR_CODE_DECODE_REQUEST: &str = "HTTP-002";
pub const ERR_CODE_URL_VAR: &str = "HTTP-003";
pub const ERR_CODE_CURRENT_USER: &str = "HTTP-004";
pub const ERR_CODE_URL_VAR_EMPTY: &str = "HTTP-005";
pub const ERR_CODE_FORM_VAR_EMPTY: &str = "HTTP-006";
pub const ERR_CODE_FORM_VAR_NOT_INT: &str = "HTTP-007";
pub const ERR_CODE_FORM_VAR_NOT_TIME: &str = "HTTP-008";
pub const ERR_CODE_CURRENT_CLIENT: &str = "HTTP-019";
pub const ERR_CODE_FORM_VAR_NOT_FLOAT: &str = "HTTP-020";
pub const ERR_CODE_FORM_VAR_NOT_BOOL: &str = "HTTP-021";
pub const ERR_CODE_URL_VAR_INVALID_UUID: &str = "HTTP-023";
pub const ERR_CODE_CURRENT_PARTNER: &str = "HTTP-025";
pub const ERR_CODE_AUTH_FAILED: &str = "HTTP-037";
pub const ERR_CODE_ENCODE_RESPONSE: &str = "HTTP-038";

pub fn err_srv_listen(cause: impl Into<BoxError>) -> AppError {
    AppError::builder(ERR_CODE_HTTP_SRV_LISTEN, "")
        .wrap(cause)
        .build()
}

pub fn err_decode_request(scope: &Scope, cause: impl Into<BoxError>) -> AppError {
    AppError::builder(ERR_CODE_DECODE_REQUEST, "invalid request")
        .wrap(cause)
        .business()
        .with_scope(scope)
        .http_status(StatusCode::BAD_REQUEST.as_u16())
        .build()
}

pub fn err_url_var(scope: &Scope, var: &str) -> AppError {
    AppError::builder(ERR_CODE_URL_VAR, "invalid or empty URL parameter")
        .with_field("var", var)
        .business()
        .with_scope(scope)
        .http_status(StatusCode::BAD_REQUEST.as_u16())
        .build()
}

pub fn err_url_var_empty(scope: &Scope, var: &str) -> AppError {
    AppError::builder(ERR_CODE_URL_VAR_EMPTY, "URL parameter is empty")
        .business()
        .with_field("var", var)
        .with_scope(scope)
        .http_status(StatusCode::BAD_REQUEST.as_u16())
        .build()
}

pub fn err_url_var_invalid_uuid(scope: &Scope, var: &str) -> AppError {
    AppError::builder(ERR_CODE_URL_VAR_INVALID_UUID, "invalid UUID")
        .business()
        .with_field("var", var)
        .with_scope(scope)
        .http_status(StatusCode::BAD_REQUEST.as_u16())
        .build()
}

pub fn err_current_user(scope: &Scope) -> AppError {
    AppError::builder(ERR_CODE_CURRENT_USER, "cannot obtain current user")
        .business()
        .with_scope(scope)
        .http_status(StatusCode::BAD_REQUEST.as_u16())
        .build()
}

pub fn err_current_client(scope: &Scope) -> AppError {
    AppError::builder(ERR_CODE_CURRENT_CLIENT, "cannot obtain current client")
        .business()
        .with_scope(scope)
        .http_status(StatusCode::BAD_REQUEST.as_u16())
        .build()
}

pub fn err_current_partner(scope: &Scope) -> AppError {
    AppError::builder(ERR_CODE_CURRENT_PARTNER, "cannot obtain current partner")
        .business()
        .with_scope(scope)
        .http_status(StatusCode::BAD_REQUEST.as_u16())
        .build()
}

pub fn err_form_var_empty(scope: &Scope, var: &str) -> AppError {
    AppError::builder(ERR_CODE_FORM_VAR_EMPTY, "URL form value is empty")
        .business()
        .with_field("var", var)
        .with_scope(scope)
        .http_status(StatusCode::BAD_REQUEST.as_u16())
        .build()
}

pub fn err_form_var_not_int(scope: &Scope, var: &str, cause: impl Into<BoxError>) -> AppError {
    AppError::builder(ERR_CODE_FORM_VAR_NOT_INT, "form value must be of int type")
        .wrap(cause)
        .business()
        .with_field("var", var)
        .with_scope(scope)
        .http_status(StatusCode::BAD_REQUEST.as_u16())
        .build()
}

pub fn err_form_var_not_float(scope: &Scope, var: &str, cause: impl Into<BoxError>) -> AppError {
    AppError::builder(ERR_CODE_FORM_VAR_NOT_FLOAT, "form value must be of float type")
        .wrap(cause)
        .business()
        .with_field("var", var)
        .with_scope(scope)
        .http_status(StatusCode::BAD_REQUEST.as_u16())
        .build()
}

pub fn err_form_var_not_bool(scope: &Scope, var: &str, cause: impl Into<BoxError>) -> AppError {
    AppError::builder(ERR_CODE_FORM_VAR_NOT_BOOL, "form value must be of bool type")
        .wrap(cause)
        .business()
        .with_field("var", var)
        .with_scope(scope)
        .http_status(StatusCode::BAD_REQUEST.as_u16())
        .build()
}

pub fn err_form_var_not_time(scope: &Scope, var: &str, cause: impl Into<BoxError>) -> AppError {
    AppError::builder(
        ERR_CODE_FORM_VAR_NOT_TIME,
        "form value must be of time type in RFC-3339 format",
    )
    .wrap(cause)
    .business()
    .with_field("var", var)
    .with_scope(scope)
    .http_status(StatusCode::BAD_REQUEST.as_u16())
    .build()
}

pub fn err_auth_failed(scope: &Scope) -> AppError {
    AppError::builder(ERR_CODE_AUTH_FAILED, "authorization failed")
        .business()
        .with_scope(scope)
        .http_status(StatusCode::UNAUTHORIZED.as_u16())
        .build()
}
