//! Base controller helpers.
//!
//! Typed accessors for path and form parameters plus authorization
//! predicates. Concrete controllers embed [`BaseController`] and stay thin:
//! parse, delegate to the domain service, respond.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use verdict_core::{AppError, Logger, Scope};

use crate::error::{
    err_current_client, err_current_partner, err_current_user, err_decode_request,
    err_form_var_empty, err_form_var_not_bool, err_form_var_not_float, err_form_var_not_int,
    err_form_var_not_time, err_url_var, err_url_var_empty, err_url_var_invalid_uuid,
};
use crate::middleware::extract_bearer_token;
use crate::request::Request;

/// Usable in a URL wherever a user/client/partner id is expected; resolved
/// against the session context.
pub const ME: &str = "me";

#[derive(Debug, Clone)]
pub struct BaseController {
    logger: Arc<Logger>,
}

impl BaseController {
    pub fn new(logger: Arc<Logger>) -> Self {
        Self { logger }
    }

    pub fn logger(&self) -> &Arc<Logger> {
        &self.logger
    }

    /// Path parameter by name.
    pub fn var(
        &self,
        scope: &Scope,
        request: &Request,
        name: &str,
        allow_empty: bool,
    ) -> Result<String, AppError> {
        match request.path_param(name) {
            Some(value) => {
                if !allow_empty && value.is_empty() {
                    return Err(err_url_var_empty(scope, name));
                }
                Ok(value.to_string())
            }
            None => Err(err_url_var(scope, name)),
        }
    }

    /// Path parameter validated as a UUID.
    pub fn var_uuid(
        &self,
        scope: &Scope,
        request: &Request,
        name: &str,
        allow_empty: bool,
    ) -> Result<String, AppError> {
        let value = self.var(scope, request, name, allow_empty)?;
        if allow_empty && value.is_empty() {
            return Ok(value);
        }
        Uuid::parse_str(&value).map_err(|_| err_url_var_invalid_uuid(scope, name))?;
        Ok(value)
    }

    /// User id path parameter; the literal `me` resolves to the current
    /// user, anything else must be a UUID.
    pub fn user_id_var(
        &self,
        scope: &Scope,
        request: &Request,
        name: &str,
    ) -> Result<String, AppError> {
        let value = self.var(scope, request, name, false)?;
        if value == ME {
            let (user_id, _) = self.current_user(scope)?;
            return Ok(user_id);
        }
        Uuid::parse_str(&value).map_err(|_| err_url_var_invalid_uuid(scope, &value))?;
        Ok(value)
    }

    pub fn username_var(
        &self,
        scope: &Scope,
        request: &Request,
        name: &str,
    ) -> Result<String, AppError> {
        let value = self.var(scope, request, name, false)?;
        if value == ME {
            let (_, username) = self.current_user(scope)?;
            return Ok(username);
        }
        Ok(value)
    }

    pub fn client_id_var(
        &self,
        scope: &Scope,
        request: &Request,
        name: &str,
    ) -> Result<String, AppError> {
        let value = self.var(scope, request, name, false)?;
        if value == ME {
            return self.must_current_client(scope);
        }
        Uuid::parse_str(&value).map_err(|_| err_url_var_invalid_uuid(scope, &value))?;
        Ok(value)
    }

    pub fn partner_id_var(
        &self,
        scope: &Scope,
        request: &Request,
        name: &str,
    ) -> Result<String, AppError> {
        let value = self.var(scope, request, name, false)?;
        if value == ME {
            return self.must_current_partner(scope);
        }
        Uuid::parse_str(&value).map_err(|_| err_url_var_invalid_uuid(scope, &value))?;
        Ok(value)
    }

    /// Form (query) value by name. A missing value counts as empty.
    pub fn form_val(
        &self,
        scope: &Scope,
        request: &Request,
        name: &str,
        allow_empty: bool,
    ) -> Result<String, AppError> {
        let value = request.query_param(name).unwrap_or_default();
        if !allow_empty && value.is_empty() {
            return Err(err_form_var_empty(scope, name));
        }
        Ok(value.to_string())
    }

    pub fn form_val_uuid(
        &self,
        scope: &Scope,
        request: &Request,
        name: &str,
        allow_empty: bool,
    ) -> Result<String, AppError> {
        let value = self.form_val(scope, request, name, allow_empty)?;
        if allow_empty && value.is_empty() {
            return Ok(value);
        }
        Uuid::parse_str(&value).map_err(|_| err_url_var_invalid_uuid(scope, name))?;
        Ok(value)
    }

    pub fn form_val_int(
        &self,
        scope: &Scope,
        request: &Request,
        name: &str,
        allow_empty: bool,
    ) -> Result<Option<i64>, AppError> {
        let value = self.form_val(scope, request, name, allow_empty)?;
        if allow_empty && value.is_empty() {
            return Ok(None);
        }
        value
            .parse::<i64>()
            .map(Some)
            .map_err(|e| err_form_var_not_int(scope, name, e))
    }

    pub fn form_val_float(
        &self,
        scope: &Scope,
        request: &Request,
        name: &str,
        allow_empty: bool,
    ) -> Result<Option<f64>, AppError> {
        let value = self.form_val(scope, request, name, allow_empty)?;
        if allow_empty && value.is_empty() {
            return Ok(None);
        }
        value
            .parse::<f64>()
            .map(Some)
            .map_err(|e| err_form_var_not_float(scope, name, e))
    }

    pub fn form_val_bool(
        &self,
        scope: &Scope,
        request: &Request,
        name: &str,
        allow_empty: bool,
    ) -> Result<Option<bool>, AppError> {
        let value = self.form_val(scope, request, name, allow_empty)?;
        if allow_empty && value.is_empty() {
            return Ok(None);
        }
        match value.to_ascii_lowercase().as_str() {
            "1" | "t" | "true" => Ok(Some(true)),
            "0" | "f" | "false" => Ok(Some(false)),
            other => Err(err_form_var_not_bool(
                scope,
                name,
                format!("invalid bool literal: {other}"),
            )),
        }
    }

    /// Form value parsed as RFC-3339 time, normalized to UTC.
    pub fn form_val_time(
        &self,
        scope: &Scope,
        request: &Request,
        name: &str,
        allow_empty: bool,
    ) -> Result<Option<DateTime<Utc>>, AppError> {
        let value = self.form_val(scope, request, name, allow_empty)?;
        if allow_empty && value.is_empty() {
            return Ok(None);
        }
        DateTime::parse_from_rfc3339(&value)
            .map(|t| Some(t.with_timezone(&Utc)))
            .map_err(|e| err_form_var_not_time(scope, name, e))
    }

    /// Decodes the JSON request body.
    pub fn decode_request<T: DeserializeOwned>(
        &self,
        scope: &Scope,
        request: &Request,
    ) -> Result<T, AppError> {
        let body = request.body().map(|b| b.as_ref()).unwrap_or_default();
        serde_json::from_slice(body).map_err(|e| err_decode_request(scope, e))
    }

    /// Current user id and username, both required.
    pub fn current_user(&self, scope: &Scope) -> Result<(String, String), AppError> {
        match scope.request() {
            Some(ctx) if !ctx.user_id().is_empty() && !ctx.username().is_empty() => {
                Ok((ctx.user_id().to_string(), ctx.username().to_string()))
            }
            _ => Err(err_current_user(scope)),
        }
    }

    /// Current client id, empty when absent.
    pub fn current_client(&self, scope: &Scope) -> String {
        self.must_current_client(scope).unwrap_or_default()
    }

    pub fn must_current_client(&self, scope: &Scope) -> Result<String, AppError> {
        match scope.request() {
            Some(ctx) if !ctx.client_id().is_empty() => Ok(ctx.client_id().to_string()),
            _ => Err(err_current_client(scope)),
        }
    }

    /// Current partner id, empty when absent.
    pub fn current_partner(&self, scope: &Scope) -> String {
        self.must_current_partner(scope).unwrap_or_default()
    }

    pub fn must_current_partner(&self, scope: &Scope) -> Result<String, AppError> {
        match scope.request() {
            Some(ctx) if !ctx.partner_id().is_empty() => Ok(ctx.partner_id().to_string()),
            _ => Err(err_current_partner(scope)),
        }
    }

    /// True when the current user requests their own data.
    pub fn my_user(&self, scope: &Scope, request: &Request) -> Result<bool, AppError> {
        let (current, _) = self.current_user(scope)?;
        Ok(match self.user_id_var(scope, request, "userId") {
            Ok(user_id) => current == user_id,
            Err(_) => false,
        })
    }

    /// True when a client requests their own profile.
    pub fn my_client_profile(&self, scope: &Scope, request: &Request) -> Result<bool, AppError> {
        let current = self.current_client(scope);
        Ok(match self.client_id_var(scope, request, "clientId") {
            Ok(client_id) => !current.is_empty() && current == client_id,
            Err(_) => false,
        })
    }

    /// True when a partner requests their own profile.
    pub fn my_partner_profile(&self, scope: &Scope, request: &Request) -> Result<bool, AppError> {
        let current = self.current_partner(scope);
        Ok(match self.partner_id_var(scope, request, "partnerId") {
            Ok(partner_id) => !current.is_empty() && current == partner_id,
            Err(_) => false,
        })
    }

    /// True when the current login carries all the requested roles.
    pub fn has_roles(&self, scope: &Scope, roles: &[&str]) -> bool {
        if roles.is_empty() {
            return true;
        }
        match scope.request() {
            Some(ctx) => roles.iter().all(|r| ctx.roles().contains(*r)),
            None => false,
        }
    }

    pub fn extract_token(&self, scope: &Scope, request: &Request) -> Result<String, AppError> {
        extract_bearer_token(scope, request)
    }
}
