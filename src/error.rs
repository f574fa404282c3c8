//! Unified gateway error model and its HTTP mapping.
//! Handlers return `AppResult<T>`; passthrough failures from downstream services are
//! carried by `upstream::UpstreamError` and rendered verbatim instead.

use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::identity::AuthFailure;
use crate::upstream::UpstreamError;

/// Fixed message for requests that reach a gated route without an authenticated session.
pub const NOT_LOGGED_IN: &str = "Not logged in";
/// Single message for wrong password and unknown email alike.
pub const BAD_CREDENTIALS: &str = "Incorrect email or password";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    UserInput { code: String, message: String },
    Auth { code: String, message: String },
    Upstream { code: String, message: String },
    Internal { code: String, message: String },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::UserInput { code, .. }
            | AppError::Auth { code, .. }
            | AppError::Upstream { code, .. }
            | AppError::Internal { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::UserInput { message, .. }
            | AppError::Auth { message, .. }
            | AppError::Upstream { message, .. }
            | AppError::Internal { message, .. } => message.as_str(),
        }
    }

    pub fn user<S: Into<String>>(code: S, msg: S) -> Self { AppError::UserInput { code: code.into(), message: msg.into() } }
    pub fn auth<S: Into<String>>(code: S, msg: S) -> Self { AppError::Auth { code: code.into(), message: msg.into() } }
    pub fn upstream<S: Into<String>>(code: S, msg: S) -> Self { AppError::Upstream { code: code.into(), message: msg.into() } }
    pub fn internal<S: Into<String>>(code: S, msg: S) -> Self { AppError::Internal { code: code.into(), message: msg.into() } }

    pub fn unauthenticated() -> Self { Self::auth("unauthenticated", NOT_LOGGED_IN) }
    pub fn invalid_credentials() -> Self { Self::auth("invalid_credentials", BAD_CREDENTIALS) }

    /// Map to HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::UserInput { .. } => 400,
            AppError::Auth { .. } => 401,
            AppError::Upstream { .. } => 502,
            AppError::Internal { .. } => 500,
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = serde_json::json!({"status": "error", "code": self.code_str(), "message": self.message()});
        (status, Json(body)).into_response()
    }
}

// Login and identity lookups never leak downstream error shapes: anything other than
// bad credentials is a backend failure.
impl From<AuthFailure> for AppError {
    fn from(err: AuthFailure) -> Self {
        match err {
            AuthFailure::InvalidCredentials => AppError::invalid_credentials(),
            AuthFailure::UpstreamUnavailable(e) => AppError::Internal { code: "identity_backend".into(), message: e.to_string() },
            AuthFailure::Internal(message) => AppError::Internal { code: "credential_check".into(), message },
        }
    }
}

impl From<crate::identity::SessionError> for AppError {
    fn from(err: crate::identity::SessionError) -> Self {
        match err {
            crate::identity::SessionError::Gone => AppError::unauthenticated(),
            other => AppError::Internal { code: "session_store".into(), message: other.to_string() },
        }
    }
}

/// Response for a proxied call that failed downstream. Responses the backend actually
/// produced are forwarded untouched; failures with no response become a 502.
pub fn passthrough(err: UpstreamError) -> Response {
    match err {
        UpstreamError::Status { status, content_type, body } => {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
            relay(status, content_type.as_deref(), body)
        }
        other => AppError::upstream("upstream_unavailable".to_string(), other.to_string()).into_response(),
    }
}

/// Build a response carrying a downstream status, content type and body as-is.
pub fn relay(status: StatusCode, content_type: Option<&str>, body: axum::body::Bytes) -> Response {
    let mut resp = (status, body).into_response();
    let headers = resp.headers_mut();
    match content_type.and_then(|c| HeaderValue::from_str(c).ok()) {
        Some(ct) => { headers.insert(CONTENT_TYPE, ct); }
        None => { headers.remove(CONTENT_TYPE); }
    }
    resp
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod error_tests;
