// crates/backend-lib/src/error.rs

//! Central error types + Axum integration.
use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Application error types with error codes
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication required: {0}")]
    Unauthorized(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Internal(_) | AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Unauthorized(_) => "AUTH_001",
            AppError::Internal(_) => "INT_001",
            AppError::Config(_) => "CFG_001",
        }
    }

    /// Get a sanitized message suitable for production use
    pub fn sanitized_message(&self) -> String {
        match self {
            AppError::Unauthorized(_) => "Authentication required".to_string(),
            AppError::Internal(_) | AppError::Config(_) => {
                "An internal server error occurred".to_string()
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();

        // Use detailed messages in development, sanitized in production
        let message = if cfg!(debug_assertions) {
            self.to_string()
        } else {
            self.sanitized_message()
        };

        let body = serde_json::json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        });

        (status, axum::Json(body)).into_response()
    }
}

impl From<figment::Error> for AppError {
    fn from(err: figment::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

/// Field name used for errors that are not tied to a single input.
pub const GENERIC_KEY: &str = "";

/// Per-field validation and identity failures, serialized as
/// `{ "Email": ["..."], "": ["..."] }` and answered with `400 Bad Request`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ErrorReport {
    errors: BTreeMap<String, Vec<String>>,
}

impl ErrorReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report holding a single generic (non-field) message
    pub fn generic(message: impl Into<String>) -> Self {
        let mut report = Self::new();
        report.add(GENERIC_KEY, message);
        report
    }

    pub fn add(&mut self, key: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(key.into())
            .or_default()
            .push(message.into());
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.errors.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.errors.get(key).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of keys with at least one message
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// `Ok(())` when nothing was recorded, otherwise the report itself
    pub fn into_result(self) -> Result<(), ErrorReport> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl IntoResponse for ErrorReport {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, axum::Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let auth_error = AppError::Unauthorized("missing session".to_string());
        assert_eq!(
            auth_error.to_string(),
            "Authentication required: missing session"
        );
        assert_eq!(auth_error.sanitized_message(), "Authentication required");

        let internal = AppError::Internal("hashing task panicked".to_string());
        assert_eq!(internal.sanitized_message(), "An internal server error occurred");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            AppError::Unauthorized("x".to_string()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Config("x".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(AppError::Unauthorized("x".to_string()).error_code(), "AUTH_001");
        assert_eq!(AppError::Config("x".to_string()).error_code(), "CFG_001");
    }

    #[test]
    fn test_figment_errors_become_config_errors() {
        let err: AppError = figment::Error::from("missing field".to_string()).into();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_app_error_into_response() {
        let response = AppError::Unauthorized("sign in".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_error_report_collects_messages_per_key() {
        let mut report = ErrorReport::new();
        assert!(report.clone().into_result().is_ok());

        report.add("Email", "The Email field is required.");
        report.add(GENERIC_KEY, "first");
        report.add(GENERIC_KEY, "second");

        assert_eq!(report.len(), 2);
        assert!(report.contains_key("Email"));
        assert_eq!(report.get(GENERIC_KEY).unwrap(), ["first", "second"]);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json[""][1], "second");
        assert_eq!(json["Email"][0], "The Email field is required.");
    }

    #[test]
    fn test_error_report_into_response() {
        let response = ErrorReport::generic("Invalid login attempt.").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response
            .headers()
            .get("content-type")
            .unwrap()
            .to_str()
            .unwrap()
            .contains("application/json"));
    }
}
