//! Error types for Wicket
//!
//! Every failure the gateway can report maps to an HTTP status and a stable
//! machine-readable code. Storage and internal failures keep their detail for
//! logging only; clients see a generic message.

use hyper::StatusCode;
use serde::Serialize;

/// Main error type for Wicket operations
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Missing required fields: {0}")]
    MissingFields(String),

    #[error("Password and confirmation do not match")]
    PasswordMismatch,

    #[error("Password must be at least 8 characters and contain a letter, a digit and one of !%*#?&")]
    InvalidPassword,

    #[error("An account with this email already exists")]
    EmailExists,

    #[error("Email or password is incorrect")]
    CredentialsMismatch,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Access token missing")]
    MissingAccessToken,

    #[error("Access token invalid")]
    InvalidAccessToken,

    /// Only ever observed inside the guard, where it triggers renewal
    #[error("Access token expired")]
    ExpiredAccessToken,

    #[error("Refresh token missing")]
    MissingRefreshToken,

    #[error("Refresh token invalid")]
    InvalidRefreshToken,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Structured error body returned to clients
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
}

impl GatewayError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingFields(_)
            | Self::PasswordMismatch
            | Self::InvalidPassword
            | Self::EmailExists
            | Self::CredentialsMismatch
            | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::MissingAccessToken
            | Self::InvalidAccessToken
            | Self::ExpiredAccessToken
            | Self::MissingRefreshToken
            | Self::InvalidRefreshToken => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Storage(_) | Self::Config(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable reason code for clients
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingFields(_) => "MISSING_FIELDS",
            Self::PasswordMismatch => "PASSWORD_MISMATCH",
            Self::InvalidPassword => "INVALID_PASSWORD",
            Self::EmailExists => "EMAIL_EXISTS",
            Self::CredentialsMismatch => "EMAIL_PASSWORD_MISMATCH",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::MissingAccessToken => "MISSING_ACCESS_TOKEN",
            Self::InvalidAccessToken => "INVALID_ACCESS_TOKEN",
            Self::ExpiredAccessToken => "EXPIRED_ACCESS_TOKEN",
            Self::MissingRefreshToken => "MISSING_REFRESH_TOKEN",
            Self::InvalidRefreshToken => "INVALID_REFRESH_TOKEN",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::NotFound(_) => "RESOURCE_NOT_FOUND",
            Self::MethodNotAllowed => "METHOD_NOT_ALLOWED",
            Self::Storage(_) => "STORAGE_FAILURE",
            Self::Config(_) | Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Message safe to show a client. Server-side details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            Self::Storage(_) | Self::Config(_) | Self::Internal(_) => {
                "Internal server error".to_string()
            }
            other => other.to_string(),
        }
    }

    /// Convert to status code and structured body
    pub fn into_status_and_body(self) -> (StatusCode, ErrorResponse) {
        (
            self.status_code(),
            ErrorResponse {
                code: self.code(),
                message: self.public_message(),
            },
        )
    }

    /// True for failures of the token gate (401 family)
    pub fn is_authentication_failure(&self) -> bool {
        self.status_code() == StatusCode::UNAUTHORIZED
    }
}

impl From<std::io::Error> for GatewayError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        Self::BadRequest(format!("Invalid JSON: {}", err))
    }
}

impl From<hyper::Error> for GatewayError {
    fn from(err: hyper::Error) -> Self {
        Self::Internal(format!("HTTP error: {}", err))
    }
}

impl From<mongodb::error::Error> for GatewayError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<bson::oid::Error> for GatewayError {
    fn from(_: bson::oid::Error) -> Self {
        Self::NotFound("post".into())
    }
}

/// Result type alias for Wicket operations
pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_failures_are_unauthorized() {
        for err in [
            GatewayError::MissingAccessToken,
            GatewayError::InvalidAccessToken,
            GatewayError::MissingRefreshToken,
            GatewayError::InvalidRefreshToken,
        ] {
            assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
            assert!(err.is_authentication_failure());
        }
        assert!(!GatewayError::Forbidden("x".into()).is_authentication_failure());
    }

    #[test]
    fn test_registration_codes() {
        assert_eq!(GatewayError::InvalidPassword.code(), "INVALID_PASSWORD");
        assert_eq!(GatewayError::EmailExists.code(), "EMAIL_EXISTS");
        assert_eq!(
            GatewayError::CredentialsMismatch.code(),
            "EMAIL_PASSWORD_MISMATCH"
        );
        assert_eq!(
            GatewayError::EmailExists.status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_storage_detail_is_hidden() {
        let err = GatewayError::Storage("connection refused to 10.0.0.7:27017".into());
        let (status, body) = err.into_status_and_body();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.code, "STORAGE_FAILURE");
        assert!(!body.message.contains("10.0.0.7"));
    }

    #[test]
    fn test_resource_statuses() {
        assert_eq!(
            GatewayError::NotFound("post".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            GatewayError::Forbidden("not the author".into()).status_code(),
            StatusCode::FORBIDDEN
        );
    }
}
