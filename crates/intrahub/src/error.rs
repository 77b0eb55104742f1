//! JSON error envelope.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// An error returned to the caller as `{"error": message}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    /// An error with an explicit status.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// 400.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// 401.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    /// 404.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// 500.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// HTTP status.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Message placed in the envelope.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

/// Default status mapping for domain errors. Handlers that need a different
/// status for a class of failure match on the error before converting.
impl From<intrahub_core::Error> for ApiError {
    fn from(err: intrahub_core::Error) -> Self {
        use intrahub_core::Error;

        match &err {
            Error::Validation(_) => Self::bad_request(err.to_string()),
            Error::AccountNotFound(_) => Self::not_found("Account not found"),
            _ => Self::internal(err.to_string()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;
    use intrahub_core::{AccountId, Error, MailServiceError, ValidationError};

    use super::*;

    #[tokio::test]
    async fn test_envelope() {
        let response = ApiError::unauthorized("Unauthorized").into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value, json!({ "error": "Unauthorized" }));
    }

    #[test]
    fn test_domain_mapping() {
        let validation: ApiError = Error::Validation(vec![ValidationError::MissingPassword]).into();
        assert_eq!(validation.status(), StatusCode::BAD_REQUEST);
        assert_eq!(validation.message(), "Invalid account: Password is required");

        let missing: ApiError = Error::AccountNotFound(AccountId::new(3)).into();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let mail: ApiError = Error::Mail(MailServiceError::Connection("timed out".into())).into();
        assert_eq!(mail.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(mail.message(), "Connection failed: timed out");
    }
}
