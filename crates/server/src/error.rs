//! Unified error handling for the HTTP API.
//!
//! Every error leaves the server as an [`ErrorEnvelope`] JSON body.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use tavola_core::{ErrorCode, ErrorEnvelope, FieldErrors};

use crate::db::RepositoryError;
use crate::services::ServiceError;

/// Application-level error type for route handlers.
#[derive(Debug, Error)]
pub enum AppError {
    /// Business logic failure.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Database operation failed outside a service.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Session store failure.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// User is not authenticated.
    #[error("{0}")]
    Unauthorized(String),

    /// Resource not found.
    #[error("{0}")]
    NotFound(String),

    /// Malformed request (body, path or query).
    #[error("{0}")]
    BadRequest(String),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(format!("Corpo da requisição inválido: {}", rejection.body_text()))
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(format!("Parâmetro inválido: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(format!("Filtro inválido: {}", rejection.body_text()))
    }
}

impl AppError {
    fn code(&self) -> ErrorCode {
        match self {
            Self::Service(err) => match err {
                ServiceError::Validation(_) => ErrorCode::Validation,
                ServiceError::BusinessRule(_) => ErrorCode::BusinessRule,
                ServiceError::Unauthorized(_) => ErrorCode::Unauthorized,
                ServiceError::Forbidden(_) => ErrorCode::Forbidden,
                ServiceError::NotFound(_) => ErrorCode::NotFound,
                ServiceError::Conflict(_) => ErrorCode::Conflict,
                ServiceError::Language(_)
                | ServiceError::Repository(_)
                | ServiceError::Internal(_) => ErrorCode::Internal,
            },
            Self::Database(RepositoryError::NotFound) | Self::NotFound(_) => ErrorCode::NotFound,
            Self::Database(RepositoryError::Conflict(_)) => ErrorCode::Conflict,
            Self::Database(_) | Self::Session(_) => ErrorCode::Internal,
            Self::Unauthorized(_) => ErrorCode::Unauthorized,
            Self::BadRequest(_) => ErrorCode::Validation,
        }
    }

    /// The envelope sent to clients. Server-side details stay in the logs.
    fn envelope(&self, code: ErrorCode) -> ErrorEnvelope {
        match (self, code) {
            (_, ErrorCode::Internal) => ErrorEnvelope::new(code, "Erro interno do servidor"),
            (Self::Service(ServiceError::Validation(fields)), _) => {
                ErrorEnvelope::new(code, "Verifique os campos destacados").with_fields(fields.clone())
            }
            _ => ErrorEnvelope::new(code, self.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();

        // Log server errors with Sentry
        if code == ErrorCode::Internal {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status =
            StatusCode::from_u16(code.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.envelope(code))).into_response()
    }
}

/// Shorthand for a validation error on one field.
#[must_use]
pub fn field_error(path: &str, message: impl ToString) -> AppError {
    let mut fields = FieldErrors::new();
    fields.insert(path, message);
    AppError::Service(ServiceError::Validation(fields))
}

/// Set the Sentry user context from a staff user ID.
pub fn set_sentry_user(user_id: i32) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use axum::body::to_bytes;

    async fn body_of(err: AppError) -> (StatusCode, ErrorEnvelope) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("Restaurante não encontrado".to_string());
        assert_eq!(err.to_string(), "Restaurante não encontrado");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(
            get_status(ServiceError::NotFound("x".to_string()).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("x".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(ServiceError::Forbidden("x".to_string()).into()),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(ServiceError::BusinessRule("x".to_string()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(ServiceError::Conflict("x".to_string()).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::Database(RepositoryError::DataCorruption("x".to_string()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_validation_envelope_carries_fields() {
        let (status, envelope) = body_of(field_error("url_name", "Endereço inválido")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(envelope.error.code, ErrorCode::Validation);
        assert_eq!(envelope.error.fields.get("url_name"), Some("Endereço inválido"));
    }

    #[tokio::test]
    async fn test_internal_errors_hide_details() {
        let err = AppError::Database(RepositoryError::DataCorruption("row 7 broken".to_string()));
        let (status, envelope) = body_of(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(envelope.error.code, ErrorCode::Internal);
        assert!(!envelope.error.message.contains("row 7"));
    }
}
