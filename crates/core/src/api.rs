//! Wire types shared by the REST server and its clients.
//!
//! Every error response uses one envelope:
//!
//! ```json
//! {"error": {"code": "validation", "message": "...", "fields": {"name": "..."}}}
//! ```

use serde::{Deserialize, Serialize};

use crate::types::{
    AssignmentPair, LanguageAssignment, MediaAsset, Pagination, Restaurant, RestaurantLanguage,
    StaffUser,
};
use crate::validation::FieldErrors;

/// Machine-readable error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Validation,
    BusinessRule,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    Internal,
}

impl ErrorCode {
    /// HTTP status code for this category.
    #[must_use]
    pub const fn status(self) -> u16 {
        match self {
            Self::Validation | Self::BusinessRule => 400,
            Self::Unauthorized => 401,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::Internal => 500,
        }
    }

    /// Best-effort category for a bare status code.
    #[must_use]
    pub const fn from_status(status: u16) -> Self {
        match status {
            400 | 422 => Self::Validation,
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            409 => Self::Conflict,
            _ => Self::Internal,
        }
    }
}

/// The body of an error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "FieldErrors::is_empty")]
    pub fields: FieldErrors,
}

/// `{"error": ErrorBody}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

impl ErrorEnvelope {
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error: ErrorBody {
                code,
                message: message.into(),
                fields: FieldErrors::new(),
            },
        }
    }

    #[must_use]
    pub fn with_fields(mut self, fields: FieldErrors) -> Self {
        self.error.fields = fields;
        self
    }
}

/// `POST /auth/login`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Email or username.
    pub login: String,
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("login", &self.login)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// `GET /restaurants/check-url/{url_name}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlAvailability {
    pub url_name: String,
    pub available: bool,
    /// Why the slug cannot be used, when it is malformed or reserved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// `GET /restaurants`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestaurantList {
    pub restaurants: Vec<Restaurant>,
    pub pagination: Pagination,
}

/// `GET /users`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserList {
    pub users: Vec<StaffUser>,
    pub pagination: Pagination,
}

/// `GET /restaurants/{id}/media`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaList {
    pub media: Vec<MediaAsset>,
}

/// `GET /restaurants/{id}/languages`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestaurantLanguages {
    pub languages: Vec<RestaurantLanguage>,
    pub default_language: Option<RestaurantLanguage>,
}

/// `PUT /restaurants/{id}/languages`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkLanguagesRequest {
    pub languages: Vec<LanguageAssignment>,
}

/// `PATCH /restaurants/{id}/languages/{code}/order`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayOrderRequest {
    pub display_order: i32,
}

/// `PUT /users/{id}/assignments`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentsRequest {
    pub assignments: Vec<AssignmentPair>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::validation::ValidationError;

    #[test]
    fn test_envelope_shape() {
        let mut fields = FieldErrors::new();
        fields.insert("name", ValidationError::Required);
        let envelope = ErrorEnvelope::new(ErrorCode::Validation, "invalid input").with_fields(fields);
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["error"]["code"], "validation");
        assert_eq!(json["error"]["fields"]["name"], "Campo obrigatório");
    }

    #[test]
    fn test_envelope_without_fields() {
        let envelope = ErrorEnvelope::new(ErrorCode::Conflict, "taken");
        let json = serde_json::to_string(&envelope).unwrap();
        assert!(!json.contains("fields"));
        let back: ErrorEnvelope = serde_json::from_str(&json).unwrap();
        assert_eq!(back, envelope);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(ErrorCode::BusinessRule.status(), 400);
        assert_eq!(ErrorCode::Conflict.status(), 409);
        assert_eq!(ErrorCode::from_status(404), ErrorCode::NotFound);
        assert_eq!(ErrorCode::from_status(502), ErrorCode::Internal);
    }
}
