//! Business logic services.
//!
//! # Services
//!
//! - `restaurant` - Restaurants, locations, media, features and payment
//! - `languages` - Restaurant language configuration and the cached catalog
//! - `users` - Staff users and role/location assignments
//! - `auth` - Password sign-in
//!
//! Services return [`ServiceError`], whose variants line up with the HTTP
//! error classes (see `crate::error`).

pub mod auth;
pub mod languages;
pub mod restaurant;
pub mod users;

use thiserror::Error;

use tavola_core::{CurrentStaff, FieldErrors, RestaurantId};

use crate::db::{LanguageError, RepositoryError};

pub use auth::AuthService;
pub use languages::{LanguageCatalog, LanguageService};
pub use restaurant::{ListRestaurantsOptions, RestaurantService, StatusFilter};
pub use users::{UserService, hash_password, verify_password};

/// Errors returned by the service layer.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// One or more fields are invalid.
    #[error("validation failed: {0}")]
    Validation(FieldErrors),

    /// A domain rule refused the operation.
    #[error("{0}")]
    BusinessRule(String),

    /// The caller is not signed in or the credentials are wrong.
    #[error("{0}")]
    Unauthorized(String),

    /// The caller may not act on this resource.
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// A unique value is already taken.
    #[error("{0}")]
    Conflict(String),

    /// A language operation failed at the database level.
    #[error(transparent)]
    Language(LanguageError),

    #[error("repository error: {0}")]
    Repository(#[source] RepositoryError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub(crate) fn not_found(what: &str) -> Self {
        Self::NotFound(format!("{what} não encontrado"))
    }

    pub(crate) fn forbidden() -> Self {
        Self::Forbidden("Você não tem permissão para esta operação".to_owned())
    }
}

impl From<FieldErrors> for ServiceError {
    fn from(errors: FieldErrors) -> Self {
        Self::Validation(errors)
    }
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound("Registro não encontrado".to_owned()),
            RepositoryError::Conflict(message) => Self::Conflict(message),
            other => Self::Repository(other),
        }
    }
}

impl From<LanguageError> for ServiceError {
    fn from(err: LanguageError) -> Self {
        match err.root() {
            LanguageError::NotConfigured(_) => Self::NotFound(err.to_string()),
            LanguageError::UnknownLanguage(_) | LanguageError::MultipleDefaults(_) => {
                Self::BusinessRule(err.to_string())
            }
            LanguageError::Database(_) | LanguageError::Operation { .. } => Self::Language(err),
        }
    }
}

/// Write access to a restaurant.
pub(crate) fn ensure_can_manage(
    actor: &CurrentStaff,
    restaurant_id: RestaurantId,
) -> Result<(), ServiceError> {
    if actor.can_manage_restaurant(restaurant_id) {
        Ok(())
    } else {
        tracing::warn!(user_id = %actor.user_id, %restaurant_id, "restaurant access denied");
        Err(ServiceError::forbidden())
    }
}

/// Read access to a restaurant's staff-only data.
pub(crate) fn ensure_can_view(
    actor: &CurrentStaff,
    restaurant_id: RestaurantId,
) -> Result<(), ServiceError> {
    if actor.can_view_restaurant(restaurant_id) {
        Ok(())
    } else {
        Err(ServiceError::forbidden())
    }
}
