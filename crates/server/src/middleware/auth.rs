//! Session-backed authentication extractors.
//!
//! The signed-in [`CurrentStaff`] is stored in the session at login and read
//! back here. API callers without a session get a 401 error envelope.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use tavola_core::CurrentStaff;

use crate::error::{AppError, set_sentry_user};

/// Session keys.
pub mod keys {
    /// The signed-in staff member.
    pub const CURRENT_STAFF: &str = "current_staff";
}

const NOT_SIGNED_IN: &str = "Sessão expirada ou inexistente. Faça login novamente";

/// Extractor that requires a signed-in staff member.
///
/// ```rust,ignore
/// async fn handler(RequireStaff(staff): RequireStaff) -> String {
///     staff.full_name
/// }
/// ```
pub struct RequireStaff(pub CurrentStaff);

impl<S> FromRequestParts<S> for RequireStaff
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or_else(|| AppError::Unauthorized(NOT_SIGNED_IN.to_owned()))?;

        let staff: CurrentStaff = session
            .get(keys::CURRENT_STAFF)
            .await?
            .ok_or_else(|| AppError::Unauthorized(NOT_SIGNED_IN.to_owned()))?;

        set_sentry_user(staff.user_id.as_i32());
        Ok(Self(staff))
    }
}

/// Extractor for routes that anonymous callers may also use.
pub struct OptionalStaff(pub Option<CurrentStaff>);

impl<S> FromRequestParts<S> for OptionalStaff
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let staff = match parts.extensions.get::<Session>() {
            Some(session) => session
                .get::<CurrentStaff>(keys::CURRENT_STAFF)
                .await
                .ok()
                .flatten(),
            None => None,
        };

        Ok(Self(staff))
    }
}

impl OptionalStaff {
    #[must_use]
    pub const fn staff(&self) -> Option<&CurrentStaff> {
        self.0.as_ref()
    }
}

/// Store the signed-in staff member in the session.
///
/// The session ID is cycled first so a pre-login ID cannot be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_staff(
    session: &Session,
    staff: &CurrentStaff,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(keys::CURRENT_STAFF, staff).await
}

/// Drop the whole session (logout).
///
/// # Errors
///
/// Returns an error if the session store cannot delete it.
pub async fn clear_current_staff(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}
