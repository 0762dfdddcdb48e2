//! Password sign-in for staff users.

use sqlx::PgPool;
use tracing::instrument;

use tavola_core::api::LoginRequest;
use tavola_core::{LoginName, StaffUser, UserId};

use crate::db::UserRepository;

use super::ServiceError;
use super::users::verify_password;

const INVALID_CREDENTIALS: &str = "E-mail, usuário ou senha inválidos";

/// Staff authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    /// Check credentials and return the signed-in user.
    ///
    /// The login is an email address or a username. Only `active` users may
    /// sign in; unknown users, wrong passwords and inactive accounts all get
    /// the same message.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Unauthorized` on any credential problem.
    #[instrument(skip(self, request))]
    pub async fn login(&self, request: &LoginRequest) -> Result<StaffUser, ServiceError> {
        let login = LoginName::from_login(&request.login);
        let Some(found) = self.users.find_for_login(&login).await? else {
            tracing::info!("login for unknown user");
            return Err(ServiceError::Unauthorized(INVALID_CREDENTIALS.to_owned()));
        };

        if !verify_password(&request.password, &found.password_hash) {
            tracing::info!(user_id = %found.user.id, "login with wrong password");
            return Err(ServiceError::Unauthorized(INVALID_CREDENTIALS.to_owned()));
        }
        if !found.user.status.can_login() {
            tracing::info!(user_id = %found.user.id, status = ?found.user.status, "login for inactive user");
            return Err(ServiceError::Unauthorized(INVALID_CREDENTIALS.to_owned()));
        }

        self.users.touch_login(found.user.id).await?;
        tracing::info!(user_id = %found.user.id, "staff signed in");
        Ok(found.user)
    }

    /// Reload the user behind a session, if it may still act.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` on database failure.
    pub async fn current_user(&self, user_id: UserId) -> Result<Option<StaffUser>, ServiceError> {
        Ok(self
            .users
            .get(user_id)
            .await?
            .filter(|user| user.status.can_login()))
    }
}
