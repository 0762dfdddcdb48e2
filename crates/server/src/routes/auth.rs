//! Sign-in, sign-out and public sign-up.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use tower_sessions::Session;
use tracing::instrument;

use tavola_core::api::LoginRequest;
use tavola_core::{CurrentStaff, Registration, RestaurantProfile, StaffUser};

use crate::error::{AppError, clear_sentry_user};
use crate::extract::ApiJson;
use crate::middleware::RequireStaff;
use crate::middleware::auth::{clear_current_staff, set_current_staff};
use crate::services::{AuthService, RestaurantService};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/register", post(register))
        .route("/auth/me", get(me))
}

/// Check credentials and start a session.
#[instrument(skip(state, session, request), fields(login = %request.login))]
async fn login(
    State(state): State<AppState>,
    session: Session,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<StaffUser>, AppError> {
    let user = AuthService::new(state.pool()).login(&request).await?;
    set_current_staff(&session, &CurrentStaff::from(&user)).await?;
    Ok(Json(user))
}

async fn logout(session: Session) -> StatusCode {
    if let Err(e) = clear_current_staff(&session).await {
        tracing::error!("Failed to flush session: {e}");
    }
    clear_sentry_user();
    StatusCode::NO_CONTENT
}

/// Public sign-up: a pending restaurant with its owner account.
#[instrument(skip(state, data), fields(url_name = %data.restaurant.url_name))]
async fn register(
    State(state): State<AppState>,
    ApiJson(data): ApiJson<Registration>,
) -> Result<(StatusCode, Json<RestaurantProfile>), AppError> {
    let service = RestaurantService::new(state.pool(), &state.config().default_language);
    let profile = service.register(&data).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

/// The signed-in user, reloaded from the database.
///
/// A session whose user was deactivated since login is dropped.
async fn me(
    State(state): State<AppState>,
    session: Session,
    RequireStaff(staff): RequireStaff,
) -> Result<Json<StaffUser>, AppError> {
    let Some(user) = AuthService::new(state.pool())
        .current_user(staff.user_id)
        .await?
    else {
        clear_current_staff(&session).await?;
        return Err(AppError::Unauthorized(
            "Sua conta não está mais ativa".to_owned(),
        ));
    };

    // Keep the session in step with role changes.
    let current = CurrentStaff::from(&user);
    if current != staff {
        session
            .insert(crate::middleware::auth::keys::CURRENT_STAFF, &current)
            .await?;
    }
    Ok(Json(user))
}
