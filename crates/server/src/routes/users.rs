//! Staff user and role endpoints.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{delete, get, put},
};
use serde::Deserialize;
use tracing::instrument;

use tavola_core::api::{AssignmentsRequest, UserList};
use tavola_core::{
    LocationId, NewStaffUser, PageRequest, RestaurantId, Role, RoleId, RoleName, StaffUser,
    StaffUserPatch, UserFilters, UserId, UserStatus,
};

use crate::error::AppError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::RequireStaff;
use crate::services::UserService;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/roles", get(list_roles))
        .route("/users", get(list).post(create))
        .route("/users/{id}", get(get_one).patch(update).delete(remove))
        .route("/users/{id}/assignments", put(replace_assignments))
        .route("/users/{id}/roles/{role_id}", delete(remove_role))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    page: Option<u32>,
    limit: Option<u32>,
    restaurant_id: Option<RestaurantId>,
    status: Option<UserStatus>,
    role: Option<RoleName>,
    location_id: Option<LocationId>,
    search: Option<String>,
}

/// Roles the caller may grant.
async fn list_roles(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
) -> Result<Json<Vec<Role>>, AppError> {
    Ok(Json(UserService::new(state.pool()).list_roles(&staff).await?))
}

#[instrument(skip(state, staff))]
async fn list(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<UserList>, AppError> {
    let filters = UserFilters {
        restaurant_id: query.restaurant_id,
        status: query.status,
        role: query.role,
        location_id: query.location_id,
        search: query.search,
    };
    let page = PageRequest::new(query.page, query.limit);
    let (users, pagination) = UserService::new(state.pool())
        .list_users(&staff, filters, page)
        .await?;
    Ok(Json(UserList { users, pagination }))
}

async fn create(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    ApiJson(data): ApiJson<NewStaffUser>,
) -> Result<(StatusCode, Json<StaffUser>), AppError> {
    let user = UserService::new(state.pool()).create_user(&staff, &data).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn get_one(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    ApiPath(id): ApiPath<UserId>,
) -> Result<Json<StaffUser>, AppError> {
    Ok(Json(UserService::new(state.pool()).get_user(&staff, id).await?))
}

async fn update(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    ApiPath(id): ApiPath<UserId>,
    ApiJson(patch): ApiJson<StaffUserPatch>,
) -> Result<Json<StaffUser>, AppError> {
    Ok(Json(
        UserService::new(state.pool())
            .update_user(&staff, id, &patch)
            .await?,
    ))
}

/// Deactivate a user. Accounts are never hard-deleted.
async fn remove(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    ApiPath(id): ApiPath<UserId>,
) -> Result<StatusCode, AppError> {
    UserService::new(state.pool()).delete_user(&staff, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn replace_assignments(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    ApiPath(id): ApiPath<UserId>,
    ApiJson(request): ApiJson<AssignmentsRequest>,
) -> Result<Json<StaffUser>, AppError> {
    Ok(Json(
        UserService::new(state.pool())
            .replace_assignments(&staff, id, &request.assignments)
            .await?,
    ))
}

async fn remove_role(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    ApiPath((id, role_id)): ApiPath<(UserId, RoleId)>,
) -> Result<Json<StaffUser>, AppError> {
    Ok(Json(
        UserService::new(state.pool())
            .remove_role(&staff, id, role_id)
            .await?,
    ))
}
