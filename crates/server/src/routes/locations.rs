//! Location endpoints, nested under a restaurant.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, patch, post},
};
use serde::Deserialize;

use tavola_core::{Location, LocationId, LocationInput, LocationPatch, RestaurantId};

use crate::error::AppError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::{OptionalStaff, RequireStaff};
use crate::services::RestaurantService;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/restaurants/{id}/locations", get(list).post(add))
        .route(
            "/restaurants/{id}/locations/{location_id}",
            patch(update).delete(remove),
        )
        .route(
            "/restaurants/{id}/locations/{location_id}/primary",
            post(set_primary),
        )
}

fn service(state: &AppState) -> RestaurantService<'_> {
    RestaurantService::new(state.pool(), &state.config().default_language)
}

#[derive(Debug, Default, Deserialize)]
struct ListQuery {
    #[serde(default)]
    include_inactive: bool,
}

async fn list(
    State(state): State<AppState>,
    viewer: OptionalStaff,
    ApiPath(id): ApiPath<RestaurantId>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<Vec<Location>>, AppError> {
    Ok(Json(
        service(&state)
            .get_locations(viewer.staff(), id, query.include_inactive)
            .await?,
    ))
}

async fn add(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    ApiPath(id): ApiPath<RestaurantId>,
    ApiJson(input): ApiJson<LocationInput>,
) -> Result<(StatusCode, Json<Location>), AppError> {
    let location = service(&state).add_location(&staff, id, &input).await?;
    Ok((StatusCode::CREATED, Json(location)))
}

async fn update(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    ApiPath((id, location_id)): ApiPath<(RestaurantId, LocationId)>,
    ApiJson(patch): ApiJson<LocationPatch>,
) -> Result<Json<Location>, AppError> {
    Ok(Json(
        service(&state)
            .update_location(&staff, id, location_id, &patch)
            .await?,
    ))
}

async fn remove(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    ApiPath((id, location_id)): ApiPath<(RestaurantId, LocationId)>,
) -> Result<StatusCode, AppError> {
    service(&state).remove_location(&staff, id, location_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Make a location the primary one; returns the updated active list.
async fn set_primary(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    ApiPath((id, location_id)): ApiPath<(RestaurantId, LocationId)>,
) -> Result<Json<Vec<Location>>, AppError> {
    Ok(Json(
        service(&state)
            .set_primary_location(&staff, id, location_id)
            .await?,
    ))
}
