//! Restaurant media endpoints. Assets carry URLs; uploads happen elsewhere.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{delete, get},
};

use tavola_core::api::MediaList;
use tavola_core::{MediaAsset, MediaAssetId, NewMediaAsset, RestaurantId};

use crate::error::AppError;
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::{OptionalStaff, RequireStaff};
use crate::services::RestaurantService;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/restaurants/{id}/media", get(list).post(add))
        .route("/restaurants/{id}/media/{media_id}", delete(remove))
}

fn service(state: &AppState) -> RestaurantService<'_> {
    RestaurantService::new(state.pool(), &state.config().default_language)
}

async fn list(
    State(state): State<AppState>,
    viewer: OptionalStaff,
    ApiPath(id): ApiPath<RestaurantId>,
) -> Result<Json<MediaList>, AppError> {
    let media = service(&state).list_media(viewer.staff(), id).await?;
    Ok(Json(MediaList { media }))
}

/// Record a media asset. Logo and banner replace the previous one.
async fn add(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    ApiPath(id): ApiPath<RestaurantId>,
    ApiJson(asset): ApiJson<NewMediaAsset>,
) -> Result<(StatusCode, Json<MediaAsset>), AppError> {
    let asset = service(&state).add_media(&staff, id, &asset).await?;
    Ok((StatusCode::CREATED, Json(asset)))
}

async fn remove(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    ApiPath((id, media_id)): ApiPath<(RestaurantId, MediaAssetId)>,
) -> Result<StatusCode, AppError> {
    service(&state).remove_media(&staff, id, media_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
