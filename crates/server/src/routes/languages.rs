//! Restaurant language endpoints and the language catalog.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{delete, get, patch, put},
};
use tracing::instrument;

use tavola_core::api::{BulkLanguagesRequest, DisplayOrderRequest, RestaurantLanguages};
use tavola_core::{Language, LanguageAssignment, RestaurantId, RestaurantLanguage};

use crate::error::AppError;
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::RequireStaff;
use crate::services::LanguageService;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/languages/available", get(available))
        .route(
            "/restaurants/{id}/languages",
            get(list).put(bulk_update).post(add),
        )
        .route("/restaurants/{id}/languages/{code}", delete(remove))
        .route("/restaurants/{id}/languages/{code}/default", put(set_default))
        .route("/restaurants/{id}/languages/{code}/order", patch(update_order))
}

fn service(state: &AppState) -> LanguageService<'_> {
    LanguageService::new(state.pool(), state.languages())
}

async fn available(State(state): State<AppState>) -> Result<Json<Vec<Language>>, AppError> {
    let languages = service(&state).available_languages().await?;
    Ok(Json(languages.as_ref().clone()))
}

async fn list(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<RestaurantId>,
) -> Result<Json<RestaurantLanguages>, AppError> {
    Ok(Json(service(&state).restaurant_languages(id).await?))
}

/// Replace several language entries in one transaction.
#[instrument(skip(state, staff, request))]
async fn bulk_update(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    ApiPath(id): ApiPath<RestaurantId>,
    ApiJson(request): ApiJson<BulkLanguagesRequest>,
) -> Result<Json<RestaurantLanguages>, AppError> {
    Ok(Json(
        service(&state)
            .bulk_update_languages(&staff, id, &request.languages)
            .await?,
    ))
}

async fn add(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    ApiPath(id): ApiPath<RestaurantId>,
    ApiJson(entry): ApiJson<LanguageAssignment>,
) -> Result<(StatusCode, Json<RestaurantLanguage>), AppError> {
    let language = service(&state).add_language(&staff, id, &entry).await?;
    Ok((StatusCode::CREATED, Json(language)))
}

async fn remove(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    ApiPath((id, code)): ApiPath<(RestaurantId, String)>,
) -> Result<StatusCode, AppError> {
    service(&state).remove_language(&staff, id, &code).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn set_default(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    ApiPath((id, code)): ApiPath<(RestaurantId, String)>,
) -> Result<StatusCode, AppError> {
    service(&state).set_default_language(&staff, id, &code).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn update_order(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    ApiPath((id, code)): ApiPath<(RestaurantId, String)>,
    ApiJson(request): ApiJson<DisplayOrderRequest>,
) -> Result<StatusCode, AppError> {
    service(&state)
        .update_display_order(&staff, id, &code, request.display_order)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
