//! Restaurant endpoints.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, put},
};
use serde::Deserialize;
use tracing::instrument;

use tavola_core::api::{RestaurantList, UrlAvailability};
use tavola_core::{
    BusinessType, FeatureSet, NewRestaurant, PaymentSettings, Restaurant, RestaurantId,
    RestaurantPatch, RestaurantProfile,
};

use crate::error::{AppError, field_error};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::{OptionalStaff, RequireStaff};
use crate::services::{ListRestaurantsOptions, RestaurantService, StatusFilter};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/restaurants", get(list).post(create))
        .route("/restaurants/check-url/{url_name}", get(check_url))
        .route("/restaurants/by-url/{url_name}", get(get_by_url_name))
        .route(
            "/restaurants/{id}",
            get(get_by_id).patch(update).delete(delete),
        )
        .route("/restaurants/{id}/features", put(update_features))
        .route("/restaurants/{id}/payment", put(update_payment))
}

fn service(state: &AppState) -> RestaurantService<'_> {
    RestaurantService::new(state.pool(), &state.config().default_language)
}

fn not_found() -> AppError {
    AppError::NotFound("Restaurante não encontrado".to_owned())
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    page: Option<u32>,
    limit: Option<u32>,
    /// `all`, a status name, or absent for active restaurants only.
    status: Option<String>,
    search: Option<String>,
    business_type: Option<BusinessType>,
    cuisine_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ProfileQuery {
    #[serde(default)]
    include_locations: bool,
}

#[instrument(skip(state, viewer))]
async fn list(
    State(state): State<AppState>,
    viewer: OptionalStaff,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<RestaurantList>, AppError> {
    let status = StatusFilter::parse(query.status.as_deref())
        .map_err(|value| field_error("status", format!("Status desconhecido: {value}")))?;

    let options = ListRestaurantsOptions {
        page: query.page,
        limit: query.limit,
        status,
        search: query.search,
        business_type: query.business_type,
        cuisine_type: query.cuisine_type,
    };
    let (restaurants, pagination) = service(&state).get_restaurants(viewer.staff(), options).await?;
    Ok(Json(RestaurantList {
        restaurants,
        pagination,
    }))
}

async fn create(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    ApiJson(data): ApiJson<NewRestaurant>,
) -> Result<(StatusCode, Json<RestaurantProfile>), AppError> {
    let profile = service(&state).create_restaurant(&staff, &data).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

async fn check_url(
    State(state): State<AppState>,
    ApiPath(url_name): ApiPath<String>,
) -> Result<Json<UrlAvailability>, AppError> {
    Ok(Json(service(&state).check_url_available(&url_name).await?))
}

async fn get_by_url_name(
    State(state): State<AppState>,
    viewer: OptionalStaff,
    ApiPath(url_name): ApiPath<String>,
    ApiQuery(query): ApiQuery<ProfileQuery>,
) -> Result<Json<RestaurantProfile>, AppError> {
    service(&state)
        .get_restaurant_by_url_name(viewer.staff(), &url_name, query.include_locations)
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

async fn get_by_id(
    State(state): State<AppState>,
    viewer: OptionalStaff,
    ApiPath(id): ApiPath<RestaurantId>,
    ApiQuery(query): ApiQuery<ProfileQuery>,
) -> Result<Json<RestaurantProfile>, AppError> {
    service(&state)
        .get_restaurant_by_id(viewer.staff(), id, query.include_locations)
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

async fn update(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    ApiPath(id): ApiPath<RestaurantId>,
    ApiJson(patch): ApiJson<RestaurantPatch>,
) -> Result<Json<Restaurant>, AppError> {
    Ok(Json(service(&state).update_restaurant(&staff, id, &patch).await?))
}

async fn delete(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    ApiPath(id): ApiPath<RestaurantId>,
) -> Result<StatusCode, AppError> {
    service(&state).delete_restaurant(&staff, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn update_features(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    ApiPath(id): ApiPath<RestaurantId>,
    ApiJson(features): ApiJson<FeatureSet>,
) -> Result<Json<Restaurant>, AppError> {
    Ok(Json(service(&state).update_features(&staff, id, &features).await?))
}

async fn update_payment(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    ApiPath(id): ApiPath<RestaurantId>,
    ApiJson(payment): ApiJson<PaymentSettings>,
) -> Result<Json<Restaurant>, AppError> {
    Ok(Json(service(&state).update_payment(&staff, id, &payment).await?))
}
