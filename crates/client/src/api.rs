//! Typed client for the Tavola REST API.
//!
//! Every call resolves to the decoded response body or a [`ClientError`].
//! Error responses are decoded from the shared envelope, so callers match
//! on [`ErrorCode`](tavola_core::ErrorCode) instead of inspecting raw bodies.
//! The session cookie set at login is kept by the underlying `reqwest`
//! cookie store.

use std::sync::Arc;

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use tavola_core::api::{
    AssignmentsRequest, BulkLanguagesRequest, DisplayOrderRequest, LoginRequest, MediaList,
    RestaurantLanguages, RestaurantList, UrlAvailability, UserList,
};
use tavola_core::{
    AssignmentPair, BusinessType, ErrorBody, ErrorCode, ErrorEnvelope, FeatureSet, FieldErrors,
    Language, LanguageAssignment, Location, LocationId, LocationInput, LocationPatch, MediaAsset,
    MediaAssetId, NewMediaAsset, NewRestaurant, NewStaffUser, PaymentSettings, Registration,
    Restaurant, RestaurantId, RestaurantLanguage, RestaurantPatch, RestaurantProfile, Role,
    RoleId, RoleName, StaffUser, StaffUserPatch, UserId, UserStatus,
};

use crate::config::ClientConfig;
use crate::error::{ClientError, GENERIC_ERROR};

const API_PREFIX: [&str; 2] = ["api", "v1"];

/// Filters for [`ApiClient::list_restaurants`].
#[derive(Debug, Clone, Default)]
pub struct RestaurantQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    /// `all` or a status name; absent lists active restaurants.
    pub status: Option<String>,
    pub search: Option<String>,
    pub business_type: Option<BusinessType>,
    pub cuisine_type: Option<String>,
}

/// Filters for [`ApiClient::list_users`].
#[derive(Debug, Clone, Default)]
pub struct UserQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub restaurant_id: Option<RestaurantId>,
    pub status: Option<UserStatus>,
    pub role: Option<RoleName>,
    pub location_id: Option<LocationId>,
    pub search: Option<String>,
}

/// Tavola API client. Cheap to clone.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    /// Build a client with a cookie store and the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.base_url.clone(),
            }),
        })
    }

    // =========================================================================
    // Plumbing
    // =========================================================================

    /// `{base}/api/v1/{segments...}`, each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ClientError::Parse("base URL cannot carry a path".to_owned()))?
            .pop_if_empty()
            .extend(API_PREFIX)
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.inner.client.request(method, url)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = request.send().await?;
        if response.status().is_success() {
            let bytes = response.bytes().await?;
            return serde_json::from_slice(&bytes)
                .map_err(|e| ClientError::Parse(format!("Failed to parse response: {e}")));
        }
        Err(Self::decode_error(response).await)
    }

    async fn send_empty(&self, request: RequestBuilder) -> Result<(), ClientError> {
        let response = request.send().await?;
        if response.status().is_success() {
            return Ok(());
        }
        Err(Self::decode_error(response).await)
    }

    /// Decode the error envelope; bodies that are not one keep the status.
    async fn decode_error(response: reqwest::Response) -> ClientError {
        let status = response.status();
        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => return ClientError::Http(e),
        };

        let error = serde_json::from_slice::<ErrorEnvelope>(&bytes).map_or_else(
            |_| {
                tracing::warn!(status = status.as_u16(), "error response without envelope");
                ErrorBody {
                    code: ErrorCode::from_status(status.as_u16()),
                    message: GENERIC_ERROR.to_owned(),
                    fields: FieldErrors::new(),
                }
            },
            |envelope| envelope.error,
        );
        ClientError::Api {
            status: status.as_u16(),
            error,
        }
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, ClientError> {
        self.send_json(self.request(Method::GET, url)).await
    }

    async fn with_body<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        method: Method,
        url: Url,
        body: &B,
    ) -> Result<T, ClientError> {
        self.send_json(self.request(method, url).json(body)).await
    }

    async fn delete(&self, url: Url) -> Result<(), ClientError> {
        self.send_empty(self.request(Method::DELETE, url)).await
    }

    // =========================================================================
    // Auth
    // =========================================================================

    /// Sign in with an email or username.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` with `ErrorCode::Unauthorized` on bad
    /// credentials.
    pub async fn login(&self, login: &str, password: &str) -> Result<StaffUser, ClientError> {
        let request = LoginRequest {
            login: login.to_owned(),
            password: password.to_owned(),
        };
        self.with_body(Method::POST, self.endpoint(&["auth", "login"])?, &request)
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let url = self.endpoint(&["auth", "logout"])?;
        self.send_empty(self.request(Method::POST, url)).await
    }

    /// Public sign-up.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` with field errors under `restaurant.*` and
    /// `owner.*`, or a conflict when the url name is taken.
    pub async fn register(&self, data: &Registration) -> Result<RestaurantProfile, ClientError> {
        self.with_body(Method::POST, self.endpoint(&["auth", "register"])?, data)
            .await
    }

    /// # Errors
    ///
    /// Returns `ClientError::Api` with `ErrorCode::Unauthorized` without a
    /// session.
    pub async fn me(&self) -> Result<StaffUser, ClientError> {
        self.get(self.endpoint(&["auth", "me"])?).await
    }

    // =========================================================================
    // Restaurants
    // =========================================================================

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn list_restaurants(
        &self,
        query: &RestaurantQuery,
    ) -> Result<RestaurantList, ClientError> {
        let mut url = self.endpoint(&["restaurants"])?;
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(page) = query.page {
                pairs.append_pair("page", &page.to_string());
            }
            if let Some(limit) = query.limit {
                pairs.append_pair("limit", &limit.to_string());
            }
            if let Some(status) = &query.status {
                pairs.append_pair("status", status);
            }
            if let Some(search) = &query.search {
                pairs.append_pair("search", search);
            }
            if let Some(business_type) = query.business_type {
                pairs.append_pair("business_type", business_type.as_str());
            }
            if let Some(cuisine) = &query.cuisine_type {
                pairs.append_pair("cuisine_type", cuisine);
            }
        }
        strip_empty_query(&mut url);
        self.get(url).await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn create_restaurant(
        &self,
        data: &NewRestaurant,
    ) -> Result<RestaurantProfile, ClientError> {
        self.with_body(Method::POST, self.endpoint(&["restaurants"])?, data)
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn check_url(&self, url_name: &str) -> Result<UrlAvailability, ClientError> {
        self.get(self.endpoint(&["restaurants", "check-url", url_name])?)
            .await
    }

    /// # Errors
    ///
    /// Returns `ClientError::Api` with `ErrorCode::NotFound` for unknown or
    /// hidden restaurants.
    pub async fn restaurant_by_url(
        &self,
        url_name: &str,
        include_locations: bool,
    ) -> Result<RestaurantProfile, ClientError> {
        let mut url = self.endpoint(&["restaurants", "by-url", url_name])?;
        if include_locations {
            url.query_pairs_mut().append_pair("include_locations", "true");
        }
        self.get(url).await
    }

    /// # Errors
    ///
    /// Returns `ClientError::Api` with `ErrorCode::NotFound` for unknown or
    /// hidden restaurants.
    pub async fn restaurant(
        &self,
        id: RestaurantId,
        include_locations: bool,
    ) -> Result<RestaurantProfile, ClientError> {
        let mut url = self.endpoint(&["restaurants", &id.to_string()])?;
        if include_locations {
            url.query_pairs_mut().append_pair("include_locations", "true");
        }
        self.get(url).await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn update_restaurant(
        &self,
        id: RestaurantId,
        patch: &RestaurantPatch,
    ) -> Result<Restaurant, ClientError> {
        let url = self.endpoint(&["restaurants", &id.to_string()])?;
        self.with_body(Method::PATCH, url, patch).await
    }

    /// Soft-delete. Fails while the restaurant has active locations.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` with `ErrorCode::BusinessRule` when
    /// locations remain.
    pub async fn delete_restaurant(&self, id: RestaurantId) -> Result<(), ClientError> {
        self.delete(self.endpoint(&["restaurants", &id.to_string()])?)
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn update_features(
        &self,
        id: RestaurantId,
        features: &FeatureSet,
    ) -> Result<Restaurant, ClientError> {
        let url = self.endpoint(&["restaurants", &id.to_string(), "features"])?;
        self.with_body(Method::PUT, url, features).await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn update_payment(
        &self,
        id: RestaurantId,
        payment: &PaymentSettings,
    ) -> Result<Restaurant, ClientError> {
        let url = self.endpoint(&["restaurants", &id.to_string(), "payment"])?;
        self.with_body(Method::PUT, url, payment).await
    }

    // =========================================================================
    // Locations
    // =========================================================================

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn list_locations(
        &self,
        id: RestaurantId,
        include_inactive: bool,
    ) -> Result<Vec<Location>, ClientError> {
        let mut url = self.endpoint(&["restaurants", &id.to_string(), "locations"])?;
        if include_inactive {
            url.query_pairs_mut().append_pair("include_inactive", "true");
        }
        self.get(url).await
    }

    /// # Errors
    ///
    /// Returns `ClientError::Api` with `ErrorCode::BusinessRule` when the
    /// plan's location limit is reached.
    pub async fn add_location(
        &self,
        id: RestaurantId,
        input: &LocationInput,
    ) -> Result<Location, ClientError> {
        let url = self.endpoint(&["restaurants", &id.to_string(), "locations"])?;
        self.with_body(Method::POST, url, input).await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn update_location(
        &self,
        id: RestaurantId,
        location_id: LocationId,
        patch: &LocationPatch,
    ) -> Result<Location, ClientError> {
        let url = self.endpoint(&[
            "restaurants",
            &id.to_string(),
            "locations",
            &location_id.to_string(),
        ])?;
        self.with_body(Method::PATCH, url, patch).await
    }

    /// # Errors
    ///
    /// Returns `ClientError::Api` with `ErrorCode::BusinessRule` for the
    /// last active location.
    pub async fn remove_location(
        &self,
        id: RestaurantId,
        location_id: LocationId,
    ) -> Result<(), ClientError> {
        self.delete(self.endpoint(&[
            "restaurants",
            &id.to_string(),
            "locations",
            &location_id.to_string(),
        ])?)
        .await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn set_primary_location(
        &self,
        id: RestaurantId,
        location_id: LocationId,
    ) -> Result<Vec<Location>, ClientError> {
        let url = self.endpoint(&[
            "restaurants",
            &id.to_string(),
            "locations",
            &location_id.to_string(),
            "primary",
        ])?;
        self.send_json(self.request(Method::POST, url)).await
    }

    // =========================================================================
    // Languages
    // =========================================================================

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn available_languages(&self) -> Result<Vec<Language>, ClientError> {
        self.get(self.endpoint(&["languages", "available"])?).await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn restaurant_languages(
        &self,
        id: RestaurantId,
    ) -> Result<RestaurantLanguages, ClientError> {
        self.get(self.endpoint(&["restaurants", &id.to_string(), "languages"])?)
            .await
    }

    /// Apply several language entries atomically.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` with `ErrorCode::BusinessRule` when more
    /// than one entry is the default.
    pub async fn bulk_update_languages(
        &self,
        id: RestaurantId,
        languages: &[LanguageAssignment],
    ) -> Result<RestaurantLanguages, ClientError> {
        let url = self.endpoint(&["restaurants", &id.to_string(), "languages"])?;
        let body = BulkLanguagesRequest {
            languages: languages.to_vec(),
        };
        self.with_body(Method::PUT, url, &body).await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn add_language(
        &self,
        id: RestaurantId,
        entry: &LanguageAssignment,
    ) -> Result<RestaurantLanguage, ClientError> {
        let url = self.endpoint(&["restaurants", &id.to_string(), "languages"])?;
        self.with_body(Method::POST, url, entry).await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn remove_language(&self, id: RestaurantId, code: &str) -> Result<(), ClientError> {
        self.delete(self.endpoint(&["restaurants", &id.to_string(), "languages", code])?)
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn set_default_language(
        &self,
        id: RestaurantId,
        code: &str,
    ) -> Result<(), ClientError> {
        let url = self.endpoint(&["restaurants", &id.to_string(), "languages", code, "default"])?;
        self.send_empty(self.request(Method::PUT, url)).await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn update_language_order(
        &self,
        id: RestaurantId,
        code: &str,
        display_order: i32,
    ) -> Result<(), ClientError> {
        let url = self.endpoint(&["restaurants", &id.to_string(), "languages", code, "order"])?;
        let request = self
            .request(Method::PATCH, url)
            .json(&DisplayOrderRequest { display_order });
        self.send_empty(request).await
    }

    // =========================================================================
    // Media
    // =========================================================================

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn list_media(&self, id: RestaurantId) -> Result<Vec<MediaAsset>, ClientError> {
        let list: MediaList = self
            .get(self.endpoint(&["restaurants", &id.to_string(), "media"])?)
            .await?;
        Ok(list.media)
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn add_media(
        &self,
        id: RestaurantId,
        asset: &NewMediaAsset,
    ) -> Result<MediaAsset, ClientError> {
        let url = self.endpoint(&["restaurants", &id.to_string(), "media"])?;
        self.with_body(Method::POST, url, asset).await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn remove_media(
        &self,
        id: RestaurantId,
        media_id: MediaAssetId,
    ) -> Result<(), ClientError> {
        self.delete(self.endpoint(&[
            "restaurants",
            &id.to_string(),
            "media",
            &media_id.to_string(),
        ])?)
        .await
    }

    // =========================================================================
    // Staff
    // =========================================================================

    /// Roles the signed-in user may grant.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn roles(&self) -> Result<Vec<Role>, ClientError> {
        self.get(self.endpoint(&["roles"])?).await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn list_users(&self, query: &UserQuery) -> Result<UserList, ClientError> {
        let mut url = self.endpoint(&["users"])?;
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(page) = query.page {
                pairs.append_pair("page", &page.to_string());
            }
            if let Some(limit) = query.limit {
                pairs.append_pair("limit", &limit.to_string());
            }
            if let Some(restaurant_id) = query.restaurant_id {
                pairs.append_pair("restaurant_id", &restaurant_id.to_string());
            }
            if let Some(status) = query.status {
                pairs.append_pair("status", status.as_str());
            }
            if let Some(role) = query.role {
                pairs.append_pair("role", role.as_str());
            }
            if let Some(location_id) = query.location_id {
                pairs.append_pair("location_id", &location_id.to_string());
            }
            if let Some(search) = &query.search {
                pairs.append_pair("search", search);
            }
        }
        strip_empty_query(&mut url);
        self.get(url).await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn create_user(&self, data: &NewStaffUser) -> Result<StaffUser, ClientError> {
        self.with_body(Method::POST, self.endpoint(&["users"])?, data)
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn user(&self, id: UserId) -> Result<StaffUser, ClientError> {
        self.get(self.endpoint(&["users", &id.to_string()])?).await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn update_user(
        &self,
        id: UserId,
        patch: &StaffUserPatch,
    ) -> Result<StaffUser, ClientError> {
        let url = self.endpoint(&["users", &id.to_string()])?;
        self.with_body(Method::PATCH, url, patch).await
    }

    /// Deactivate a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn delete_user(&self, id: UserId) -> Result<(), ClientError> {
        self.delete(self.endpoint(&["users", &id.to_string()])?).await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn replace_assignments(
        &self,
        id: UserId,
        assignments: &[AssignmentPair],
    ) -> Result<StaffUser, ClientError> {
        let url = self.endpoint(&["users", &id.to_string(), "assignments"])?;
        let body = AssignmentsRequest {
            assignments: assignments.to_vec(),
        };
        self.with_body(Method::PUT, url, &body).await
    }

    /// # Errors
    ///
    /// Returns `ClientError::Api` with `ErrorCode::BusinessRule` for the
    /// user's last role.
    pub async fn remove_role(&self, id: UserId, role_id: RoleId) -> Result<StaffUser, ClientError> {
        let url = self.endpoint(&["users", &id.to_string(), "roles", &role_id.to_string()])?;
        self.send_json(self.request(Method::DELETE, url)).await
    }
}

/// `query_pairs_mut` leaves a bare `?` behind when nothing was appended.
fn strip_empty_query(url: &mut Url) {
    if url.query() == Some("") {
        url.set_query(None);
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

/// Whether an error is a missing or expired session.
#[must_use]
pub fn is_session_expired(error: &ClientError) -> bool {
    matches!(error, ClientError::Api { status, .. } if *status == StatusCode::UNAUTHORIZED.as_u16())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use httpmock::prelude::*;
    use serde_json::json;

    fn client(server: &MockServer) -> ApiClient {
        ApiClient::new(&ClientConfig::new(&server.base_url()).unwrap()).unwrap()
    }

    fn staff_json() -> serde_json::Value {
        json!({
            "id": 7,
            "restaurant_id": 1,
            "email": "ana@example.com",
            "full_name": "Ana Souza",
            "status": "active",
            "assignments": [],
            "created_at": "2025-01-01T00:00:00Z"
        })
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let config = ClientConfig::new("http://localhost:3000/").unwrap();
        let api = ApiClient::new(&config).unwrap();
        let url = api
            .endpoint(&["restaurants", "1", "languages", "pt BR"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:3000/api/v1/restaurants/1/languages/pt%20BR"
        );
    }

    #[tokio::test]
    async fn test_login_posts_credentials() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/v1/auth/login")
                .json_body(json!({"login": "ana@example.com", "password": "segredo123"}));
            then.status(200).json_body(staff_json());
        });

        let user = client(&server)
            .login("ana@example.com", "segredo123")
            .await
            .unwrap();
        assert_eq!(user.full_name, "Ana Souza");
        mock.assert();
    }

    #[tokio::test]
    async fn test_error_envelope_is_decoded() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/api/v1/restaurants/3/locations");
            then.status(400).json_body(json!({
                "error": {
                    "code": "business_rule",
                    "message": "Limite de locais do plano atingido"
                }
            }));
        });

        let input: LocationInput = serde_json::from_value(json!({
            "name": "Centro",
            "url_name": "centro",
            "address": {
                "address_zip_code": "01001-000",
                "address_street": "Praça da Sé",
                "address_number": "1",
                "address_neighborhood": "Sé",
                "address_city": "São Paulo",
                "address_state": "SP"
            }
        }))
        .unwrap();
        let err = client(&server)
            .add_location(RestaurantId::new(3), &input)
            .await
            .unwrap_err();

        assert_eq!(err.code(), Some(ErrorCode::BusinessRule));
        assert_eq!(err.user_message(), "Limite de locais do plano atingido");
    }

    #[tokio::test]
    async fn test_error_without_envelope_keeps_status() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/v1/auth/me");
            then.status(401).body("unauthorized");
        });

        let err = client(&server).me().await.unwrap_err();
        assert!(err.is_unauthorized());
        assert!(is_session_expired(&err));
        assert_eq!(err.user_message(), GENERIC_ERROR);
    }

    #[tokio::test]
    async fn test_list_restaurants_sends_filters() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/v1/restaurants")
                .query_param("page", "2")
                .query_param("search", "pizza");
            then.status(200).json_body(json!({
                "restaurants": [],
                "pagination": {
                    "page": 2, "limit": 20, "total": 21, "total_pages": 2,
                    "has_next": false, "has_prev": true
                }
            }));
        });

        let query = RestaurantQuery {
            page: Some(2),
            search: Some("pizza".to_owned()),
            ..RestaurantQuery::default()
        };
        let list = client(&server).list_restaurants(&query).await.unwrap();
        assert!(list.pagination.has_prev);
        mock.assert();
    }

    #[tokio::test]
    async fn test_delete_expects_no_body() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(DELETE).path("/api/v1/restaurants/1/media/9");
            then.status(204);
        });

        client(&server)
            .remove_media(RestaurantId::new(1), MediaAssetId::new(9))
            .await
            .unwrap();
        mock.assert();
    }
}
