//! HTTP routes.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health, /health/ready
//!
//! # Auth
//! POST /api/v1/auth/login | /auth/logout | /auth/register ; GET /auth/me
//!
//! # Restaurants
//! GET|POST /api/v1/restaurants
//! GET  /api/v1/restaurants/check-url/{url_name}
//! GET  /api/v1/restaurants/by-url/{url_name}
//! GET|PATCH|DELETE /api/v1/restaurants/{id}
//! PUT  /api/v1/restaurants/{id}/features | /payment
//!
//! # Locations
//! GET|POST /api/v1/restaurants/{id}/locations
//! PATCH|DELETE /api/v1/restaurants/{id}/locations/{location_id}
//! POST /api/v1/restaurants/{id}/locations/{location_id}/primary
//!
//! # Languages
//! GET  /api/v1/languages/available
//! GET|PUT|POST /api/v1/restaurants/{id}/languages
//! DELETE /api/v1/restaurants/{id}/languages/{code}
//! PUT  /api/v1/restaurants/{id}/languages/{code}/default
//! PATCH /api/v1/restaurants/{id}/languages/{code}/order
//!
//! # Media
//! GET|POST /api/v1/restaurants/{id}/media ; DELETE .../media/{media_id}
//!
//! # Staff
//! GET|POST /api/v1/users ; GET|PATCH|DELETE /api/v1/users/{id}
//! PUT  /api/v1/users/{id}/assignments ; DELETE /api/v1/users/{id}/roles/{role_id}
//! GET  /api/v1/roles
//! ```

pub mod auth;
pub mod languages;
pub mod locations;
pub mod media;
pub mod restaurants;
pub mod users;

use axum::{Router, extract::State, http::StatusCode, routing::get};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::middleware::{SessionSetupError, create_session_layer};
use crate::state::AppState;

/// Prefix of every API route.
pub const API_PREFIX: &str = "/api/v1";

/// All API routes, relative to [`API_PREFIX`].
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(restaurants::router())
        .merge(locations::router())
        .merge(languages::router())
        .merge(media::router())
        .merge(users::router())
}

/// The complete application: health checks, the API, sessions and request
/// tracing. Sentry layers are added by the binary.
///
/// # Errors
///
/// Returns `SessionSetupError` if the session store cannot be configured.
pub fn app(state: AppState) -> Result<Router, SessionSetupError> {
    let session_layer = create_session_layer(state.pool(), state.config())?;

    Ok(Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest(API_PREFIX, api_routes())
        .layer(session_layer)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state))
}

/// Liveness check. Does not touch dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness check: 503 while the database is unreachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use std::time::Duration;

    use axum::body::{Body, to_bytes};
    use axum::http::{Request, header};
    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use tavola_core::{ErrorCode, ErrorEnvelope};

    use crate::config::ServerConfig;

    /// An app whose pool never connects; only routes that reject before
    /// touching the database can be exercised.
    fn test_app() -> Router {
        let config = ServerConfig {
            database_url: SecretString::from("postgres://localhost/tavola_test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            session_secret: SecretString::from("x".repeat(32)),
            default_language: "pt-BR".to_string(),
            language_cache_ttl: Duration::from_secs(300),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 1.0,
            tls: None,
        };
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(100))
            .connect_lazy("postgres://localhost/tavola_test")
            .unwrap();
        app(AppState::new(config, pool)).unwrap()
    }

    async fn send(request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = test_app().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    fn envelope(body: &[u8]) -> ErrorEnvelope {
        serde_json::from_slice(body).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(Request::get("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"ok");
    }

    #[tokio::test]
    async fn test_me_requires_session() {
        let (status, body) =
            send(Request::get("/api/v1/auth/me").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(envelope(&body).error.code, ErrorCode::Unauthorized);
    }

    #[tokio::test]
    async fn test_protected_routes_require_session() {
        for (method, uri) in [
            ("POST", "/api/v1/restaurants"),
            ("PATCH", "/api/v1/restaurants/1"),
            ("DELETE", "/api/v1/restaurants/1/locations/2"),
            ("PUT", "/api/v1/restaurants/1/languages/en/default"),
            ("GET", "/api/v1/users"),
            ("GET", "/api/v1/roles"),
        ] {
            let request = Request::builder()
                .method(method)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{}"))
                .unwrap();
            let (status, _) = send(request).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
        }
    }

    #[tokio::test]
    async fn test_malformed_login_body_is_validation_error() {
        let request = Request::post("/api/v1/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"login\": 42"))
            .unwrap();
        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(envelope(&body).error.code, ErrorCode::Validation);
    }

    #[tokio::test]
    async fn test_non_numeric_restaurant_id_is_rejected() {
        let (status, body) = send(
            Request::get("/api/v1/restaurants/abc")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(envelope(&body).error.code, ErrorCode::Validation);
    }

    #[tokio::test]
    async fn test_unknown_status_filter_is_rejected() {
        let (status, body) = send(
            Request::get("/api/v1/restaurants?status=closed")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let envelope = envelope(&body);
        assert!(envelope.error.fields.get("status").is_some());
    }
}
