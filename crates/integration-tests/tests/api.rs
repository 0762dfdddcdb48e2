//! The HTTP API served in-process and driven by `tavola-client`.
//!
//! These tests require a `PostgreSQL` database in `TAVOLA_TEST_DATABASE_URL`.
//!
//! Run with: cargo test -p tavola-integration-tests -- --ignored

#![allow(clippy::unwrap_used)]

use tavola_client::api::is_session_expired;
use tavola_client::{ApiClient, ClientConfig, ClientError};
use tavola_core::{ErrorCode, SubscriptionPlan};
use tavola_integration_tests::{
    TEST_PASSWORD, create_restaurant, create_super_admin, spawn_app, test_pool,
};
use tavola_server::db::RestaurantRepository;

fn client_for(base_url: &str) -> ApiClient {
    let dir = std::env::temp_dir();
    let config = ClientConfig::new(base_url)
        .expect("valid base url")
        .with_storage_dir(dir);
    ApiClient::new(&config).expect("Failed to create API client")
}

fn error_message(err: &ClientError) -> &str {
    match err {
        ClientError::Api { error, .. } => &error.message,
        other => panic!("expected an API error, got {other:?}"),
    }
}

#[tokio::test]
#[ignore = "Requires TAVOLA_TEST_DATABASE_URL"]
async fn test_health() {
    let base_url = spawn_app(test_pool().await).await;

    let resp = reqwest::get(format!("{base_url}/health"))
        .await
        .expect("Failed to reach health endpoint");
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "ok");
}

#[tokio::test]
#[ignore = "Requires TAVOLA_TEST_DATABASE_URL"]
async fn test_login_errors_do_not_reveal_which_part_failed() {
    let pool = test_pool().await;
    let (_, username) = create_super_admin(&pool).await;
    let api = client_for(&spawn_app(pool).await);

    let wrong_password = api.login(&username, "senha-errada-000").await.unwrap_err();
    let unknown_user = api.login("ninguem-aqui", TEST_PASSWORD).await.unwrap_err();

    assert_eq!(wrong_password.code(), Some(ErrorCode::Unauthorized));
    assert_eq!(unknown_user.code(), Some(ErrorCode::Unauthorized));
    assert_eq!(error_message(&wrong_password), error_message(&unknown_user));
}

#[tokio::test]
#[ignore = "Requires TAVOLA_TEST_DATABASE_URL"]
async fn test_session_lifecycle() {
    let pool = test_pool().await;
    let (admin, username) = create_super_admin(&pool).await;
    let api = client_for(&spawn_app(pool).await);

    let err = api.me().await.unwrap_err();
    assert!(is_session_expired(&err));

    let user = api.login(&username, TEST_PASSWORD).await.expect("login");
    assert_eq!(user.id, admin.user_id);
    assert_eq!(api.me().await.expect("me").id, admin.user_id);

    api.logout().await.expect("logout");
    assert!(is_session_expired(&api.me().await.unwrap_err()));
}

#[tokio::test]
#[ignore = "Requires TAVOLA_TEST_DATABASE_URL"]
async fn test_url_check_and_public_lookup() {
    let pool = test_pool().await;
    let (admin, _) = create_super_admin(&pool).await;
    let id = create_restaurant(&pool, &admin, SubscriptionPlan::Starter).await;
    let restaurant = RestaurantRepository::new(&pool)
        .get_by_id(id)
        .await
        .unwrap()
        .expect("created");
    let api = client_for(&spawn_app(pool).await);

    let taken = api.check_url(&restaurant.url_name).await.expect("check url");
    assert!(!taken.available);

    let reserved = api.check_url("admin").await.expect("check url");
    assert!(!reserved.available);
    assert!(reserved.reason.is_some());

    let profile = api
        .restaurant_by_url(&restaurant.url_name, true)
        .await
        .expect("active restaurants are public");
    assert_eq!(profile.restaurant.id, id);
    assert_eq!(profile.locations.len(), 1);
}
