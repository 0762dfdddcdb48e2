//! Location rules against a real database.
//!
//! These tests require a `PostgreSQL` database in `TAVOLA_TEST_DATABASE_URL`.
//!
//! Run with: cargo test -p tavola-integration-tests -- --ignored

#![allow(clippy::unwrap_used)]

use tavola_core::{Location, RestaurantStatus, SubscriptionPlan};
use tavola_integration_tests::{
    create_restaurant, create_super_admin, location_input, test_pool, unique,
};
use tavola_server::db::RestaurantRepository;
use tavola_server::services::{RestaurantService, ServiceError};

fn primaries(locations: &[Location]) -> Vec<&str> {
    locations
        .iter()
        .filter(|l| l.is_primary)
        .map(|l| l.url_name.as_str())
        .collect()
}

// ============================================================================
// Plan limits
// ============================================================================

#[tokio::test]
#[ignore = "Requires TAVOLA_TEST_DATABASE_URL"]
async fn test_starter_plan_allows_one_location() {
    let pool = test_pool().await;
    let (admin, _) = create_super_admin(&pool).await;
    let id = create_restaurant(&pool, &admin, SubscriptionPlan::Starter).await;
    let service = RestaurantService::new(&pool, "pt-BR");

    let err = service
        .add_location(&admin, id, &location_input(&unique("loja")))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::BusinessRule(_)));

    let locations = service.get_locations(Some(&admin), id, true).await.unwrap();
    assert_eq!(locations.len(), 1);
}

#[tokio::test]
#[ignore = "Requires TAVOLA_TEST_DATABASE_URL"]
async fn test_professional_plan_allows_three_locations() {
    let pool = test_pool().await;
    let (admin, _) = create_super_admin(&pool).await;
    let id = create_restaurant(&pool, &admin, SubscriptionPlan::Professional).await;
    let service = RestaurantService::new(&pool, "pt-BR");

    for _ in 0..2 {
        service
            .add_location(&admin, id, &location_input(&unique("loja")))
            .await
            .expect("within plan limit");
    }
    let err = service
        .add_location(&admin, id, &location_input(&unique("loja")))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::BusinessRule(_)));
}

#[tokio::test]
#[ignore = "Requires TAVOLA_TEST_DATABASE_URL"]
async fn test_removed_locations_free_a_slot() {
    let pool = test_pool().await;
    let (admin, _) = create_super_admin(&pool).await;
    let id = create_restaurant(&pool, &admin, SubscriptionPlan::Professional).await;
    let service = RestaurantService::new(&pool, "pt-BR");

    let mut added = Vec::new();
    for _ in 0..2 {
        added.push(
            service
                .add_location(&admin, id, &location_input(&unique("loja")))
                .await
                .expect("within plan limit"),
        );
    }
    let first = added.first().expect("two locations added");
    service.remove_location(&admin, id, first.id).await.expect("remove");

    service
        .add_location(&admin, id, &location_input(&unique("loja")))
        .await
        .expect("inactive locations do not count");
}

// ============================================================================
// Primary location
// ============================================================================

#[tokio::test]
#[ignore = "Requires TAVOLA_TEST_DATABASE_URL"]
async fn test_set_primary_keeps_exactly_one() {
    let pool = test_pool().await;
    let (admin, _) = create_super_admin(&pool).await;
    let id = create_restaurant(&pool, &admin, SubscriptionPlan::Premium).await;
    let service = RestaurantService::new(&pool, "pt-BR");

    let second = service
        .add_location(&admin, id, &location_input(&unique("loja")))
        .await
        .unwrap();
    assert!(!second.is_primary);

    let locations = service.set_primary_location(&admin, id, second.id).await.unwrap();
    assert_eq!(primaries(&locations), vec![second.url_name.as_str()]);
}

#[tokio::test]
#[ignore = "Requires TAVOLA_TEST_DATABASE_URL"]
async fn test_removing_primary_promotes_another() {
    let pool = test_pool().await;
    let (admin, _) = create_super_admin(&pool).await;
    let id = create_restaurant(&pool, &admin, SubscriptionPlan::Premium).await;
    let service = RestaurantService::new(&pool, "pt-BR");

    let before = service.get_locations(Some(&admin), id, false).await.unwrap();
    let primary = before.iter().find(|l| l.is_primary).expect("has primary");
    let second = service
        .add_location(&admin, id, &location_input(&unique("loja")))
        .await
        .unwrap();

    service.remove_location(&admin, id, primary.id).await.unwrap();

    let after = service.get_locations(Some(&admin), id, false).await.unwrap();
    assert_eq!(primaries(&after), vec![second.url_name.as_str()]);
}

#[tokio::test]
#[ignore = "Requires TAVOLA_TEST_DATABASE_URL"]
async fn test_last_location_cannot_be_removed() {
    let pool = test_pool().await;
    let (admin, _) = create_super_admin(&pool).await;
    let id = create_restaurant(&pool, &admin, SubscriptionPlan::Starter).await;
    let service = RestaurantService::new(&pool, "pt-BR");

    let locations = service.get_locations(Some(&admin), id, false).await.unwrap();
    let only = locations.first().expect("one location");
    let err = service.remove_location(&admin, id, only.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::BusinessRule(_)));
}

// ============================================================================
// Soft delete
// ============================================================================

#[tokio::test]
#[ignore = "Requires TAVOLA_TEST_DATABASE_URL"]
async fn test_delete_with_active_locations_leaves_restaurant_unchanged() {
    let pool = test_pool().await;
    let (admin, _) = create_super_admin(&pool).await;
    let id = create_restaurant(&pool, &admin, SubscriptionPlan::Starter).await;
    let service = RestaurantService::new(&pool, "pt-BR");

    let err = service.delete_restaurant(&admin, id).await.unwrap_err();
    assert!(matches!(err, ServiceError::BusinessRule(_)));

    let restaurant = RestaurantRepository::new(&pool)
        .get_by_id(id)
        .await
        .unwrap()
        .expect("restaurant still exists");
    assert_eq!(restaurant.status, RestaurantStatus::Active);
}
