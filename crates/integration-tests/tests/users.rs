//! Staff user management against a real database.
//!
//! These tests require a `PostgreSQL` database in `TAVOLA_TEST_DATABASE_URL`.
//!
//! Run with: cargo test -p tavola-integration-tests -- --ignored

#![allow(clippy::unwrap_used)]

use sqlx::PgPool;
use tavola_core::{
    AssignmentPair, CurrentStaff, LocationId, NewStaffUser, RestaurantId, RoleId, RoleName,
    StaffUser, SubscriptionPlan,
};
use tavola_integration_tests::{
    TEST_PASSWORD, create_restaurant, create_super_admin, test_pool, unique,
};
use tavola_server::db::users::RemoveRole;
use tavola_server::db::{RoleRepository, UserRepository};
use tavola_server::services::{RestaurantService, ServiceError, UserService};

async fn role_id(pool: &PgPool, name: RoleName) -> RoleId {
    RoleRepository::new(pool)
        .get_by_name(name)
        .await
        .expect("Failed to load role")
        .expect("roles are seeded by migrations")
        .id
}

async fn primary_location(pool: &PgPool, admin: &CurrentStaff, id: RestaurantId) -> LocationId {
    RestaurantService::new(pool, "pt-BR")
        .get_locations(Some(admin), id, false)
        .await
        .expect("Failed to list locations")
        .into_iter()
        .find(|l| l.is_primary)
        .expect("restaurants start with a primary location")
        .id
}

fn new_user(restaurant_id: RestaurantId, assignments: Vec<AssignmentPair>) -> NewStaffUser {
    NewStaffUser {
        restaurant_id: Some(restaurant_id),
        email: None,
        username: Some(unique("staff")),
        full_name: "Funcionário de Teste".to_owned(),
        password: TEST_PASSWORD.to_owned(),
        assignments,
    }
}

fn role_names(user: &StaffUser) -> Vec<RoleName> {
    let mut names: Vec<RoleName> = user.assignments.iter().map(|a| a.role_name).collect();
    names.sort_unstable();
    names
}

/// A super admin, a new restaurant and its primary location.
async fn setup(pool: &PgPool) -> (CurrentStaff, RestaurantId, LocationId) {
    let (admin, _) = create_super_admin(pool).await;
    let id = create_restaurant(pool, &admin, SubscriptionPlan::Starter).await;
    let location = primary_location(pool, &admin, id).await;
    (admin, id, location)
}

// ============================================================================
// Assignments
// ============================================================================

#[tokio::test]
#[ignore = "Requires TAVOLA_TEST_DATABASE_URL"]
async fn test_replace_assignments_swaps_every_role() {
    let pool = test_pool().await;
    let (admin, id, location) = setup(&pool).await;
    let service = UserService::new(&pool);

    let waiter = role_id(&pool, RoleName::Waiter).await;
    let kitchen = role_id(&pool, RoleName::Kitchen).await;
    let cashier = role_id(&pool, RoleName::Cashier).await;
    let pair = |role_id| AssignmentPair {
        role_id,
        location_id: location,
    };

    let user = service
        .create_user(&admin, &new_user(id, vec![pair(waiter)]))
        .await
        .expect("create waiter");
    assert_eq!(role_names(&user), vec![RoleName::Waiter]);

    let replaced = service
        .replace_assignments(&admin, user.id, &[pair(kitchen), pair(cashier)])
        .await
        .expect("replace assignments");
    assert_eq!(role_names(&replaced), vec![RoleName::Kitchen, RoleName::Cashier]);
    assert!(
        replaced
            .assignments
            .iter()
            .all(|a| a.location_id == Some(location))
    );

    let reloaded = service.get_user(&admin, user.id).await.unwrap();
    assert_eq!(reloaded, replaced);
}

#[tokio::test]
#[ignore = "Requires TAVOLA_TEST_DATABASE_URL"]
async fn test_duplicate_assignment_is_rejected() {
    let pool = test_pool().await;
    let (admin, id, location) = setup(&pool).await;
    let service = UserService::new(&pool);
    let pair = AssignmentPair {
        role_id: role_id(&pool, RoleName::Waiter).await,
        location_id: location,
    };

    let err = service
        .create_user(&admin, &new_user(id, vec![pair, pair]))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));

    let user = service
        .create_user(&admin, &new_user(id, vec![pair]))
        .await
        .expect("create waiter");
    let err = service
        .replace_assignments(&admin, user.id, &[pair, pair])
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
    assert_eq!(service.get_user(&admin, user.id).await.unwrap(), user);
}

#[tokio::test]
#[ignore = "Requires TAVOLA_TEST_DATABASE_URL"]
async fn test_location_of_another_restaurant_is_rejected() {
    let pool = test_pool().await;
    let (admin, id, _) = setup(&pool).await;
    let other = create_restaurant(&pool, &admin, SubscriptionPlan::Starter).await;
    let foreign = primary_location(&pool, &admin, other).await;
    let service = UserService::new(&pool);

    let pair = AssignmentPair {
        role_id: role_id(&pool, RoleName::Waiter).await,
        location_id: foreign,
    };
    let err = service
        .create_user(&admin, &new_user(id, vec![pair]))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
}

// ============================================================================
// Role removal
// ============================================================================

#[tokio::test]
#[ignore = "Requires TAVOLA_TEST_DATABASE_URL"]
async fn test_last_role_cannot_be_removed() {
    let pool = test_pool().await;
    let (admin, id, location) = setup(&pool).await;
    let service = UserService::new(&pool);
    let waiter = role_id(&pool, RoleName::Waiter).await;
    let kitchen = role_id(&pool, RoleName::Kitchen).await;

    let user = service
        .create_user(
            &admin,
            &new_user(
                id,
                vec![
                    AssignmentPair {
                        role_id: waiter,
                        location_id: location,
                    },
                    AssignmentPair {
                        role_id: kitchen,
                        location_id: location,
                    },
                ],
            ),
        )
        .await
        .expect("create user with two roles");

    let remaining = service
        .remove_role(&admin, user.id, kitchen)
        .await
        .expect("a second role can be removed");
    assert_eq!(role_names(&remaining), vec![RoleName::Waiter]);

    let err = service
        .remove_role(&admin, user.id, waiter)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::BusinessRule(_)));

    let err = service
        .remove_role(&admin, user.id, kitchen)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    let repo = UserRepository::new(&pool);
    assert_eq!(
        repo.remove_role(user.id, waiter).await.unwrap(),
        RemoveRole::LastRole
    );
    let reloaded = repo.get(user.id).await.unwrap().unwrap();
    assert_eq!(role_names(&reloaded), vec![RoleName::Waiter]);
}

// ============================================================================
// Tiers
// ============================================================================

#[tokio::test]
#[ignore = "Requires TAVOLA_TEST_DATABASE_URL"]
async fn test_grants_are_limited_by_actor_tier() {
    let pool = test_pool().await;
    let (admin, id, location) = setup(&pool).await;
    let service = UserService::new(&pool);
    let pair = |role_id| AssignmentPair {
        role_id,
        location_id: location,
    };

    let super_admin = role_id(&pool, RoleName::SuperAdmin).await;
    let restaurant_admin = role_id(&pool, RoleName::RestaurantAdministrator).await;
    let location_admin = role_id(&pool, RoleName::LocationAdministrator).await;
    let waiter = role_id(&pool, RoleName::Waiter).await;

    let owner = service
        .create_user(&admin, &new_user(id, vec![pair(restaurant_admin)]))
        .await
        .expect("create restaurant administrator");
    let owner = CurrentStaff::from(&owner);

    let err = service
        .create_user(&owner, &new_user(id, vec![pair(super_admin)]))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));

    let manager = service
        .create_user(&owner, &new_user(id, vec![pair(location_admin)]))
        .await
        .expect("restaurant administrators grant location roles");
    let manager = CurrentStaff::from(&manager);

    let err = service
        .create_user(&manager, &new_user(id, vec![pair(restaurant_admin)]))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));

    let granted = service
        .create_user(&manager, &new_user(id, vec![pair(waiter)]))
        .await
        .expect("location administrators grant staff roles");
    assert_eq!(granted.restaurant_id, Some(id));

    let visible: Vec<RoleName> = service
        .list_roles(&manager)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.name)
        .collect();
    assert!(!visible.contains(&RoleName::SuperAdmin));
    assert!(!visible.contains(&RoleName::RestaurantAdministrator));
    assert!(visible.contains(&RoleName::Waiter));
}

#[tokio::test]
#[ignore = "Requires TAVOLA_TEST_DATABASE_URL"]
async fn test_restaurant_admin_cannot_manage_other_restaurants() {
    let pool = test_pool().await;
    let (admin, id, location) = setup(&pool).await;
    let other = create_restaurant(&pool, &admin, SubscriptionPlan::Starter).await;
    let service = UserService::new(&pool);

    let owner = service
        .create_user(
            &admin,
            &new_user(
                id,
                vec![AssignmentPair {
                    role_id: role_id(&pool, RoleName::RestaurantAdministrator).await,
                    location_id: location,
                }],
            ),
        )
        .await
        .expect("create restaurant administrator");
    let owner = CurrentStaff::from(&owner);

    let other_location = primary_location(&pool, &admin, other).await;
    let outsider = service
        .create_user(
            &admin,
            &new_user(
                other,
                vec![AssignmentPair {
                    role_id: role_id(&pool, RoleName::Waiter).await,
                    location_id: other_location,
                }],
            ),
        )
        .await
        .expect("create waiter elsewhere");

    let err = service.get_user(&owner, outsider.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));
    let err = service.delete_user(&owner, outsider.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));
}
