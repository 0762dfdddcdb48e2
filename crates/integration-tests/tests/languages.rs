//! Default-language invariants against a real database.
//!
//! These tests require a `PostgreSQL` database in `TAVOLA_TEST_DATABASE_URL`.
//!
//! Run with: cargo test -p tavola-integration-tests -- --ignored

#![allow(clippy::unwrap_used)]

use tavola_core::{LanguageAssignment, RestaurantId, RestaurantLanguage, SubscriptionPlan};
use tavola_integration_tests::{create_restaurant, create_super_admin, test_pool};
use tavola_server::db::{LanguageError, LanguageRepository};
use tavola_server::services::{LanguageCatalog, LanguageService, ServiceError};

fn defaults(languages: &[RestaurantLanguage]) -> Vec<&str> {
    languages
        .iter()
        .filter(|l| l.is_default)
        .map(|l| l.code.as_str())
        .collect()
}

fn entry(code: &str, display_order: i32, is_default: bool) -> LanguageAssignment {
    LanguageAssignment {
        code: code.to_owned(),
        display_order,
        is_default,
    }
}

async fn configured(repo: &LanguageRepository<'_>, id: RestaurantId) -> Vec<RestaurantLanguage> {
    repo.for_restaurant(id)
        .await
        .expect("Failed to list restaurant languages")
}

#[tokio::test]
#[ignore = "Requires TAVOLA_TEST_DATABASE_URL"]
async fn test_new_restaurant_gets_default_language() {
    let pool = test_pool().await;
    let (admin, _) = create_super_admin(&pool).await;
    let id = create_restaurant(&pool, &admin, SubscriptionPlan::Starter).await;

    let repo = LanguageRepository::new(&pool);
    let languages = configured(&repo, id).await;
    assert_eq!(defaults(&languages), vec!["pt-BR"]);
}

#[tokio::test]
#[ignore = "Requires TAVOLA_TEST_DATABASE_URL"]
async fn test_set_default_keeps_exactly_one() {
    let pool = test_pool().await;
    let (admin, _) = create_super_admin(&pool).await;
    let id = create_restaurant(&pool, &admin, SubscriptionPlan::Starter).await;
    let repo = LanguageRepository::new(&pool);

    repo.add(id, "en", 2, false).await.expect("add en");
    repo.add(id, "es", 3, false).await.expect("add es");

    repo.set_default(id, "en").await.expect("default en");
    assert_eq!(defaults(&configured(&repo, id).await), vec!["en"]);

    // Setting the same default again is idempotent
    repo.set_default(id, "en").await.expect("default en again");
    repo.set_default(id, "es").await.expect("default es");
    assert_eq!(defaults(&configured(&repo, id).await), vec!["es"]);
}

#[tokio::test]
#[ignore = "Requires TAVOLA_TEST_DATABASE_URL"]
async fn test_add_as_default_replaces_previous_default() {
    let pool = test_pool().await;
    let (admin, _) = create_super_admin(&pool).await;
    let id = create_restaurant(&pool, &admin, SubscriptionPlan::Starter).await;
    let repo = LanguageRepository::new(&pool);

    let added = repo.add(id, "en", 2, true).await.expect("add en as default");
    assert!(added.is_default);
    assert_eq!(defaults(&configured(&repo, id).await), vec!["en"]);
}

#[tokio::test]
#[ignore = "Requires TAVOLA_TEST_DATABASE_URL"]
async fn test_add_unknown_code_writes_nothing() {
    let pool = test_pool().await;
    let (admin, _) = create_super_admin(&pool).await;
    let id = create_restaurant(&pool, &admin, SubscriptionPlan::Starter).await;
    let repo = LanguageRepository::new(&pool);
    let before = configured(&repo, id).await;

    let err = repo.add(id, "xx-YY", 9, true).await.unwrap_err();
    assert!(matches!(err.root(), LanguageError::UnknownLanguage(code) if code == "xx-YY"));
    assert_eq!(configured(&repo, id).await, before);
}

#[tokio::test]
#[ignore = "Requires TAVOLA_TEST_DATABASE_URL"]
async fn test_set_default_on_unconfigured_code_keeps_previous() {
    let pool = test_pool().await;
    let (admin, _) = create_super_admin(&pool).await;
    let id = create_restaurant(&pool, &admin, SubscriptionPlan::Starter).await;
    let repo = LanguageRepository::new(&pool);

    assert!(repo.set_default(id, "es").await.is_err());
    assert_eq!(defaults(&configured(&repo, id).await), vec!["pt-BR"]);
}

#[tokio::test]
#[ignore = "Requires TAVOLA_TEST_DATABASE_URL"]
async fn test_bulk_update_rejects_two_defaults() {
    let pool = test_pool().await;
    let (admin, _) = create_super_admin(&pool).await;
    let id = create_restaurant(&pool, &admin, SubscriptionPlan::Starter).await;
    let repo = LanguageRepository::new(&pool);
    let before = configured(&repo, id).await;

    let err = repo
        .bulk_update(id, &[entry("en", 1, true), entry("es", 2, true)])
        .await
        .unwrap_err();
    assert!(matches!(err.root(), LanguageError::MultipleDefaults(2)));
    assert_eq!(configured(&repo, id).await, before);
}

#[tokio::test]
#[ignore = "Requires TAVOLA_TEST_DATABASE_URL"]
async fn test_bulk_update_rolls_back_on_unknown_code() {
    let pool = test_pool().await;
    let (admin, _) = create_super_admin(&pool).await;
    let id = create_restaurant(&pool, &admin, SubscriptionPlan::Starter).await;
    let repo = LanguageRepository::new(&pool);
    let before = configured(&repo, id).await;

    let result = repo
        .bulk_update(id, &[entry("en", 1, true), entry("zz", 2, false)])
        .await;
    assert!(result.is_err());
    assert_eq!(configured(&repo, id).await, before);
}

#[tokio::test]
#[ignore = "Requires TAVOLA_TEST_DATABASE_URL"]
async fn test_bulk_update_moves_default() {
    let pool = test_pool().await;
    let (admin, _) = create_super_admin(&pool).await;
    let id = create_restaurant(&pool, &admin, SubscriptionPlan::Starter).await;
    let catalog = LanguageCatalog::new(std::time::Duration::from_secs(1));
    let service = LanguageService::new(&pool, &catalog);

    let result = service
        .bulk_update_languages(&admin, id, &[entry("pt-BR", 1, false), entry("en", 2, true)])
        .await
        .expect("bulk update");

    assert_eq!(defaults(&result.languages), vec!["en"]);
    assert_eq!(result.default_language.map(|l| l.code).as_deref(), Some("en"));
}

#[tokio::test]
#[ignore = "Requires TAVOLA_TEST_DATABASE_URL"]
async fn test_default_language_cannot_be_removed() {
    let pool = test_pool().await;
    let (admin, _) = create_super_admin(&pool).await;
    let id = create_restaurant(&pool, &admin, SubscriptionPlan::Starter).await;
    let catalog = LanguageCatalog::new(std::time::Duration::from_secs(1));
    let service = LanguageService::new(&pool, &catalog);

    let err = service.remove_language(&admin, id, "pt-BR").await.unwrap_err();
    assert!(matches!(err, ServiceError::BusinessRule(_)));

    service
        .add_language(&admin, id, &entry("en", 2, false))
        .await
        .expect("add en");
    service
        .remove_language(&admin, id, "en")
        .await
        .expect("non-default languages can be removed");
    let remaining = service.restaurant_languages(id).await.expect("list");
    assert_eq!(remaining.languages.len(), 1);
}

#[tokio::test]
#[ignore = "Requires TAVOLA_TEST_DATABASE_URL"]
async fn test_bulk_update_without_default_keeps_default() {
    let pool = test_pool().await;
    let (admin, _) = create_super_admin(&pool).await;
    let id = create_restaurant(&pool, &admin, SubscriptionPlan::Starter).await;
    let repo = LanguageRepository::new(&pool);

    repo.bulk_update(id, &[entry("pt-BR", 2, false), entry("en", 1, false)])
        .await
        .expect("bulk update without a default");

    let languages = configured(&repo, id).await;
    assert_eq!(defaults(&languages), vec!["pt-BR"]);
    let pt = languages.iter().find(|l| l.code == "pt-BR").unwrap();
    assert_eq!(pt.display_order, 2);
}

#[tokio::test]
#[ignore = "Requires TAVOLA_TEST_DATABASE_URL"]
async fn test_readding_default_with_new_order_keeps_it_default() {
    let pool = test_pool().await;
    let (admin, _) = create_super_admin(&pool).await;
    let id = create_restaurant(&pool, &admin, SubscriptionPlan::Starter).await;
    let repo = LanguageRepository::new(&pool);

    let readded = repo.add(id, "pt-BR", 5, false).await.expect("re-add pt-BR");
    assert!(readded.is_default);
    assert_eq!(readded.display_order, 5);
    assert_eq!(defaults(&configured(&repo, id).await), vec!["pt-BR"]);
}
