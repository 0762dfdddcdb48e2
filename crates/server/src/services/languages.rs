//! Restaurant language configuration.
//!
//! Wraps [`LanguageRepository`] with access checks and keeps the global
//! language catalog in a short-lived `moka` cache.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;
use tracing::{debug, instrument};

use tavola_core::api::RestaurantLanguages;
use tavola_core::types::language::active_default;
use tavola_core::{CurrentStaff, Language, LanguageAssignment, RestaurantId, RestaurantLanguage};

use crate::db::LanguageRepository;

use super::{ServiceError, ensure_can_manage};

const CATALOG_KEY: &str = "active";

/// Cached copy of the active language catalog.
#[derive(Clone)]
pub struct LanguageCatalog {
    cache: Cache<&'static str, Arc<Vec<Language>>>,
}

impl LanguageCatalog {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        let cache = Cache::builder().max_capacity(1).time_to_live(ttl).build();
        Self { cache }
    }

    /// The catalog, from cache or loaded through `repo`.
    async fn get_or_load(
        &self,
        repo: &LanguageRepository<'_>,
    ) -> Result<Arc<Vec<Language>>, ServiceError> {
        if let Some(languages) = self.cache.get(CATALOG_KEY).await {
            debug!("Cache hit for language catalog");
            return Ok(languages);
        }

        let languages = Arc::new(repo.available().await?);
        self.cache.insert(CATALOG_KEY, Arc::clone(&languages)).await;
        Ok(languages)
    }

    /// Drop the cached catalog (after seeding, for instance).
    pub async fn invalidate(&self) {
        self.cache.invalidate(CATALOG_KEY).await;
    }
}

/// Language operations for one request.
pub struct LanguageService<'a> {
    repo: LanguageRepository<'a>,
    catalog: &'a LanguageCatalog,
}

impl<'a> LanguageService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, catalog: &'a LanguageCatalog) -> Self {
        Self {
            repo: LanguageRepository::new(pool),
            catalog,
        }
    }

    /// Active catalog entries ordered by display order.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Language` if the catalog cannot be read.
    pub async fn available_languages(&self) -> Result<Arc<Vec<Language>>, ServiceError> {
        self.catalog.get_or_load(&self.repo).await
    }

    /// A restaurant's active languages and its default one.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Language` on database failure.
    pub async fn restaurant_languages(
        &self,
        restaurant_id: RestaurantId,
    ) -> Result<RestaurantLanguages, ServiceError> {
        let languages = self.repo.for_restaurant(restaurant_id).await?;
        let default_language = active_default(&languages).cloned();
        Ok(RestaurantLanguages {
            languages,
            default_language,
        })
    }

    /// The default language, if any.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Language` on database failure.
    pub async fn default_language(
        &self,
        restaurant_id: RestaurantId,
    ) -> Result<Option<RestaurantLanguage>, ServiceError> {
        Ok(self.repo.default_for(restaurant_id).await?)
    }

    /// Add or reactivate a language.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::BusinessRule` for codes outside the catalog.
    #[instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    pub async fn add_language(
        &self,
        actor: &CurrentStaff,
        restaurant_id: RestaurantId,
        entry: &LanguageAssignment,
    ) -> Result<RestaurantLanguage, ServiceError> {
        ensure_can_manage(actor, restaurant_id)?;
        Ok(self
            .repo
            .add(restaurant_id, entry.code.trim(), entry.display_order, entry.is_default)
            .await?)
    }

    /// Deactivate a language. The default language stays until another one
    /// is made the default.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::BusinessRule` when `code` is the default and
    /// `ServiceError::NotFound` when it is not configured.
    #[instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    pub async fn remove_language(
        &self,
        actor: &CurrentStaff,
        restaurant_id: RestaurantId,
        code: &str,
    ) -> Result<(), ServiceError> {
        ensure_can_manage(actor, restaurant_id)?;

        if let Some(default) = self.repo.default_for(restaurant_id).await?
            && default.code == code
        {
            return Err(ServiceError::BusinessRule(
                "Defina outro idioma padrão antes de remover este".to_owned(),
            ));
        }
        Ok(self.repo.remove(restaurant_id, code).await?)
    }

    /// Make `code` the only default language.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` when `code` is not an active language
    /// of the restaurant; the previous default is kept.
    #[instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    pub async fn set_default_language(
        &self,
        actor: &CurrentStaff,
        restaurant_id: RestaurantId,
        code: &str,
    ) -> Result<(), ServiceError> {
        ensure_can_manage(actor, restaurant_id)?;
        Ok(self.repo.set_default(restaurant_id, code).await?)
    }

    /// Change the display order of one language.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` when `code` is not configured.
    pub async fn update_display_order(
        &self,
        actor: &CurrentStaff,
        restaurant_id: RestaurantId,
        code: &str,
        display_order: i32,
    ) -> Result<(), ServiceError> {
        ensure_can_manage(actor, restaurant_id)?;
        Ok(self
            .repo
            .update_display_order(restaurant_id, code, display_order)
            .await?)
    }

    /// Apply several language entries atomically and return the result.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::BusinessRule` when more than one entry is the
    /// default or a code is unknown; nothing is written in either case.
    #[instrument(skip(self, actor, languages), fields(user_id = %actor.user_id))]
    pub async fn bulk_update_languages(
        &self,
        actor: &CurrentStaff,
        restaurant_id: RestaurantId,
        languages: &[LanguageAssignment],
    ) -> Result<RestaurantLanguages, ServiceError> {
        ensure_can_manage(actor, restaurant_id)?;
        self.repo.bulk_update(restaurant_id, languages).await?;
        self.restaurant_languages(restaurant_id).await
    }
}
