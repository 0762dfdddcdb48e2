//! Language catalog and per-restaurant language configuration.
//!
//! Every multi-statement operation runs in a single transaction. Dropping
//! an uncommitted [`sqlx::Transaction`] rolls it back, so returning early
//! with `?` leaves the configuration untouched.
//!
//! A restaurant has at most one default among its active languages. The
//! default is moved by clearing every default first and then setting the
//! requested one, inside the same transaction; a partial unique index
//! backs this up at the database level.

use sqlx::{PgConnection, PgPool};
use tracing::instrument;

use tavola_core::types::language::count_defaults;
use tavola_core::{Language, LanguageAssignment, LanguageId, RestaurantId, RestaurantLanguage};

/// Errors from language operations.
#[derive(Debug, thiserror::Error)]
pub enum LanguageError {
    /// The code is not in the catalog or the catalog entry is inactive.
    #[error("language not found or inactive: {0}")]
    UnknownLanguage(String),

    /// The restaurant has no active configuration for this code.
    #[error("language {0} is not configured for this restaurant")]
    NotConfigured(String),

    /// A bulk update marked more than one entry as default.
    #[error("only one language can be the default (got {0})")]
    MultipleDefaults(usize),

    /// A multi-statement operation failed and was rolled back.
    #[error("failed to {action}: {source}")]
    Operation {
        action: &'static str,
        #[source]
        source: Box<LanguageError>,
    },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl LanguageError {
    fn during(self, action: &'static str) -> Self {
        Self::Operation {
            action,
            source: Box::new(self),
        }
    }

    /// The innermost error, skipping `Operation` wrappers.
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::Operation { source, .. } => source.root(),
            other => other,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LanguageRow {
    id: i32,
    code: String,
    name: String,
    native_name: String,
    flag: Option<String>,
    display_order: i32,
    is_active: bool,
}

impl From<LanguageRow> for Language {
    fn from(row: LanguageRow) -> Self {
        Self {
            id: LanguageId::new(row.id),
            code: row.code,
            name: row.name,
            native_name: row.native_name,
            flag: row.flag,
            display_order: row.display_order,
            is_active: row.is_active,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RestaurantLanguageRow {
    language_id: i32,
    code: String,
    name: String,
    native_name: String,
    flag: Option<String>,
    display_order: i32,
    is_default: bool,
    is_active: bool,
}

impl From<RestaurantLanguageRow> for RestaurantLanguage {
    fn from(row: RestaurantLanguageRow) -> Self {
        Self {
            language_id: LanguageId::new(row.language_id),
            code: row.code,
            name: row.name,
            native_name: row.native_name,
            flag: row.flag,
            display_order: row.display_order,
            is_default: row.is_default,
            is_active: row.is_active,
        }
    }
}

const RESTAURANT_LANGUAGE_SELECT: &str = r"
    SELECT rl.language_id, l.code, l.name, l.native_name, l.flag,
           rl.display_order, rl.is_default, rl.is_active
    FROM tavola.restaurant_language rl
    JOIN tavola.language l ON l.id = rl.language_id
";

/// Repository for language catalog and restaurant language operations.
pub struct LanguageRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> LanguageRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Active catalog languages, ordered by display order.
    ///
    /// # Errors
    ///
    /// Returns `LanguageError::Database` if the query fails.
    pub async fn available(&self) -> Result<Vec<Language>, LanguageError> {
        let rows = sqlx::query_as::<_, LanguageRow>(
            r"
            SELECT id, code, name, native_name, flag, display_order, is_active
            FROM tavola.language
            WHERE is_active
            ORDER BY display_order, code
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Insert or update a catalog entry by code. Used by seeding.
    ///
    /// # Errors
    ///
    /// Returns `LanguageError::Database` if the query fails.
    pub async fn upsert_catalog_entry(
        &self,
        code: &str,
        name: &str,
        native_name: &str,
        flag: Option<&str>,
        display_order: i32,
        is_active: bool,
    ) -> Result<Language, LanguageError> {
        let row = sqlx::query_as::<_, LanguageRow>(
            r"
            INSERT INTO tavola.language (code, name, native_name, flag, display_order, is_active)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (code) DO UPDATE
                SET name = EXCLUDED.name,
                    native_name = EXCLUDED.native_name,
                    flag = EXCLUDED.flag,
                    display_order = EXCLUDED.display_order,
                    is_active = EXCLUDED.is_active
            RETURNING id, code, name, native_name, flag, display_order, is_active
            ",
        )
        .bind(code)
        .bind(name)
        .bind(native_name)
        .bind(flag)
        .bind(display_order)
        .bind(is_active)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Active languages configured for a restaurant, ordered by the
    /// restaurant's order and then the catalog order.
    ///
    /// # Errors
    ///
    /// Returns `LanguageError::Database` if the query fails.
    pub async fn for_restaurant(
        &self,
        restaurant_id: RestaurantId,
    ) -> Result<Vec<RestaurantLanguage>, LanguageError> {
        let sql = format!(
            "{RESTAURANT_LANGUAGE_SELECT}
             WHERE rl.restaurant_id = $1 AND rl.is_active
             ORDER BY rl.display_order, l.display_order"
        );
        let rows = sqlx::query_as::<_, RestaurantLanguageRow>(&sql)
            .bind(restaurant_id)
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// The active default language, if any.
    ///
    /// # Errors
    ///
    /// Returns `LanguageError::Database` if the query fails.
    pub async fn default_for(
        &self,
        restaurant_id: RestaurantId,
    ) -> Result<Option<RestaurantLanguage>, LanguageError> {
        let sql = format!(
            "{RESTAURANT_LANGUAGE_SELECT}
             WHERE rl.restaurant_id = $1 AND rl.is_default AND rl.is_active"
        );
        let row = sqlx::query_as::<_, RestaurantLanguageRow>(&sql)
            .bind(restaurant_id)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    /// Add (or reactivate and update) a language for a restaurant.
    ///
    /// # Errors
    ///
    /// Returns `LanguageError::Operation` wrapping `UnknownLanguage` or a
    /// database error; nothing is written in that case.
    #[instrument(skip(self))]
    pub async fn add(
        &self,
        restaurant_id: RestaurantId,
        code: &str,
        display_order: i32,
        is_default: bool,
    ) -> Result<RestaurantLanguage, LanguageError> {
        self.add_in_transaction(restaurant_id, code, display_order, is_default)
            .await
            .map_err(|e| e.during("add language"))
    }

    async fn add_in_transaction(
        &self,
        restaurant_id: RestaurantId,
        code: &str,
        display_order: i32,
        is_default: bool,
    ) -> Result<RestaurantLanguage, LanguageError> {
        let mut tx = self.pool.begin().await?;
        let language =
            upsert_language(&mut tx, restaurant_id, code, display_order, is_default).await?;
        tx.commit().await?;
        Ok(language)
    }

    /// Soft-deactivate a configured language.
    ///
    /// # Errors
    ///
    /// Returns `LanguageError::NotConfigured` if no active row matches.
    #[instrument(skip(self))]
    pub async fn remove(&self, restaurant_id: RestaurantId, code: &str) -> Result<(), LanguageError> {
        let result = sqlx::query(
            r"
            UPDATE tavola.restaurant_language rl
            SET is_active = FALSE, is_default = FALSE
            FROM tavola.language l
            WHERE l.id = rl.language_id
              AND rl.restaurant_id = $1 AND l.code = $2 AND rl.is_active
            ",
        )
        .bind(restaurant_id)
        .bind(code)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(LanguageError::NotConfigured(code.to_owned()));
        }
        Ok(())
    }

    /// Make `code` the restaurant's only default language.
    ///
    /// # Errors
    ///
    /// Returns `LanguageError::Operation` wrapping `NotConfigured` when the
    /// target row is missing or inactive; the previous default is kept.
    #[instrument(skip(self))]
    pub async fn set_default(
        &self,
        restaurant_id: RestaurantId,
        code: &str,
    ) -> Result<(), LanguageError> {
        self.set_default_in_transaction(restaurant_id, code)
            .await
            .map_err(|e| e.during("set default language"))
    }

    async fn set_default_in_transaction(
        &self,
        restaurant_id: RestaurantId,
        code: &str,
    ) -> Result<(), LanguageError> {
        let mut tx = self.pool.begin().await?;
        clear_defaults(&mut tx, restaurant_id).await?;
        let updated = sqlx::query(
            r"
            UPDATE tavola.restaurant_language rl
            SET is_default = TRUE
            FROM tavola.language l
            WHERE l.id = rl.language_id
              AND rl.restaurant_id = $1 AND l.code = $2 AND rl.is_active
            ",
        )
        .bind(restaurant_id)
        .bind(code)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(LanguageError::NotConfigured(code.to_owned()));
        }
        tx.commit().await?;
        Ok(())
    }

    /// Change the restaurant-specific order of a language.
    ///
    /// # Errors
    ///
    /// Returns `LanguageError::NotConfigured` if no row matches.
    pub async fn update_display_order(
        &self,
        restaurant_id: RestaurantId,
        code: &str,
        display_order: i32,
    ) -> Result<(), LanguageError> {
        let result = sqlx::query(
            r"
            UPDATE tavola.restaurant_language rl
            SET display_order = $3
            FROM tavola.language l
            WHERE l.id = rl.language_id AND rl.restaurant_id = $1 AND l.code = $2
            ",
        )
        .bind(restaurant_id)
        .bind(code)
        .bind(display_order)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(LanguageError::NotConfigured(code.to_owned()));
        }
        Ok(())
    }

    /// Apply several language assignments atomically.
    ///
    /// More than one default is rejected before touching the database. When
    /// one entry is the default, existing defaults are cleared first; when
    /// none is, the current default is kept. An empty list changes nothing.
    ///
    /// # Errors
    ///
    /// Returns `LanguageError::MultipleDefaults`, or `LanguageError::Operation`
    /// wrapping the first failing entry (the whole batch is rolled back).
    #[instrument(skip(self, languages), fields(count = languages.len()))]
    pub async fn bulk_update(
        &self,
        restaurant_id: RestaurantId,
        languages: &[LanguageAssignment],
    ) -> Result<(), LanguageError> {
        let defaults = count_defaults(languages);
        if defaults > 1 {
            return Err(LanguageError::MultipleDefaults(defaults));
        }
        if languages.is_empty() {
            return Ok(());
        }

        self.bulk_in_transaction(restaurant_id, languages, defaults == 1)
            .await
            .map_err(|e| e.during("update languages"))
    }

    async fn bulk_in_transaction(
        &self,
        restaurant_id: RestaurantId,
        languages: &[LanguageAssignment],
        replaces_default: bool,
    ) -> Result<(), LanguageError> {
        let mut tx = self.pool.begin().await?;
        if replaces_default {
            clear_defaults(&mut tx, restaurant_id).await?;
        }
        for entry in languages {
            upsert_language(
                &mut tx,
                restaurant_id,
                &entry.code,
                entry.display_order,
                entry.is_default,
            )
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

/// Look up an active catalog entry by code.
async fn resolve_code(conn: &mut PgConnection, code: &str) -> Result<LanguageId, LanguageError> {
    let id: Option<i32> =
        sqlx::query_scalar("SELECT id FROM tavola.language WHERE code = $1 AND is_active")
            .bind(code)
            .fetch_optional(&mut *conn)
            .await?;

    id.map(LanguageId::new)
        .ok_or_else(|| LanguageError::UnknownLanguage(code.to_owned()))
}

async fn clear_defaults(
    conn: &mut PgConnection,
    restaurant_id: RestaurantId,
) -> Result<(), LanguageError> {
    sqlx::query(
        "UPDATE tavola.restaurant_language SET is_default = FALSE WHERE restaurant_id = $1 AND is_default",
    )
    .bind(restaurant_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Insert or reactivate a restaurant language inside an open transaction.
///
/// When `is_default` is set, other defaults are cleared first. An entry
/// sent without the flag never demotes the current default; only choosing
/// another default does.
pub(crate) async fn upsert_language(
    conn: &mut PgConnection,
    restaurant_id: RestaurantId,
    code: &str,
    display_order: i32,
    is_default: bool,
) -> Result<RestaurantLanguage, LanguageError> {
    let language_id = resolve_code(conn, code).await?;
    if is_default {
        clear_defaults(conn, restaurant_id).await?;
    }

    sqlx::query(
        r"
        INSERT INTO tavola.restaurant_language AS rl
            (restaurant_id, language_id, display_order, is_default, is_active)
        VALUES ($1, $2, $3, $4, TRUE)
        ON CONFLICT (restaurant_id, language_id)
        DO UPDATE SET display_order = EXCLUDED.display_order,
                      is_default = rl.is_default OR EXCLUDED.is_default,
                      is_active = TRUE
        ",
    )
    .bind(restaurant_id)
    .bind(language_id)
    .bind(display_order)
    .bind(is_default)
    .execute(&mut *conn)
    .await?;

    let sql = format!(
        "{RESTAURANT_LANGUAGE_SELECT} WHERE rl.restaurant_id = $1 AND rl.language_id = $2"
    );
    let row = sqlx::query_as::<_, RestaurantLanguageRow>(&sql)
        .bind(restaurant_id)
        .bind(language_id)
        .fetch_one(&mut *conn)
        .await?;

    Ok(row.into())
}
