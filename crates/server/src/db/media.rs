//! Media asset repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use tavola_core::{MediaAsset, MediaAssetId, MediaKind, NewMediaAsset, RestaurantId};

use super::RepositoryError;

#[derive(Debug, sqlx::FromRow)]
struct MediaRow {
    id: i32,
    restaurant_id: i32,
    kind: MediaKind,
    url: String,
    alt_text: Option<String>,
    display_order: i32,
    created_at: DateTime<Utc>,
}

impl From<MediaRow> for MediaAsset {
    fn from(row: MediaRow) -> Self {
        Self {
            id: MediaAssetId::new(row.id),
            restaurant_id: RestaurantId::new(row.restaurant_id),
            kind: row.kind,
            url: row.url,
            alt_text: row.alt_text,
            display_order: row.display_order,
            created_at: row.created_at,
        }
    }
}

/// Repository for media asset records. Files themselves live elsewhere;
/// only their URLs are stored.
pub struct MediaRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> MediaRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Media of a restaurant, logo and favicon first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, restaurant_id: RestaurantId) -> Result<Vec<MediaAsset>, RepositoryError> {
        let rows = sqlx::query_as::<_, MediaRow>(
            r"
            SELECT id, restaurant_id, kind, url, alt_text, display_order, created_at
            FROM tavola.media_asset
            WHERE restaurant_id = $1
            ORDER BY kind, display_order, id
            ",
        )
        .bind(restaurant_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Add a media record. A new logo or favicon replaces the previous one
    /// of the same kind.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self, asset), fields(kind = ?asset.kind))]
    pub async fn add(
        &self,
        restaurant_id: RestaurantId,
        asset: &NewMediaAsset,
    ) -> Result<MediaAsset, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        if asset.kind.is_singleton() {
            sqlx::query("DELETE FROM tavola.media_asset WHERE restaurant_id = $1 AND kind = $2")
                .bind(restaurant_id)
                .bind(asset.kind)
                .execute(&mut *tx)
                .await?;
        }

        let row = sqlx::query_as::<_, MediaRow>(
            r"
            INSERT INTO tavola.media_asset (restaurant_id, kind, url, alt_text, display_order)
            VALUES ($1, $2, $3, NULLIF($4, ''), $5)
            RETURNING id, restaurant_id, kind, url, alt_text, display_order, created_at
            ",
        )
        .bind(restaurant_id)
        .bind(asset.kind)
        .bind(asset.url.trim())
        .bind(asset.alt_text.as_deref())
        .bind(asset.display_order)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row.into())
    }

    /// Delete a media record.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the record does not belong to
    /// the restaurant.
    pub async fn remove(
        &self,
        restaurant_id: RestaurantId,
        media_id: MediaAssetId,
    ) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("DELETE FROM tavola.media_asset WHERE restaurant_id = $1 AND id = $2")
                .bind(restaurant_id)
                .bind(media_id)
                .execute(self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
