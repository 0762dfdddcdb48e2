//! Location repository.
//!
//! Operations that touch more than one row lock the owning restaurant row
//! first (`SELECT ... FOR UPDATE`), so concurrent location changes for the
//! same restaurant are serialized and the "one active primary" rule holds.

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};
use tracing::instrument;

use tavola_core::{
    Address, FeatureSet, Location, LocationId, LocationInput, LocationPatch, OperatingHours,
    RestaurantId,
};

use super::{RepositoryError, conflict_on_unique};

#[derive(Debug, sqlx::FromRow)]
struct LocationRow {
    id: i32,
    restaurant_id: i32,
    name: String,
    url_name: String,
    phone: Option<String>,
    whatsapp: Option<String>,
    address: Json<Address>,
    operating_hours: Json<OperatingHours>,
    selected_features: Vec<String>,
    is_primary: bool,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<LocationRow> for Location {
    type Error = RepositoryError;

    fn try_from(row: LocationRow) -> Result<Self, Self::Error> {
        let selected_features = FeatureSet::from_names(&row.selected_features)
            .map_err(|e| RepositoryError::DataCorruption(format!("location {}: {e}", row.id)))?;

        Ok(Self {
            id: LocationId::new(row.id),
            restaurant_id: RestaurantId::new(row.restaurant_id),
            name: row.name,
            url_name: row.url_name,
            phone: row.phone,
            whatsapp: row.whatsapp,
            address: row.address.0,
            operating_hours: row.operating_hours.0,
            selected_features,
            is_primary: row.is_primary,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const LOCATION_COLUMNS: &str = "id, restaurant_id, name, url_name, phone, whatsapp, address, \
     operating_hours, selected_features, is_primary, is_active, created_at, updated_at";

const URL_TAKEN: &str = "location url_name already in use";

/// Result of adding a location under a plan limit.
#[derive(Debug)]
pub enum AddLocation {
    Added(Location),
    LimitReached { limit: usize },
}

/// Result of deactivating a location.
#[derive(Debug, PartialEq, Eq)]
pub enum RemoveLocation {
    /// Deactivated; carries the location promoted to primary, if any.
    Removed { promoted: Option<LocationId> },
    /// Refused: it is the restaurant's last active location.
    LastLocation,
}

/// Repository for location database operations.
pub struct LocationRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> LocationRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Locations of a restaurant, primary first then oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        restaurant_id: RestaurantId,
        include_inactive: bool,
    ) -> Result<Vec<Location>, RepositoryError> {
        let sql = format!(
            "SELECT {LOCATION_COLUMNS} FROM tavola.location
             WHERE restaurant_id = $1 AND (is_active OR $2)
             ORDER BY is_primary DESC, created_at, id"
        );
        let rows = sqlx::query_as::<_, LocationRow>(&sql)
            .bind(restaurant_id)
            .bind(include_inactive)
            .fetch_all(self.pool)
            .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Get one location of a restaurant.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(
        &self,
        restaurant_id: RestaurantId,
        location_id: LocationId,
    ) -> Result<Option<Location>, RepositoryError> {
        let sql = format!(
            "SELECT {LOCATION_COLUMNS} FROM tavola.location WHERE restaurant_id = $1 AND id = $2"
        );
        let row = sqlx::query_as::<_, LocationRow>(&sql)
            .bind(restaurant_id)
            .bind(location_id)
            .fetch_optional(self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Number of active locations.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_active(&self, restaurant_id: RestaurantId) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM tavola.location WHERE restaurant_id = $1 AND is_active",
        )
        .bind(restaurant_id)
        .fetch_one(self.pool)
        .await?;
        Ok(count)
    }

    /// Ids of the restaurant's active locations among `ids`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn active_ids_among(
        &self,
        restaurant_id: RestaurantId,
        ids: &[LocationId],
    ) -> Result<Vec<LocationId>, RepositoryError> {
        let raw: Vec<i32> = ids.iter().map(LocationId::as_i32).collect();
        let found: Vec<i32> = sqlx::query_scalar(
            "SELECT id FROM tavola.location WHERE restaurant_id = $1 AND is_active AND id = ANY($2)",
        )
        .bind(restaurant_id)
        .bind(&raw)
        .fetch_all(self.pool)
        .await?;
        Ok(found.into_iter().map(LocationId::new).collect())
    }

    /// Add a location unless the restaurant already has `limit` active ones.
    /// The first active location becomes primary.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the restaurant does not exist,
    /// `RepositoryError::Conflict` if the url name is taken.
    #[instrument(skip(self, input), fields(url_name = %input.url_name))]
    pub async fn add(
        &self,
        restaurant_id: RestaurantId,
        input: &LocationInput,
        limit: Option<usize>,
    ) -> Result<AddLocation, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        lock_restaurant(&mut tx, restaurant_id).await?;

        let active: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM tavola.location WHERE restaurant_id = $1 AND is_active",
        )
        .bind(restaurant_id)
        .fetch_one(&mut *tx)
        .await?;
        let active = usize::try_from(active).unwrap_or(usize::MAX);

        if let Some(limit) = limit
            && active >= limit
        {
            return Ok(AddLocation::LimitReached { limit });
        }

        let location = insert_location(&mut tx, restaurant_id, input, active == 0).await?;
        tx.commit().await?;
        Ok(AddLocation::Added(location))
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such location exists,
    /// `RepositoryError::Conflict` if the new url name is taken.
    pub async fn update(
        &self,
        restaurant_id: RestaurantId,
        location_id: LocationId,
        patch: &LocationPatch,
    ) -> Result<Location, RepositoryError> {
        let sql = format!(
            r"
            UPDATE tavola.location SET
                name = COALESCE($3, name),
                url_name = COALESCE($4, url_name),
                phone = CASE WHEN $5::text IS NULL THEN phone ELSE NULLIF($5, '') END,
                whatsapp = CASE WHEN $6::text IS NULL THEN whatsapp ELSE NULLIF($6, '') END,
                address = COALESCE($7, address),
                operating_hours = COALESCE($8, operating_hours),
                selected_features = COALESCE($9, selected_features)
            WHERE restaurant_id = $1 AND id = $2
            RETURNING {LOCATION_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, LocationRow>(&sql)
            .bind(restaurant_id)
            .bind(location_id)
            .bind(patch.name.as_deref())
            .bind(patch.url_name.as_deref())
            .bind(patch.phone.as_deref())
            .bind(patch.whatsapp.as_deref())
            .bind(patch.address.as_ref().map(Json))
            .bind(patch.operating_hours.as_ref().map(Json))
            .bind(patch.selected_features.as_ref().map(FeatureSet::names))
            .fetch_optional(self.pool)
            .await
            .map_err(|e| conflict_on_unique(e, URL_TAKEN))?
            .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    /// Make one active location the primary one.
    ///
    /// Demotes every location and promotes the target in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the target is missing or inactive.
    #[instrument(skip(self))]
    pub async fn set_primary(
        &self,
        restaurant_id: RestaurantId,
        location_id: LocationId,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        lock_restaurant(&mut tx, restaurant_id).await?;

        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM tavola.location WHERE restaurant_id = $1 AND id = $2 AND is_active)",
        )
        .bind(restaurant_id)
        .bind(location_id)
        .fetch_one(&mut *tx)
        .await?;
        if !exists {
            return Err(RepositoryError::NotFound);
        }

        sqlx::query("UPDATE tavola.location SET is_primary = FALSE WHERE restaurant_id = $1 AND is_primary")
            .bind(restaurant_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE tavola.location SET is_primary = TRUE WHERE id = $1")
            .bind(location_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Soft-deactivate a location. The last active location is kept; when
    /// the primary is removed the oldest remaining active location is
    /// promoted in the same transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the location is missing or
    /// already inactive.
    #[instrument(skip(self))]
    pub async fn deactivate(
        &self,
        restaurant_id: RestaurantId,
        location_id: LocationId,
    ) -> Result<RemoveLocation, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        lock_restaurant(&mut tx, restaurant_id).await?;

        let was_primary: Option<bool> = sqlx::query_scalar(
            "SELECT is_primary FROM tavola.location WHERE restaurant_id = $1 AND id = $2 AND is_active",
        )
        .bind(restaurant_id)
        .bind(location_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(was_primary) = was_primary else {
            return Err(RepositoryError::NotFound);
        };

        let active: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM tavola.location WHERE restaurant_id = $1 AND is_active",
        )
        .bind(restaurant_id)
        .fetch_one(&mut *tx)
        .await?;
        if active <= 1 {
            return Ok(RemoveLocation::LastLocation);
        }

        sqlx::query("UPDATE tavola.location SET is_active = FALSE, is_primary = FALSE WHERE id = $1")
            .bind(location_id)
            .execute(&mut *tx)
            .await?;

        let promoted = if was_primary {
            let id: i32 = sqlx::query_scalar(
                r"
                UPDATE tavola.location SET is_primary = TRUE
                WHERE id = (
                    SELECT id FROM tavola.location
                    WHERE restaurant_id = $1 AND is_active
                    ORDER BY created_at, id
                    LIMIT 1
                )
                RETURNING id
                ",
            )
            .bind(restaurant_id)
            .fetch_one(&mut *tx)
            .await?;
            Some(LocationId::new(id))
        } else {
            None
        };

        tx.commit().await?;
        Ok(RemoveLocation::Removed { promoted })
    }
}

/// Lock the restaurant row for the rest of the transaction.
pub(crate) async fn lock_restaurant(
    conn: &mut PgConnection,
    restaurant_id: RestaurantId,
) -> Result<(), RepositoryError> {
    let found: Option<i32> =
        sqlx::query_scalar("SELECT id FROM tavola.restaurant WHERE id = $1 FOR UPDATE")
            .bind(restaurant_id)
            .fetch_optional(&mut *conn)
            .await?;
    found.map(|_| ()).ok_or(RepositoryError::NotFound)
}

/// Insert a location inside an open transaction.
pub(crate) async fn insert_location(
    conn: &mut PgConnection,
    restaurant_id: RestaurantId,
    input: &LocationInput,
    is_primary: bool,
) -> Result<Location, RepositoryError> {
    let sql = format!(
        r"
        INSERT INTO tavola.location
            (restaurant_id, name, url_name, phone, whatsapp, address, operating_hours,
             selected_features, is_primary)
        VALUES ($1, $2, $3, NULLIF($4, ''), NULLIF($5, ''), $6, $7, $8, $9)
        RETURNING {LOCATION_COLUMNS}
        "
    );
    let row = sqlx::query_as::<_, LocationRow>(&sql)
        .bind(restaurant_id)
        .bind(input.name.trim())
        .bind(&input.url_name)
        .bind(input.phone.as_deref())
        .bind(input.whatsapp.as_deref())
        .bind(Json(&input.address))
        .bind(Json(&input.operating_hours))
        .bind(input.selected_features.names())
        .bind(is_primary)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| conflict_on_unique(e, URL_TAKEN))?;

    row.try_into()
}
