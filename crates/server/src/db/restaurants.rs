//! Restaurant repository.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use tracing::instrument;

use tavola_core::validation::PixKeyType;
use tavola_core::{
    BusinessType, Email, FeatureSet, Location, LoginName, NewRestaurant, PageRequest,
    PaymentMethod, PaymentSettings, PixKey, Restaurant, RestaurantId, RestaurantPatch,
    RestaurantStatus, RoleId, SubscriptionPlan, UserId, UserStatus,
};

use super::languages::upsert_language;
use super::locations::{insert_location, lock_restaurant};
use super::users::{insert_assignments, insert_user};
use super::{RepositoryError, conflict_on_unique, like_pattern};

#[derive(Debug, sqlx::FromRow)]
struct RestaurantRow {
    id: i32,
    name: String,
    url_name: String,
    description: Option<String>,
    business_type: BusinessType,
    cuisine_type: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    whatsapp: Option<String>,
    website: Option<String>,
    cnpj: Option<String>,
    subscription_plan: SubscriptionPlan,
    selected_features: Vec<String>,
    status: RestaurantStatus,
    payment_methods: Vec<String>,
    pix_key_type: Option<String>,
    pix_key: Option<String>,
    created_by: Option<i32>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RestaurantRow> for Restaurant {
    type Error = RepositoryError;

    fn try_from(row: RestaurantRow) -> Result<Self, Self::Error> {
        let corrupt = |what: String| RepositoryError::DataCorruption(format!("restaurant {}: {what}", row.id));

        let email = row
            .email
            .as_deref()
            .map(Email::parse)
            .transpose()
            .map_err(|e| corrupt(format!("invalid email: {e}")))?;
        let selected_features = FeatureSet::from_names(&row.selected_features).map_err(corrupt)?;
        let accepted_methods = row
            .payment_methods
            .iter()
            .map(|m| m.parse::<PaymentMethod>())
            .collect::<Result<_, _>>()
            .map_err(corrupt)?;
        let pix = match (row.pix_key_type.as_deref(), row.pix_key) {
            (Some(key_type), Some(key)) => Some(PixKey {
                key_type: key_type.parse::<PixKeyType>().map_err(corrupt)?,
                key,
            }),
            _ => None,
        };

        Ok(Self {
            id: RestaurantId::new(row.id),
            name: row.name,
            url_name: row.url_name,
            description: row.description,
            business_type: row.business_type,
            cuisine_type: row.cuisine_type,
            email,
            phone: row.phone,
            whatsapp: row.whatsapp,
            website: row.website,
            cnpj: row.cnpj,
            subscription_plan: row.subscription_plan,
            selected_features,
            status: row.status,
            payment: PaymentSettings {
                accepted_methods,
                pix,
            },
            created_by: row.created_by.map(UserId::new),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const RESTAURANT_COLUMNS: &str = "id, name, url_name, description, business_type, cuisine_type, \
     email, phone, whatsapp, website, cnpj, subscription_plan, selected_features, status, \
     payment_methods, pix_key_type, pix_key, created_by, created_at, updated_at";

const URL_TAKEN: &str = "url_name already in use";

/// Filters for listing restaurants.
#[derive(Debug, Clone, Default)]
pub struct RestaurantFilter {
    /// `None` lists every status.
    pub status: Option<RestaurantStatus>,
    /// Case-insensitive match on name, description or cuisine type.
    pub search: Option<String>,
    pub business_type: Option<BusinessType>,
    pub cuisine_type: Option<String>,
}

/// The owner account created by a public sign-up.
#[derive(Debug)]
pub struct NewOwner<'a> {
    pub email: &'a Email,
    pub full_name: &'a str,
    pub password_hash: &'a str,
    pub role_id: RoleId,
}

/// Repository for restaurant database operations.
pub struct RestaurantRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> RestaurantRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Whether a restaurant already uses this url name (any status).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn url_name_exists(&self, url_name: &str) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM tavola.restaurant WHERE url_name = $1)",
        )
        .bind(url_name)
        .fetch_one(self.pool)
        .await?;
        Ok(exists)
    }

    /// Get a restaurant by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn get_by_id(&self, id: RestaurantId) -> Result<Option<Restaurant>, RepositoryError> {
        let sql = format!("SELECT {RESTAURANT_COLUMNS} FROM tavola.restaurant WHERE id = $1");
        let row = sqlx::query_as::<_, RestaurantRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get a restaurant by its url name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn get_by_url_name(
        &self,
        url_name: &str,
    ) -> Result<Option<Restaurant>, RepositoryError> {
        let sql = format!("SELECT {RESTAURANT_COLUMNS} FROM tavola.restaurant WHERE url_name = $1");
        let row = sqlx::query_as::<_, RestaurantRow>(&sql)
            .bind(url_name)
            .fetch_optional(self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// One page of restaurants plus the total number of matches.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        filter: &RestaurantFilter,
        page: PageRequest,
    ) -> Result<(Vec<Restaurant>, u64), RepositoryError> {
        const WHERE: &str = r"
            WHERE ($1::tavola.restaurant_status IS NULL OR status = $1)
              AND ($2::text IS NULL
                   OR name ILIKE $2 OR description ILIKE $2 OR cuisine_type ILIKE $2)
              AND ($3::tavola.business_type IS NULL OR business_type = $3)
              AND ($4::text IS NULL OR cuisine_type ILIKE $4)
        ";
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(like_pattern);
        let cuisine = filter
            .cuisine_type
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(like_pattern);

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM tavola.restaurant {WHERE}"))
            .bind(filter.status)
            .bind(search.as_deref())
            .bind(filter.business_type)
            .bind(cuisine.as_deref())
            .fetch_one(self.pool)
            .await?;

        let sql = format!(
            "SELECT {RESTAURANT_COLUMNS} FROM tavola.restaurant {WHERE}
             ORDER BY name, id LIMIT $5 OFFSET $6"
        );
        let rows = sqlx::query_as::<_, RestaurantRow>(&sql)
            .bind(filter.status)
            .bind(search.as_deref())
            .bind(filter.business_type)
            .bind(cuisine.as_deref())
            .bind(i64::from(page.limit))
            .bind(page.offset())
            .fetch_all(self.pool)
            .await?;

        let restaurants = rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((restaurants, u64::try_from(total).unwrap_or(0)))
    }

    /// Create a restaurant with its primary location and default language in
    /// one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the url name is taken and
    /// `RepositoryError::DataCorruption` if the default language is not in
    /// the catalog.
    #[instrument(skip(self, data), fields(url_name = %data.url_name))]
    pub async fn create(
        &self,
        data: &NewRestaurant,
        created_by: Option<UserId>,
        default_language: &str,
    ) -> Result<(Restaurant, Location), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let restaurant =
            insert_restaurant(&mut tx, data, RestaurantStatus::Active, created_by).await?;
        let location = insert_location(&mut tx, restaurant.id, &data.location, true).await?;
        upsert_language(&mut tx, restaurant.id, default_language, 0, true)
            .await
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;
        tx.commit().await?;
        Ok((restaurant, location))
    }

    /// Public sign-up: restaurant (pending), primary location, default
    /// language and the owner account, all or nothing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the url name or the owner
    /// email is taken.
    #[instrument(skip(self, data, owner), fields(url_name = %data.url_name))]
    pub async fn register(
        &self,
        data: &NewRestaurant,
        owner: NewOwner<'_>,
        default_language: &str,
    ) -> Result<(Restaurant, Location, UserId), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let restaurant = insert_restaurant(&mut tx, data, RestaurantStatus::Pending, None).await?;
        let location = insert_location(&mut tx, restaurant.id, &data.location, true).await?;
        upsert_language(&mut tx, restaurant.id, default_language, 0, true)
            .await
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;

        let user_id = insert_user(
            &mut tx,
            Some(restaurant.id),
            &LoginName::Email(owner.email.clone()),
            owner.full_name,
            owner.password_hash,
            UserStatus::Active,
        )
        .await?;
        insert_assignments(&mut tx, user_id, &[(owner.role_id, Some(location.id))]).await?;

        let restaurant = set_created_by(&mut tx, restaurant.id, user_id).await?;
        tx.commit().await?;
        Ok((restaurant, location, user_id))
    }

    /// Apply a partial update. An empty string clears an optional field.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the restaurant does not exist.
    pub async fn update(
        &self,
        id: RestaurantId,
        patch: &RestaurantPatch,
    ) -> Result<Restaurant, RepositoryError> {
        let email = patch
            .email
            .as_deref()
            .map(|e| Email::parse(e).map_or_else(|_| String::new(), String::from));
        let sql = format!(
            r"
            UPDATE tavola.restaurant SET
                name = COALESCE($2, name),
                description = CASE WHEN $3::text IS NULL THEN description ELSE NULLIF($3, '') END,
                business_type = COALESCE($4, business_type),
                cuisine_type = CASE WHEN $5::text IS NULL THEN cuisine_type ELSE NULLIF($5, '') END,
                email = CASE WHEN $6::text IS NULL THEN email ELSE NULLIF($6, '') END,
                phone = CASE WHEN $7::text IS NULL THEN phone ELSE NULLIF($7, '') END,
                whatsapp = CASE WHEN $8::text IS NULL THEN whatsapp ELSE NULLIF($8, '') END,
                website = CASE WHEN $9::text IS NULL THEN website ELSE NULLIF($9, '') END,
                cnpj = CASE WHEN $10::text IS NULL THEN cnpj ELSE NULLIF($10, '') END
            WHERE id = $1
            RETURNING {RESTAURANT_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, RestaurantRow>(&sql)
            .bind(id)
            .bind(patch.name.as_deref().map(str::trim))
            .bind(patch.description.as_deref())
            .bind(patch.business_type)
            .bind(patch.cuisine_type.as_deref())
            .bind(email.as_deref())
            .bind(patch.phone.as_deref())
            .bind(patch.whatsapp.as_deref())
            .bind(patch.website.as_deref())
            .bind(patch.cnpj.as_deref())
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    /// Replace the selected features.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the restaurant does not exist.
    pub async fn update_features(
        &self,
        id: RestaurantId,
        features: &FeatureSet,
    ) -> Result<Restaurant, RepositoryError> {
        let sql = format!(
            "UPDATE tavola.restaurant SET selected_features = $2 WHERE id = $1 RETURNING {RESTAURANT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, RestaurantRow>(&sql)
            .bind(id)
            .bind(features.names())
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    /// Replace the payment settings.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the restaurant does not exist.
    pub async fn update_payment(
        &self,
        id: RestaurantId,
        payment: &PaymentSettings,
    ) -> Result<Restaurant, RepositoryError> {
        let sql = format!(
            r"
            UPDATE tavola.restaurant
            SET payment_methods = $2, pix_key_type = $3, pix_key = $4
            WHERE id = $1
            RETURNING {RESTAURANT_COLUMNS}
            "
        );
        let pix = payment
            .accepted_methods
            .contains(&PaymentMethod::Pix)
            .then_some(payment.pix.as_ref())
            .flatten();
        let row = sqlx::query_as::<_, RestaurantRow>(&sql)
            .bind(id)
            .bind(payment.method_names())
            .bind(pix.map(|p| p.key_type.as_str()))
            .bind(pix.map(|p| p.key.trim()))
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    /// Soft-delete (status `inactive`) unless active locations remain.
    ///
    /// Returns the number of active locations that blocked the deletion, or
    /// `0` when the restaurant was deactivated.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the restaurant does not exist.
    #[instrument(skip(self))]
    pub async fn soft_delete(&self, id: RestaurantId) -> Result<i64, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        lock_restaurant(&mut tx, id).await?;

        let active: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM tavola.location WHERE restaurant_id = $1 AND is_active",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        if active > 0 {
            return Ok(active);
        }

        sqlx::query("UPDATE tavola.restaurant SET status = 'inactive' WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(0)
    }
}

async fn insert_restaurant(
    conn: &mut PgConnection,
    data: &NewRestaurant,
    status: RestaurantStatus,
    created_by: Option<UserId>,
) -> Result<Restaurant, RepositoryError> {
    let email = data
        .email
        .as_deref()
        .and_then(|e| Email::parse(e).ok())
        .map(String::from);
    let pix = data
        .payment
        .accepted_methods
        .contains(&PaymentMethod::Pix)
        .then_some(data.payment.pix.as_ref())
        .flatten();

    let sql = format!(
        r"
        INSERT INTO tavola.restaurant
            (name, url_name, description, business_type, cuisine_type, email, phone, whatsapp,
             website, cnpj, subscription_plan, selected_features, status, payment_methods,
             pix_key_type, pix_key, created_by)
        VALUES ($1, $2, NULLIF($3, ''), $4, NULLIF($5, ''), $6, NULLIF($7, ''), NULLIF($8, ''),
                NULLIF($9, ''), NULLIF($10, ''), $11, $12, $13, $14, $15, $16, $17)
        RETURNING {RESTAURANT_COLUMNS}
        "
    );
    let row = sqlx::query_as::<_, RestaurantRow>(&sql)
        .bind(data.name.trim())
        .bind(&data.url_name)
        .bind(data.description.as_deref())
        .bind(data.business_type)
        .bind(data.cuisine_type.as_deref())
        .bind(email)
        .bind(data.phone.as_deref())
        .bind(data.whatsapp.as_deref())
        .bind(data.website.as_deref())
        .bind(data.cnpj.as_deref())
        .bind(data.subscription_plan)
        .bind(data.selected_features.names())
        .bind(status)
        .bind(data.payment.method_names())
        .bind(pix.map(|p| p.key_type.as_str()))
        .bind(pix.map(|p| p.key.trim()))
        .bind(created_by)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| conflict_on_unique(e, URL_TAKEN))?;

    row.try_into()
}

async fn set_created_by(
    conn: &mut PgConnection,
    id: RestaurantId,
    user_id: UserId,
) -> Result<Restaurant, RepositoryError> {
    let sql = format!(
        "UPDATE tavola.restaurant SET created_by = $2 WHERE id = $1 RETURNING {RESTAURANT_COLUMNS}"
    );
    let row = sqlx::query_as::<_, RestaurantRow>(&sql)
        .bind(id)
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?;
    row.try_into()
}
