//! Restaurant service: restaurants, their locations and media.
//!
//! Anonymous callers and staff of other restaurants only ever see active
//! restaurants; everything else goes through [`ensure_can_manage`] or
//! [`ensure_can_view`].

use sqlx::PgPool;
use tracing::instrument;

use tavola_core::api::UrlAvailability;
use tavola_core::validation::validate_url_slug;
use tavola_core::{
    BusinessType, CurrentStaff, Email, FeatureSet, FieldErrors, Location, LocationId,
    LocationInput, LocationPatch, MediaAsset, MediaAssetId, NewMediaAsset, NewRestaurant,
    PageRequest, Pagination, PaymentSettings, Registration, Restaurant, RestaurantId,
    RestaurantPatch, RestaurantProfile, RestaurantStatus, RoleName, ValidationError,
};

use crate::db::locations::{AddLocation, RemoveLocation};
use crate::db::restaurants::NewOwner;
use crate::db::{
    LocationRepository, MediaRepository, RestaurantFilter, RestaurantRepository, RoleRepository,
};

use super::users::hash_password;
use super::{ServiceError, ensure_can_manage, ensure_can_view};

const URL_TAKEN: &str = "Este endereço já está em uso";

/// Which statuses a restaurant listing includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    /// Active restaurants only.
    #[default]
    Default,
    Only(RestaurantStatus),
    All,
}

impl StatusFilter {
    /// Parse the `status` query parameter: absent, `all` or a status name.
    ///
    /// # Errors
    ///
    /// Returns the unknown value.
    pub fn parse(value: Option<&str>) -> Result<Self, String> {
        match value.map(str::trim) {
            None | Some("") => Ok(Self::Default),
            Some("all") => Ok(Self::All),
            Some(status) => status.parse().map(Self::Only),
        }
    }

    const fn status(self) -> Option<RestaurantStatus> {
        match self {
            Self::Default => Some(RestaurantStatus::Active),
            Self::Only(status) => Some(status),
            Self::All => None,
        }
    }
}

/// Options for [`RestaurantService::get_restaurants`].
#[derive(Debug, Clone, Default)]
pub struct ListRestaurantsOptions {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: StatusFilter,
    pub search: Option<String>,
    pub business_type: Option<BusinessType>,
    pub cuisine_type: Option<String>,
}

/// Restaurant operations for one request.
pub struct RestaurantService<'a> {
    restaurants: RestaurantRepository<'a>,
    locations: LocationRepository<'a>,
    media: MediaRepository<'a>,
    roles: RoleRepository<'a>,
    default_language: &'a str,
}

impl<'a> RestaurantService<'a> {
    /// `default_language` is used when a new restaurant names none.
    #[must_use]
    pub const fn new(pool: &'a PgPool, default_language: &'a str) -> Self {
        Self {
            restaurants: RestaurantRepository::new(pool),
            locations: LocationRepository::new(pool),
            media: MediaRepository::new(pool),
            roles: RoleRepository::new(pool),
            default_language,
        }
    }

    // =========================================================================
    // Restaurants
    // =========================================================================

    /// Whether a url name is well-formed and unused.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` on database failure.
    pub async fn check_url_available(&self, url_name: &str) -> Result<UrlAvailability, ServiceError> {
        let url_name = url_name.trim().to_owned();
        if let Err(e) = validate_url_slug(&url_name) {
            return Ok(UrlAvailability {
                url_name,
                available: false,
                reason: Some(e.to_string()),
            });
        }

        let taken = self.restaurants.url_name_exists(&url_name).await?;
        Ok(UrlAvailability {
            url_name,
            available: !taken,
            reason: taken.then(|| URL_TAKEN.to_owned()),
        })
    }

    /// Create a restaurant with its primary location and default language.
    /// Platform administrators only.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` for bad fields and
    /// `ServiceError::Conflict` when the url name is taken.
    #[instrument(skip(self, actor, data), fields(user_id = %actor.user_id, url_name = %data.url_name))]
    pub async fn create_restaurant(
        &self,
        actor: &CurrentStaff,
        data: &NewRestaurant,
    ) -> Result<RestaurantProfile, ServiceError> {
        if !actor.is_super_admin() {
            return Err(ServiceError::forbidden());
        }
        data.validate()?;
        if self.restaurants.url_name_exists(&data.url_name).await? {
            return Err(ServiceError::Conflict(URL_TAKEN.to_owned()));
        }

        let language = self.language_for(data);
        let (restaurant, location) = self
            .restaurants
            .create(data, Some(actor.user_id), language)
            .await?;

        tracing::info!(restaurant_id = %restaurant.id, "restaurant created");
        Ok(RestaurantProfile {
            restaurant,
            locations: vec![location],
            media: Vec::new(),
        })
    }

    /// Public sign-up: a pending restaurant plus its owner account.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` for bad fields and
    /// `ServiceError::Conflict` when the url name or owner email is taken.
    #[instrument(skip(self, data), fields(url_name = %data.restaurant.url_name))]
    pub async fn register(&self, data: &Registration) -> Result<RestaurantProfile, ServiceError> {
        data.validate()?;
        if self
            .restaurants
            .url_name_exists(&data.restaurant.url_name)
            .await?
        {
            let mut errors = FieldErrors::new();
            errors.insert("restaurant.url_name", URL_TAKEN);
            return Err(errors.into());
        }

        let email = Email::parse(&data.owner.email).map_err(|_| {
            let mut errors = FieldErrors::new();
            errors.insert("owner.email", ValidationError::InvalidEmail);
            ServiceError::Validation(errors)
        })?;
        let role = self
            .roles
            .get_by_name(RoleName::RestaurantAdministrator)
            .await?
            .ok_or_else(|| ServiceError::Internal("role catalog is not seeded".to_owned()))?;
        let password_hash = hash_password(&data.owner.password)?;

        let owner = NewOwner {
            email: &email,
            full_name: &data.owner.full_name,
            password_hash: &password_hash,
            role_id: role.id,
        };
        let language = self.language_for(&data.restaurant);
        let (restaurant, location, owner_id) = self
            .restaurants
            .register(&data.restaurant, owner, language)
            .await?;

        tracing::info!(restaurant_id = %restaurant.id, %owner_id, "restaurant registered");
        Ok(RestaurantProfile {
            restaurant,
            locations: vec![location],
            media: Vec::new(),
        })
    }

    /// Look up by id. Inactive restaurants are hidden from callers without
    /// access to them.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` on database failure.
    pub async fn get_restaurant_by_id(
        &self,
        actor: Option<&CurrentStaff>,
        id: RestaurantId,
        include_locations: bool,
    ) -> Result<Option<RestaurantProfile>, ServiceError> {
        let restaurant = self.restaurants.get_by_id(id).await?;
        self.profile(actor, restaurant, include_locations).await
    }

    /// Look up by url name, with the same visibility rules as
    /// [`Self::get_restaurant_by_id`].
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` on database failure.
    pub async fn get_restaurant_by_url_name(
        &self,
        actor: Option<&CurrentStaff>,
        url_name: &str,
        include_locations: bool,
    ) -> Result<Option<RestaurantProfile>, ServiceError> {
        let restaurant = self.restaurants.get_by_url_name(url_name).await?;
        self.profile(actor, restaurant, include_locations).await
    }

    /// Paginated listing. Only platform administrators may list statuses
    /// other than `active`.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Forbidden` when others ask for other statuses.
    pub async fn get_restaurants(
        &self,
        actor: Option<&CurrentStaff>,
        options: ListRestaurantsOptions,
    ) -> Result<(Vec<Restaurant>, Pagination), ServiceError> {
        let is_platform = actor.is_some_and(CurrentStaff::is_super_admin);
        if options.status != StatusFilter::Default && !is_platform {
            return Err(ServiceError::forbidden());
        }

        let page = PageRequest::new(options.page, options.limit);
        let filter = RestaurantFilter {
            status: options.status.status(),
            search: options.search,
            business_type: options.business_type,
            cuisine_type: options.cuisine_type,
        };
        let (restaurants, total) = self.restaurants.list(&filter, page).await?;
        Ok((restaurants, Pagination::new(page, total)))
    }

    /// Apply a partial update. The url name is fixed after creation; a patch
    /// repeating the current one is accepted.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` for bad fields or a changed url
    /// name.
    #[instrument(skip(self, actor, patch), fields(user_id = %actor.user_id))]
    pub async fn update_restaurant(
        &self,
        actor: &CurrentStaff,
        id: RestaurantId,
        patch: &RestaurantPatch,
    ) -> Result<Restaurant, ServiceError> {
        ensure_can_manage(actor, id)?;
        patch.validate()?;
        let current = self.load(id).await?;

        if let Some(url_name) = &patch.url_name
            && url_name.trim() != current.url_name
        {
            let mut errors = FieldErrors::new();
            errors.insert(
                "url_name",
                ValidationError::Other("O endereço do restaurante não pode ser alterado".to_owned()),
            );
            return Err(errors.into());
        }

        Ok(self.restaurants.update(id, patch).await?)
    }

    /// Replace the restaurant's selected features.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Forbidden` without manage access.
    pub async fn update_features(
        &self,
        actor: &CurrentStaff,
        id: RestaurantId,
        features: &FeatureSet,
    ) -> Result<Restaurant, ServiceError> {
        ensure_can_manage(actor, id)?;
        Ok(self.restaurants.update_features(id, features).await?)
    }

    /// Replace the payment settings.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` when PIX is accepted without a
    /// valid key.
    pub async fn update_payment(
        &self,
        actor: &CurrentStaff,
        id: RestaurantId,
        payment: &PaymentSettings,
    ) -> Result<Restaurant, ServiceError> {
        ensure_can_manage(actor, id)?;
        payment.validate()?;
        Ok(self.restaurants.update_payment(id, payment).await?)
    }

    /// Soft-delete (status `inactive`). Refused while active locations
    /// remain; the record is left unchanged in that case.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::BusinessRule` when active locations exist.
    #[instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    pub async fn delete_restaurant(
        &self,
        actor: &CurrentStaff,
        id: RestaurantId,
    ) -> Result<(), ServiceError> {
        ensure_can_manage(actor, id)?;
        match self.restaurants.soft_delete(id).await? {
            0 => {
                tracing::info!(restaurant_id = %id, "restaurant deactivated");
                Ok(())
            }
            active => Err(ServiceError::BusinessRule(format!(
                "Não é possível excluir um restaurante com {active} unidade(s) ativa(s)"
            ))),
        }
    }

    // =========================================================================
    // Locations
    // =========================================================================

    /// Locations of a restaurant. Inactive ones are included only for
    /// callers with access to the restaurant.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` for restaurants the caller may not see.
    pub async fn get_locations(
        &self,
        actor: Option<&CurrentStaff>,
        id: RestaurantId,
        include_inactive: bool,
    ) -> Result<Vec<Location>, ServiceError> {
        let restaurant = self.load(id).await?;
        let has_access = actor.is_some_and(|a| a.can_view_restaurant(id));
        if !has_access && restaurant.status != RestaurantStatus::Active {
            return Err(ServiceError::not_found("Restaurante"));
        }
        Ok(self
            .locations
            .list(id, include_inactive && has_access)
            .await?)
    }

    /// Add a location within the subscription plan's limit.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::BusinessRule` at or over the limit.
    #[instrument(skip(self, actor, input), fields(user_id = %actor.user_id))]
    pub async fn add_location(
        &self,
        actor: &CurrentStaff,
        id: RestaurantId,
        input: &LocationInput,
    ) -> Result<Location, ServiceError> {
        ensure_can_manage(actor, id)?;
        input.validate()?;
        let restaurant = self.load(id).await?;

        let plan = restaurant.subscription_plan;
        match self.locations.add(id, input, plan.location_limit()).await? {
            AddLocation::Added(location) => Ok(location),
            AddLocation::LimitReached { limit } => Err(ServiceError::BusinessRule(format!(
                "O plano {plan} permite no máximo {limit} unidade(s)"
            ))),
        }
    }

    /// Apply a partial update to a location.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` for bad fields and
    /// `ServiceError::NotFound` for unknown locations.
    pub async fn update_location(
        &self,
        actor: &CurrentStaff,
        id: RestaurantId,
        location_id: LocationId,
        patch: &LocationPatch,
    ) -> Result<Location, ServiceError> {
        ensure_can_manage(actor, id)?;
        patch.validate()?;
        Ok(self.locations.update(id, location_id, patch).await?)
    }

    /// Make one location the primary one.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` for unknown or inactive locations.
    pub async fn set_primary_location(
        &self,
        actor: &CurrentStaff,
        id: RestaurantId,
        location_id: LocationId,
    ) -> Result<Vec<Location>, ServiceError> {
        ensure_can_manage(actor, id)?;
        self.locations.set_primary(id, location_id).await?;
        Ok(self.locations.list(id, false).await?)
    }

    /// Deactivate a location, promoting another one if it was primary.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::BusinessRule` for the last active location.
    #[instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    pub async fn remove_location(
        &self,
        actor: &CurrentStaff,
        id: RestaurantId,
        location_id: LocationId,
    ) -> Result<(), ServiceError> {
        ensure_can_manage(actor, id)?;
        match self.locations.deactivate(id, location_id).await? {
            RemoveLocation::Removed { promoted } => {
                if let Some(promoted) = promoted {
                    tracing::info!(location_id = %promoted, "primary location reassigned");
                }
                Ok(())
            }
            RemoveLocation::LastLocation => Err(ServiceError::BusinessRule(
                "O restaurante precisa de ao menos uma unidade ativa".to_owned(),
            )),
        }
    }

    // =========================================================================
    // Media
    // =========================================================================

    /// Media of a restaurant visible to the caller.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` for restaurants the caller may not see.
    pub async fn list_media(
        &self,
        actor: Option<&CurrentStaff>,
        id: RestaurantId,
    ) -> Result<Vec<MediaAsset>, ServiceError> {
        let restaurant = self.load(id).await?;
        if restaurant.status != RestaurantStatus::Active {
            match actor {
                Some(actor) => ensure_can_view(actor, id)?,
                None => return Err(ServiceError::not_found("Restaurante")),
            }
        }
        Ok(self.media.list(id).await?)
    }

    /// Attach a media record; a logo or favicon replaces the previous one.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` for a bad URL.
    pub async fn add_media(
        &self,
        actor: &CurrentStaff,
        id: RestaurantId,
        asset: &NewMediaAsset,
    ) -> Result<MediaAsset, ServiceError> {
        ensure_can_manage(actor, id)?;
        asset.validate()?;
        Ok(self.media.add(id, asset).await?)
    }

    /// Delete a media record.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` for unknown media.
    pub async fn remove_media(
        &self,
        actor: &CurrentStaff,
        id: RestaurantId,
        media_id: MediaAssetId,
    ) -> Result<(), ServiceError> {
        ensure_can_manage(actor, id)?;
        Ok(self.media.remove(id, media_id).await?)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn load(&self, id: RestaurantId) -> Result<Restaurant, ServiceError> {
        self.restaurants
            .get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Restaurante"))
    }

    fn language_for<'d>(&'d self, data: &'d NewRestaurant) -> &'d str {
        data.default_language
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .unwrap_or(self.default_language)
    }

    async fn profile(
        &self,
        actor: Option<&CurrentStaff>,
        restaurant: Option<Restaurant>,
        include_locations: bool,
    ) -> Result<Option<RestaurantProfile>, ServiceError> {
        let Some(restaurant) = restaurant else {
            return Ok(None);
        };
        let has_access = actor.is_some_and(|a| a.can_view_restaurant(restaurant.id));
        if restaurant.status != RestaurantStatus::Active && !has_access {
            return Ok(None);
        }

        let (locations, media) = if include_locations {
            (
                self.locations.list(restaurant.id, false).await?,
                self.media.list(restaurant.id).await?,
            )
        } else {
            (Vec::new(), Vec::new())
        };
        Ok(Some(RestaurantProfile {
            restaurant,
            locations,
            media,
        }))
    }
}
