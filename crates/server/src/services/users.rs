//! Staff user service.
//!
//! Who may manage whom:
//! - super admins manage every user;
//! - admins bound to a restaurant (restaurant or location administrators)
//!   manage that restaurant's users, but only users whose roles they could
//!   grant themselves.

use std::collections::BTreeSet;

use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use sqlx::PgPool;
use tracing::instrument;

use tavola_core::types::staff::{grantable_roles, validate_assignment_pairs};
use tavola_core::{
    ActorTier, AssignmentPair, CurrentStaff, FieldErrors, LocationId, NewStaffUser, PageRequest,
    Pagination, RestaurantId, Role, RoleId, StaffUser, StaffUserPatch, UserFilters, UserId,
    UserStatus, ValidationError,
};

use crate::db::users::RemoveRole;
use crate::db::{LocationRepository, RoleRepository, UserRepository};

use super::ServiceError;

/// Hash a password with Argon2id and a random salt.
///
/// # Errors
///
/// Returns `ServiceError::Internal` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, ServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ServiceError::Internal(format!("password hashing failed: {e}")))?;
    Ok(hash.to_string())
}

/// Check a password against a stored PHC hash string.
#[must_use]
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Staff user management.
pub struct UserService<'a> {
    users: UserRepository<'a>,
    roles: RoleRepository<'a>,
    locations: LocationRepository<'a>,
}

impl<'a> UserService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
            roles: RoleRepository::new(pool),
            locations: LocationRepository::new(pool),
        }
    }

    /// The role catalog filtered by what the actor may grant.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the catalog cannot be read.
    pub async fn list_roles(&self, actor: &CurrentStaff) -> Result<Vec<Role>, ServiceError> {
        let catalog = self.roles.list().await?;
        Ok(grantable_roles(&catalog, actor.tier()))
    }

    /// Users visible to the actor. Restaurant-bound actors only ever see
    /// their own restaurant.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Forbidden` for actors without an admin role.
    #[instrument(skip(self, actor, filters), fields(user_id = %actor.user_id))]
    pub async fn list_users(
        &self,
        actor: &CurrentStaff,
        mut filters: UserFilters,
        page: PageRequest,
    ) -> Result<(Vec<StaffUser>, Pagination), ServiceError> {
        if !actor.is_super_admin() {
            filters.restaurant_id = actor.restaurant_id;
        }
        ensure_can_manage_staff(actor, filters.restaurant_id)?;

        let (users, total) = self.users.list(&filters, page).await?;
        Ok((users, Pagination::new(page, total)))
    }

    /// Get one user.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` or `ServiceError::Forbidden`.
    pub async fn get_user(&self, actor: &CurrentStaff, id: UserId) -> Result<StaffUser, ServiceError> {
        let user = self.load(id).await?;
        if user.id != actor.user_id {
            ensure_can_manage_staff(actor, user.restaurant_id)?;
        }
        Ok(user)
    }

    /// Create a staff user with its role/location assignments.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` for bad fields, unknown roles or
    /// locations outside the restaurant, `ServiceError::Forbidden` when a
    /// role is above the actor's tier and `ServiceError::Conflict` when the
    /// login is taken.
    #[instrument(skip(self, actor, data), fields(user_id = %actor.user_id))]
    pub async fn create_user(
        &self,
        actor: &CurrentStaff,
        data: &NewStaffUser,
    ) -> Result<StaffUser, ServiceError> {
        let login = data.validate()?;

        let restaurant_id = if actor.is_super_admin() {
            data.restaurant_id
        } else {
            actor.restaurant_id
        };
        let Some(restaurant_id) = restaurant_id else {
            let mut errors = FieldErrors::new();
            errors.insert("restaurant_id", ValidationError::Required);
            return Err(errors.into());
        };
        ensure_can_manage_staff(actor, Some(restaurant_id))?;
        self.check_assignments(actor, restaurant_id, &data.assignments)
            .await?;

        let password_hash = hash_password(&data.password)?;
        let user = self
            .users
            .create(
                Some(restaurant_id),
                &login,
                &data.full_name,
                &password_hash,
                &data.assignments,
            )
            .await?;

        tracing::info!(new_user_id = %user.id, %restaurant_id, "staff user created");
        Ok(user)
    }

    /// Update name, status or login name.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::BusinessRule` when actors try to deactivate
    /// themselves.
    #[instrument(skip(self, actor, patch), fields(user_id = %actor.user_id))]
    pub async fn update_user(
        &self,
        actor: &CurrentStaff,
        id: UserId,
        patch: &StaffUserPatch,
    ) -> Result<StaffUser, ServiceError> {
        let login = patch.validate()?;
        let user = self.load(id).await?;
        ensure_can_manage_user(actor, &user)?;

        if id == actor.user_id
            && let Some(status) = patch.status
            && status != UserStatus::Active
        {
            return Err(ServiceError::BusinessRule(
                "Você não pode desativar a própria conta".to_owned(),
            ));
        }

        Ok(self
            .users
            .update(id, patch.full_name.as_deref(), patch.status, login.as_ref())
            .await?)
    }

    /// Replace every role/location assignment of a user.
    ///
    /// # Errors
    ///
    /// Same rules as [`Self::create_user`].
    #[instrument(skip(self, actor, assignments), fields(user_id = %actor.user_id))]
    pub async fn replace_assignments(
        &self,
        actor: &CurrentStaff,
        id: UserId,
        assignments: &[AssignmentPair],
    ) -> Result<StaffUser, ServiceError> {
        validate_assignment_pairs(assignments)?;
        let user = self.load(id).await?;
        ensure_can_manage_user(actor, &user)?;
        let Some(restaurant_id) = user.restaurant_id else {
            return Err(ServiceError::BusinessRule(
                "Usuários da plataforma não têm unidades".to_owned(),
            ));
        };
        self.check_assignments(actor, restaurant_id, assignments)
            .await?;

        Ok(self.users.replace_assignments(id, assignments).await?)
    }

    /// Remove one role (at every location) from a user.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::BusinessRule` if it is the user's last role.
    #[instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    pub async fn remove_role(
        &self,
        actor: &CurrentStaff,
        id: UserId,
        role_id: RoleId,
    ) -> Result<StaffUser, ServiceError> {
        let user = self.load(id).await?;
        ensure_can_manage_user(actor, &user)?;

        match self.users.remove_role(id, role_id).await? {
            RemoveRole::Removed => self.load(id).await,
            RemoveRole::LastRole => Err(ServiceError::BusinessRule(
                "A última função do usuário não pode ser removida".to_owned(),
            )),
            RemoveRole::NotAssigned => Err(ServiceError::not_found("Função")),
        }
    }

    /// Soft-delete a user (status `inactive`).
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::BusinessRule` when actors try to delete
    /// themselves.
    #[instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    pub async fn delete_user(&self, actor: &CurrentStaff, id: UserId) -> Result<(), ServiceError> {
        if id == actor.user_id {
            return Err(ServiceError::BusinessRule(
                "Você não pode excluir a própria conta".to_owned(),
            ));
        }
        let user = self.load(id).await?;
        ensure_can_manage_user(actor, &user)?;

        self.users.set_status(id, UserStatus::Inactive).await?;
        tracing::info!(deleted_user_id = %id, "staff user deactivated");
        Ok(())
    }

    async fn load(&self, id: UserId) -> Result<StaffUser, ServiceError> {
        self.users
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Usuário"))
    }

    /// Every role exists and is grantable; every location is an active
    /// location of the restaurant.
    async fn check_assignments(
        &self,
        actor: &CurrentStaff,
        restaurant_id: RestaurantId,
        assignments: &[AssignmentPair],
    ) -> Result<(), ServiceError> {
        let catalog = self.roles.list().await?;
        let tier = actor.tier();
        let mut errors = FieldErrors::new();

        for (index, pair) in assignments.iter().enumerate() {
            match catalog.iter().find(|r| r.id == pair.role_id) {
                None => errors.insert(
                    format!("assignments.{index}.role_id"),
                    ValidationError::Other("Função inválida".to_owned()),
                ),
                Some(role) if !tier.can_grant(role.name) => {
                    tracing::warn!(user_id = %actor.user_id, role = %role.name, "role above actor tier");
                    return Err(ServiceError::forbidden());
                }
                Some(_) => {}
            }
        }

        let wanted: BTreeSet<LocationId> = assignments.iter().map(|a| a.location_id).collect();
        let ids: Vec<LocationId> = wanted.iter().copied().collect();
        let found: BTreeSet<LocationId> = self
            .locations
            .active_ids_among(restaurant_id, &ids)
            .await?
            .into_iter()
            .collect();
        for (index, pair) in assignments.iter().enumerate() {
            if !found.contains(&pair.location_id) {
                errors.insert(
                    format!("assignments.{index}.location_id"),
                    ValidationError::Other("Unidade inválida para este restaurante".to_owned()),
                );
            }
        }

        errors.into_result().map_err(ServiceError::from)
    }
}

/// Super admins manage everyone; other admins manage their restaurant.
fn ensure_can_manage_staff(
    actor: &CurrentStaff,
    restaurant_id: Option<RestaurantId>,
) -> Result<(), ServiceError> {
    if actor.is_super_admin() {
        return Ok(());
    }
    let is_admin = actor.roles.iter().any(|r| r.is_admin());
    if is_admin && restaurant_id.is_some() && actor.restaurant_id == restaurant_id {
        Ok(())
    } else {
        Err(ServiceError::forbidden())
    }
}

/// Restaurant access plus: the target's roles must all be grantable by the
/// actor.
fn ensure_can_manage_user(actor: &CurrentStaff, user: &StaffUser) -> Result<(), ServiceError> {
    ensure_can_manage_staff(actor, user.restaurant_id)?;
    let tier = actor.tier();
    if tier != ActorTier::SuperAdmin
        && user.assignments.iter().any(|a| !tier.can_grant(a.role_name))
    {
        return Err(ServiceError::forbidden());
    }
    Ok(())
}
