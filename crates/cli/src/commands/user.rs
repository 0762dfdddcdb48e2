//! Staff user commands.
//!
//! The first super admin cannot be created through the API, so it is
//! bootstrapped here. Restaurant-bound users can be created the same way
//! for support tasks.

use secrecy::{ExposeSecret, SecretString};

use tavola_core::types::staff::MIN_PASSWORD_LENGTH;
use tavola_core::{FieldErrors, LocationId, LoginName, RestaurantId, RoleName, UserId};
use tavola_server::db::{LocationRepository, RoleRepository, UserRepository};
use tavola_server::services::hash_password;

use super::{CliError, connect};

const PASSWORD_VAR: &str = "TAVOLA_USER_PASSWORD";

/// Arguments of `tavola user create`.
#[derive(Debug)]
pub struct CreateUser {
    pub email: Option<String>,
    pub username: Option<String>,
    pub full_name: String,
    pub password: SecretString,
    pub restaurant_id: Option<i32>,
    pub role: RoleName,
    pub location_ids: Vec<i32>,
}

/// Use the `--password` value or fall back to `TAVOLA_USER_PASSWORD`.
pub fn password_from(arg: Option<String>) -> Result<SecretString, CliError> {
    dotenvy::dotenv().ok();
    arg.or_else(|| std::env::var(PASSWORD_VAR).ok())
        .map(SecretString::from)
        .ok_or(CliError::MissingEnvVar(PASSWORD_VAR))
}

impl CreateUser {
    /// Check everything that does not need the database.
    fn check(&self) -> Result<LoginName, CliError> {
        let login = LoginName::from_parts(self.email.as_deref(), self.username.as_deref())
            .map_err(|errors| CliError::Invalid(describe(&errors)))?;

        if self.full_name.trim().is_empty() {
            return Err(CliError::Invalid("full name is required".to_owned()));
        }
        if self.password.expose_secret().chars().count() < MIN_PASSWORD_LENGTH {
            return Err(CliError::Invalid(format!(
                "password must have at least {MIN_PASSWORD_LENGTH} characters"
            )));
        }

        match (self.role, self.restaurant_id) {
            (RoleName::SuperAdmin, Some(_)) => Err(CliError::Invalid(
                "super_admin users are not bound to a restaurant".to_owned(),
            )),
            (RoleName::SuperAdmin, None) if !self.location_ids.is_empty() => Err(
                CliError::Invalid("super_admin users have no locations".to_owned()),
            ),
            (RoleName::SuperAdmin, None) => Ok(login),
            (role, None) => Err(CliError::Invalid(format!(
                "--restaurant is required for role {role}"
            ))),
            (role, Some(_)) if self.location_ids.is_empty() => Err(CliError::Invalid(format!(
                "role {role} needs at least one --location"
            ))),
            (_, Some(_)) => Ok(login),
        }
    }

    fn locations(&self) -> Vec<LocationId> {
        let mut ids: Vec<LocationId> = self.location_ids.iter().copied().map(LocationId::new).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

fn describe(errors: &FieldErrors) -> String {
    errors
        .iter()
        .map(|(field, message)| format!("{field}: {message}"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Create the user and return its id.
pub async fn create(request: &CreateUser) -> Result<UserId, CliError> {
    let login = request.check()?;
    let restaurant_id = request.restaurant_id.map(RestaurantId::new);
    let pool = connect().await?;

    let role = RoleRepository::new(&pool)
        .get_by_name(request.role)
        .await?
        .ok_or_else(|| {
            CliError::Invalid(format!("role {} is not seeded; run `tavola seed`", request.role))
        })?;

    let locations = request.locations();
    if let Some(restaurant_id) = restaurant_id {
        let found = LocationRepository::new(&pool)
            .active_ids_among(restaurant_id, &locations)
            .await?;
        if let Some(missing) = locations.iter().find(|id| !found.contains(id)) {
            return Err(CliError::Invalid(format!(
                "location {missing} is not an active location of restaurant {restaurant_id}"
            )));
        }
    }

    let pairs: Vec<_> = if locations.is_empty() {
        vec![(role.id, None)]
    } else {
        locations.into_iter().map(|id| (role.id, Some(id))).collect()
    };

    let password_hash = hash_password(request.password.expose_secret())?;

    tracing::info!(login = ?login, role = %request.role, "Creating staff user");
    let user = UserRepository::new(&pool)
        .create_with_roles(
            restaurant_id,
            &login,
            request.full_name.trim(),
            &password_hash,
            &pairs,
        )
        .await?;

    tracing::info!(user_id = %user.id, "Staff user created");
    Ok(user.id)
}
