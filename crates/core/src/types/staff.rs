//! Staff users, roles and role/location assignments.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Email, LocationId, RestaurantId, RoleId, UserId, UserStatus};
use crate::validation::{FieldErrors, ValidationError, require_text};

/// Minimum password length for staff accounts.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Known role names, from most to least privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleName {
    SuperAdmin,
    RestaurantAdministrator,
    LocationAdministrator,
    Waiter,
    Kitchen,
    Cashier,
}

impl RoleName {
    pub const ALL: [Self; 6] = [
        Self::SuperAdmin,
        Self::RestaurantAdministrator,
        Self::LocationAdministrator,
        Self::Waiter,
        Self::Kitchen,
        Self::Cashier,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SuperAdmin => "super_admin",
            Self::RestaurantAdministrator => "restaurant_administrator",
            Self::LocationAdministrator => "location_administrator",
            Self::Waiter => "waiter",
            Self::Kitchen => "kitchen",
            Self::Cashier => "cashier",
        }
    }

    /// Administrative roles make the holder an admin user.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(
            self,
            Self::SuperAdmin | Self::RestaurantAdministrator | Self::LocationAdministrator
        )
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoleName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| format!("unknown role: {s}"))
    }
}

/// Privilege tier of an acting user, which decides the roles it may grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorTier {
    SuperAdmin,
    RestaurantAdmin,
    Staff,
}

impl ActorTier {
    /// Derive the tier from held roles.
    ///
    /// A `restaurant_administrator` not bound to any restaurant is a
    /// platform-level super admin.
    pub fn from_roles(
        roles: impl IntoIterator<Item = RoleName>,
        restaurant_id: Option<RestaurantId>,
    ) -> Self {
        let mut tier = Self::Staff;
        for role in roles {
            match role {
                RoleName::SuperAdmin => return Self::SuperAdmin,
                RoleName::RestaurantAdministrator if restaurant_id.is_none() => {
                    return Self::SuperAdmin;
                }
                RoleName::RestaurantAdministrator => tier = Self::RestaurantAdmin,
                _ => {}
            }
        }
        tier
    }

    /// Whether a user of this tier may see and grant `role`.
    #[must_use]
    pub const fn can_grant(self, role: RoleName) -> bool {
        match self {
            Self::SuperAdmin | Self::RestaurantAdmin => !matches!(role, RoleName::SuperAdmin),
            Self::Staff => !matches!(
                role,
                RoleName::SuperAdmin | RoleName::RestaurantAdministrator
            ),
        }
    }
}

/// A role from the role catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: RoleName,
    pub display_name: String,
    /// Lower is more privileged.
    pub level: i32,
}

/// Filter a role catalog down to what `tier` may grant.
#[must_use]
pub fn grantable_roles(catalog: &[Role], tier: ActorTier) -> Vec<Role> {
    catalog
        .iter()
        .filter(|role| tier.can_grant(role.name))
        .cloned()
        .collect()
}

/// A role held at a location (or restaurant-wide when `location_id` is `None`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub role_id: RoleId,
    pub role_name: RoleName,
    pub location_id: Option<LocationId>,
}

/// One flattened `(role, location)` pair as submitted by the assignment form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AssignmentPair {
    pub role_id: RoleId,
    pub location_id: LocationId,
}

/// The login identifier of a staff user: exactly one of email or username.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginName {
    Email(Email),
    Username(String),
}

impl LoginName {
    /// Build from the two optional form fields.
    ///
    /// # Errors
    ///
    /// Returns errors keyed by `email` / `username` unless exactly one is
    /// present and well-formed.
    pub fn from_parts(email: Option<&str>, username: Option<&str>) -> Result<Self, FieldErrors> {
        let email = email.map(str::trim).filter(|s| !s.is_empty());
        let username = username.map(str::trim).filter(|s| !s.is_empty());
        let mut errors = FieldErrors::new();
        match (email, username) {
            (Some(email), None) => match Email::parse(email) {
                Ok(email) => return Ok(Self::Email(email)),
                Err(_) => errors.insert("email", ValidationError::InvalidEmail),
            },
            (None, Some(username)) => match validate_username(username) {
                Ok(()) => return Ok(Self::Username(username.to_owned())),
                Err(e) => errors.insert("username", e),
            },
            (Some(_), Some(_)) => {
                let message = "Informe e-mail ou nome de usuário, não ambos";
                errors.insert("email", ValidationError::Other(message.to_owned()));
                errors.insert("username", ValidationError::Other(message.to_owned()));
            }
            (None, None) => {
                errors.insert("email", ValidationError::Required);
                errors.insert("username", ValidationError::Required);
            }
        }
        Err(errors)
    }

    /// Parse a login identifier typed into the sign-in form.
    #[must_use]
    pub fn from_login(identifier: &str) -> Self {
        let identifier = identifier.trim();
        Email::parse(identifier)
            .map_or_else(|_| Self::Username(identifier.to_owned()), Self::Email)
    }

    #[must_use]
    pub fn email(&self) -> Option<&Email> {
        match self {
            Self::Email(email) => Some(email),
            Self::Username(_) => None,
        }
    }

    #[must_use]
    pub fn username(&self) -> Option<&str> {
        match self {
            Self::Username(username) => Some(username),
            Self::Email(_) => None,
        }
    }
}

/// 3 to 50 characters from `[a-z0-9._-]`.
///
/// # Errors
///
/// Returns a descriptive [`ValidationError`].
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    let len = username.chars().count();
    if !(3..=50).contains(&len) {
        return Err(ValidationError::Other(
            "O nome de usuário deve ter entre 3 e 50 caracteres".to_owned(),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-'))
    {
        return Err(ValidationError::Other(
            "Use apenas letras minúsculas, números, ponto, hífen ou sublinhado".to_owned(),
        ));
    }
    Ok(())
}

/// A staff user with its role assignments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffUser {
    pub id: UserId,
    pub restaurant_id: Option<RestaurantId>,
    #[serde(flatten)]
    pub login: LoginName,
    pub full_name: String,
    pub status: UserStatus,
    pub assignments: Vec<RoleAssignment>,
    pub created_at: DateTime<Utc>,
}

impl StaffUser {
    /// Derived from the held roles.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.assignments.iter().any(|a| a.role_name.is_admin())
    }

    #[must_use]
    pub fn tier(&self) -> ActorTier {
        ActorTier::from_roles(
            self.assignments.iter().map(|a| a.role_name),
            self.restaurant_id,
        )
    }
}

/// The authenticated staff member, as kept in the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentStaff {
    pub user_id: UserId,
    pub restaurant_id: Option<RestaurantId>,
    pub full_name: String,
    pub roles: Vec<RoleName>,
}

impl CurrentStaff {
    #[must_use]
    pub fn tier(&self) -> ActorTier {
        ActorTier::from_roles(self.roles.iter().copied(), self.restaurant_id)
    }

    #[must_use]
    pub fn is_super_admin(&self) -> bool {
        self.tier() == ActorTier::SuperAdmin
    }

    /// Super admins manage every restaurant; restaurant administrators
    /// manage their own.
    #[must_use]
    pub fn can_manage_restaurant(&self, restaurant_id: RestaurantId) -> bool {
        match self.tier() {
            ActorTier::SuperAdmin => true,
            ActorTier::RestaurantAdmin => self.restaurant_id == Some(restaurant_id),
            ActorTier::Staff => false,
        }
    }

    /// Read access: managers plus any staff member of the restaurant.
    #[must_use]
    pub fn can_view_restaurant(&self, restaurant_id: RestaurantId) -> bool {
        self.is_super_admin() || self.restaurant_id == Some(restaurant_id)
    }
}

impl From<&StaffUser> for CurrentStaff {
    fn from(user: &StaffUser) -> Self {
        let mut roles: Vec<RoleName> = user.assignments.iter().map(|a| a.role_name).collect();
        roles.sort_unstable();
        roles.dedup();
        Self {
            user_id: user.id,
            restaurant_id: user.restaurant_id,
            full_name: user.full_name.clone(),
            roles,
        }
    }
}

/// Data for creating a staff user.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStaffUser {
    /// Required for super admins; ignored for restaurant-bound actors.
    #[serde(default)]
    pub restaurant_id: Option<RestaurantId>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    pub full_name: String,
    pub password: String,
    pub assignments: Vec<AssignmentPair>,
}

impl fmt::Debug for NewStaffUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewStaffUser")
            .field("restaurant_id", &self.restaurant_id)
            .field("email", &self.email)
            .field("username", &self.username)
            .field("full_name", &self.full_name)
            .field("password", &"[REDACTED]")
            .field("assignments", &self.assignments)
            .finish()
    }
}

/// Check the shape of an assignment list: non-empty and without duplicates.
///
/// # Errors
///
/// Returns an error keyed by `assignments`.
pub fn validate_assignment_pairs(pairs: &[AssignmentPair]) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    if pairs.is_empty() {
        errors.insert(
            "assignments",
            ValidationError::Other("Atribua ao menos uma função".to_owned()),
        );
    } else {
        let mut sorted = pairs.to_vec();
        sorted.sort_unstable();
        if sorted.windows(2).any(|w| w.first() == w.get(1)) {
            errors.insert(
                "assignments",
                ValidationError::Other("Atribuição duplicada".to_owned()),
            );
        }
    }
    errors.into_result()
}

impl NewStaffUser {
    /// Validate fields and return the parsed login name.
    ///
    /// # Errors
    ///
    /// Returns errors keyed by field name.
    pub fn validate(&self) -> Result<LoginName, FieldErrors> {
        let mut errors = FieldErrors::new();
        let login = LoginName::from_parts(self.email.as_deref(), self.username.as_deref());
        if let Err(e) = require_text(&self.full_name, 100) {
            errors.insert("full_name", e);
        }
        if self.password.chars().count() < MIN_PASSWORD_LENGTH {
            errors.insert(
                "password",
                ValidationError::Other(format!(
                    "A senha deve ter ao menos {MIN_PASSWORD_LENGTH} caracteres"
                )),
            );
        }
        if let Err(e) = validate_assignment_pairs(&self.assignments) {
            errors.merge(e);
        }
        match login {
            Ok(login) if errors.is_empty() => Ok(login),
            Ok(_) => Err(errors),
            Err(login_errors) => {
                errors.merge(login_errors);
                Err(errors)
            }
        }
    }
}

/// Partial update of a staff user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffUserPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<UserStatus>,
    /// Replacing the login switches between email and username.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl StaffUserPatch {
    /// Validate present fields; returns the new login name when one is set.
    ///
    /// # Errors
    ///
    /// Returns errors keyed by field name.
    pub fn validate(&self) -> Result<Option<LoginName>, FieldErrors> {
        let mut errors = FieldErrors::new();
        if let Some(name) = &self.full_name
            && let Err(e) = require_text(name, 100)
        {
            errors.insert("full_name", e);
        }
        let login = if self.email.is_some() || self.username.is_some() {
            match LoginName::from_parts(self.email.as_deref(), self.username.as_deref()) {
                Ok(login) => Some(login),
                Err(login_errors) => {
                    errors.merge(login_errors);
                    None
                }
            }
        } else {
            None
        };
        errors.into_result().map(|()| login)
    }
}

/// Filters for listing staff users.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserFilters {
    #[serde(default)]
    pub restaurant_id: Option<RestaurantId>,
    #[serde(default)]
    pub status: Option<UserStatus>,
    #[serde(default)]
    pub role: Option<RoleName>,
    #[serde(default)]
    pub location_id: Option<LocationId>,
    #[serde(default)]
    pub search: Option<String>,
}
