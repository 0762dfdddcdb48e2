//! Status and classification enums.
//!
//! Each enum maps to a Postgres enum type in the `tavola` schema when the
//! `postgres` feature is enabled.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle status of a restaurant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "tavola.restaurant_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum RestaurantStatus {
    /// Registered, awaiting confirmation.
    #[default]
    Pending,
    /// Visible and operating.
    Active,
    /// Blocked by the platform.
    Suspended,
    /// Soft-deleted.
    Inactive,
}

impl RestaurantStatus {
    /// Returns the wire name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Suspended => "suspended",
            Self::Inactive => "inactive",
        }
    }
}

impl fmt::Display for RestaurantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RestaurantStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "active" => Ok(Self::Active),
            "suspended" => Ok(Self::Suspended),
            "inactive" => Ok(Self::Inactive),
            _ => Err(format!("invalid restaurant status: {s}")),
        }
    }
}

/// Whether a restaurant operates one or several locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "tavola.business_type", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum BusinessType {
    #[default]
    Single,
    Multi,
}

impl BusinessType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Multi => "multi",
        }
    }
}

/// Subscription plan, which caps the number of active locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "tavola.subscription_plan", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionPlan {
    #[default]
    Starter,
    Professional,
    Premium,
    Enterprise,
}

impl SubscriptionPlan {
    /// Maximum number of active locations, or `None` when unlimited.
    #[must_use]
    pub const fn location_limit(self) -> Option<usize> {
        match self {
            Self::Starter => Some(1),
            Self::Professional => Some(3),
            Self::Premium => Some(10),
            Self::Enterprise => None,
        }
    }

    /// Whether a restaurant with `active_locations` may add another one.
    #[must_use]
    pub const fn allows_another_location(self, active_locations: usize) -> bool {
        match self.location_limit() {
            Some(limit) => active_locations < limit,
            None => true,
        }
    }

    /// Returns the wire name of the plan.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Starter => "starter",
            Self::Professional => "professional",
            Self::Premium => "premium",
            Self::Enterprise => "enterprise",
        }
    }
}

impl fmt::Display for SubscriptionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account status of a staff user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "tavola.user_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    #[default]
    Active,
    Inactive,
    Pending,
    Suspended,
}

impl UserStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Pending => "pending",
            Self::Suspended => "suspended",
        }
    }

    /// Only active users can log in.
    #[must_use]
    pub const fn can_login(self) -> bool {
        matches!(self, Self::Active)
    }
}

impl FromStr for UserStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            "pending" => Ok(Self::Pending),
            "suspended" => Ok(Self::Suspended),
            _ => Err(format!("invalid user status: {s}")),
        }
    }
}

/// Kind of media asset attached to a restaurant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "tavola.media_kind", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Logo,
    Favicon,
    Image,
    Video,
}

impl MediaKind {
    /// Logo and favicon are singletons: a new upload replaces the old one.
    #[must_use]
    pub const fn is_singleton(self) -> bool {
        matches!(self, Self::Logo | Self::Favicon)
    }
}
