//! Database operations for the `tavola` `PostgreSQL` schema.
//!
//! ## Tables
//!
//! - `restaurant` - Tenants, with payment settings and selected features
//! - `location` - Physical locations (address and hours as JSONB)
//! - `media_asset` - Logo, favicon, images and videos (URLs only)
//! - `language` - Global language catalog
//! - `restaurant_language` - Languages configured per restaurant
//! - `role` - Role catalog
//! - `staff_user` - Staff accounts
//! - `user_role_location` - Role/location assignments
//! - `session` - Session storage
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! tavola migrate
//! ```

pub mod languages;
pub mod locations;
pub mod media;
pub mod restaurants;
pub mod roles;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use languages::{LanguageError, LanguageRepository};
pub use locations::LocationRepository;
pub use media::MediaRepository;
pub use restaurants::{RestaurantFilter, RestaurantRepository};
pub use roles::RoleRepository;
pub use users::{UserRepository, UserWithHash};

/// Embedded schema migrations.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate URL name).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Map a unique violation to `Conflict`, anything else to `Database`.
pub(crate) fn conflict_on_unique(e: sqlx::Error, message: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(message.to_owned());
    }
    RepositoryError::Database(e)
}

/// Escape `LIKE` wildcards and wrap the term in `%` for a contains match.
pub(crate) fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
