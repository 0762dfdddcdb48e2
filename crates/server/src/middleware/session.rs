//! Session layer configuration.
//!
//! Sessions live in `tavola.session` (created by migration) and expire
//! after 24 hours without activity.

use sqlx::PgPool;
use thiserror::Error;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::ServerConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "tavola_session";

const SESSION_EXPIRY_SECONDS: i64 = 24 * 60 * 60;

const SESSION_SCHEMA: &str = "tavola";
const SESSION_TABLE: &str = "session";

/// The session store rejected its schema or table name.
#[derive(Debug, Error)]
#[error("invalid session store name: {0}")]
pub struct SessionSetupError(String);

/// Create the session layer backed by `PostgreSQL`.
///
/// Cookies are `HttpOnly` and `SameSite=Lax`; they are `Secure` when the
/// API is served over HTTPS.
///
/// # Errors
///
/// Returns `SessionSetupError` if the store refuses the schema or table name.
pub fn create_session_layer(
    pool: &PgPool,
    config: &ServerConfig,
) -> Result<SessionManagerLayer<PostgresStore>, SessionSetupError> {
    let store = PostgresStore::new(pool.clone())
        .with_schema_name(SESSION_SCHEMA)
        .map_err(SessionSetupError)?
        .with_table_name(SESSION_TABLE)
        .map_err(SessionSetupError)?;

    Ok(SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.secure_cookies())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/"))
}
