//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ServerConfig;
use crate::services::LanguageCatalog;

/// Application state shared across all handlers.
///
/// Cheap to clone; everything lives behind one `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    pool: PgPool,
    languages: LanguageCatalog,
}

impl AppState {
    #[must_use]
    pub fn new(config: ServerConfig, pool: PgPool) -> Self {
        let languages = LanguageCatalog::new(config.language_cache_ttl);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                languages,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// The cached language catalog.
    #[must_use]
    pub fn languages(&self) -> &LanguageCatalog {
        &self.inner.languages
    }
}
