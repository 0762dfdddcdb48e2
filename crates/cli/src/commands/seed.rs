//! Catalog seeding.
//!
//! Languages and roles are global rows shared by every restaurant. The
//! initial migrations insert a default set; this command upserts a YAML
//! catalog over it so entries can be renamed, reordered or deactivated
//! without a new migration.
//!
//! ```yaml
//! languages:
//!   - code: pt-BR
//!     name: Portuguese (Brazil)
//!     native_name: Português (Brasil)
//!     flag: "🇧🇷"
//!     display_order: 1
//! roles:
//!   - name: waiter
//!     display_name: Garçom
//!     level: 30
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use tavola_core::RoleName;
use tavola_server::db::{LanguageRepository, RoleRepository};

use super::{CliError, connect};

const BUNDLED: &str = include_str!("../../seeds/catalog.yaml");

/// A language catalog entry.
#[derive(Debug, Deserialize)]
pub struct LanguageSeed {
    pub code: String,
    pub name: String,
    pub native_name: String,
    #[serde(default)]
    pub flag: Option<String>,
    pub display_order: i32,
    #[serde(default = "active")]
    pub is_active: bool,
}

const fn active() -> bool {
    true
}

/// A role catalog entry.
#[derive(Debug, Deserialize)]
pub struct RoleSeed {
    pub name: RoleName,
    pub display_name: String,
    pub level: i32,
}

/// Everything `tavola seed` writes.
#[derive(Debug, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub languages: Vec<LanguageSeed>,
    #[serde(default)]
    pub roles: Vec<RoleSeed>,
}

impl Catalog {
    /// Read `path`, or the bundled catalog when `None`.
    pub fn load(path: Option<&Path>) -> Result<Self, CliError> {
        let Some(path) = path else {
            return Self::parse(BUNDLED);
        };
        let text = std::fs::read_to_string(path).map_err(|source| CliError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Parse and check a YAML catalog.
    pub fn parse(text: &str) -> Result<Self, CliError> {
        let catalog: Self = serde_yaml::from_str(text)?;
        catalog.validate()?;
        Ok(catalog)
    }

    fn validate(&self) -> Result<(), CliError> {
        let mut codes = HashSet::new();
        for language in &self.languages {
            let code = language.code.trim();
            if code.is_empty() || language.name.trim().is_empty() {
                return Err(CliError::Invalid(
                    "every language needs a code and a name".to_owned(),
                ));
            }
            if !codes.insert(code) {
                return Err(CliError::Invalid(format!("duplicate language code: {code}")));
            }
        }

        let mut roles = HashSet::new();
        for role in &self.roles {
            if role.display_name.trim().is_empty() {
                return Err(CliError::Invalid(format!("role {} has no display name", role.name)));
            }
            if !roles.insert(role.name) {
                return Err(CliError::Invalid(format!("duplicate role: {}", role.name)));
            }
        }
        Ok(())
    }
}

/// Upsert every catalog entry.
pub async fn run(catalog: &Catalog) -> Result<(), CliError> {
    let pool = connect().await?;

    let languages = LanguageRepository::new(&pool);
    for seed in &catalog.languages {
        let language = languages
            .upsert_catalog_entry(
                seed.code.trim(),
                seed.name.trim(),
                seed.native_name.trim(),
                seed.flag.as_deref(),
                seed.display_order,
                seed.is_active,
            )
            .await?;
        tracing::info!(code = %language.code, active = language.is_active, "Seeded language");
    }

    let roles = RoleRepository::new(&pool);
    for seed in &catalog.roles {
        let role = roles
            .upsert(seed.name, seed.display_name.trim(), seed.level)
            .await?;
        tracing::info!(role = %role.name, level = role.level, "Seeded role");
    }

    tracing::info!(
        languages = catalog.languages.len(),
        roles = catalog.roles.len(),
        "Seeding complete!"
    );
    Ok(())
}
