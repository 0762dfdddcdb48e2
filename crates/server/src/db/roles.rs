//! Role catalog repository.

use sqlx::PgPool;

use tavola_core::{Role, RoleId, RoleName};

use super::RepositoryError;

#[derive(Debug, sqlx::FromRow)]
struct RoleRow {
    id: i32,
    name: String,
    display_name: String,
    level: i32,
}

impl TryFrom<RoleRow> for Role {
    type Error = RepositoryError;

    fn try_from(row: RoleRow) -> Result<Self, Self::Error> {
        let name = row
            .name
            .parse::<RoleName>()
            .map_err(|e| RepositoryError::DataCorruption(format!("role {}: {e}", row.id)))?;

        Ok(Self {
            id: RoleId::new(row.id),
            name,
            display_name: row.display_name,
            level: row.level,
        })
    }
}

/// Repository for the role catalog.
pub struct RoleRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> RoleRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All roles, most privileged first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Role>, RepositoryError> {
        let rows = sqlx::query_as::<_, RoleRow>(
            "SELECT id, name, display_name, level FROM tavola.role ORDER BY level, id",
        )
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Get a role by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_name(&self, name: RoleName) -> Result<Option<Role>, RepositoryError> {
        let row = sqlx::query_as::<_, RoleRow>(
            "SELECT id, name, display_name, level FROM tavola.role WHERE name = $1",
        )
        .bind(name.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Insert or rename a catalog entry. Used by seeding.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert(
        &self,
        name: RoleName,
        display_name: &str,
        level: i32,
    ) -> Result<Role, RepositoryError> {
        let row = sqlx::query_as::<_, RoleRow>(
            r"
            INSERT INTO tavola.role (name, display_name, level)
            VALUES ($1, $2, $3)
            ON CONFLICT (name) DO UPDATE
                SET display_name = EXCLUDED.display_name, level = EXCLUDED.level
            RETURNING id, name, display_name, level
            ",
        )
        .bind(name.as_str())
        .bind(display_name)
        .bind(level)
        .fetch_one(self.pool)
        .await?;

        row.try_into()
    }
}
