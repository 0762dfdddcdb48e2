//! Staff user repository.
//!
//! Users and their `user_role_location` assignments are always written in
//! one transaction; a user without any assignment is never committed.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use tracing::instrument;

use tavola_core::{
    AssignmentPair, Email, LocationId, LoginName, PageRequest, RestaurantId, RoleAssignment,
    RoleId, RoleName, StaffUser, UserFilters, UserId, UserStatus,
};

use super::{RepositoryError, conflict_on_unique, like_pattern};

const LOGIN_TAKEN: &str = "email or username already in use";

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i32,
    restaurant_id: Option<i32>,
    email: Option<String>,
    username: Option<String>,
    full_name: String,
    status: UserStatus,
    created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct UserWithHashRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

#[derive(Debug, sqlx::FromRow)]
struct AssignmentRow {
    user_id: i32,
    role_id: i32,
    role_name: String,
    location_id: Option<i32>,
}

impl UserRow {
    fn login(&self) -> Result<LoginName, RepositoryError> {
        let corrupt = |msg: String| RepositoryError::DataCorruption(format!("user {}: {msg}", self.id));
        match (self.email.as_deref(), self.username.as_deref()) {
            (Some(email), None) => Email::parse(email)
                .map(LoginName::Email)
                .map_err(|e| corrupt(format!("invalid email: {e}"))),
            (None, Some(username)) => Ok(LoginName::Username(username.to_owned())),
            _ => Err(corrupt("expected exactly one of email or username".to_owned())),
        }
    }

    fn into_user(self, assignments: Vec<RoleAssignment>) -> Result<StaffUser, RepositoryError> {
        let login = self.login()?;
        Ok(StaffUser {
            id: UserId::new(self.id),
            restaurant_id: self.restaurant_id.map(RestaurantId::new),
            login,
            full_name: self.full_name,
            status: self.status,
            assignments,
            created_at: self.created_at,
        })
    }
}

impl TryFrom<AssignmentRow> for RoleAssignment {
    type Error = RepositoryError;

    fn try_from(row: AssignmentRow) -> Result<Self, Self::Error> {
        let role_name = row
            .role_name
            .parse::<RoleName>()
            .map_err(|e| RepositoryError::DataCorruption(format!("user {}: {e}", row.user_id)))?;
        Ok(Self {
            role_id: RoleId::new(row.role_id),
            role_name,
            location_id: row.location_id.map(LocationId::new),
        })
    }
}

/// A user together with its password hash, for sign-in only.
#[derive(Debug)]
pub struct UserWithHash {
    pub user: StaffUser,
    pub password_hash: String,
}

/// Result of removing one role from a user.
#[derive(Debug, PartialEq, Eq)]
pub enum RemoveRole {
    Removed,
    /// Refused: the user would be left without any role.
    LastRole,
    /// The user does not hold the role.
    NotAssigned,
}

const USER_COLUMNS: &str =
    "u.id, u.restaurant_id, u.email, u.username, u.full_name, u.status, u.created_at";

/// Repository for staff user operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// One page of users matching the filters, plus the total count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        filters: &UserFilters,
        page: PageRequest,
    ) -> Result<(Vec<StaffUser>, u64), RepositoryError> {
        const WHERE: &str = r"
            WHERE ($1::int IS NULL OR u.restaurant_id = $1)
              AND ($2::tavola.user_status IS NULL OR u.status = $2)
              AND ($3::text IS NULL OR EXISTS (
                    SELECT 1 FROM tavola.user_role_location a
                    JOIN tavola.role r ON r.id = a.role_id
                    WHERE a.user_id = u.id AND r.name = $3))
              AND ($4::int IS NULL OR EXISTS (
                    SELECT 1 FROM tavola.user_role_location a
                    WHERE a.user_id = u.id AND a.location_id = $4))
              AND ($5::text IS NULL
                   OR u.full_name ILIKE $5 OR u.email ILIKE $5 OR u.username ILIKE $5)
        ";
        let search = filters
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(like_pattern);
        let role = filters.role.map(RoleName::as_str);

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM tavola.staff_user u {WHERE}"))
                .bind(filters.restaurant_id)
                .bind(filters.status)
                .bind(role)
                .bind(filters.location_id)
                .bind(search.as_deref())
                .fetch_one(self.pool)
                .await?;

        let sql = format!(
            "SELECT {USER_COLUMNS} FROM tavola.staff_user u {WHERE}
             ORDER BY u.full_name, u.id LIMIT $6 OFFSET $7"
        );
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .bind(filters.restaurant_id)
            .bind(filters.status)
            .bind(role)
            .bind(filters.location_id)
            .bind(search.as_deref())
            .bind(i64::from(page.limit))
            .bind(page.offset())
            .fetch_all(self.pool)
            .await?;

        let users = self.attach_assignments(rows).await?;
        Ok((users, u64::try_from(total).unwrap_or(0)))
    }

    /// Get a user by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: UserId) -> Result<Option<StaffUser>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM tavola.staff_user u WHERE u.id = $1");
        let Some(row) = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
        else {
            return Ok(None);
        };

        let assignments = load_assignments(self.pool, &[row.id])
            .await?
            .remove(&row.id)
            .unwrap_or_default();
        row.into_user(assignments).map(Some)
    }

    /// Look up a user by email or username, with the password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_for_login(
        &self,
        login: &LoginName,
    ) -> Result<Option<UserWithHash>, RepositoryError> {
        let sql = format!(
            "SELECT {USER_COLUMNS}, u.password_hash FROM tavola.staff_user u
             WHERE u.email = $1 OR u.username = $2"
        );
        let Some(row) = sqlx::query_as::<_, UserWithHashRow>(&sql)
            .bind(login.email().map(Email::as_str))
            .bind(login.username())
            .fetch_optional(self.pool)
            .await?
        else {
            return Ok(None);
        };

        let assignments = load_assignments(self.pool, &[row.user.id])
            .await?
            .remove(&row.user.id)
            .unwrap_or_default();
        Ok(Some(UserWithHash {
            user: row.user.into_user(assignments)?,
            password_hash: row.password_hash,
        }))
    }

    /// Create a user with its assignments.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email or username is taken.
    #[instrument(skip(self, password_hash, assignments))]
    pub async fn create(
        &self,
        restaurant_id: Option<RestaurantId>,
        login: &LoginName,
        full_name: &str,
        password_hash: &str,
        assignments: &[AssignmentPair],
    ) -> Result<StaffUser, RepositoryError> {
        let pairs: Vec<_> = assignments
            .iter()
            .map(|a| (a.role_id, Some(a.location_id)))
            .collect();
        self.create_with_roles(restaurant_id, login, full_name, password_hash, &pairs)
            .await
    }

    /// Create a user whose roles may be held without a location, such as a
    /// platform-level super admin.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email or username is taken.
    #[instrument(skip(self, password_hash, pairs))]
    pub async fn create_with_roles(
        &self,
        restaurant_id: Option<RestaurantId>,
        login: &LoginName,
        full_name: &str,
        password_hash: &str,
        pairs: &[(RoleId, Option<LocationId>)],
    ) -> Result<StaffUser, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let user_id = insert_user(
            &mut tx,
            restaurant_id,
            login,
            full_name,
            password_hash,
            UserStatus::Active,
        )
        .await?;
        insert_assignments(&mut tx, user_id, pairs).await?;
        tx.commit().await?;

        self.get(user_id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Update name, status and/or login name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist and
    /// `RepositoryError::Conflict` if the new login is taken.
    pub async fn update(
        &self,
        id: UserId,
        full_name: Option<&str>,
        status: Option<UserStatus>,
        login: Option<&LoginName>,
    ) -> Result<StaffUser, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE tavola.staff_user SET
                full_name = COALESCE($2, full_name),
                status = COALESCE($3, status),
                email = CASE WHEN $4 THEN $5 ELSE email END,
                username = CASE WHEN $4 THEN $6 ELSE username END
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(full_name.map(str::trim))
        .bind(status)
        .bind(login.is_some())
        .bind(login.and_then(LoginName::email).map(Email::as_str))
        .bind(login.and_then(LoginName::username))
        .execute(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, LOGIN_TAKEN))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Replace every assignment of a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    #[instrument(skip(self, assignments))]
    pub async fn replace_assignments(
        &self,
        id: UserId,
        assignments: &[AssignmentPair],
    ) -> Result<StaffUser, RepositoryError> {
        let pairs: Vec<_> = assignments
            .iter()
            .map(|a| (a.role_id, Some(a.location_id)))
            .collect();

        let mut tx = self.pool.begin().await?;
        lock_user(&mut tx, id).await?;
        sqlx::query("DELETE FROM tavola.user_role_location WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        insert_assignments(&mut tx, id, &pairs).await?;
        tx.commit().await?;

        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Remove every assignment of one role, unless it is the user's only role.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    #[instrument(skip(self))]
    pub async fn remove_role(&self, id: UserId, role_id: RoleId) -> Result<RemoveRole, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        lock_user(&mut tx, id).await?;

        let roles: Vec<i32> = sqlx::query_scalar(
            "SELECT DISTINCT role_id FROM tavola.user_role_location WHERE user_id = $1",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        if !roles.contains(&role_id.as_i32()) {
            return Ok(RemoveRole::NotAssigned);
        }
        if roles.len() <= 1 {
            return Ok(RemoveRole::LastRole);
        }

        sqlx::query("DELETE FROM tavola.user_role_location WHERE user_id = $1 AND role_id = $2")
            .bind(id)
            .bind(role_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(RemoveRole::Removed)
    }

    /// Change a user's status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn set_status(&self, id: UserId, status: UserStatus) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE tavola.staff_user SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Record a successful sign-in.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn touch_login(&self, id: UserId) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE tavola.staff_user SET last_login_at = now() WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    async fn attach_assignments(&self, rows: Vec<UserRow>) -> Result<Vec<StaffUser>, RepositoryError> {
        let ids: Vec<i32> = rows.iter().map(|r| r.id).collect();
        let mut by_user = load_assignments(self.pool, &ids).await?;
        rows.into_iter()
            .map(|row| {
                let assignments = by_user.remove(&row.id).unwrap_or_default();
                row.into_user(assignments)
            })
            .collect()
    }
}

async fn load_assignments(
    pool: &PgPool,
    user_ids: &[i32],
) -> Result<HashMap<i32, Vec<RoleAssignment>>, RepositoryError> {
    if user_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = sqlx::query_as::<_, AssignmentRow>(
        r"
        SELECT a.user_id, a.role_id, r.name AS role_name, a.location_id
        FROM tavola.user_role_location a
        JOIN tavola.role r ON r.id = a.role_id
        WHERE a.user_id = ANY($1)
        ORDER BY a.user_id, r.level, a.location_id NULLS FIRST
        ",
    )
    .bind(user_ids)
    .fetch_all(pool)
    .await?;

    let mut by_user: HashMap<i32, Vec<RoleAssignment>> = HashMap::new();
    for row in rows {
        let user_id = row.user_id;
        by_user.entry(user_id).or_default().push(row.try_into()?);
    }
    Ok(by_user)
}

async fn lock_user(conn: &mut PgConnection, id: UserId) -> Result<(), RepositoryError> {
    let found: Option<i32> =
        sqlx::query_scalar("SELECT id FROM tavola.staff_user WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
    found.map(|_| ()).ok_or(RepositoryError::NotFound)
}

/// Insert a user row inside an open transaction.
pub(crate) async fn insert_user(
    conn: &mut PgConnection,
    restaurant_id: Option<RestaurantId>,
    login: &LoginName,
    full_name: &str,
    password_hash: &str,
    status: UserStatus,
) -> Result<UserId, RepositoryError> {
    let id: i32 = sqlx::query_scalar(
        r"
        INSERT INTO tavola.staff_user (restaurant_id, email, username, full_name, password_hash, status)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        ",
    )
    .bind(restaurant_id)
    .bind(login.email().map(Email::as_str))
    .bind(login.username())
    .bind(full_name.trim())
    .bind(password_hash)
    .bind(status)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| conflict_on_unique(e, LOGIN_TAKEN))?;

    Ok(UserId::new(id))
}

/// Insert `(role, location)` assignments inside an open transaction.
pub(crate) async fn insert_assignments(
    conn: &mut PgConnection,
    user_id: UserId,
    pairs: &[(RoleId, Option<LocationId>)],
) -> Result<(), RepositoryError> {
    let role_ids: Vec<i32> = pairs.iter().map(|(role, _)| role.as_i32()).collect();
    let location_ids: Vec<Option<i32>> = pairs
        .iter()
        .map(|(_, location)| location.map(i32::from))
        .collect();

    sqlx::query(
        r"
        INSERT INTO tavola.user_role_location (user_id, role_id, location_id)
        SELECT $1, role_id, location_id
        FROM UNNEST($2::int[], $3::int[]) AS t (role_id, location_id)
        ",
    )
    .bind(user_id)
    .bind(&role_ids)
    .bind(&location_ids)
    .execute(&mut *conn)
    .await
    .map_err(|e| conflict_on_unique(e, "duplicate role assignment"))?;

    Ok(())
}
