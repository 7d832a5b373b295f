use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, error, instrument, warn};

use super::models::{NewUser, UserModel, UserRow};
use crate::shared::AppError;

/// Trait for user repository operations
#[async_trait]
pub trait UserRepository {
    /// Looks up an active user by email. `NotFound` when no row matches.
    async fn find_by_email(&self, email: &str) -> Result<UserModel, AppError>;
    /// Inserts a user and returns the store-assigned id. `Conflict` on duplicate email.
    async fn store(&self, user: &NewUser) -> Result<i32, AppError>;
    /// Soft-deletes an active user. `NotFound` when no active row matches.
    async fn delete(&self, id: i32) -> Result<(), AppError>;
}

struct Users {
    by_id: BTreeMap<i32, UserModel>,
    next_id: i32,
}

/// In-memory implementation of UserRepository for development and testing
///
/// Data is stored in memory and will be lost when the application restarts.
pub struct InMemoryUserRepository {
    users: Mutex<Users>,
}

impl Default for InMemoryUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryUserRepository {
    /// Creates a new empty in-memory repository
    pub fn new() -> Self {
        Self::with_users(Vec::new())
    }

    /// Creates an in-memory repository with pre-populated users
    pub fn with_users(users: Vec<UserModel>) -> Self {
        let next_id = users.iter().map(|u| u.id).max().unwrap_or(0) + 1;
        let by_id = users.into_iter().map(|u| (u.id, u)).collect();

        Self {
            users: Mutex::new(Users { by_id, next_id }),
        }
    }

    /// Copy of every stored user, inactive ones included, in id order
    pub fn snapshot(&self) -> Result<Vec<UserModel>, AppError> {
        Ok(self.lock()?.by_id.values().cloned().collect())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Users>, AppError> {
        self.users.lock().map_err(|_| {
            error!("User store lock poisoned");
            AppError::Internal
        })
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    #[instrument(skip(self))]
    async fn find_by_email(&self, email: &str) -> Result<UserModel, AppError> {
        debug!("Fetching user by email from memory");

        self.lock()?
            .by_id
            .values()
            .find(|u| u.active && u.email == email)
            .cloned()
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    #[instrument(skip(self, user), fields(email = %user.email))]
    async fn store(&self, user: &NewUser) -> Result<i32, AppError> {
        let mut users = self.lock()?;
        if users.by_id.values().any(|u| u.email == user.email) {
            warn!("Email already registered in memory");
            return Err(AppError::Conflict("email already registered".to_string()));
        }

        let id = users.next_id;
        users.next_id += 1;
        users.by_id.insert(
            id,
            UserModel {
                id,
                name: user.name.clone(),
                email: user.email.clone(),
                password_hash: user.password_hash.clone(),
                phone: user.phone.clone(),
                role: user.role,
                active: true,
            },
        );

        debug!(user_id = id, "User stored in memory");
        Ok(id)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: i32) -> Result<(), AppError> {
        let mut users = self.lock()?;
        match users.by_id.get_mut(&id) {
            Some(user) if user.active => {
                user.active = false;
                debug!(user_id = id, "User deactivated in memory");
                Ok(())
            }
            _ => {
                warn!(user_id = id, "User not found for deletion in memory");
                Err(AppError::NotFound("User not found".to_string()))
            }
        }
    }
}

/// PostgreSQL implementation of user repository
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    #[instrument(skip(self))]
    async fn find_by_email(&self, email: &str) -> Result<UserModel, AppError> {
        debug!("Fetching user by email from database");

        let row = sqlx::query_as::<_, UserRow>(
            r#"SELECT id, name, email, password, phone, role, active
               FROM "user" WHERE email = $1 AND active = true"#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch user from database");
            AppError::DatabaseError(e.to_string())
        })?;

        match row {
            Some(row) => UserModel::try_from(row),
            None => {
                debug!("User not found in database");
                Err(AppError::NotFound("User not found".to_string()))
            }
        }
    }

    #[instrument(skip(self, user), fields(email = %user.email))]
    async fn store(&self, user: &NewUser) -> Result<i32, AppError> {
        let id: i32 = sqlx::query_scalar(
            r#"INSERT INTO "user" (name, email, password, phone, role, active)
               VALUES ($1, $2, $3, $4, $5, true) RETURNING id"#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.phone)
        .bind(user.role.as_ref())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                warn!("Email already registered in database");
                AppError::Conflict("email already registered".to_string())
            }
            _ => {
                error!(error = %e, "Failed to insert user into database");
                AppError::DatabaseError(e.to_string())
            }
        })?;

        debug!(user_id = id, "User stored in database");
        Ok(id)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: i32) -> Result<(), AppError> {
        let result =
            sqlx::query(r#"UPDATE "user" SET active = false WHERE id = $1 AND active = true"#)
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    error!(error = %e, user_id = id, "Failed to deactivate user in database");
                    AppError::DatabaseError(e.to_string())
                })?;

        if result.rows_affected() == 0 {
            warn!(user_id = id, "User not found for deletion");
            return Err(AppError::NotFound("User not found".to_string()));
        }

        debug!(user_id = id, "User deactivated in database");
        Ok(())
    }
}
