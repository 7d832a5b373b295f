use sqlx::FromRow;
use std::str::FromStr;

use crate::auth::{Identity, Role};
use crate::shared::AppError;

/// Stored user record. `password_hash` is an argon2 PHC string.
#[derive(Debug, Clone, PartialEq)]
pub struct UserModel {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub phone: Option<String>,
    pub role: Role,
    pub active: bool,
}

impl UserModel {
    pub fn identity(&self) -> Identity {
        Identity {
            user_id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
        }
    }
}

/// Raw `"user"` row; `role` is kept as text in the table.
#[derive(Debug, FromRow)]
pub struct UserRow {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
    pub role: String,
    pub active: bool,
}

impl TryFrom<UserRow> for UserModel {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = Role::from_str(&row.role).map_err(|_| {
            tracing::error!(user_id = row.id, role = %row.role, "Unknown role stored for user");
            AppError::DatabaseError(format!("unknown role '{}'", row.role))
        })?;

        Ok(UserModel {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password,
            phone: row.phone,
            role,
            active: row.active,
        })
    }
}

/// A user ready to be inserted; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub phone: Option<String>,
    pub role: Role,
}
