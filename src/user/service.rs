use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::{
    models::{NewUser, UserModel},
    repository::UserRepository,
    types::RegisterRequest,
};
use crate::auth::{password, Identity, Role, TokenService};
use crate::shared::AppError;

/// A successfully authenticated user together with its freshly issued token
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user: UserModel,
    pub token: String,
}

/// Service for handling account business logic
pub struct UserService {
    repository: Arc<dyn UserRepository + Send + Sync>,
    token_service: TokenService,
}

impl UserService {
    pub fn new(
        repository: Arc<dyn UserRepository + Send + Sync>,
        token_service: TokenService,
    ) -> Self {
        Self {
            repository,
            token_service,
        }
    }

    /// Checks credentials and issues a token.
    ///
    /// Unknown (or deactivated) emails surface as `NotFound`, a wrong password as
    /// `InvalidCredentials`. No token is issued in either case.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthenticatedUser, AppError> {
        let email = normalize_email(email);
        let user = self.repository.find_by_email(&email).await?;

        let matches =
            password::verify_password_blocking(password.to_string(), user.password_hash.clone())
                .await?;
        if !matches {
            warn!(user_id = user.id, "Password mismatch on login");
            return Err(AppError::InvalidCredentials);
        }

        let token = self.token_service.issue(&user.identity())?;
        info!(user_id = user.id, role = %user.role, "User logged in");

        Ok(AuthenticatedUser { user, token })
    }

    /// Validates and stores a new regular account, returning its id
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register(&self, request: RegisterRequest) -> Result<i32, AppError> {
        let phone = request
            .phone
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());

        self.create_account(
            &request.name,
            &request.email,
            request.password,
            phone,
            Role::Regular,
        )
        .await
    }

    /// Creates the configured administrator unless that email is already taken.
    ///
    /// Returns the new id, or `None` when an account with the email exists.
    #[instrument(skip(self, name, password))]
    pub async fn bootstrap_admin(
        &self,
        name: &str,
        email: &str,
        password: String,
    ) -> Result<Option<i32>, AppError> {
        match self
            .create_account(name, email, password, None, Role::Admin)
            .await
        {
            Ok(id) => Ok(Some(id)),
            Err(AppError::Conflict(_)) => {
                info!("Administrator account already present");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn create_account(
        &self,
        name: &str,
        email: &str,
        password: String,
        phone: Option<String>,
        role: Role,
    ) -> Result<i32, AppError> {
        let name = name.trim();
        let email = normalize_email(email);

        if name.is_empty() || email.is_empty() || password.trim().is_empty() {
            return Err(AppError::Validation(
                "name, email and password are required".to_string(),
            ));
        }
        if !email.contains('@') {
            return Err(AppError::Validation("invalid email".to_string()));
        }

        let new_user = NewUser {
            name: name.to_string(),
            email,
            password_hash: password::hash_password_blocking(password).await?,
            phone,
            role,
        };

        let id = self.repository.store(&new_user).await?;
        info!(user_id = id, role = %new_user.role, "User registered");
        Ok(id)
    }

    /// Soft-deletes a user on behalf of `actor`
    #[instrument(skip(self, actor), fields(actor_id = actor.user_id))]
    pub async fn delete_user(&self, actor: &Identity, id: i32) -> Result<(), AppError> {
        debug!(user_id = id, "Deleting user");
        self.repository.delete(id).await?;
        info!(user_id = id, actor_id = actor.user_id, "User deactivated");
        Ok(())
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
