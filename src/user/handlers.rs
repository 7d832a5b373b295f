use axum::{extract::State, http::StatusCode, Extension, Json};
use tracing::{info, instrument};

use super::{
    service::UserService,
    types::{LoginRequest, LoginResponse, MessageResponse, RegisterRequest},
};
use crate::auth::Identity;
use crate::shared::{AppError, AppJson, AppPath, AppState};

fn service(state: &AppState) -> UserService {
    UserService::new(state.user_repository.clone(), state.token_service.clone())
}

/// HTTP handler for logging in
///
/// POST /login
/// Returns a signed token. Unknown email and wrong password are indistinguishable.
#[instrument(name = "login", skip(state, request))]
pub async fn login(
    State(state): State<AppState>,
    AppJson(request): AppJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let authenticated = service(&state)
        .login(&request.email, &request.password)
        .await
        .map_err(|e| match e {
            AppError::NotFound(_) => AppError::InvalidCredentials,
            other => other,
        })?;

    Ok(Json(LoginResponse {
        message: "logged in".to_string(),
        token: authenticated.token,
    }))
}

/// HTTP handler for registering an account
///
/// POST /register
#[instrument(name = "register", skip(state, request))]
pub async fn register(
    State(state): State<AppState>,
    AppJson(request): AppJson<RegisterRequest>,
) -> Result<(StatusCode, Json<&'static str>), AppError> {
    let id = service(&state).register(request).await?;
    info!(user_id = id, "Registration complete");

    Ok((StatusCode::CREATED, Json("success")))
}

/// HTTP handler for deactivating a user (admin only)
///
/// DELETE /user/:id
#[instrument(name = "delete_user", skip(state, identity))]
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    AppPath(id): AppPath<i32>,
) -> Result<Json<MessageResponse>, AppError> {
    service(&state).delete_user(&identity, id).await?;

    Ok(Json(MessageResponse::new("User has been deleted")))
}
