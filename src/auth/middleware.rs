use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::{debug, instrument, warn};

use super::{errors::AuthError, policy::authorize, types::Identity, types::Role};
use crate::shared::{AppError, AppState};

/// Header carrying the signed token.
pub const TOKEN_HEADER: &str = "x-access-token";

/// JWT authentication middleware - validates the token header and adds the caller's
/// `Identity` to the request.
/// Usage: .route_layer(middleware::from_fn_with_state(app_state.clone(), auth::jwt_auth))
/// Handlers can then extract Extension(identity): Extension<Identity>.
#[instrument(skip(state, req, next), fields(uri = %req.uri()))]
pub async fn jwt_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_token(req.headers()).ok_or_else(|| {
        warn!("Missing auth token in request");
        AuthError::MissingToken
    })?;

    let identity = match state.token_service.verify(token) {
        Ok(identity) => identity,
        Err(e) => {
            warn!("JWT authentication failed: {}", e);
            return Err(e.into());
        }
    };

    debug!(
        user_id = identity.user_id,
        role = %identity.role,
        "Authentication successful, adding identity to request"
    );

    req.extensions_mut().insert(identity);

    Ok(next.run(req).await)
}

/// Role guard. Must sit inside `jwt_auth`.
/// Usage: .route_layer(middleware::from_fn_with_state(Role::Admin, auth::require_role))
#[instrument(skip(req, next), fields(uri = %req.uri()))]
pub async fn require_role(
    State(required): State<Role>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let identity = req
        .extensions()
        .get::<Identity>()
        .ok_or(AuthError::MissingToken)?;

    if let Err(e) = authorize(identity, required) {
        warn!(
            user_id = identity.user_id,
            role = %identity.role,
            required = %required,
            "Caller lacks required role"
        );
        return Err(e.into());
    }

    Ok(next.run(req).await)
}

/// Reads `x-access-token`, falling back to `Authorization: Bearer`. Blank values
/// count as absent.
fn extract_token(headers: &HeaderMap) -> Option<&str> {
    let from_header = headers
        .get(TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|token| !token.is_empty());

    from_header.or_else(|| {
        headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
    })
}
