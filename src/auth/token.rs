use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use tracing::{debug, instrument};

use super::{
    errors::AuthError,
    types::{Claims, Identity},
};

/// Issues and verifies HS256-signed identity tokens
#[derive(Clone)]
pub struct TokenService {
    secret: String,
    pub expiration_minutes: i64,
}

impl TokenService {
    pub fn new(secret: impl Into<String>, expiration_minutes: i64) -> Self {
        Self {
            secret: secret.into(),
            expiration_minutes,
        }
    }

    /// Signs a token carrying the given identity
    #[instrument(skip(self, identity), fields(user_id = identity.user_id))]
    pub fn issue(&self, identity: &Identity) -> Result<String, AuthError> {
        let now = Utc::now();
        let exp = Duration::try_minutes(self.expiration_minutes)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| {
                AuthError::TokenCreation(format!(
                    "token lifetime of {} minutes is out of range",
                    self.expiration_minutes
                ))
            })?
            .timestamp() as usize;

        debug!(
            expiration_minutes = self.expiration_minutes,
            exp_timestamp = exp,
            "Creating JWT token with expiration"
        );

        let claims = Claims {
            user_id: identity.user_id,
            name: identity.name.clone(),
            email: identity.email.clone(),
            role: identity.role,
            exp,
            iat: now.timestamp() as usize,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_ref()),
        )
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to encode JWT token");
            AuthError::TokenCreation(e.to_string())
        })
    }

    /// Validates signature and expiry and returns the embedded identity
    #[instrument(skip(self, token))]
    pub fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }

        debug!("Decoding and validating JWT token");

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_ref()),
            &Validation::default(),
        )
        .map(|data| {
            debug!(
                user_id = data.claims.user_id,
                role = %data.claims.role,
                exp = data.claims.exp,
                "JWT token decoded successfully"
            );
            Identity::from(data.claims)
        })
        .map_err(|e| {
            debug!(error = %e, "Failed to decode JWT token");
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                _ => AuthError::InvalidToken(e.to_string()),
            }
        })
    }
}
