use thiserror::Error;

use super::types::Role;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("missing auth token")]
    MissingToken,

    #[error("invalid auth token: {0}")]
    InvalidToken(String),

    #[error("auth token has expired")]
    ExpiredToken,

    #[error("{required} role required")]
    InsufficientRole { required: Role },

    #[error("failed to sign auth token: {0}")]
    TokenCreation(String),
}
