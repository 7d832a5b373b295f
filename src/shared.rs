use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        FromRequest, FromRequestParts,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::auth::{AuthError, TokenService};
use crate::course::repository::{CourseRepository, InMemoryCourseRepository};
use crate::stats::repository::{InMemoryStatisticRepository, StatisticRepository};
use crate::user::repository::{InMemoryUserRepository, UserRepository};

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub user_repository: Arc<dyn UserRepository + Send + Sync>,
    pub course_repository: Arc<dyn CourseRepository + Send + Sync>,
    pub statistic_repository: Arc<dyn StatisticRepository + Send + Sync>,
    pub token_service: TokenService,
}

impl AppState {
    pub fn new(
        user_repository: Arc<dyn UserRepository + Send + Sync>,
        course_repository: Arc<dyn CourseRepository + Send + Sync>,
        statistic_repository: Arc<dyn StatisticRepository + Send + Sync>,
        token_service: TokenService,
    ) -> Self {
        Self {
            user_repository,
            course_repository,
            statistic_repository,
            token_service,
        }
    }

    /// Wires the in-memory repositories together so statistics see the same data
    /// as the user and course endpoints.
    pub fn in_memory(
        users: Arc<InMemoryUserRepository>,
        courses: Arc<InMemoryCourseRepository>,
        token_service: TokenService,
    ) -> Self {
        let statistics = Arc::new(InMemoryStatisticRepository::new(
            Arc::clone(&users),
            Arc::clone(&courses),
        ));
        Self::new(users, courses, statistics, token_service)
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal server error")]
    Internal,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidCredentials => StatusCode::BAD_REQUEST,
            AppError::Auth(AuthError::TokenCreation(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Auth(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::DatabaseError(_) | AppError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // Store and signing failures were logged where they happened; the client
        // only gets a generic message for them.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            "internal error".to_string()
        } else {
            self.to_string()
        };

        let body = Json(json!({
            "message": message
        }));

        (status, body).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        debug!(reason = %rejection.body_text(), "Rejected request body");
        AppError::Validation("invalid data request".to_string())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        debug!(reason = %rejection.body_text(), "Rejected path parameter");
        AppError::Validation("invalid parameter".to_string())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        debug!(reason = %rejection.body_text(), "Rejected query string");
        AppError::Validation("invalid parameter".to_string())
    }
}

/// `Json` extractor that answers malformed bodies with the `{message}` envelope.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// `Path` extractor that answers unparsable segments with a 400.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct AppPath<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);


#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;

    async fn body_message(error: AppError) -> (StatusCode, String) {
        let response = error.into_response();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        (status, value["message"].as_str().unwrap().to_string())
    }

    #[tokio::test]
    async fn test_validation_error_is_bad_request() {
        let (status, message) =
            body_message(AppError::Validation("invalid parameter".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(message, "invalid parameter");
    }

    #[tokio::test]
    async fn test_auth_errors_are_forbidden_with_reason() {
        let (status, message) = body_message(AuthError::MissingToken.into()).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(message, "missing auth token");

        let (status, message) = body_message(
            AuthError::InsufficientRole {
                required: Role::Admin,
            }
            .into(),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(message, "admin role required");
    }

    #[tokio::test]
    async fn test_database_error_does_not_leak_cause() {
        let cause = "relation \"course\" does not exist";
        let (status, message) = body_message(AppError::DatabaseError(cause.into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(message, "internal error");
    }

    #[tokio::test]
    async fn test_not_found_maps_to_404() {
        let (status, _) = body_message(AppError::NotFound("Course not found".into())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
