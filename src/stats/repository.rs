use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, instrument};

use crate::auth::Role;
use crate::course::repository::InMemoryCourseRepository;
use crate::shared::AppError;
use crate::user::repository::InMemoryUserRepository;

/// Aggregate counts over active rows
#[async_trait]
pub trait StatisticRepository: Send + Sync {
    async fn count_regular_users(&self) -> Result<i64, AppError>;
    async fn count_courses(&self) -> Result<i64, AppError>;
    async fn count_free_courses(&self) -> Result<i64, AppError>;
}

/// Counts straight from the in-memory user and course repositories
pub struct InMemoryStatisticRepository {
    users: Arc<InMemoryUserRepository>,
    courses: Arc<InMemoryCourseRepository>,
}

impl InMemoryStatisticRepository {
    pub fn new(users: Arc<InMemoryUserRepository>, courses: Arc<InMemoryCourseRepository>) -> Self {
        Self { users, courses }
    }
}

#[async_trait]
impl StatisticRepository for InMemoryStatisticRepository {
    async fn count_regular_users(&self) -> Result<i64, AppError> {
        let users = self.users.snapshot()?;
        Ok(users
            .iter()
            .filter(|u| u.active && u.role == Role::Regular)
            .count() as i64)
    }

    async fn count_courses(&self) -> Result<i64, AppError> {
        let courses = self.courses.snapshot()?;
        Ok(courses.iter().filter(|c| c.active).count() as i64)
    }

    async fn count_free_courses(&self) -> Result<i64, AppError> {
        let courses = self.courses.snapshot()?;
        Ok(courses.iter().filter(|c| c.active && c.price == 0).count() as i64)
    }
}

pub struct PostgresStatisticRepository {
    pool: PgPool,
}

impl PostgresStatisticRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn count(&self, sql: &str) -> Result<i64, AppError> {
        sqlx::query_scalar::<_, i64>(sql)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to count rows in database");
                AppError::DatabaseError(e.to_string())
            })
    }
}

#[async_trait]
impl StatisticRepository for PostgresStatisticRepository {
    #[instrument(skip(self))]
    async fn count_regular_users(&self) -> Result<i64, AppError> {
        self.count(r#"SELECT COUNT(*) FROM "user" WHERE role = 'regular' AND active = true"#)
            .await
    }

    #[instrument(skip(self))]
    async fn count_courses(&self) -> Result<i64, AppError> {
        self.count("SELECT COUNT(*) FROM course WHERE active = true")
            .await
    }

    #[instrument(skip(self))]
    async fn count_free_courses(&self) -> Result<i64, AppError> {
        self.count("SELECT COUNT(*) FROM course WHERE active = true AND price = 0")
            .await
    }
}
