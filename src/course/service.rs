use std::str::FromStr;
use std::sync::Arc;
use strum::IntoEnumIterator;
use tracing::{debug, info, instrument, warn};

use super::{
    models::{CourseDraft, SortMode},
    repository::CourseRepository,
    types::{CategoryResponse, CourseDetailResponse, CourseResponse, CourseUpdateResponse},
};
use crate::auth::Identity;
use crate::shared::AppError;

/// Service for course and category use-cases
///
/// Maps repository rows to response DTOs. Role checks happen in the router
/// before any mutating call reaches this layer; `actor` is carried for audit logs.
pub struct CourseService {
    repository: Arc<dyn CourseRepository + Send + Sync>,
}

impl CourseService {
    pub fn new(repository: Arc<dyn CourseRepository + Send + Sync>) -> Self {
        Self { repository }
    }

    #[instrument(skip(self))]
    pub async fn list_courses(&self) -> Result<Vec<CourseResponse>, AppError> {
        let courses = self.repository.fetch().await?;
        debug!(course_count = courses.len(), "Listed active courses");
        Ok(courses.into_iter().map(CourseResponse::from).collect())
    }

    #[instrument(skip(self))]
    pub async fn get_course(&self, id: i32) -> Result<CourseDetailResponse, AppError> {
        Ok(self.repository.find_one(id).await?.into())
    }

    #[instrument(skip(self))]
    pub async fn search_courses(&self, term: &str) -> Result<Vec<CourseResponse>, AppError> {
        let term = term.trim();
        if term.is_empty() {
            return Err(AppError::Validation("invalid parameter".to_string()));
        }

        let courses = self.repository.search(term).await?;
        Ok(courses.into_iter().map(CourseResponse::from).collect())
    }

    /// Lists courses in one of the fixed orders. Unknown modes fail before any query.
    #[instrument(skip(self))]
    pub async fn sort_courses(&self, mode: &str) -> Result<Vec<CourseResponse>, AppError> {
        let mode = SortMode::from_str(mode).map_err(|_| {
            warn!(mode = %mode, "Rejected sort mode");
            let accepted: Vec<String> = SortMode::iter().map(|m| m.to_string()).collect();
            AppError::Validation(format!(
                "invalid sort parameter, expected one of: {}",
                accepted.join(", ")
            ))
        })?;

        let courses = self.repository.sort(mode).await?;
        Ok(courses.into_iter().map(CourseResponse::from).collect())
    }

    #[instrument(skip(self, actor, draft), fields(actor_id = actor.user_id))]
    pub async fn create_course(
        &self,
        actor: &Identity,
        draft: CourseDraft,
    ) -> Result<CourseResponse, AppError> {
        let draft = draft.validated()?;
        let course = self.repository.store(&draft).await?;

        info!(course_id = course.id, actor_id = actor.user_id, "Course created");
        Ok(course.into())
    }

    #[instrument(skip(self, actor, draft), fields(actor_id = actor.user_id))]
    pub async fn update_course(
        &self,
        actor: &Identity,
        id: i32,
        draft: CourseDraft,
    ) -> Result<CourseUpdateResponse, AppError> {
        let draft = draft.validated()?;
        self.repository.update(id, &draft).await?;

        info!(course_id = id, actor_id = actor.user_id, "Course updated");
        Ok(CourseUpdateResponse::new(id, draft))
    }

    #[instrument(skip(self, actor), fields(actor_id = actor.user_id))]
    pub async fn delete_course(&self, actor: &Identity, id: i32) -> Result<(), AppError> {
        self.repository.delete(id).await?;

        info!(course_id = id, actor_id = actor.user_id, "Course deactivated");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn get_categories(&self) -> Result<Vec<CategoryResponse>, AppError> {
        let categories = self.repository.fetch_categories().await?;
        Ok(categories.into_iter().map(CategoryResponse::from).collect())
    }

    #[instrument(skip(self))]
    pub async fn get_popular_categories(
        &self,
        limit: i64,
    ) -> Result<Vec<CategoryResponse>, AppError> {
        if limit < 1 {
            return Err(AppError::Validation("invalid parameter".to_string()));
        }

        let categories = self.repository.fetch_popular_categories(limit).await?;
        Ok(categories.into_iter().map(CategoryResponse::from).collect())
    }
}
