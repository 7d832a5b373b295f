use axum::{extract::State, http::StatusCode, Extension, Json};
use tracing::{info, instrument};

use super::{
    models::CourseDraft,
    service::CourseService,
    types::{
        CategoryResponse, CourseDetailResponse, CourseResponse, CourseUpdateResponse, SearchQuery,
        SortQuery,
    },
};
use crate::auth::Identity;
use crate::shared::{AppError, AppJson, AppPath, AppQuery, AppState};
use crate::user::types::MessageResponse;

fn service(state: &AppState) -> CourseService {
    CourseService::new(state.course_repository.clone())
}

/// GET /course
#[instrument(name = "list_courses", skip(state))]
pub async fn list_courses(
    State(state): State<AppState>,
) -> Result<Json<Vec<CourseResponse>>, AppError> {
    let courses = service(&state).list_courses().await?;
    info!(course_count = courses.len(), "Courses listed");
    Ok(Json(courses))
}

/// GET /course/:id
#[instrument(name = "get_course", skip(state))]
pub async fn get_course(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> Result<Json<CourseDetailResponse>, AppError> {
    Ok(Json(service(&state).get_course(id).await?))
}

/// GET /course-search?search=
#[instrument(name = "search_courses", skip(state, query))]
pub async fn search_courses(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<SearchQuery>,
) -> Result<Json<Vec<CourseResponse>>, AppError> {
    Ok(Json(service(&state).search_courses(&query.search).await?))
}

/// GET /course-sort?sort=high|low|free
#[instrument(name = "sort_courses", skip(state, query))]
pub async fn sort_courses(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<SortQuery>,
) -> Result<Json<Vec<CourseResponse>>, AppError> {
    Ok(Json(service(&state).sort_courses(&query.sort).await?))
}

/// POST /course (admin only)
#[instrument(name = "create_course", skip(state, identity, draft))]
pub async fn create_course(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    AppJson(draft): AppJson<CourseDraft>,
) -> Result<(StatusCode, Json<CourseResponse>), AppError> {
    let course = service(&state).create_course(&identity, draft).await?;
    Ok((StatusCode::CREATED, Json(course)))
}

/// PATCH /course/:id (admin only)
#[instrument(name = "update_course", skip(state, identity, draft))]
pub async fn update_course(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    AppPath(id): AppPath<i32>,
    AppJson(draft): AppJson<CourseDraft>,
) -> Result<Json<CourseUpdateResponse>, AppError> {
    Ok(Json(
        service(&state).update_course(&identity, id, draft).await?,
    ))
}

/// DELETE /course/:id (admin only)
#[instrument(name = "delete_course", skip(state, identity))]
pub async fn delete_course(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    AppPath(id): AppPath<i32>,
) -> Result<Json<MessageResponse>, AppError> {
    service(&state).delete_course(&identity, id).await?;
    Ok(Json(MessageResponse::new("Course has been deleted")))
}

/// GET /category
#[instrument(name = "get_categories", skip(state))]
pub async fn get_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<CategoryResponse>>, AppError> {
    Ok(Json(service(&state).get_categories().await?))
}

/// GET /category/:limit
#[instrument(name = "get_popular_categories", skip(state))]
pub async fn get_popular_categories(
    State(state): State<AppState>,
    AppPath(limit): AppPath<i64>,
) -> Result<Json<Vec<CategoryResponse>>, AppError> {
    Ok(Json(service(&state).get_popular_categories(limit).await?))
}
