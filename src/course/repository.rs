use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, error, instrument, warn};

use super::models::{CategoryModel, CourseDetailRow, CourseDraft, CourseModel, SortMode};
use crate::shared::AppError;

/// Trait for course and category repository operations
///
/// Every course read only sees active rows. List methods return an empty
/// vector when nothing matches.
#[async_trait]
pub trait CourseRepository {
    async fn find_one(&self, id: i32) -> Result<CourseDetailRow, AppError>;
    async fn fetch(&self) -> Result<Vec<CourseModel>, AppError>;
    async fn store(&self, draft: &CourseDraft) -> Result<CourseModel, AppError>;
    async fn update(&self, id: i32, draft: &CourseDraft) -> Result<(), AppError>;
    /// Soft delete: flips the active flag
    async fn delete(&self, id: i32) -> Result<(), AppError>;
    /// Substring match on the course name; the term is matched literally.
    async fn search(&self, term: &str) -> Result<Vec<CourseModel>, AppError>;
    async fn sort(&self, mode: SortMode) -> Result<Vec<CourseModel>, AppError>;
    async fn fetch_categories(&self) -> Result<Vec<CategoryModel>, AppError>;
    /// Top `limit` categories by count, highest first
    async fn fetch_popular_categories(&self, limit: i64) -> Result<Vec<CategoryModel>, AppError>;
}

/// Escapes LIKE metacharacters so user input only matches literally.
pub fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn course_not_found() -> AppError {
    AppError::NotFound("Course not found".to_string())
}

fn category_not_found() -> AppError {
    AppError::Validation("category not found".to_string())
}

struct Catalog {
    categories: BTreeMap<i32, CategoryModel>,
    courses: BTreeMap<i32, CourseModel>,
    next_course_id: i32,
}

/// In-memory implementation of CourseRepository for development and testing
pub struct InMemoryCourseRepository {
    catalog: Mutex<Catalog>,
}

impl Default for InMemoryCourseRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCourseRepository {
    /// Creates a new empty in-memory repository
    pub fn new() -> Self {
        Self::with_data(Vec::new(), Vec::new())
    }

    /// Creates an in-memory repository with pre-populated categories and courses
    pub fn with_data(categories: Vec<CategoryModel>, courses: Vec<CourseModel>) -> Self {
        let next_course_id = courses.iter().map(|c| c.id).max().unwrap_or(0) + 1;

        Self {
            catalog: Mutex::new(Catalog {
                categories: categories.into_iter().map(|c| (c.id, c)).collect(),
                courses: courses.into_iter().map(|c| (c.id, c)).collect(),
                next_course_id,
            }),
        }
    }

    /// Copy of every stored course, inactive ones included, in id order
    pub fn snapshot(&self) -> Result<Vec<CourseModel>, AppError> {
        Ok(self.lock()?.courses.values().cloned().collect())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Catalog>, AppError> {
        self.catalog.lock().map_err(|_| {
            error!("Course store lock poisoned");
            AppError::Internal
        })
    }

    fn active_where<F>(&self, keep: F) -> Result<Vec<CourseModel>, AppError>
    where
        F: Fn(&CourseModel) -> bool,
    {
        Ok(self
            .lock()?
            .courses
            .values()
            .filter(|c| c.active && keep(c))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CourseRepository for InMemoryCourseRepository {
    #[instrument(skip(self))]
    async fn find_one(&self, id: i32) -> Result<CourseDetailRow, AppError> {
        let catalog = self.lock()?;
        let course = catalog
            .courses
            .get(&id)
            .filter(|c| c.active)
            .ok_or_else(course_not_found)?;
        let category = catalog
            .categories
            .get(&course.category_id)
            .ok_or_else(course_not_found)?;

        Ok(CourseDetailRow {
            id: course.id,
            category_id: category.id,
            category_name: category.name.clone(),
            name: course.name.clone(),
            price: course.price,
            count: course.count,
        })
    }

    #[instrument(skip(self))]
    async fn fetch(&self) -> Result<Vec<CourseModel>, AppError> {
        self.active_where(|_| true)
    }

    #[instrument(skip(self, draft), fields(name = %draft.name))]
    async fn store(&self, draft: &CourseDraft) -> Result<CourseModel, AppError> {
        let mut catalog = self.lock()?;
        if !catalog.categories.contains_key(&draft.category_id) {
            warn!(category_id = draft.category_id, "Unknown category for new course");
            return Err(category_not_found());
        }

        let course = CourseModel {
            id: catalog.next_course_id,
            category_id: draft.category_id,
            name: draft.name.clone(),
            price: draft.price,
            count: draft.count,
            active: true,
        };
        catalog.next_course_id += 1;
        catalog.courses.insert(course.id, course.clone());

        debug!(course_id = course.id, "Course stored in memory");
        Ok(course)
    }

    #[instrument(skip(self, draft))]
    async fn update(&self, id: i32, draft: &CourseDraft) -> Result<(), AppError> {
        let mut catalog = self.lock()?;
        if !catalog.courses.get(&id).is_some_and(|c| c.active) {
            return Err(course_not_found());
        }
        if !catalog.categories.contains_key(&draft.category_id) {
            return Err(category_not_found());
        }

        let course = catalog
            .courses
            .get_mut(&id)
            .ok_or_else(course_not_found)?;
        course.category_id = draft.category_id;
        course.name = draft.name.clone();
        course.price = draft.price;
        course.count = draft.count;

        debug!(course_id = id, "Course updated in memory");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: i32) -> Result<(), AppError> {
        let mut catalog = self.lock()?;
        let course = catalog
            .courses
            .get_mut(&id)
            .filter(|c| c.active)
            .ok_or_else(|| {
                warn!(course_id = id, "Course not found for deletion in memory");
                course_not_found()
            })?;
        course.active = false;

        debug!(course_id = id, "Course deactivated in memory");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn search(&self, term: &str) -> Result<Vec<CourseModel>, AppError> {
        self.active_where(|c| c.name.contains(term))
    }

    #[instrument(skip(self))]
    async fn sort(&self, mode: SortMode) -> Result<Vec<CourseModel>, AppError> {
        let mut courses = match mode {
            SortMode::Free => return self.active_where(|c| c.price == 0),
            SortMode::High | SortMode::Low => self.active_where(|_| true)?,
        };

        // Ties keep id order, matching the SQL variants
        match mode {
            SortMode::High => courses.sort_by(|a, b| b.price.cmp(&a.price).then(a.id.cmp(&b.id))),
            _ => courses.sort_by(|a, b| a.price.cmp(&b.price).then(a.id.cmp(&b.id))),
        }
        Ok(courses)
    }

    #[instrument(skip(self))]
    async fn fetch_categories(&self) -> Result<Vec<CategoryModel>, AppError> {
        Ok(self.lock()?.categories.values().cloned().collect())
    }

    #[instrument(skip(self))]
    async fn fetch_popular_categories(&self, limit: i64) -> Result<Vec<CategoryModel>, AppError> {
        let mut categories = self.fetch_categories().await?;
        categories.sort_by(|a, b| b.count.cmp(&a.count).then(a.id.cmp(&b.id)));
        categories.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(categories)
    }
}

const COURSE_COLUMNS: &str = "id, category_id, name, price, count, active";

/// PostgreSQL implementation of course repository
pub struct PostgresCourseRepository {
    pool: PgPool,
}

impl PostgresCourseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_courses<'q>(
        &self,
        sql: &'q str,
        bind: Option<&'q str>,
    ) -> Result<Vec<CourseModel>, AppError> {
        let mut query = sqlx::query_as::<_, CourseModel>(sql);
        if let Some(value) = bind {
            query = query.bind(value);
        }

        query.fetch_all(&self.pool).await.map_err(|e| {
            error!(error = %e, "Failed to fetch courses from database");
            AppError::DatabaseError(e.to_string())
        })
    }
}

fn map_write_error(e: sqlx::Error) -> AppError {
    match &e {
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23503") => {
            warn!("Course references an unknown category");
            category_not_found()
        }
        _ => {
            error!(error = %e, "Failed to write course to database");
            AppError::DatabaseError(e.to_string())
        }
    }
}

#[async_trait]
impl CourseRepository for PostgresCourseRepository {
    #[instrument(skip(self))]
    async fn find_one(&self, id: i32) -> Result<CourseDetailRow, AppError> {
        sqlx::query_as::<_, CourseDetailRow>(
            "SELECT c.id, c.category_id, cat.name AS category_name, c.name, c.price, c.count \
             FROM course c JOIN category cat ON cat.id = c.category_id \
             WHERE c.id = $1 AND c.active = true",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!(error = %e, course_id = id, "Failed to fetch course from database");
            AppError::DatabaseError(e.to_string())
        })?
        .ok_or_else(|| {
            debug!(course_id = id, "Course not found in database");
            course_not_found()
        })
    }

    #[instrument(skip(self))]
    async fn fetch(&self) -> Result<Vec<CourseModel>, AppError> {
        let sql = format!("SELECT {COURSE_COLUMNS} FROM course WHERE active = true ORDER BY id");
        self.fetch_courses(&sql, None).await
    }

    #[instrument(skip(self, draft), fields(name = %draft.name))]
    async fn store(&self, draft: &CourseDraft) -> Result<CourseModel, AppError> {
        let sql = format!(
            "INSERT INTO course (category_id, name, price, count, active) \
             VALUES ($1, $2, $3, $4, true) RETURNING {COURSE_COLUMNS}"
        );
        let course = sqlx::query_as::<_, CourseModel>(&sql)
            .bind(draft.category_id)
            .bind(&draft.name)
            .bind(draft.price)
            .bind(draft.count)
            .fetch_one(&self.pool)
            .await
            .map_err(map_write_error)?;

        debug!(course_id = course.id, "Course stored in database");
        Ok(course)
    }

    #[instrument(skip(self, draft))]
    async fn update(&self, id: i32, draft: &CourseDraft) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE course SET category_id = $2, name = $3, price = $4, count = $5 \
             WHERE id = $1 AND active = true",
        )
        .bind(id)
        .bind(draft.category_id)
        .bind(&draft.name)
        .bind(draft.price)
        .bind(draft.count)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        if result.rows_affected() == 0 {
            warn!(course_id = id, "Course not found for update");
            return Err(course_not_found());
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: i32) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE course SET active = false WHERE id = $1 AND active = true")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!(error = %e, course_id = id, "Failed to deactivate course in database");
                AppError::DatabaseError(e.to_string())
            })?;

        if result.rows_affected() == 0 {
            warn!(course_id = id, "Course not found for deletion");
            return Err(course_not_found());
        }

        debug!(course_id = id, "Course deactivated in database");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn search(&self, term: &str) -> Result<Vec<CourseModel>, AppError> {
        let pattern = format!("%{}%", escape_like(term));
        let sql = format!(
            "SELECT {COURSE_COLUMNS} FROM course \
             WHERE active = true AND name LIKE $1 ESCAPE '\\' ORDER BY id"
        );
        self.fetch_courses(&sql, Some(pattern.as_str())).await
    }

    #[instrument(skip(self))]
    async fn sort(&self, mode: SortMode) -> Result<Vec<CourseModel>, AppError> {
        let clause = match mode {
            SortMode::High => "ORDER BY price DESC, id",
            SortMode::Low => "ORDER BY price ASC, id",
            SortMode::Free => "AND price = 0 ORDER BY id",
        };
        let sql = format!("SELECT {COURSE_COLUMNS} FROM course WHERE active = true {clause}");
        self.fetch_courses(&sql, None).await
    }

    #[instrument(skip(self))]
    async fn fetch_categories(&self) -> Result<Vec<CategoryModel>, AppError> {
        sqlx::query_as::<_, CategoryModel>("SELECT id, name, count FROM category ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to fetch categories from database");
                AppError::DatabaseError(e.to_string())
            })
    }

    #[instrument(skip(self))]
    async fn fetch_popular_categories(&self, limit: i64) -> Result<Vec<CategoryModel>, AppError> {
        sqlx::query_as::<_, CategoryModel>(
            "SELECT id, name, count FROM category ORDER BY count DESC, id LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!(error = %e, limit, "Failed to fetch popular categories from database");
            AppError::DatabaseError(e.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_utils::{sample_categories, sample_courses};

    fn repo() -> InMemoryCourseRepository {
        InMemoryCourseRepository::with_data(sample_categories(), sample_courses())
    }

    fn ids(courses: &[CourseModel]) -> Vec<i32> {
        courses.iter().map(|c| c.id).collect()
    }

    fn draft(category_id: i32, name: &str, price: i32) -> CourseDraft {
        CourseDraft {
            category_id,
            name: name.to_string(),
            price,
            count: 0,
        }
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("100%_off\\"), "100\\%\\_off\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[tokio::test]
    async fn test_fetch_skips_inactive() {
        let courses = repo().fetch().await.unwrap();
        assert_eq!(ids(&courses), vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_find_one_joins_category() {
        let detail = repo().find_one(3).await.unwrap();
        assert_eq!(detail.category_name, "Design");
        assert_eq!(detail.name, "Intro to Figma");
    }

    #[tokio::test]
    async fn test_find_one_inactive_or_missing_is_not_found() {
        let repo = repo();
        assert!(matches!(repo.find_one(6).await, Err(AppError::NotFound(_))));
        assert!(matches!(repo.find_one(600).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_store_requires_known_category() {
        let repo = repo();
        let stored = repo.store(&draft(2, "Color Theory", 10)).await.unwrap();
        assert_eq!(stored.id, 7);
        assert!(stored.active);

        let result = repo.store(&draft(99, "Orphan", 10)).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_update_only_touches_active_courses() {
        let repo = repo();
        repo.update(1, &draft(3, "Rust for Marketers", 5)).await.unwrap();
        let detail = repo.find_one(1).await.unwrap();
        assert_eq!(detail.category_name, "Marketing");
        assert_eq!(detail.price, 5);

        assert!(matches!(
            repo.update(6, &draft(1, "Revived", 0)).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_missing_course_wins_over_unknown_category() {
        let repo = repo();
        assert!(matches!(
            repo.update(999, &draft(99, "Nowhere", 0)).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            repo.update(1, &draft(99, "Nowhere", 0)).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_is_soft_and_single_shot() {
        let repo = repo();
        repo.delete(2).await.unwrap();

        assert!(!ids(&repo.fetch().await.unwrap()).contains(&2));
        assert!(matches!(repo.delete(2).await, Err(AppError::NotFound(_))));
        assert_eq!(repo.snapshot().unwrap().len(), 6);
    }

    #[tokio::test]
    async fn test_search_is_literal_substring() {
        let repo = repo();
        assert_eq!(ids(&repo.search("Rust").await.unwrap()), vec![1, 2]);
        assert!(repo.search("%").await.unwrap().is_empty());
        assert!(repo.search("Perl").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sort_modes() {
        let repo = repo();
        assert_eq!(ids(&repo.sort(SortMode::High).await.unwrap()), vec![2, 1, 5, 3, 4]);
        assert_eq!(ids(&repo.sort(SortMode::Low).await.unwrap()), vec![3, 4, 5, 1, 2]);
        assert_eq!(ids(&repo.sort(SortMode::Free).await.unwrap()), vec![3, 4]);
    }

    #[tokio::test]
    async fn test_popular_categories() {
        let repo = repo();
        let top: Vec<i32> = repo
            .fetch_popular_categories(2)
            .await
            .unwrap()
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(top, vec![2, 1]);
        assert_eq!(repo.fetch_popular_categories(10).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_empty_repository_returns_empty_lists() {
        let repo = InMemoryCourseRepository::new();
        assert!(repo.fetch().await.unwrap().is_empty());
        assert!(repo.fetch_categories().await.unwrap().is_empty());
        assert!(repo.sort(SortMode::Free).await.unwrap().is_empty());
    }
}
