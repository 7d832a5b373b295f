use axum::Router;
use std::sync::Arc;

use course_catalog::{
    auth::TokenService,
    build_router,
    course::{
        models::{CategoryModel, CourseModel},
        repository::InMemoryCourseRepository,
    },
    user::repository::InMemoryUserRepository,
    AppState,
};

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub const TEST_SECRET: &str = "workflow-secret";

pub struct TestSetup {
    pub router: Router,
    pub token_service: TokenService,
    pub users: Arc<InMemoryUserRepository>,
    pub courses: Arc<InMemoryCourseRepository>,
}

pub struct TestSetupBuilder {
    categories: Vec<CategoryModel>,
    courses: Vec<CourseModel>,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            categories: vec![
                category(1, "Programming", 50),
                category(2, "Design", 20),
                category(3, "Business", 80),
            ],
            courses: Vec::new(),
        }
    }

    /// Five active courses, two of them free
    pub fn with_catalog(mut self) -> Self {
        self.courses = vec![
            course(1, 1, "Rust Fundamentals", 200_000),
            course(2, 1, "Systems Programming", 350_000),
            course(3, 2, "Sketching 101", 0),
            course(4, 3, "Startup Finance", 120_000),
            course(5, 2, "Color Basics", 0),
        ];
        self
    }

    pub fn build(self) -> TestSetup {
        let token_service = TokenService::new(TEST_SECRET, 60);
        let users = Arc::new(InMemoryUserRepository::new());
        let courses = Arc::new(InMemoryCourseRepository::with_data(
            self.categories,
            self.courses,
        ));

        let state = AppState::in_memory(users.clone(), courses.clone(), token_service.clone());

        TestSetup {
            router: build_router(state),
            token_service,
            users,
            courses,
        }
    }
}

fn category(id: i32, name: &str, count: i32) -> CategoryModel {
    CategoryModel {
        id,
        name: name.to_string(),
        count,
    }
}

fn course(id: i32, category_id: i32, name: &str, price: i32) -> CourseModel {
    CourseModel {
        id,
        category_id,
        name: name.to_string(),
        price,
        count: 0,
        active: true,
    }
}
