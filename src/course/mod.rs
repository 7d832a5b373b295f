// Public API - what other modules can use
pub use handlers::{
    create_course, delete_course, get_categories, get_course, get_popular_categories,
    list_courses, search_courses, sort_courses, update_course,
};
pub use service::CourseService;

// Internal modules
mod handlers;
pub mod models;
pub mod repository;
mod service;
pub mod types;
