// Library crate for the course catalog service
// This file exposes the public API for the binary and integration tests

pub mod app;
pub mod auth;
pub mod config;
pub mod course;
pub mod shared;
pub mod stats;
pub mod user;

// Re-export commonly used types for easier access in tests
pub use app::{build_router, build_state};
pub use config::AppConfig;
pub use shared::{AppError, AppState};
