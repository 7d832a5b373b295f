pub use handlers::get_statistics;
pub use service::{StatisticResponse, StatisticService};

mod handlers;
pub mod repository;
mod service;
