use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};

use super::repository::StatisticRepository;
use crate::shared::AppError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatisticResponse {
    pub total_user: i64,
    pub total_course: i64,
    pub total_course_free: i64,
}

pub struct StatisticService {
    repository: Arc<dyn StatisticRepository + Send + Sync>,
}

impl StatisticService {
    pub fn new(repository: Arc<dyn StatisticRepository + Send + Sync>) -> Self {
        Self { repository }
    }

    /// Runs the three counts in sequence. Any failure fails the whole call.
    #[instrument(skip(self))]
    pub async fn get_statistics(&self) -> Result<StatisticResponse, AppError> {
        let total_user = self.repository.count_regular_users().await?;
        let total_course = self.repository.count_courses().await?;
        let total_course_free = self.repository.count_free_courses().await?;

        debug!(total_user, total_course, total_course_free, "Statistics computed");

        Ok(StatisticResponse {
            total_user,
            total_course,
            total_course_free,
        })
    }
}
