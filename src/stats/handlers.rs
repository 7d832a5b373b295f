use axum::{extract::State, Json};
use tracing::instrument;

use super::service::{StatisticResponse, StatisticService};
use crate::shared::{AppError, AppState};

/// HTTP handler for catalog statistics (admin only)
///
/// GET /statistic
#[instrument(name = "get_statistics", skip(state))]
pub async fn get_statistics(
    State(state): State<AppState>,
) -> Result<Json<StatisticResponse>, AppError> {
    let service = StatisticService::new(state.statistic_repository.clone());
    Ok(Json(service.get_statistics().await?))
}
