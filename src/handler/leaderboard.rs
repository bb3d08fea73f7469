use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use chrono::Utc;

use crate::{
    dtos::referraldtos::{LeaderboardResponseDto, StandingDto},
    error::HttpError,
    AppState,
};

pub fn leaderboard_handler() -> Router {
    Router::new()
        .route("/", get(get_standings))
        .route("/check", get(check_leaderboard).post(check_leaderboard))
}

/// Trigger endpoint. Answers plain text; failures never leak detail to the caller.
pub async fn check_leaderboard(
    Extension(app_state): Extension<Arc<AppState>>,
) -> impl IntoResponse {
    tracing::info!("Leaderboard check triggered via HTTP");

    match app_state.leaderboard_service.check_leaderboard().await {
        Ok(outcome) => (StatusCode::OK, outcome.message()),
        Err(e) => {
            tracing::error!("Error checking leaderboard: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error checking leaderboard.")
        }
    }
}

pub async fn get_standings(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let now = Utc::now();
    let standings = app_state.leaderboard_service
        .standings_at(now)
        .await?;

    let month = now
        .with_timezone(&app_state.leaderboard_service.reference_offset())
        .format("%Y-%m")
        .to_string();

    Ok(Json(LeaderboardResponseDto {
        status: "success".to_string(),
        month,
        results: standings.len(),
        standings: StandingDto::from_ranked(standings),
    }))
}
