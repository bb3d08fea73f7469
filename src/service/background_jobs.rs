// service/background_jobs.rs
use std::sync::Arc;

use chrono::Utc;
use tokio::{
    task::JoinHandle,
    time::{interval, Duration, MissedTickBehavior},
};

use crate::{
    service::leaderboard_service::{LeaderboardOutcome, LeaderboardService},
    AppState,
};

/// Run one leaderboard check detached from the caller.
///
/// Best effort: failures are logged and never reach whoever triggered the check.
pub fn spawn_leaderboard_check(leaderboard: Arc<LeaderboardService>) -> JoinHandle<()> {
    tokio::spawn(async move {
        match leaderboard.check_leaderboard().await {
            Ok(LeaderboardOutcome::LeaderChanged { leader, notified: false }) => {
                tracing::warn!("Triggered leaderboard check: new leader {} was not announced", leader)
            }
            Ok(outcome) => tracing::info!(
                "Triggered leaderboard check: {} (leader: {})",
                outcome.message(),
                outcome.leader().unwrap_or("none")
            ),
            Err(e) => tracing::error!("Error triggering leaderboard check: {}", e),
        }
    })
}

/// Start the periodic leaderboard check
pub async fn start_leaderboard_job(app_state: Arc<AppState>, period: Duration) {
    let mut interval = interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        tracing::info!("Running leaderboard job at {}", Utc::now());

        match app_state.leaderboard_service.check_leaderboard().await {
            Ok(outcome) => tracing::info!("Leaderboard job completed: {:?}", outcome),
            Err(e) => tracing::error!("Leaderboard job failed: {}", e),
        }
    }
}
