mod config;
mod db;
mod dtos;
mod error;
mod handler;
mod models;
mod routes;
mod service;
mod utils;

#[cfg(test)]
mod test_utils;

use std::{sync::Arc, time::Duration};

use config::Config;
use db::{db::DBClient, memory::MemoryStore, referraldb::ReferralExt};
use dotenv::dotenv;
use routes::create_router;
use sqlx::postgres::PgPoolOptions;

use service::{
    background_jobs::start_leaderboard_job,
    leaderboard_service::LeaderboardService,
    notification_service::{Notifier, SlackNotifier},
    referral::ReferralService,
};

#[derive(Clone)]
pub struct AppState {
    pub env: Config,
    pub referral_service: Arc<ReferralService>,
    pub leaderboard_service: Arc<LeaderboardService>,
}

impl AppState {
    pub fn new(store: Arc<dyn ReferralExt>, notifier: Arc<dyn Notifier>, config: Config) -> Self {
        let referral_service = Arc::new(ReferralService::new(store.clone()));
        let leaderboard_service = Arc::new(LeaderboardService::new(store, notifier, &config));

        Self {
            env: config,
            referral_service,
            leaderboard_service,
        }
    }
}

async fn connect_store(config: &Config) -> Arc<dyn ReferralExt> {
    let Some(database_url) = config.database_url.as_deref() else {
        tracing::warn!("ℹ️  DATABASE_URL not set - referrals are kept in memory and lost on restart");
        return Arc::new(MemoryStore::new());
    };

    let pool = match PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(config.store_timeout())
        .connect(database_url)
        .await
    {
        Ok(pool) => {
            tracing::info!("✅ Connection to the database is successful!");
            pool
        }
        Err(err) => {
            tracing::error!("🔥 Failed to connect to the database: {:?}", err);
            std::process::exit(1);
        }
    };

    let db_client = DBClient::new(pool).with_query_timeout(config.store_timeout());
    if let Err(err) = db_client.migrate().await {
        tracing::error!("🔥 Failed to apply migrations: {}", err);
        std::process::exit(1);
    }

    Arc::new(db_client)
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_max_level(config::max_log_level())
        .init();

    let config = Config::init();

    let store = connect_store(&config).await;

    let notifier = match SlackNotifier::new(config.slack_webhook_url.clone(), config.notify_timeout()) {
        Ok(notifier) => Arc::new(notifier),
        Err(err) => {
            tracing::error!("🔥 Failed to build the notification client: {}", err);
            std::process::exit(1);
        }
    };

    let app_state = Arc::new(AppState::new(store, notifier, config.clone()));

    let app = create_router(app_state.clone());

    if config.leaderboard_check_interval_secs > 0 {
        tokio::spawn(start_leaderboard_job(
            app_state.clone(),
            Duration::from_secs(config.leaderboard_check_interval_secs),
        ));
    }

    tracing::info!("🚀 Server is running on http://localhost:{}", config.port);

    let listener = match tokio::net::TcpListener::bind(format!("0.0.0.0:{}", &config.port)).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("🔥 Failed to bind port {}: {}", config.port, err);
            std::process::exit(1);
        }
    };

    if let Err(err) = axum::serve(listener, app).await {
        tracing::error!("🔥 Server error: {}", err);
    }
}
