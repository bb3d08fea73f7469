// service/leaderboard_service.rs
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};

use crate::{
    config::Config,
    db::referraldb::ReferralExt,
    models::referralmodel::{LeaderState, RankedEntry},
    service::{
        error::ServiceError,
        notification_service::Notifier,
        ranking::{self, Evaluation},
    },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaderboardOutcome {
    NoActivity,
    Unchanged { leader: String },
    // `notified` is false when the transport failed; the state was committed anyway
    LeaderChanged { leader: String, notified: bool },
}

impl LeaderboardOutcome {
    pub fn leader(&self) -> Option<&str> {
        match self {
            LeaderboardOutcome::NoActivity => None,
            LeaderboardOutcome::Unchanged { leader }
            | LeaderboardOutcome::LeaderChanged { leader, .. } => Some(leader),
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            LeaderboardOutcome::NoActivity => "No referrals this month.",
            _ => "Leaderboard check complete.",
        }
    }
}

pub struct LeaderboardService {
    store: Arc<dyn ReferralExt>,
    notifier: Arc<dyn Notifier>,
    reference_offset: FixedOffset,
    leaderboard_url: String,
}

impl LeaderboardService {
    pub fn new(store: Arc<dyn ReferralExt>, notifier: Arc<dyn Notifier>, config: &Config) -> Self {
        Self {
            store,
            notifier,
            reference_offset: config.reference_offset(),
            leaderboard_url: config.leaderboard_url.clone(),
        }
    }

    pub fn reference_offset(&self) -> FixedOffset {
        self.reference_offset
    }

    pub async fn check_leaderboard(&self) -> Result<LeaderboardOutcome, ServiceError> {
        self.check_leaderboard_at(Utc::now()).await
    }

    /// Rank the month containing `now` and announce the leader if it changed.
    ///
    /// Any read failure aborts before a write. The leader state is written after the
    /// announcement is attempted, whether or not delivery succeeded, so a leader is
    /// never announced twice.
    pub async fn check_leaderboard_at(&self, now: DateTime<Utc>) -> Result<LeaderboardOutcome, ServiceError> {
        let records = self.store.get_referrals().await?;
        tracing::debug!("Retrieved {} referral records", records.len());

        let previous = self.store.get_leader_state().await?;
        let previous_leader = previous.as_ref().map(|state| state.top_referrer.as_str());

        match ranking::evaluate(&records, now, self.reference_offset, previous_leader) {
            Evaluation::NoActivity => {
                tracing::info!("No referrals this month. Skipping leader announcement.");
                Ok(LeaderboardOutcome::NoActivity)
            }
            Evaluation::Unchanged { leader } => {
                tracing::debug!("Leader unchanged: {} ({} this month)", leader.id, leader.month_count);
                Ok(LeaderboardOutcome::Unchanged { leader: leader.id })
            }
            Evaluation::LeaderChanged { previous, leader, top_three } => {
                tracing::info!(
                    "Leader changed: {} -> {} ({} this month)",
                    previous.as_deref().unwrap_or("none"),
                    leader.id,
                    leader.month_count
                );

                let announcement = ranking::compose_announcement(&top_three, &self.leaderboard_url);
                let notified = match self.notifier.send(&announcement).await {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::error!("Failed to announce new leader {}: {}", leader.id, e);
                        false
                    }
                };

                self.store
                    .set_leader_state(&LeaderState {
                        top_referrer: leader.id.clone(),
                        updated_at: now,
                    })
                    .await?;
                tracing::info!("Updated top referrer to {}", leader.id);

                Ok(LeaderboardOutcome::LeaderChanged { leader: leader.id, notified })
            }
        }
    }

    /// Current-month standings, best first, referrers without activity omitted.
    pub async fn standings_at(&self, now: DateTime<Utc>) -> Result<Vec<RankedEntry>, ServiceError> {
        let records = self.store.get_referrals().await?;
        Ok(ranking::monthly_standings(&records, now, self.reference_offset))
    }
}
