use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Accumulated referral events for one referrer.
///
/// `history` holds raw timestamps in arrival order and is never pruned, so
/// `total == history.len()` after every write.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, sqlx::FromRow)]
pub struct ReferralRecord {
    pub id: String,
    pub total: i64,
    pub history: Vec<String>,
}

/// The last leader that was announced. Absent until the first announcement.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, sqlx::FromRow)]
pub struct LeaderState {
    pub top_referrer: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedEntry {
    pub id: String,
    pub month_count: usize,
    // None ranks after every real instant
    pub first_event_in_month: Option<DateTime<Utc>>,
}
