use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    models::referralmodel::{RankedEntry, ReferralRecord},
    service::referral::RecordOutcome,
};

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct RecordReferralDto {
    #[validate(length(min = 1, max = 128, message = "Referrer must be between 1-128 characters"))]
    pub referrer: String,

    // Defaults to the time the request is handled
    pub event_time: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RecordReferralResponseDto {
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<RecordOutcome>,
}

#[derive(Debug, Serialize)]
pub struct ReferralResponseDto {
    pub status: String,
    pub data: ReferralRecord,
}

#[derive(Debug, Serialize)]
pub struct StandingDto {
    pub rank: usize,
    pub referrer: String,
    pub month_count: usize,
    pub first_event_in_month: Option<DateTime<Utc>>,
}

impl StandingDto {
    pub fn from_ranked(entries: Vec<RankedEntry>) -> Vec<StandingDto> {
        entries
            .into_iter()
            .enumerate()
            .map(|(i, entry)| StandingDto {
                rank: i + 1,
                referrer: entry.id,
                month_count: entry.month_count,
                first_event_in_month: entry.first_event_in_month,
            })
            .collect()
    }
}

#[derive(Debug, Serialize)]
pub struct LeaderboardResponseDto {
    pub status: String,
    // Calendar month in the reference offset, e.g. "2024-03"
    pub month: String,
    pub results: usize,
    pub standings: Vec<StandingDto>,
}
