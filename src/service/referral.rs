use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    db::referraldb::ReferralExt,
    error::ErrorMessage,
    models::referralmodel::ReferralRecord,
    service::error::ServiceError,
    utils::timestamp::format_event_time,
};

/// Case-folded referrer id, or `None` when nothing is left after trimming.
pub fn normalize_referrer(raw: &str) -> Option<String> {
    let normalized = raw.trim().to_lowercase();
    (!normalized.is_empty()).then_some(normalized)
}

/// Name of the per-device flag marking a referral as already logged.
///
/// The id is hex-encoded so every referrer gets its own flag and the name stays a
/// valid cookie token whatever the id contains.
pub fn referral_cookie_name(referrer: &str) -> String {
    format!("referral_{}", hex::encode(referrer.as_bytes()))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordOutcome {
    pub referrer: String,
    pub total: i64,
}

pub struct ReferralService {
    store: Arc<dyn ReferralExt>,
}

impl ReferralService {
    pub fn new(store: Arc<dyn ReferralExt>) -> Self {
        Self { store }
    }

    /// Append one referral event.
    ///
    /// There is no server-side dedup: every call adds a history entry, even with a
    /// timestamp already present. Callers gate calls with the per-device flag.
    pub async fn record(&self, referrer: &str, event_time: DateTime<Utc>) -> Result<RecordOutcome, ServiceError> {
        let referrer = normalize_referrer(referrer)
            .ok_or_else(|| ServiceError::Validation(ErrorMessage::EmptyReferrer.to_string()))?;

        let total = self
            .store
            .record_referral(&referrer, &format_event_time(event_time))
            .await?;

        tracing::info!("Referral logged for {} (total {})", referrer, total);
        Ok(RecordOutcome { referrer, total })
    }

    pub async fn get_referral(&self, referrer: &str) -> Result<Option<ReferralRecord>, ServiceError> {
        let referrer = normalize_referrer(referrer)
            .ok_or_else(|| ServiceError::Validation(ErrorMessage::EmptyReferrer.to_string()))?;

        Ok(self.store.get_referral(&referrer).await?)
    }
}
