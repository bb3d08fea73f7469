// db/memory.rs
use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{error::StorageError, referraldb::ReferralExt};
use crate::models::referralmodel::{LeaderState, ReferralRecord};

/// In-process record store, used when no database is configured.
///
/// Appends happen under the write lock, which gives the same per-id atomicity as the
/// Postgres upsert. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    referrals: RwLock<BTreeMap<String, ReferralRecord>>,
    leader_state: RwLock<Option<LeaderState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReferralExt for MemoryStore {
    async fn get_referral(
        &self,
        referrer_id: &str,
    ) -> Result<Option<ReferralRecord>, StorageError> {
        Ok(self.referrals.read().await.get(referrer_id).cloned())
    }

    async fn record_referral(
        &self,
        referrer_id: &str,
        event_time: &str,
    ) -> Result<i64, StorageError> {
        let mut referrals = self.referrals.write().await;
        let record = referrals
            .entry(referrer_id.to_string())
            .or_insert_with(|| ReferralRecord {
                id: referrer_id.to_string(),
                total: 0,
                history: Vec::new(),
            });

        record.total += 1;
        record.history.push(event_time.to_string());
        Ok(record.total)
    }

    async fn get_referrals(&self) -> Result<Vec<ReferralRecord>, StorageError> {
        Ok(self.referrals.read().await.values().cloned().collect())
    }

    async fn get_leader_state(&self) -> Result<Option<LeaderState>, StorageError> {
        Ok(self.leader_state.read().await.clone())
    }

    async fn set_leader_state(
        &self,
        state: &LeaderState,
    ) -> Result<(), StorageError> {
        *self.leader_state.write().await = Some(state.clone());
        Ok(())
    }
}
