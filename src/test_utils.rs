// Shared fixtures for in-crate tests
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;

use crate::{
    config::Config,
    db::{error::StorageError, memory::MemoryStore, referraldb::ReferralExt},
    models::referralmodel::{LeaderState, ReferralRecord},
    service::notification_service::{Notifier, TransportError},
    AppState,
};

/// Keeps every announcement instead of sending it.
#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, text: &str) -> Result<(), TransportError> {
        self.messages.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

/// Counts attempts and fails every one of them.
#[derive(Default)]
pub struct FailingNotifier {
    attempts: Mutex<usize>,
}

impl FailingNotifier {
    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }
}

#[async_trait]
impl Notifier for FailingNotifier {
    async fn send(&self, _text: &str) -> Result<(), TransportError> {
        *self.attempts.lock().unwrap() += 1;
        Err(TransportError::Rejected(500))
    }
}

/// A store whose backend never answers.
pub struct UnreachableStore;

fn unreachable() -> StorageError {
    StorageError::Timeout(Duration::from_secs(5))
}

#[async_trait]
impl ReferralExt for UnreachableStore {
    async fn get_referral(&self, _referrer_id: &str) -> Result<Option<ReferralRecord>, StorageError> {
        Err(unreachable())
    }

    async fn record_referral(&self, _referrer_id: &str, _event_time: &str) -> Result<i64, StorageError> {
        Err(unreachable())
    }

    async fn get_referrals(&self) -> Result<Vec<ReferralRecord>, StorageError> {
        Err(unreachable())
    }

    async fn get_leader_state(&self) -> Result<Option<LeaderState>, StorageError> {
        Err(unreachable())
    }

    async fn set_leader_state(&self, _state: &LeaderState) -> Result<(), StorageError> {
        Err(unreachable())
    }
}

pub fn test_config() -> Config {
    Config {
        leaderboard_url: "https://example.com/referral/comp.html".to_string(),
        ..Config::default()
    }
}

pub fn memory_state() -> (Arc<AppState>, Arc<MemoryStore>, Arc<RecordingNotifier>) {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let state = AppState::new(store.clone(), notifier.clone(), test_config());
    (Arc::new(state), store, notifier)
}
