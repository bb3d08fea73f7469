// Store call timeout protection
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

use super::error::StorageError;

pub struct QueryTimeout;

impl QueryTimeout {
    /// Run a query, failing with `StorageError::Timeout` if it outlives `timeout_duration`.
    pub async fn execute_with_timeout<F, T>(
        query_fn: F,
        timeout_duration: Duration,
    ) -> Result<T, StorageError>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        match timeout(timeout_duration, query_fn).await {
            Ok(result) => result.map_err(StorageError::from),
            Err(_) => {
                tracing::warn!("Query timed out after {:?}", timeout_duration);
                Err(StorageError::Timeout(timeout_duration))
            }
        }
    }

    /// Default timeout for referral reads and writes (5 seconds)
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
}
