// db/db.rs
use std::time::Duration;

use sqlx::{Pool, Postgres};

use super::{error::StorageError, query_timeout::QueryTimeout};

#[derive(Clone)]
pub struct DBClient {
    pub pool: Pool<Postgres>,
    pub query_timeout: Duration,
}

impl std::fmt::Debug for DBClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DBClient")
            .field("pool", &"Pool<Postgres>")
            .field("query_timeout", &self.query_timeout)
            .finish()
    }
}

impl DBClient {
    pub fn new(pool: Pool<Postgres>) -> Self {
        DBClient {
            pool,
            query_timeout: QueryTimeout::DEFAULT_TIMEOUT,
        }
    }

    /// Bound every store call by `query_timeout` instead of the default.
    pub fn with_query_timeout(mut self, query_timeout: Duration) -> Self {
        self.query_timeout = query_timeout;
        self
    }

    /// Apply the embedded migrations in `migrations/`.
    pub async fn migrate(&self) -> Result<(), StorageError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::info!("✅ Referral schema is up to date");
        Ok(())
    }
}
