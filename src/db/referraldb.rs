// db/referraldb.rs
use async_trait::async_trait;

use super::{db::DBClient, error::StorageError, query_timeout::QueryTimeout};
use crate::models::referralmodel::{LeaderState, ReferralRecord};

/// Record store for referral events and the announced leader.
///
/// `record_referral` must be atomic per referrer: concurrent calls for the same id
/// never lose an increment or a history entry.
#[async_trait]
pub trait ReferralExt: Send + Sync {
    async fn get_referral(
        &self,
        referrer_id: &str,
    ) -> Result<Option<ReferralRecord>, StorageError>;

    /// Create the record or append to it, returning the new total.
    async fn record_referral(
        &self,
        referrer_id: &str,
        event_time: &str,
    ) -> Result<i64, StorageError>;

    async fn get_referrals(&self) -> Result<Vec<ReferralRecord>, StorageError>;

    async fn get_leader_state(&self) -> Result<Option<LeaderState>, StorageError>;

    async fn set_leader_state(
        &self,
        state: &LeaderState,
    ) -> Result<(), StorageError>;
}

#[async_trait]
impl ReferralExt for DBClient {
    async fn get_referral(
        &self,
        referrer_id: &str,
    ) -> Result<Option<ReferralRecord>, StorageError> {
        QueryTimeout::execute_with_timeout(
            sqlx::query_as::<_, ReferralRecord>(
                r#"
                SELECT id, total, history
                FROM referrals
                WHERE id = $1
                "#,
            )
            .bind(referrer_id)
            .fetch_optional(&self.pool),
            self.query_timeout,
        )
        .await
    }

    async fn record_referral(
        &self,
        referrer_id: &str,
        event_time: &str,
    ) -> Result<i64, StorageError> {
        // Single statement so the row lock serialises same-id writers
        QueryTimeout::execute_with_timeout(
            sqlx::query_scalar::<_, i64>(
                r#"
                INSERT INTO referrals (id, total, history)
                VALUES ($1, 1, ARRAY[$2::TEXT])
                ON CONFLICT (id) DO UPDATE
                SET total = referrals.total + 1,
                    history = array_append(referrals.history, $2::TEXT),
                    updated_at = NOW()
                RETURNING total
                "#,
            )
            .bind(referrer_id)
            .bind(event_time)
            .fetch_one(&self.pool),
            self.query_timeout,
        )
        .await
    }

    async fn get_referrals(&self) -> Result<Vec<ReferralRecord>, StorageError> {
        QueryTimeout::execute_with_timeout(
            sqlx::query_as::<_, ReferralRecord>(
                r#"
                SELECT id, total, history
                FROM referrals
                ORDER BY id
                "#,
            )
            .fetch_all(&self.pool),
            self.query_timeout,
        )
        .await
    }

    async fn get_leader_state(&self) -> Result<Option<LeaderState>, StorageError> {
        QueryTimeout::execute_with_timeout(
            sqlx::query_as::<_, LeaderState>(
                r#"
                SELECT top_referrer, updated_at
                FROM leader_state
                WHERE id = 1
                "#,
            )
            .fetch_optional(&self.pool),
            self.query_timeout,
        )
        .await
    }

    async fn set_leader_state(
        &self,
        state: &LeaderState,
    ) -> Result<(), StorageError> {
        QueryTimeout::execute_with_timeout(
            sqlx::query(
                r#"
                INSERT INTO leader_state (id, top_referrer, updated_at)
                VALUES (1, $1, $2)
                ON CONFLICT (id) DO UPDATE
                SET top_referrer = EXCLUDED.top_referrer,
                    updated_at = EXCLUDED.updated_at
                "#,
            )
            .bind(&state.top_referrer)
            .bind(state.updated_at)
            .execute(&self.pool),
            self.query_timeout,
        )
        .await?;

        Ok(())
    }
}

// These run against a throwaway database created by `sqlx::test`, so they need
// DATABASE_URL to point at a Postgres server: `cargo test -- --ignored`.
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use sqlx::PgPool;

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_record_creates_then_appends(pool: PgPool) {
        let db_client = DBClient::new(pool);

        assert_eq!(db_client.get_referral("alice").await.unwrap(), None);
        assert_eq!(db_client.record_referral("alice", "2024-03-05T00:00:00.000Z").await.unwrap(), 1);
        assert_eq!(db_client.record_referral("alice", "2024-03-01T00:00:00.000Z").await.unwrap(), 2);
        assert_eq!(db_client.record_referral("alice", "2024-03-01T00:00:00.000Z").await.unwrap(), 3);

        let record = db_client.get_referral("alice").await.unwrap().unwrap();
        assert_eq!(record.total, 3);
        assert_eq!(
            record.history,
            vec![
                "2024-03-05T00:00:00.000Z",
                "2024-03-01T00:00:00.000Z",
                "2024-03-01T00:00:00.000Z",
            ]
        );
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_concurrent_records_are_not_lost(pool: PgPool) {
        let db_client = DBClient::new(pool);

        let handles: Vec<_> = (0..25)
            .map(|i| {
                let db_client = db_client.clone();
                tokio::spawn(async move {
                    db_client
                        .record_referral("bob", &format!("2024-03-01T00:00:{:02}.000Z", i))
                        .await
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let record = db_client.get_referral("bob").await.unwrap().unwrap();
        assert_eq!(record.total, 25);
        assert_eq!(record.history.len(), 25);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_get_referrals_ordered_by_id(pool: PgPool) {
        let db_client = DBClient::new(pool);

        for id in ["carol", "alice", "bob"] {
            db_client.record_referral(id, "2024-03-01T00:00:00.000Z").await.unwrap();
        }

        let ids: Vec<String> = db_client
            .get_referrals()
            .await
            .unwrap()
            .into_iter()
            .map(|record| record.id)
            .collect();
        assert_eq!(ids, vec!["alice", "bob", "carol"]);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_leader_state_is_a_single_row(pool: PgPool) {
        let db_client = DBClient::new(pool.clone());
        assert_eq!(db_client.get_leader_state().await.unwrap(), None);

        let first = LeaderState {
            top_referrer: "alice".to_string(),
            updated_at: Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap(),
        };
        let second = LeaderState {
            top_referrer: "bob".to_string(),
            updated_at: Utc.with_ymd_and_hms(2024, 3, 12, 9, 30, 0).unwrap(),
        };

        db_client.set_leader_state(&first).await.unwrap();
        db_client.set_leader_state(&second).await.unwrap();

        assert_eq!(db_client.get_leader_state().await.unwrap(), Some(second));

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM leader_state")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }
}
