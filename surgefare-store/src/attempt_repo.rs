use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;
use surgefare_core::repository::AttemptLedger;
use surgefare_core::CoreResult;
use surgefare_shared::Attempt;

use crate::database::db_error;

pub struct PgAttemptLedger {
    pool: PgPool,
}

impl PgAttemptLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttemptLedger for PgAttemptLedger {
    async fn record_attempt(&self, attempt: &Attempt) -> CoreResult<()> {
        sqlx::query("INSERT INTO booking_attempts (user_id, flight_id, attempt_time) VALUES ($1, $2, $3)")
            .bind(attempt.user_id)
            .bind(&attempt.flight_id)
            .bind(attempt.attempt_time)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn count_recent(
        &self,
        user_id: Uuid,
        flight_id: &str,
        now: DateTime<Utc>,
        window: Duration,
    ) -> CoreResult<u64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM booking_attempts
            WHERE user_id = $1 AND flight_id = $2 AND attempt_time >= $3
            "#,
        )
        .bind(user_id)
        .bind(flight_id)
        .bind(now.checked_sub_signed(window).unwrap_or(DateTime::<Utc>::MIN_UTC))
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn purge_before(&self, cutoff: DateTime<Utc>) -> CoreResult<u64> {
        let result = sqlx::query("DELETE FROM booking_attempts WHERE attempt_time < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected())
    }
}
