use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::info;
use surgefare_core::repository::AttemptLedger;
use surgefare_core::CoreResult;

/// Bounds ledger growth by dropping attempts older than the retention horizon.
pub struct LedgerRetention {
    ledger: Arc<dyn AttemptLedger>,
    retention: Duration,
}

impl LedgerRetention {
    /// `retention` must be at least the surge counting window.
    pub fn new(ledger: Arc<dyn AttemptLedger>, retention: Duration) -> Self {
        Self { ledger, retention }
    }

    pub async fn purge(&self, now: DateTime<Utc>) -> CoreResult<u64> {
        let cutoff = now.checked_sub_signed(self.retention).unwrap_or(DateTime::<Utc>::MIN_UTC);
        let removed = self.ledger.purge_before(cutoff).await?;
        if removed > 0 {
            info!("Purged {} booking attempts older than {}", removed, self.retention);
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use surgefare_core::SurgePolicy;
    use surgefare_shared::Attempt;
    use surgefare_store::InMemoryStore;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_purge_preserves_counting_window() {
        let store = Arc::new(InMemoryStore::new());
        let policy = SurgePolicy::default();
        let user = Uuid::new_v4();
        let now = Utc::now();

        for minutes in [0, 4, 30, 90] {
            store
                .record_attempt(&Attempt::new(user, "AI101", now - Duration::minutes(minutes)))
                .await
                .unwrap();
        }

        let retention = LedgerRetention::new(store.clone(), Duration::hours(1));
        assert_eq!(retention.purge(now).await.unwrap(), 1);

        let recent = store.count_recent(user, "AI101", now, policy.attempt_window).await.unwrap();
        assert_eq!(recent, 2);
    }
}
