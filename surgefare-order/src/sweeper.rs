use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::warn;
use surgefare_core::repository::BookingRepository;
use surgefare_core::CoreResult;

use crate::manager::BookingSettings;

/// Slack on top of the longest possible ticket issuance.
const ISSUANCE_MARGIN_SECONDS: i64 = 5;

/// Releases holds whose booking never completed (crashed or timed-out
/// requests), refunding the debit.
pub struct HoldSweeper {
    bookings: Arc<dyn BookingRepository>,
    hold_ttl: Duration,
}

impl HoldSweeper {
    /// `hold_ttl` is raised to outlast the slowest issuance `settings` allow,
    /// so a hold is never released while its ticket is still being issued.
    pub fn new(bookings: Arc<dyn BookingRepository>, hold_ttl: Duration, settings: &BookingSettings) -> Self {
        let worst = settings.worst_case_issuance();
        let floor = worst
            .checked_add(&Duration::seconds(ISSUANCE_MARGIN_SECONDS))
            .unwrap_or(worst);
        if hold_ttl < floor {
            warn!("Hold TTL {} is shorter than ticket issuance can take, using {}", hold_ttl, floor);
        }
        Self {
            bookings,
            hold_ttl: hold_ttl.max(floor),
        }
    }

    pub fn hold_ttl(&self) -> Duration {
        self.hold_ttl
    }

    pub async fn sweep(&self, now: DateTime<Utc>) -> CoreResult<u64> {
        let cutoff = now.checked_sub_signed(self.hold_ttl).unwrap_or(DateTime::<Utc>::MIN_UTC);
        let released = self.bookings.release_stale_holds(cutoff).await?;
        if released > 0 {
            warn!("Released {} stale booking holds", released);
        }
        Ok(released)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use surgefare_core::repository::UserRepository;
    use surgefare_shared::{BookingHold, Flight, User};
    use surgefare_store::InMemoryStore;

    async fn store_with_user(wallet: i64) -> (Arc<InMemoryStore>, User, Flight) {
        let store = Arc::new(InMemoryStore::new());
        let flight = Flight::new("AI101", "Air India", "Delhi", "Mumbai", Utc::now(), 1000);
        store.insert_flight(flight.clone()).await;
        let user = User::new("Asha Rao", wallet);
        store.insert_user(user.clone()).await;
        (store, user, flight)
    }

    #[tokio::test]
    async fn test_sweep_releases_only_stale_holds() {
        let (store, user, flight) = store_with_user(5000).await;
        let other = User::new("Ravi", 5000);
        store.insert_user(other.clone()).await;
        let now = Utc::now();

        let stale = BookingHold::snapshot(user.id, &flight, "PNR-1-AAAA".to_string(), now - Duration::minutes(10));
        let fresh = BookingHold::snapshot(other.id, &flight, "PNR-2-BBBB".to_string(), now - Duration::seconds(10));
        store.place_hold(&stale).await.unwrap();
        store.place_hold(&fresh).await.unwrap();

        let sweeper = HoldSweeper::new(store.clone(), Duration::minutes(2), &BookingSettings::default());
        assert_eq!(sweeper.sweep(now).await.unwrap(), 1);

        assert_eq!(store.pending_holds().await, 1);
        assert_eq!(store.get_user(user.id).await.unwrap().unwrap().wallet, 5000);
        assert_eq!(store.wallet_of(other.id).await, Some(4000));
        assert!(store.exists_for(other.id, "AI101").await.unwrap());
        assert!(!store.exists_for(user.id, "AI101").await.unwrap());
    }

    #[test]
    fn test_ttl_outlasts_issuance() {
        let store = Arc::new(InMemoryStore::new());
        let settings = BookingSettings {
            issue_attempts: 3,
            issue_timeout: std::time::Duration::from_secs(20),
        };

        let sweeper = HoldSweeper::new(store.clone(), Duration::seconds(10), &settings);
        assert_eq!(sweeper.hold_ttl(), Duration::seconds(65));

        let sweeper = HoldSweeper::new(store, Duration::minutes(10), &settings);
        assert_eq!(sweeper.hold_ttl(), Duration::minutes(10));
    }
}
