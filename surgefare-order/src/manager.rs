use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;
use surgefare_core::events::{publish_best_effort, EventPublisher};
use surgefare_core::repository::{BookingRepository, FlightRepository, UserRepository};
use surgefare_core::ticket::{TicketIssuer, TicketRequest};
use surgefare_core::{CoreError, CoreResult};
use surgefare_shared::pii::Redacted;
use surgefare_shared::{Booking, BookingHold, DomainEvent, Flight, User};

use crate::pnr::{PnrSource, RandomPnr};

/// PNR collisions tolerated before giving up.
const MAX_PNR_ATTEMPTS: usize = 3;

#[derive(Debug, Clone)]
pub struct BookingSettings {
    /// Issuance calls per booking, all with the same PNR.
    pub issue_attempts: u32,
    pub issue_timeout: Duration,
}

impl Default for BookingSettings {
    fn default() -> Self {
        Self {
            issue_attempts: 2,
            issue_timeout: Duration::from_secs(10),
        }
    }
}

impl BookingSettings {
    /// Longest a booking can spend issuing its ticket: every attempt timing out.
    pub fn worst_case_issuance(&self) -> chrono::Duration {
        self.issue_timeout
            .checked_mul(self.issue_attempts.max(1))
            .and_then(|total| chrono::Duration::from_std(total).ok())
            .unwrap_or(chrono::Duration::MAX)
    }
}

/// Commits bookings as a saga: hold (debit) → issue ticket → confirm,
/// releasing the hold if any later step fails.
pub struct BookingManager {
    users: Arc<dyn UserRepository>,
    flights: Arc<dyn FlightRepository>,
    bookings: Arc<dyn BookingRepository>,
    issuer: Arc<dyn TicketIssuer>,
    events: Arc<dyn EventPublisher>,
    pnrs: Box<dyn PnrSource>,
    settings: BookingSettings,
}

impl BookingManager {
    pub fn new(
        users: Arc<dyn UserRepository>,
        flights: Arc<dyn FlightRepository>,
        bookings: Arc<dyn BookingRepository>,
        issuer: Arc<dyn TicketIssuer>,
        events: Arc<dyn EventPublisher>,
        settings: BookingSettings,
    ) -> Self {
        Self {
            users,
            flights,
            bookings,
            issuer,
            events,
            pnrs: Box::new(RandomPnr),
            settings,
        }
    }

    pub fn with_pnr_source(mut self, pnrs: Box<dyn PnrSource>) -> Self {
        self.pnrs = pnrs;
        self
    }

    /// Book `flight_id` for `user_id` at the flight's persisted current price.
    ///
    /// Pricing is not recomputed here: the price is whatever the last quote
    /// left in storage. Client-supplied prices are never consulted.
    ///
    /// `Conflict` is also returned while another request for the same pair
    /// holds an unconfirmed booking. That hold may still roll back, so such a
    /// `Conflict` is worth retrying once the other request settles.
    pub async fn book(&self, user_id: Uuid, flight_id: &str, now: DateTime<Utc>) -> CoreResult<Booking> {
        let user = self
            .users
            .get_user(user_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("user {}", user_id)))?;
        let flight = self
            .flights
            .get_flight(flight_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("flight {}", flight_id)))?;

        // Fast-path checks; the hold placement re-enforces both atomically.
        if self.bookings.exists_for(user_id, flight_id).await? {
            return Err(CoreError::Conflict(format!(
                "user {} already booked flight {}",
                user_id, flight_id
            )));
        }
        if !user.can_afford(flight.current_price) {
            return Err(CoreError::InsufficientFunds {
                required: flight.current_price,
                available: user.wallet,
            });
        }

        let hold = self.place_hold(user_id, &flight, now).await?;
        info!(
            "Hold {} placed on {} for {}: {} debited",
            hold.pnr, hold.flight_id, user_id, hold.price_paid
        );

        let ticket_url = match self.issue_ticket(&user, &hold).await {
            Ok(url) => url,
            Err(e) => {
                self.compensate(&hold).await;
                return Err(e);
            }
        };

        let booking = match self.bookings.confirm_hold(&hold.pnr, &ticket_url).await {
            Ok(booking) => booking,
            Err(e) => {
                self.compensate(&hold).await;
                return Err(e);
            }
        };

        info!("Booking confirmed: {} ({} on {})", booking.pnr, user_id, booking.flight_id);
        publish_best_effort(
            self.events.as_ref(),
            DomainEvent::BookingConfirmed {
                pnr: booking.pnr.clone(),
                user_id: booking.user_id,
                flight_id: booking.flight_id.clone(),
                price_paid: booking.price_paid,
                booking_time: booking.booking_time,
            },
        )
        .await;

        Ok(booking)
    }

    async fn place_hold(&self, user_id: Uuid, flight: &Flight, now: DateTime<Utc>) -> CoreResult<BookingHold> {
        for _ in 0..MAX_PNR_ATTEMPTS {
            let hold = BookingHold::snapshot(user_id, flight, self.pnrs.next_pnr(now), now);
            match self.bookings.place_hold(&hold).await {
                Ok(()) => return Ok(hold),
                Err(CoreError::DuplicatePnr(pnr)) => warn!("PNR {} already taken, regenerating", pnr),
                Err(e) => return Err(e),
            }
        }
        Err(CoreError::InternalError("could not allocate a unique PNR".to_string()))
    }

    /// Every retry reuses the hold's PNR, so an idempotent issuer yields one
    /// artifact and one reference no matter how many calls it takes.
    async fn issue_ticket(&self, user: &User, hold: &BookingHold) -> CoreResult<String> {
        let request = TicketRequest {
            passenger_name: Redacted(user.name.clone()),
            flight_id: hold.flight_id.clone(),
            airline: hold.airline.clone(),
            route: hold.route.clone(),
            price_paid: hold.price_paid,
            booking_time: hold.booking_time,
            pnr: hold.pnr.clone(),
        };

        let attempts = self.settings.issue_attempts.max(1);
        let mut last_error = String::new();
        for attempt in 1..=attempts {
            match tokio::time::timeout(self.settings.issue_timeout, self.issuer.issue(&request)).await {
                Ok(Ok(url)) => return Ok(url),
                Ok(Err(e)) => last_error = e.to_string(),
                Err(_) => last_error = format!("timed out after {:?}", self.settings.issue_timeout),
            }
            warn!(
                "Ticket issuance for {} failed (attempt {}/{}): {}",
                hold.pnr, attempt, attempts, last_error
            );
        }

        Err(CoreError::UpstreamFailure(format!(
            "ticket issuance for {} failed: {}",
            hold.pnr, last_error
        )))
    }

    async fn compensate(&self, hold: &BookingHold) {
        match self.bookings.release_hold(&hold.pnr).await {
            Ok(()) => warn!("Booking {} rolled back, {} refunded", hold.pnr, hold.price_paid),
            Err(e) => error!("Failed to release hold {}, leaving it to the sweeper: {}", hold.pnr, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use surgefare_core::events::TracingEventPublisher;
    use surgefare_core::ticket::LinkTicketIssuer;
    use surgefare_store::InMemoryStore;
    use crate::sweeper::HoldSweeper;

    /// Fails the first `failures` calls, then behaves like a link issuer.
    struct FlakyIssuer {
        failures: usize,
        calls: AtomicUsize,
        pnrs_seen: Mutex<Vec<String>>,
        issued: Mutex<HashMap<String, String>>,
    }

    impl FlakyIssuer {
        fn new(failures: usize) -> Self {
            Self {
                failures,
                calls: AtomicUsize::new(0),
                pnrs_seen: Mutex::new(Vec::new()),
                issued: Mutex::new(HashMap::new()),
            }
        }
    }

    #[async_trait]
    impl TicketIssuer for FlakyIssuer {
        async fn issue(&self, request: &TicketRequest) -> CoreResult<String> {
            self.pnrs_seen.lock().unwrap().push(request.pnr.clone());
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
                return Err(CoreError::UpstreamFailure("storage unavailable".to_string()));
            }
            let mut issued = self.issued.lock().unwrap();
            let url = issued
                .entry(request.pnr.clone())
                .or_insert_with(|| format!("https://cdn.example.com/flight_tickets/{}.pdf", request.pnr));
            Ok(url.clone())
        }
    }

    /// Takes `delay` to issue, counting every ticket it produces.
    struct SlowIssuer {
        delay: Duration,
        issued: AtomicUsize,
    }

    #[async_trait]
    impl TicketIssuer for SlowIssuer {
        async fn issue(&self, request: &TicketRequest) -> CoreResult<String> {
            tokio::time::sleep(self.delay).await;
            self.issued.fetch_add(1, Ordering::SeqCst);
            Ok(format!("https://cdn.example.com/flight_tickets/{}.pdf", request.pnr))
        }
    }

    struct FixedPnrs(Mutex<Vec<String>>);

    impl PnrSource for FixedPnrs {
        fn next_pnr(&self, _now: DateTime<Utc>) -> String {
            self.0.lock().unwrap().remove(0)
        }
    }

    struct Fixture {
        store: Arc<InMemoryStore>,
        user_id: Uuid,
    }

    async fn fixture(wallet: i64, current_price: i64) -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let mut flight = Flight::new("AI101", "Air India", "Delhi", "Mumbai", Utc::now(), 1000);
        flight.current_price = current_price;
        store.insert_flight(flight).await;

        let user = User::new("Asha Rao", wallet);
        let user_id = user.id;
        store.insert_user(user).await;
        Fixture { store, user_id }
    }

    fn manager(store: &Arc<InMemoryStore>, issuer: Arc<dyn TicketIssuer>, settings: BookingSettings) -> BookingManager {
        BookingManager::new(
            store.clone(),
            store.clone(),
            store.clone(),
            issuer,
            Arc::new(TracingEventPublisher),
            settings,
        )
    }

    fn link_issuer() -> Arc<dyn TicketIssuer> {
        Arc::new(LinkTicketIssuer::new("https://cdn.example.com", "flight_tickets"))
    }

    #[tokio::test]
    async fn test_booking_debits_and_snapshots() {
        let Fixture { store, user_id } = fixture(5000, 1100).await;
        let manager = manager(&store, link_issuer(), BookingSettings::default());
        let now = Utc::now();

        let booking = manager.book(user_id, "AI101", now).await.unwrap();

        assert_eq!(booking.price_paid, 1100);
        assert_eq!(booking.route, "Delhi → Mumbai");
        assert_eq!(booking.airline, "Air India");
        assert_eq!(booking.booking_time, now);
        assert!(booking.pnr.starts_with("PNR-"));
        assert_eq!(booking.ticket_url, format!("https://cdn.example.com/flight_tickets/{}.pdf", booking.pnr));
        assert_eq!(store.wallet_of(user_id).await, Some(3900));
        assert_eq!(store.pending_holds().await, 0);
    }

    #[tokio::test]
    async fn test_second_booking_conflicts() {
        let Fixture { store, user_id } = fixture(5000, 1100).await;
        let manager = manager(&store, link_issuer(), BookingSettings::default());

        manager.book(user_id, "AI101", Utc::now()).await.unwrap();
        let second = manager.book(user_id, "AI101", Utc::now()).await;

        assert!(matches!(second, Err(CoreError::Conflict(_))));
        assert_eq!(store.wallet_of(user_id).await, Some(3900));
        assert_eq!(store.list_bookings(user_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_insufficient_funds_changes_nothing() {
        let Fixture { store, user_id } = fixture(1099, 1100).await;
        let manager = manager(&store, link_issuer(), BookingSettings::default());

        let result = manager.book(user_id, "AI101", Utc::now()).await;

        assert!(matches!(
            result,
            Err(CoreError::InsufficientFunds { required: 1100, available: 1099 })
        ));
        assert_eq!(store.wallet_of(user_id).await, Some(1099));
        assert!(!store.exists_for(user_id, "AI101").await.unwrap());
    }

    #[tokio::test]
    async fn test_exact_balance_is_enough() {
        let Fixture { store, user_id } = fixture(1100, 1100).await;
        let manager = manager(&store, link_issuer(), BookingSettings::default());

        manager.book(user_id, "AI101", Utc::now()).await.unwrap();
        assert_eq!(store.wallet_of(user_id).await, Some(0));
    }

    #[tokio::test]
    async fn test_missing_user_or_flight() {
        let Fixture { store, user_id } = fixture(5000, 1000).await;
        let manager = manager(&store, link_issuer(), BookingSettings::default());

        let no_user = manager.book(Uuid::new_v4(), "AI101", Utc::now()).await;
        assert!(matches!(no_user, Err(CoreError::NotFound(_))));

        let no_flight = manager.book(user_id, "ZZ999", Utc::now()).await;
        assert!(matches!(no_flight, Err(CoreError::NotFound(_))));
        assert_eq!(store.wallet_of(user_id).await, Some(5000));
    }

    #[tokio::test]
    async fn test_issuer_failure_rolls_back_and_retry_succeeds() {
        let Fixture { store, user_id } = fixture(5000, 1000).await;
        let issuer = Arc::new(FlakyIssuer::new(2));
        let settings = BookingSettings { issue_attempts: 2, ..BookingSettings::default() };
        let manager = manager(&store, issuer.clone(), settings);

        let failed = manager.book(user_id, "AI101", Utc::now()).await;
        assert!(matches!(failed, Err(CoreError::UpstreamFailure(_))));
        assert_eq!(store.wallet_of(user_id).await, Some(5000));
        assert_eq!(store.pending_holds().await, 0);
        assert!(store.list_bookings(user_id).await.unwrap().is_empty());

        let booking = manager.book(user_id, "AI101", Utc::now()).await.unwrap();
        assert_eq!(store.wallet_of(user_id).await, Some(4000));
        assert!(booking.ticket_url.ends_with(&format!("{}.pdf", booking.pnr)));
    }

    #[tokio::test]
    async fn test_issuance_retries_reuse_pnr() {
        let Fixture { store, user_id } = fixture(5000, 1000).await;
        let issuer = Arc::new(FlakyIssuer::new(1));
        let settings = BookingSettings { issue_attempts: 3, ..BookingSettings::default() };
        let manager = manager(&store, issuer.clone(), settings);

        let booking = manager.book(user_id, "AI101", Utc::now()).await.unwrap();

        let seen = issuer.pnrs_seen.lock().unwrap().clone();
        assert_eq!(seen, vec![booking.pnr.clone(), booking.pnr.clone()]);
        let issued = issuer.issued.lock().unwrap();
        assert_eq!(issued.len(), 1);
        assert_eq!(issued.get(&booking.pnr), Some(&booking.ticket_url));
    }

    #[tokio::test]
    async fn test_pnr_collision_regenerates() {
        let Fixture { store, user_id } = fixture(5000, 1000).await;
        let other = User::new("Ravi Kumar", 5000);
        let other_id = other.id;
        store.insert_user(other).await;

        let pnrs = vec!["PNR-1-AAAA".to_string(), "PNR-1-AAAA".to_string(), "PNR-1-BBBB".to_string()];
        let manager = manager(&store, link_issuer(), BookingSettings::default())
            .with_pnr_source(Box::new(FixedPnrs(Mutex::new(pnrs))));

        let first = manager.book(user_id, "AI101", Utc::now()).await.unwrap();
        let second = manager.book(other_id, "AI101", Utc::now()).await.unwrap();

        assert_eq!(first.pnr, "PNR-1-AAAA");
        assert_eq!(second.pnr, "PNR-1-BBBB");
        assert_eq!(store.wallet_of(other_id).await, Some(4000));
    }

    #[tokio::test]
    async fn test_price_paid_survives_repricing() {
        let Fixture { store, user_id } = fixture(5000, 1100).await;
        let manager = manager(&store, link_issuer(), BookingSettings::default());

        let booking = manager.book(user_id, "AI101", Utc::now()).await.unwrap();

        let mut flight = store.get_flight("AI101").await.unwrap().unwrap();
        flight.current_price = 1000;
        flight.surge_active_until = None;
        store.update_pricing(&flight).await.unwrap().unwrap();

        let history = store.list_bookings(user_id).await.unwrap();
        assert_eq!(history[0].price_paid, 1100);
        assert_eq!(history[0], booking);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_bookings_debit_once() {
        let Fixture { store, user_id } = fixture(5000, 1100).await;
        let manager = Arc::new(manager(&store, link_issuer(), BookingSettings::default()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let manager = manager.clone();
                tokio::spawn(async move { manager.book(user_id, "AI101", Utc::now()).await })
            })
            .collect();

        let mut successes = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(CoreError::Conflict(_)) => {}
                Err(e) => panic!("unexpected error: {}", e),
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(store.wallet_of(user_id).await, Some(3900));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_sweeper_leaves_hold_alone_during_slow_issuance() {
        let Fixture { store, user_id } = fixture(5000, 1100).await;
        let issuer = Arc::new(SlowIssuer {
            delay: Duration::from_millis(300),
            issued: AtomicUsize::new(0),
        });
        let settings = BookingSettings {
            issue_attempts: 1,
            issue_timeout: Duration::from_secs(1),
        };
        let manager = Arc::new(manager(&store, issuer.clone(), settings.clone()));
        let sweeper = HoldSweeper::new(store.clone(), chrono::Duration::milliseconds(100), &settings);

        let booking = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.book(user_id, "AI101", Utc::now()).await })
        };
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(store.pending_holds().await, 1);
        assert_eq!(sweeper.sweep(Utc::now()).await.unwrap(), 0);

        let booking = booking.await.unwrap().unwrap();
        assert_eq!(issuer.issued.load(Ordering::SeqCst), 1);
        assert_eq!(store.wallet_of(user_id).await, Some(3900));
        assert_eq!(store.list_bookings(user_id).await.unwrap(), vec![booking]);
        assert_eq!(store.pending_holds().await, 0);
    }
}
