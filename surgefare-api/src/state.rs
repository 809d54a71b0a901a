use std::sync::Arc;
use surgefare_catalog::{LedgerRetention, SurgePricingEngine};
use surgefare_core::events::EventPublisher;
use surgefare_core::repository::{AttemptLedger, BookingRepository, FlightRepository, UserRepository};
use surgefare_core::ticket::TicketIssuer;
use surgefare_order::{BookingManager, BookingSettings, HoldSweeper, ReceiptStore};
use surgefare_store::app_config::{BookingRules, PricingRules};
use surgefare_store::{DbClient, InMemoryStore, PgAttemptLedger, PgBookingRepository, PgFlightRepository, PgUserRepository};

use crate::middleware::resiliency::CircuitBreaker;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
}

/// Storage seams, backed either by Postgres or by the in-memory store.
#[derive(Clone)]
pub struct Repositories {
    pub flights: Arc<dyn FlightRepository>,
    pub ledger: Arc<dyn AttemptLedger>,
    pub users: Arc<dyn UserRepository>,
    pub bookings: Arc<dyn BookingRepository>,
}

impl Repositories {
    pub fn postgres(db: &DbClient) -> Self {
        Self {
            flights: Arc::new(PgFlightRepository::new(db.pool.clone())),
            ledger: Arc::new(PgAttemptLedger::new(db.pool.clone())),
            users: Arc::new(PgUserRepository::new(db.pool.clone())),
            bookings: Arc::new(PgBookingRepository::new(db.pool.clone())),
        }
    }

    pub fn in_memory(store: Arc<InMemoryStore>) -> Self {
        Self {
            flights: store.clone(),
            ledger: store.clone(),
            users: store.clone(),
            bookings: store,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub pricing: Arc<SurgePricingEngine>,
    pub bookings: Arc<BookingManager>,
    pub receipts: Arc<ReceiptStore>,
    pub retention: Arc<LedgerRetention>,
    pub sweeper: Arc<HoldSweeper>,
    pub issuer_breaker: Arc<CircuitBreaker>,
    pub auth: AuthConfig,
}

impl AppState {
    pub fn new(
        repos: Repositories,
        issuer: Arc<dyn TicketIssuer>,
        events: Arc<dyn EventPublisher>,
        pricing: &PricingRules,
        booking: &BookingRules,
        auth: AuthConfig,
    ) -> Self {
        let engine = SurgePricingEngine::new(
            repos.flights.clone(),
            repos.ledger.clone(),
            events.clone(),
            pricing.surge_policy(),
        );
        let settings = BookingSettings {
            issue_attempts: booking.issue_attempts,
            issue_timeout: booking.issue_timeout(),
        };
        let sweeper = HoldSweeper::new(repos.bookings.clone(), booking.hold_ttl(), &settings);
        let manager = BookingManager::new(
            repos.users.clone(),
            repos.flights.clone(),
            repos.bookings.clone(),
            issuer,
            events,
            settings,
        );

        Self {
            pricing: Arc::new(engine),
            bookings: Arc::new(manager),
            receipts: Arc::new(ReceiptStore::new(repos.bookings.clone())),
            retention: Arc::new(LedgerRetention::new(repos.ledger.clone(), pricing.attempt_retention())),
            sweeper: Arc::new(sweeper),
            issuer_breaker: Arc::new(CircuitBreaker::new(
                "ticket-issuer",
                booking.breaker_failure_threshold,
                booking.breaker_reset(),
            )),
            auth,
        }
    }
}
