use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;
use surgefare_shared::{Attempt, Booking, BookingHold, Flight, User};

use crate::CoreResult;

/// Append-only log of quote attempts.
#[async_trait]
pub trait AttemptLedger: Send + Sync {
    /// Append one attempt. Never deduplicates.
    async fn record_attempt(&self, attempt: &Attempt) -> CoreResult<()>;

    /// Attempts for exactly this pair with `attempt_time >= now - window`.
    async fn count_recent(
        &self,
        user_id: Uuid,
        flight_id: &str,
        now: DateTime<Utc>,
        window: Duration,
    ) -> CoreResult<u64>;

    /// Drop attempts strictly older than `cutoff`. Returns how many were removed.
    async fn purge_before(&self, cutoff: DateTime<Utc>) -> CoreResult<u64>;
}

/// Flight aggregate access. Pricing fields are only ever written through
/// `update_pricing`, which is a conditional update on `version`.
#[async_trait]
pub trait FlightRepository: Send + Sync {
    async fn get_flight(&self, flight_id: &str) -> CoreResult<Option<Flight>>;

    /// Persist `current_price` and `surge_active_until` from `flight` if the
    /// stored version still equals `flight.version`. Returns the stored flight
    /// (with its bumped version) on success, `None` if another writer won.
    async fn update_pricing(&self, flight: &Flight) -> CoreResult<Option<Flight>>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get_user(&self, user_id: Uuid) -> CoreResult<Option<User>>;
}

/// Booking rows and the holds that precede them.
///
/// Implementations must enforce uniqueness of (user_id, flight_id) and of
/// `pnr` across holds and confirmed bookings together.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// True if a booking or an outstanding hold exists for the pair.
    async fn exists_for(&self, user_id: Uuid, flight_id: &str) -> CoreResult<bool>;

    /// In one transaction: insert the hold and debit the user's wallet by
    /// `hold.price_paid`, provided the balance covers it.
    ///
    /// Fails with `Conflict` (pair taken), `DuplicatePnr`, `InsufficientFunds`
    /// or `NotFound` (user vanished); nothing is persisted on failure.
    async fn place_hold(&self, hold: &BookingHold) -> CoreResult<()>;

    /// Attach the ticket reference and turn the hold into a booking.
    async fn confirm_hold(&self, pnr: &str, ticket_url: &str) -> CoreResult<Booking>;

    /// Remove a pending hold and refund its debit. No-op if the hold is gone
    /// or already confirmed.
    async fn release_hold(&self, pnr: &str) -> CoreResult<()>;

    /// Release every hold placed before `cutoff`. Returns how many were released.
    async fn release_stale_holds(&self, cutoff: DateTime<Utc>) -> CoreResult<u64>;

    /// Confirmed bookings for the user, newest first.
    async fn list_bookings(&self, user_id: Uuid) -> CoreResult<Vec<Booking>>;
}
