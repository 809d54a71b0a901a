use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::RwLock;
use uuid::Uuid;
use surgefare_core::repository::{AttemptLedger, BookingRepository, FlightRepository, UserRepository};
use surgefare_core::{CoreError, CoreResult};
use surgefare_shared::{Attempt, Booking, BookingHold, Flight, User};

/// Process-local backend with the same guarantees as the Postgres one.
///
/// Every trait method takes the lock once and never awaits while holding it,
/// so each call is a single atomic step.
#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    flights: HashMap<String, Flight>,
    users: HashMap<Uuid, User>,
    attempts: Vec<Attempt>,
    holds: HashMap<String, BookingHold>,
    bookings: HashMap<String, Booking>,
}

impl MemoryState {
    fn pair_taken(&self, user_id: Uuid, flight_id: &str) -> bool {
        self.holds.values().any(|h| h.user_id == user_id && h.flight_id == flight_id)
            || self.bookings.values().any(|b| b.user_id == user_id && b.flight_id == flight_id)
    }

    fn release(&mut self, pnr: &str) -> Option<(Uuid, i64)> {
        let hold = self.holds.remove(pnr)?;
        if let Some(user) = self.users.get_mut(&hold.user_id) {
            user.wallet += hold.price_paid;
        }
        Some((hold.user_id, hold.price_paid))
    }
}

#[derive(Debug, Deserialize)]
struct Fixtures {
    #[serde(default)]
    flights: Vec<Flight>,
    #[serde(default)]
    users: Vec<User>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load flights and users from a JSON fixture file.
    pub async fn from_fixtures(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let raw = tokio::fs::read_to_string(path).await?;
        let fixtures: Fixtures = serde_json::from_str(&raw)?;

        let store = Self::new();
        for flight in fixtures.flights {
            store.insert_flight(flight).await;
        }
        for user in fixtures.users {
            store.insert_user(user).await;
        }
        Ok(store)
    }

    pub async fn insert_flight(&self, flight: Flight) {
        self.state.write().await.flights.insert(flight.flight_id.clone(), flight);
    }

    pub async fn insert_user(&self, user: User) {
        self.state.write().await.users.insert(user.id, user);
    }

    pub async fn wallet_of(&self, user_id: Uuid) -> Option<i64> {
        self.state.read().await.users.get(&user_id).map(|u| u.wallet)
    }

    pub async fn pending_holds(&self) -> usize {
        self.state.read().await.holds.len()
    }

    pub async fn attempt_count(&self) -> usize {
        self.state.read().await.attempts.len()
    }
}

#[async_trait]
impl AttemptLedger for InMemoryStore {
    async fn record_attempt(&self, attempt: &Attempt) -> CoreResult<()> {
        self.state.write().await.attempts.push(attempt.clone());
        Ok(())
    }

    async fn count_recent(
        &self,
        user_id: Uuid,
        flight_id: &str,
        now: DateTime<Utc>,
        window: Duration,
    ) -> CoreResult<u64> {
        let since = now.checked_sub_signed(window).unwrap_or(DateTime::<Utc>::MIN_UTC);
        let state = self.state.read().await;
        let count = state
            .attempts
            .iter()
            .filter(|a| a.user_id == user_id && a.flight_id == flight_id && a.attempt_time >= since)
            .count();
        Ok(count as u64)
    }

    async fn purge_before(&self, cutoff: DateTime<Utc>) -> CoreResult<u64> {
        let mut state = self.state.write().await;
        let before = state.attempts.len();
        state.attempts.retain(|a| a.attempt_time >= cutoff);
        Ok((before - state.attempts.len()) as u64)
    }
}

#[async_trait]
impl FlightRepository for InMemoryStore {
    async fn get_flight(&self, flight_id: &str) -> CoreResult<Option<Flight>> {
        Ok(self.state.read().await.flights.get(flight_id).cloned())
    }

    async fn update_pricing(&self, flight: &Flight) -> CoreResult<Option<Flight>> {
        let mut state = self.state.write().await;
        let stored = state
            .flights
            .get_mut(&flight.flight_id)
            .ok_or_else(|| CoreError::NotFound(format!("flight {}", flight.flight_id)))?;

        if stored.version != flight.version {
            return Ok(None);
        }
        stored.current_price = flight.current_price;
        stored.surge_active_until = flight.surge_active_until;
        stored.version += 1;
        Ok(Some(stored.clone()))
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn get_user(&self, user_id: Uuid) -> CoreResult<Option<User>> {
        Ok(self.state.read().await.users.get(&user_id).cloned())
    }
}

#[async_trait]
impl BookingRepository for InMemoryStore {
    async fn exists_for(&self, user_id: Uuid, flight_id: &str) -> CoreResult<bool> {
        Ok(self.state.read().await.pair_taken(user_id, flight_id))
    }

    async fn place_hold(&self, hold: &BookingHold) -> CoreResult<()> {
        let mut state = self.state.write().await;

        if state.pair_taken(hold.user_id, &hold.flight_id) {
            return Err(CoreError::Conflict(format!(
                "user {} already booked flight {}",
                hold.user_id, hold.flight_id
            )));
        }
        if state.holds.contains_key(&hold.pnr) || state.bookings.contains_key(&hold.pnr) {
            return Err(CoreError::DuplicatePnr(hold.pnr.clone()));
        }

        let user = state
            .users
            .get_mut(&hold.user_id)
            .ok_or_else(|| CoreError::NotFound(format!("user {}", hold.user_id)))?;
        if !user.can_afford(hold.price_paid) {
            return Err(CoreError::InsufficientFunds {
                required: hold.price_paid,
                available: user.wallet,
            });
        }
        user.wallet -= hold.price_paid;

        state.holds.insert(hold.pnr.clone(), hold.clone());
        Ok(())
    }

    async fn confirm_hold(&self, pnr: &str, ticket_url: &str) -> CoreResult<Booking> {
        let mut state = self.state.write().await;
        let hold = state
            .holds
            .remove(pnr)
            .ok_or_else(|| CoreError::InternalError(format!("hold {} is no longer pending", pnr)))?;

        let booking = hold.confirm(ticket_url.to_string());
        state.bookings.insert(booking.pnr.clone(), booking.clone());
        Ok(booking)
    }

    async fn release_hold(&self, pnr: &str) -> CoreResult<()> {
        self.state.write().await.release(pnr);
        Ok(())
    }

    async fn release_stale_holds(&self, cutoff: DateTime<Utc>) -> CoreResult<u64> {
        let mut state = self.state.write().await;
        let stale: Vec<String> = state
            .holds
            .values()
            .filter(|h| h.booking_time < cutoff)
            .map(|h| h.pnr.clone())
            .collect();

        for pnr in &stale {
            state.release(pnr);
        }
        Ok(stale.len() as u64)
    }

    async fn list_bookings(&self, user_id: Uuid) -> CoreResult<Vec<Booking>> {
        let state = self.state.read().await;
        let mut bookings: Vec<Booking> = state
            .bookings
            .values()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.booking_time.cmp(&a.booking_time).then_with(|| b.pnr.cmp(&a.pnr)));
        Ok(bookings)
    }
}
