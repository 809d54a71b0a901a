use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;
use surgefare_core::events::{publish_best_effort, EventPublisher};
use surgefare_core::repository::{AttemptLedger, FlightRepository};
use surgefare_core::{CoreError, CoreResult, SurgePolicy, SurgeTransition};
use surgefare_shared::{Attempt, DomainEvent, Flight};

/// Lost compare-and-set races tolerated before a quote gives up.
const MAX_PRICING_RETRIES: usize = 5;

/// Outcome of a single quote.
#[derive(Debug, Clone)]
pub struct Quote {
    pub flight: Flight,
    pub transition: SurgeTransition,
    /// Attempts by this user for this flight inside the window, this one included.
    pub recent_attempts: u64,
}

/// Surge pricing engine: every quote is an attempt, and attempts drive price.
pub struct SurgePricingEngine {
    flights: Arc<dyn FlightRepository>,
    ledger: Arc<dyn AttemptLedger>,
    events: Arc<dyn EventPublisher>,
    policy: SurgePolicy,
}

impl SurgePricingEngine {
    pub fn new(
        flights: Arc<dyn FlightRepository>,
        ledger: Arc<dyn AttemptLedger>,
        events: Arc<dyn EventPublisher>,
        policy: SurgePolicy,
    ) -> Self {
        Self { flights, ledger, events, policy }
    }

    /// Quote `flight_id` for `user_id` at `now`, returning the up-to-date flight.
    pub async fn quote(&self, flight_id: &str, user_id: Uuid, now: DateTime<Utc>) -> CoreResult<Flight> {
        Ok(self.quote_detailed(flight_id, user_id, now).await?.flight)
    }

    /// Record the attempt, count the window, then decay/escalate the flight
    /// and persist with a version check. On a lost race the flight is
    /// reloaded and repriced; the attempt is never recorded twice.
    pub async fn quote_detailed(&self, flight_id: &str, user_id: Uuid, now: DateTime<Utc>) -> CoreResult<Quote> {
        let mut flight = self.load(flight_id).await?;

        self.ledger.record_attempt(&Attempt::new(user_id, flight_id, now)).await?;
        let recent_attempts = self
            .ledger
            .count_recent(user_id, flight_id, now, self.policy.attempt_window)
            .await?;

        for _ in 0..MAX_PRICING_RETRIES {
            let (next, transition) = self.policy.reprice(&flight, recent_attempts, now);
            if !transition.is_change() {
                return Ok(Quote { flight, transition, recent_attempts });
            }

            match self.flights.update_pricing(&next).await? {
                Some(stored) => {
                    self.announce(&stored, transition, user_id, now).await;
                    return Ok(Quote { flight: stored, transition, recent_attempts });
                }
                None => {
                    debug!("Pricing for {} changed concurrently, recomputing", flight_id);
                    flight = self.load(flight_id).await?;
                }
            }
        }

        Err(CoreError::InternalError(format!(
            "pricing for flight {} kept changing under contention",
            flight_id
        )))
    }

    async fn load(&self, flight_id: &str) -> CoreResult<Flight> {
        self.flights
            .get_flight(flight_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("flight {}", flight_id)))
    }

    async fn announce(&self, flight: &Flight, transition: SurgeTransition, user_id: Uuid, now: DateTime<Utc>) {
        if matches!(transition, SurgeTransition::Expired | SurgeTransition::Renewed) {
            info!("Surge expired on {}, price back to {}", flight.flight_id, flight.base_price);
            publish_best_effort(
                self.events.as_ref(),
                DomainEvent::SurgeExpired {
                    flight_id: flight.flight_id.clone(),
                    restored_price: flight.base_price,
                    at: now,
                },
            )
            .await;
        }

        if let (SurgeTransition::Activated | SurgeTransition::Renewed, Some(until)) =
            (transition, flight.surge_active_until)
        {
            info!(
                "Surge activated on {}: {} -> {} until {}",
                flight.flight_id, flight.base_price, flight.current_price, until
            );
            publish_best_effort(
                self.events.as_ref(),
                DomainEvent::SurgeActivated {
                    flight_id: flight.flight_id.clone(),
                    surge_price: flight.current_price,
                    active_until: until,
                    triggered_by: user_id,
                },
            )
            .await;
        }
    }
}
