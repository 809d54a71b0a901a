use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

use super::flight::Flight;

/// A confirmed, non-cancelable booking. Every field is a snapshot taken at
/// commit time and never changes afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Booking {
    pub id: Uuid,
    #[serde(rename = "userId")]
    pub user_id: Uuid,
    #[serde(rename = "flightId")]
    pub flight_id: String,
    pub airline: String,
    pub route: String,
    pub price_paid: i64,
    #[serde(rename = "bookingTime")]
    pub booking_time: DateTime<Utc>,
    pub pnr: String,
    pub ticket_url: String,
}

/// A booking in flight: the wallet has been debited and the (user, flight)
/// slot is taken, but no ticket has been issued yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingHold {
    pub id: Uuid,
    pub user_id: Uuid,
    pub flight_id: String,
    pub airline: String,
    pub route: String,
    pub price_paid: i64,
    pub booking_time: DateTime<Utc>,
    pub pnr: String,
}

impl BookingHold {
    /// Snapshot the flight's persisted price and route for `user_id`.
    pub fn snapshot(user_id: Uuid, flight: &Flight, pnr: String, booking_time: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            flight_id: flight.flight_id.clone(),
            airline: flight.airline.clone(),
            route: flight.route(),
            price_paid: flight.current_price,
            booking_time,
            pnr,
        }
    }

    pub fn confirm(self, ticket_url: String) -> Booking {
        Booking {
            id: self.id,
            user_id: self.user_id,
            flight_id: self.flight_id,
            airline: self.airline,
            route: self.route,
            price_paid: self.price_paid,
            booking_time: self.booking_time,
            pnr: self.pnr,
            ticket_url,
        }
    }
}
