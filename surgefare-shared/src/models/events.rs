use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

pub const PRICING_TOPIC: &str = "pricing.surge";
pub const BOOKING_TOPIC: &str = "booking.confirmed";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DomainEvent {
    SurgeActivated {
        flight_id: String,
        surge_price: i64,
        active_until: DateTime<Utc>,
        triggered_by: Uuid,
    },
    SurgeExpired {
        flight_id: String,
        restored_price: i64,
        at: DateTime<Utc>,
    },
    BookingConfirmed {
        pnr: String,
        user_id: Uuid,
        flight_id: String,
        price_paid: i64,
        booking_time: DateTime<Utc>,
    },
}

impl DomainEvent {
    pub fn topic(&self) -> &'static str {
        match self {
            DomainEvent::SurgeActivated { .. } | DomainEvent::SurgeExpired { .. } => PRICING_TOPIC,
            DomainEvent::BookingConfirmed { .. } => BOOKING_TOPIC,
        }
    }

    /// Partition key: pricing events by flight, booking events by PNR.
    pub fn key(&self) -> &str {
        match self {
            DomainEvent::SurgeActivated { flight_id, .. } => flight_id,
            DomainEvent::SurgeExpired { flight_id, .. } => flight_id,
            DomainEvent::BookingConfirmed { pnr, .. } => pnr,
        }
    }
}
