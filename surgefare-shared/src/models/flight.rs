use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

/// A scheduled flight together with its live pricing state.
///
/// `id` is the storage key; `flight_id` is the business key (e.g. `AI101`)
/// that every client-facing operation uses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Flight {
    #[serde(skip_serializing)]
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(rename = "flightId")]
    pub flight_id: String,
    pub airline: String,
    pub departure_city: String,
    pub arrival_city: String,
    pub arrival_time: DateTime<Utc>,
    pub base_price: i64,
    pub current_price: i64,
    pub surge_active_until: Option<DateTime<Utc>>,
    /// Optimistic concurrency counter, bumped by every persisted pricing change.
    #[serde(skip)]
    pub version: i64,
}

impl Flight {
    pub fn new(
        flight_id: impl Into<String>,
        airline: impl Into<String>,
        departure_city: impl Into<String>,
        arrival_city: impl Into<String>,
        arrival_time: DateTime<Utc>,
        base_price: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            flight_id: flight_id.into(),
            airline: airline.into(),
            departure_city: departure_city.into(),
            arrival_city: arrival_city.into(),
            arrival_time,
            base_price,
            current_price: base_price,
            surge_active_until: None,
            version: 0,
        }
    }

    /// Route string as printed on tickets and receipts.
    pub fn route(&self) -> String {
        format!("{} → {}", self.departure_city, self.arrival_city)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_shape() {
        let arrival = Utc::now();
        let flight = Flight::new("AI101", "Air India", "Delhi", "Mumbai", arrival, 1000);
        let json = serde_json::to_value(&flight).unwrap();

        assert_eq!(json["flightId"], "AI101");
        assert_eq!(json["base_price"], 1000);
        assert_eq!(json["current_price"], 1000);
        assert!(json["surge_active_until"].is_null());
        assert!(json.get("id").is_none());
        assert!(json.get("version").is_none());
    }

    #[test]
    fn test_route_format() {
        let flight = Flight::new("6E202", "IndiGo", "Pune", "Goa", Utc::now(), 2500);
        assert_eq!(flight.route(), "Pune → Goa");
    }
}
