use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;
use surgefare_core::repository::FlightRepository;
use surgefare_core::CoreResult;
use surgefare_shared::Flight;

use crate::database::db_error;

pub struct PgFlightRepository {
    pool: PgPool,
}

impl PgFlightRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct FlightRow {
    id: Uuid,
    flight_id: String,
    airline: String,
    departure_city: String,
    arrival_city: String,
    arrival_time: DateTime<Utc>,
    base_price: i64,
    current_price: i64,
    surge_active_until: Option<DateTime<Utc>>,
    version: i64,
}

impl From<FlightRow> for Flight {
    fn from(row: FlightRow) -> Self {
        Flight {
            id: row.id,
            flight_id: row.flight_id,
            airline: row.airline,
            departure_city: row.departure_city,
            arrival_city: row.arrival_city,
            arrival_time: row.arrival_time,
            base_price: row.base_price,
            current_price: row.current_price,
            surge_active_until: row.surge_active_until,
            version: row.version,
        }
    }
}

const FLIGHT_COLUMNS: &str = "id, flight_id, airline, departure_city, arrival_city, arrival_time, \
     base_price, current_price, surge_active_until, version";

#[async_trait]
impl FlightRepository for PgFlightRepository {
    async fn get_flight(&self, flight_id: &str) -> CoreResult<Option<Flight>> {
        let row: Option<FlightRow> = sqlx::query_as(&format!(
            "SELECT {} FROM flights WHERE flight_id = $1",
            FLIGHT_COLUMNS
        ))
        .bind(flight_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(Flight::from))
    }

    async fn update_pricing(&self, flight: &Flight) -> CoreResult<Option<Flight>> {
        // Compare-and-set on version: a concurrent quote that already wrote
        // makes this a no-op and the caller recomputes.
        let row: Option<FlightRow> = sqlx::query_as(&format!(
            r#"
            UPDATE flights
            SET current_price = $1, surge_active_until = $2, version = version + 1
            WHERE flight_id = $3 AND version = $4
            RETURNING {}
            "#,
            FLIGHT_COLUMNS
        ))
        .bind(flight.current_price)
        .bind(flight.surge_active_until)
        .bind(&flight.flight_id)
        .bind(flight.version)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(Flight::from))
    }
}
