use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;
use surgefare_core::repository::BookingRepository;
use surgefare_core::{CoreError, CoreResult};
use surgefare_shared::{Booking, BookingHold};

use crate::database::db_error;

const PAIR_CONSTRAINT: &str = "bookings_user_flight_key";
const PNR_CONSTRAINT: &str = "bookings_pnr_key";

pub struct PgBookingRepository {
    pool: PgPool,
}

impl PgBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    user_id: Uuid,
    flight_id: String,
    airline: String,
    route: String,
    price_paid: i64,
    booking_time: DateTime<Utc>,
    pnr: String,
    ticket_url: String,
}

impl From<BookingRow> for Booking {
    fn from(row: BookingRow) -> Self {
        Booking {
            id: row.id,
            user_id: row.user_id,
            flight_id: row.flight_id,
            airline: row.airline,
            route: row.route,
            price_paid: row.price_paid,
            booking_time: row.booking_time,
            pnr: row.pnr,
            ticket_url: row.ticket_url,
        }
    }
}

const BOOKING_COLUMNS: &str = "id, user_id, flight_id, airline, route, price_paid, booking_time, pnr, ticket_url";

/// Translate constraint violations from the hold insert into domain errors.
fn hold_insert_error(e: sqlx::Error, hold: &BookingHold) -> CoreError {
    let mapped = match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => match db.constraint() {
            Some(PNR_CONSTRAINT) => Some(CoreError::DuplicatePnr(hold.pnr.clone())),
            Some(PAIR_CONSTRAINT) => Some(CoreError::Conflict(format!(
                "user {} already booked flight {}",
                hold.user_id, hold.flight_id
            ))),
            _ => None,
        },
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
            Some(CoreError::NotFound(format!("user {}", hold.user_id)))
        }
        _ => None,
    };
    mapped.unwrap_or_else(|| db_error(e))
}

#[async_trait]
impl BookingRepository for PgBookingRepository {
    async fn exists_for(&self, user_id: Uuid, flight_id: &str) -> CoreResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM bookings WHERE user_id = $1 AND flight_id = $2)",
        )
        .bind(user_id)
        .bind(flight_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(exists)
    }

    async fn place_hold(&self, hold: &BookingHold) -> CoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        // The insert claims the (user, flight) and pnr slots first; a racing
        // hold for the same pair blocks here and then fails on the constraint.
        sqlx::query(
            r#"
            INSERT INTO bookings (id, user_id, flight_id, airline, route, price_paid, booking_time, pnr, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'PENDING')
            "#,
        )
        .bind(hold.id)
        .bind(hold.user_id)
        .bind(&hold.flight_id)
        .bind(&hold.airline)
        .bind(&hold.route)
        .bind(hold.price_paid)
        .bind(hold.booking_time)
        .bind(&hold.pnr)
        .execute(&mut *tx)
        .await
        .map_err(|e| hold_insert_error(e, hold))?;

        let remaining: Option<i64> = sqlx::query_scalar(
            "UPDATE users SET wallet = wallet - $2 WHERE id = $1 AND wallet >= $2 RETURNING wallet",
        )
        .bind(hold.user_id)
        .bind(hold.price_paid)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error)?;

        if remaining.is_none() {
            let available: Option<i64> = sqlx::query_scalar("SELECT wallet FROM users WHERE id = $1")
                .bind(hold.user_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_error)?;
            // Dropping the transaction rolls back the insert.
            return Err(match available {
                Some(available) => CoreError::InsufficientFunds {
                    required: hold.price_paid,
                    available,
                },
                None => CoreError::NotFound(format!("user {}", hold.user_id)),
            });
        }

        tx.commit().await.map_err(db_error)?;
        Ok(())
    }

    async fn confirm_hold(&self, pnr: &str, ticket_url: &str) -> CoreResult<Booking> {
        let row: Option<BookingRow> = sqlx::query_as(&format!(
            r#"
            UPDATE bookings SET status = 'CONFIRMED', ticket_url = $2
            WHERE pnr = $1 AND status = 'PENDING'
            RETURNING {}
            "#,
            BOOKING_COLUMNS
        ))
        .bind(pnr)
        .bind(ticket_url)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.map(Booking::from)
            .ok_or_else(|| CoreError::InternalError(format!("hold {} is no longer pending", pnr)))
    }

    async fn release_hold(&self, pnr: &str) -> CoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let released: Option<(Uuid, i64)> = sqlx::query_as(
            "DELETE FROM bookings WHERE pnr = $1 AND status = 'PENDING' RETURNING user_id, price_paid",
        )
        .bind(pnr)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error)?;

        if let Some((user_id, amount)) = released {
            sqlx::query("UPDATE users SET wallet = wallet + $2 WHERE id = $1")
                .bind(user_id)
                .bind(amount)
                .execute(&mut *tx)
                .await
                .map_err(db_error)?;
            info!("Released hold {} and refunded {} to {}", pnr, amount, user_id);
        }

        tx.commit().await.map_err(db_error)?;
        Ok(())
    }

    async fn release_stale_holds(&self, cutoff: DateTime<Utc>) -> CoreResult<u64> {
        let pnrs: Vec<String> = sqlx::query_scalar(
            "SELECT pnr FROM bookings WHERE status = 'PENDING' AND booking_time < $1",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        let mut released = 0;
        for pnr in &pnrs {
            self.release_hold(pnr).await?;
            released += 1;
        }
        Ok(released)
    }

    async fn list_bookings(&self, user_id: Uuid) -> CoreResult<Vec<Booking>> {
        let rows: Vec<BookingRow> = sqlx::query_as(&format!(
            r#"
            SELECT {}
            FROM bookings
            WHERE user_id = $1 AND status = 'CONFIRMED'
            ORDER BY booking_time DESC, pnr DESC
            "#,
            BOOKING_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(rows.into_iter().map(Booking::from).collect())
    }
}
