use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use surgefare_shared::Booking;

use crate::error::AppError;
use crate::middleware::auth::CustomerClaims;
use crate::middleware::resiliency::issuer_circuit_middleware;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub message: &'static str,
    pub booking: Booking,
}

pub fn routes(state: AppState) -> Router<AppState> {
    let commit = Router::new()
        .route("/v1/flights/{flight_id}/bookings", post(book_flight))
        .route_layer(axum::middleware::from_fn_with_state(state, issuer_circuit_middleware));

    Router::new()
        .route("/v1/bookings", get(booking_history))
        .merge(commit)
}

/// POST /v1/flights/{flight_id}/bookings
/// Book at the flight's stored price. The request carries no price.
async fn book_flight(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
    Path(flight_id): Path<String>,
) -> Result<(StatusCode, Json<BookingResponse>), AppError> {
    let user_id = claims.user_id()?;
    let booking = state.bookings.book(user_id, &flight_id, Utc::now()).await?;

    Ok((
        StatusCode::CREATED,
        Json(BookingResponse {
            message: "Booking successful",
            booking,
        }),
    ))
}

/// GET /v1/bookings
async fn booking_history(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
) -> Result<Json<Vec<Booking>>, AppError> {
    let user_id = claims.user_id()?;
    Ok(Json(state.receipts.history(user_id).await?))
}
