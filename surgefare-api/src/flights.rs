use axum::{
    extract::{Path, State},
    routing::get,
    Extension, Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use surgefare_shared::Flight;

use crate::error::AppError;
use crate::middleware::auth::CustomerClaims;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct QuoteResponse {
    pub message: &'static str,
    pub flight: Flight,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/flights/{flight_id}", get(quote_flight))
}

/// GET /v1/flights/{flight_id}
/// Current price for the caller. Counts as a booking attempt.
async fn quote_flight(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
    Path(flight_id): Path<String>,
) -> Result<Json<QuoteResponse>, AppError> {
    let user_id = claims.user_id()?;
    let flight = state.pricing.quote(&flight_id, user_id, Utc::now()).await?;

    Ok(Json(QuoteResponse {
        message: "Flight fetched successfully",
        flight,
    }))
}
