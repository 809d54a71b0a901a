use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

/// One quote request by a user for a flight. Write-once.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Attempt {
    #[serde(rename = "userId")]
    pub user_id: Uuid,
    #[serde(rename = "flightId")]
    pub flight_id: String,
    #[serde(rename = "attemptTime")]
    pub attempt_time: DateTime<Utc>,
}

impl Attempt {
    pub fn new(user_id: Uuid, flight_id: impl Into<String>, attempt_time: DateTime<Utc>) -> Self {
        Self {
            user_id,
            flight_id: flight_id.into(),
            attempt_time,
        }
    }
}
