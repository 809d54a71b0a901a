use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;

/// Source of booking reference codes. Uniqueness is enforced by storage;
/// a source only needs to make collisions rare.
pub trait PnrSource: Send + Sync {
    fn next_pnr(&self, now: DateTime<Utc>) -> String;
}

/// `PNR-<unix millis>-<4 uppercase alphanumerics>`
pub struct RandomPnr;

const SUFFIX_LEN: usize = 4;

impl PnrSource for RandomPnr {
    fn next_pnr(&self, now: DateTime<Utc>) -> String {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(SUFFIX_LEN)
            .map(char::from)
            .collect();
        format!("PNR-{}-{}", now.timestamp_millis(), suffix.to_ascii_uppercase())
    }
}
