use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use surgefare_shared::Flight;

/// What a repricing pass did to a flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SurgeTransition {
    Unchanged,
    /// Window elapsed, price restored to base.
    Expired,
    /// Threshold crossed, surge window opened.
    Activated,
    /// Expired and re-triggered by the same request.
    Renewed,
}

impl SurgeTransition {
    pub fn is_change(&self) -> bool {
        !matches!(self, SurgeTransition::Unchanged)
    }
}

/// Surge pricing rules. The algorithm is fixed; only the constants vary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurgePolicy {
    /// Surge opens once the recent attempt count is strictly greater than this.
    pub attempt_threshold: u64,
    /// Trailing window over which attempts are counted.
    pub attempt_window: Duration,
    /// Price increase over base, in whole percent.
    pub surge_percent: u32,
    /// How long a surge window stays open.
    pub surge_duration: Duration,
}

impl Default for SurgePolicy {
    fn default() -> Self {
        Self {
            attempt_threshold: 3,
            attempt_window: Duration::minutes(5),
            surge_percent: 10,
            surge_duration: Duration::minutes(10),
        }
    }
}

impl SurgePolicy {
    /// `round(base * (1 + percent / 100))`, half-up, in exact integer arithmetic.
    pub fn surge_price(&self, base_price: i64) -> i64 {
        let scaled = i128::from(base_price) * (100 + i128::from(self.surge_percent));
        let rounded = (scaled + 50).div_euclid(100);
        i64::try_from(rounded).unwrap_or(i64::MAX)
    }

    /// Close an elapsed surge window. Returns true if the flight changed.
    pub fn decay(&self, flight: &mut Flight, now: DateTime<Utc>) -> bool {
        match flight.surge_active_until {
            Some(until) if now > until => {
                flight.current_price = flight.base_price;
                flight.surge_active_until = None;
                true
            }
            _ => false,
        }
    }

    /// Open a surge window if the threshold is crossed and none is open.
    /// An open window is never extended or compounded.
    pub fn escalate(&self, flight: &mut Flight, recent_attempts: u64, now: DateTime<Utc>) -> bool {
        if recent_attempts <= self.attempt_threshold || flight.surge_active_until.is_some() {
            return false;
        }
        flight.current_price = self.surge_price(flight.base_price);
        // Saturate rather than overflow; the window then never closes.
        flight.surge_active_until = Some(
            now.checked_add_signed(self.surge_duration)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        );
        true
    }

    /// Decay then escalate on a copy of `flight`.
    pub fn reprice(&self, flight: &Flight, recent_attempts: u64, now: DateTime<Utc>) -> (Flight, SurgeTransition) {
        let mut next = flight.clone();
        let expired = self.decay(&mut next, now);
        let activated = self.escalate(&mut next, recent_attempts, now);

        let transition = match (expired, activated) {
            (false, false) => SurgeTransition::Unchanged,
            (true, false) => SurgeTransition::Expired,
            (false, true) => SurgeTransition::Activated,
            (true, true) => SurgeTransition::Renewed,
        };
        (next, transition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flight(base: i64) -> Flight {
        Flight::new("AI101", "Air India", "Delhi", "Mumbai", Utc::now(), base)
    }

    #[test]
    fn test_surge_price_rounding() {
        let policy = SurgePolicy::default();
        assert_eq!(policy.surge_price(1000), 1100);
        assert_eq!(policy.surge_price(1005), 1106);
        assert_eq!(policy.surge_price(1004), 1104);
        assert_eq!(policy.surge_price(0), 0);
    }

    #[test]
    fn test_threshold_is_strict() {
        let policy = SurgePolicy::default();
        let now = Utc::now();

        let (same, transition) = policy.reprice(&flight(1000), 3, now);
        assert_eq!(transition, SurgeTransition::Unchanged);
        assert_eq!(same.current_price, 1000);

        let (surged, transition) = policy.reprice(&flight(1000), 4, now);
        assert_eq!(transition, SurgeTransition::Activated);
        assert_eq!(surged.current_price, 1100);
        assert_eq!(surged.surge_active_until, Some(now + Duration::minutes(10)));
    }

    #[test]
    fn test_huge_surge_duration_saturates() {
        let policy = SurgePolicy {
            surge_duration: Duration::seconds(i64::MAX / 1000),
            ..SurgePolicy::default()
        };
        let now = Utc::now();

        let (surged, transition) = policy.reprice(&flight(1000), 4, now);
        assert_eq!(transition, SurgeTransition::Activated);
        assert_eq!(surged.current_price, 1100);
        assert_eq!(surged.surge_active_until, Some(DateTime::<Utc>::MAX_UTC));

        let (still, transition) = policy.reprice(&surged, 4, now + Duration::days(365));
        assert_eq!(transition, SurgeTransition::Unchanged);
        assert_eq!(still, surged);
    }

    #[test]
    fn test_active_surge_not_extended() {
        let policy = SurgePolicy::default();
        let start = Utc::now();
        let (surged, _) = policy.reprice(&flight(1000), 4, start);

        let later = start + Duration::minutes(3);
        let (again, transition) = policy.reprice(&surged, 9, later);
        assert_eq!(transition, SurgeTransition::Unchanged);
        assert_eq!(again.current_price, 1100);
        assert_eq!(again.surge_active_until, surged.surge_active_until);
    }

    #[test]
    fn test_decay_restores_base_regardless_of_attempts() {
        let policy = SurgePolicy::default();
        let start = Utc::now();
        let (surged, _) = policy.reprice(&flight(1000), 4, start);

        let after = start + Duration::minutes(10) + Duration::seconds(1);
        let (decayed, transition) = policy.reprice(&surged, 1, after);
        assert_eq!(transition, SurgeTransition::Expired);
        assert_eq!(decayed.current_price, 1000);
        assert_eq!(decayed.surge_active_until, None);
    }

    #[test]
    fn test_window_end_is_inclusive() {
        let policy = SurgePolicy::default();
        let start = Utc::now();
        let (surged, _) = policy.reprice(&flight(1000), 4, start);

        let edge = start + Duration::minutes(10);
        let (held, transition) = policy.reprice(&surged, 0, edge);
        assert_eq!(transition, SurgeTransition::Unchanged);
        assert_eq!(held.current_price, 1100);
    }

    #[test]
    fn test_expired_surge_retriggers_immediately() {
        let policy = SurgePolicy::default();
        let start = Utc::now();
        let (surged, _) = policy.reprice(&flight(1000), 4, start);

        let after = start + Duration::minutes(11);
        let (renewed, transition) = policy.reprice(&surged, 5, after);
        assert_eq!(transition, SurgeTransition::Renewed);
        assert_eq!(renewed.current_price, 1100);
        assert_eq!(renewed.surge_active_until, Some(after + Duration::minutes(10)));
    }

    #[test]
    fn test_reprice_is_idempotent_for_same_instant() {
        let policy = SurgePolicy::default();
        let now = Utc::now();
        let (once, _) = policy.reprice(&flight(1000), 4, now);
        let (twice, transition) = policy.reprice(&once, 4, now);
        assert_eq!(transition, SurgeTransition::Unchanged);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_custom_policy() {
        let policy = SurgePolicy {
            attempt_threshold: 1,
            attempt_window: Duration::minutes(1),
            surge_percent: 25,
            surge_duration: Duration::minutes(2),
        };
        let now = Utc::now();
        let (surged, transition) = policy.reprice(&flight(800), 2, now);
        assert_eq!(transition, SurgeTransition::Activated);
        assert_eq!(surged.current_price, 1000);
        assert_eq!(surged.surge_active_until, Some(now + Duration::minutes(2)));
    }
}
