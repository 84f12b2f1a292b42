//! Deterministic test doubles: clocks, insight stubs, seeded randomness.
//!
//! Usable from unit tests, integration tests, and demo scripts alike, so it
//! ships as a normal module rather than test-only code.

use crate::insight::{InsightError, InsightResult, InsightService};
use crate::runtime::Clock;
use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};

/// The instant all fixed-clock tests start from: 2025-01-01T00:00:00Z.
#[must_use]
pub fn test_clock() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::UNIX_EPOCH)
}

/// A clock frozen at a single instant.
#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub DateTime<Utc>);

impl Default for FixedClock {
    fn default() -> Self {
        Self(test_clock())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// A clock that only moves when the test advances it.
///
/// Shared via `Arc`, so the environment and the test body observe the same
/// instant.
#[derive(Clone, Debug)]
pub struct SteppingClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl SteppingClock {
    /// Creates a stepping clock starting at `start`.
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Moves the clock forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += delta;
    }
}

impl Default for SteppingClock {
    fn default() -> Self {
        Self::new(test_clock())
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// An insight backend that always fails, for exercising the fallback path.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullInsight;

impl InsightService for NullInsight {
    fn explain(&self, _scenario: &str) -> Pin<Box<dyn Future<Output = InsightResult> + Send>> {
        Box::pin(async {
            Err(InsightError::Unavailable {
                reason: "disabled under test".to_string(),
            })
        })
    }
}

/// A reproducible RNG for bot selection tests.
#[must_use]
pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stepping_clock_advances_monotonically() {
        let clock = SteppingClock::default();
        let start = clock.now();
        clock.advance(Duration::seconds(90));
        assert_eq!(clock.now() - start, Duration::seconds(90));
    }

    #[test]
    fn fixed_clock_never_moves() {
        let clock = FixedClock::default();
        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.now(), test_clock());
    }
}
