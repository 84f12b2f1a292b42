//! Advisory insight service.
//!
//! After notable lock events the simulator surfaces a short educational note
//! about what just happened at the database layer. The trait abstracts over
//! the advisory backend; the built-in implementation serves canned text so
//! the simulator runs fully offline. The backend is best-effort: callers fall
//! back to [`INSIGHT_FALLBACK`] on any failure.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

/// Advisory shown before any show is selected.
pub const INSIGHT_WELCOME: &str =
    "Welcome to CineLock. Select a movie to begin the concurrent booking simulation.";

/// Advisory used whenever the insight backend fails.
pub const INSIGHT_FALLBACK: &str =
    "The system is currently handling high-concurrency transactions. Ensure ACID compliance.";

/// Errors from the insight backend.
#[derive(Debug, Clone, Error)]
pub enum InsightError {
    /// The backend could not produce an advisory for this scenario.
    #[error("insight backend unavailable: {reason}")]
    Unavailable {
        /// Why the backend failed.
        reason: String,
    },
}

/// Result alias for insight operations.
pub type InsightResult = Result<String, InsightError>;

/// Abstraction over the advisory backend.
pub trait InsightService: Send + Sync {
    /// Produces a short advisory for the given scenario description.
    ///
    /// # Errors
    ///
    /// Returns [`InsightError`] when the backend cannot answer; callers fall
    /// back to [`INSIGHT_FALLBACK`].
    fn explain(&self, scenario: &str) -> Pin<Box<dyn Future<Output = InsightResult> + Send>>;
}

/// Offline insight backend serving fixed educational advisories keyed off
/// the scenario text.
#[derive(Clone, Debug, Default)]
pub struct CannedInsight;

impl CannedInsight {
    /// Creates the canned backend.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Creates an Arc-wrapped instance for sharing.
    #[must_use]
    pub fn shared() -> Arc<dyn InsightService> {
        Arc::new(Self::new())
    }

    fn advisory(scenario: &str) -> &'static str {
        let lower = scenario.to_lowercase();
        if lower.contains("deadlock") {
            "Two transactions each held a lock the other needed. The engine's \
             wait-for graph detected the cycle and aborted one victim so the \
             other could proceed."
        } else if lower.contains("conflict") || lower.contains("double-booking") {
            "A concurrent transaction already holds this row's lock. Under \
             READ COMMITTED the second writer must wait or abort rather than \
             overwrite uncommitted state."
        } else if lower.contains("commit") || lower.contains("payment") {
            "COMMIT made the booking durable and released the transaction's \
             locks atomically. No other session ever observed a half-finished \
             booking."
        } else if lower.contains("expired") || lower.contains("released") {
            "Lock timeouts keep abandoned transactions from starving the \
             system. Expired holds were rolled back and their rows returned \
             to the pool."
        } else {
            "A row-level exclusive lock prevents other transactions from \
             modifying this seat until the holder commits or the lock expires."
        }
    }
}

impl InsightService for CannedInsight {
    fn explain(&self, scenario: &str) -> Pin<Box<dyn Future<Output = InsightResult> + Send>> {
        let advisory = Self::advisory(scenario);
        Box::pin(async move { Ok(advisory.to_string()) })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn advisories_track_the_scenario() {
        let service = CannedInsight::new();
        let deadlock = service
            .explain("A deadlock occurs when two transactions hold locks and wait for each other.")
            .await
            .unwrap();
        assert!(deadlock.contains("wait-for graph"));

        let conflict = service
            .explain("Pessimistic locking prevents a double-booking conflict.")
            .await
            .unwrap();
        assert!(conflict.contains("concurrent transaction"));
    }

    #[tokio::test]
    async fn advisories_are_deterministic() {
        let service = CannedInsight::new();
        let scenario = "Payment success triggers status update to BOOKED and a database COMMIT.";
        let first = service.explain(scenario).await.unwrap();
        let second = service.explain(scenario).await.unwrap();
        assert_eq!(first, second);
    }
}
