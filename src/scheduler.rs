//! Periodic reclaim of expired locks.
//!
//! The scheduler holds no mutation access of its own: every tick dispatches
//! [`BookingAction::ReclaimExpired`] through the store and awaits its
//! completion before the next tick is scheduled, so reclaim passes never
//! overlap. The caller drops and respawns the scheduler when the inventory
//! resets on a show change.

use crate::booking::{BookingAction, BookingStore};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Handle to the background reclaim task. Dropping it stops the task.
pub struct ExpiryScheduler {
    handle: JoinHandle<()>,
}

impl ExpiryScheduler {
    /// Spawns the reclaim loop with the given tick period (must be non-zero).
    ///
    /// The loop exits on its own once the store shuts down.
    #[must_use]
    pub fn spawn(store: BookingStore, period: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick of an interval completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match store.send(BookingAction::ReclaimExpired).await {
                    Ok(dispatched) => dispatched.wait().await,
                    Err(_) => {
                        tracing::debug!("store shut down; stopping reclaim loop");
                        break;
                    },
                }
            }
        });
        Self { handle }
    }

    /// Whether the reclaim loop has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for ExpiryScheduler {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::booking::{BookingEnvironment, BookingReducer, BookingState};
    use crate::catalog::Catalog;
    use crate::config::LatencyConfig;
    use crate::insight::CannedInsight;
    use crate::testing::SteppingClock;
    use crate::types::RequesterId;
    use std::sync::Arc;

    fn store_with_clock(clock: SteppingClock) -> BookingStore {
        let env = BookingEnvironment {
            clock: Arc::new(clock),
            insight: CannedInsight::shared(),
            latency: LatencyConfig::none(),
            lock_duration: Duration::from_secs(7 * 60),
        };
        BookingStore::new(BookingState::new(50), BookingReducer, env)
    }

    async fn lock_seat(store: &BookingStore, seat: &str) {
        let show = Catalog::builtin().show("s1").cloned().unwrap();
        store
            .send(BookingAction::SelectShow(show))
            .await
            .unwrap()
            .wait()
            .await;
        store
            .send(BookingAction::AcquireReady {
                requester: RequesterId::new("u1"),
                seat_ids: vec![seat.parse().unwrap()],
            })
            .await
            .unwrap()
            .wait()
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn reclaims_expired_locks_on_its_period() {
        let clock = SteppingClock::default();
        let store = store_with_clock(clock.clone());
        lock_seat(&store, "A1").await;

        clock.advance(chrono::Duration::minutes(8));
        let _scheduler = ExpiryScheduler::spawn(store.clone(), Duration::from_secs(5));
        tokio::time::sleep(Duration::from_secs(6)).await;

        assert!(
            store
                .state(|s| s.seat("A1".parse().unwrap()).unwrap().status.is_available())
                .await
        );
    }

    #[tokio::test(start_paused = true)]
    async fn leaves_fresh_locks_alone() {
        let clock = SteppingClock::default();
        let store = store_with_clock(clock.clone());
        lock_seat(&store, "B2").await;

        let _scheduler = ExpiryScheduler::spawn(store.clone(), Duration::from_secs(5));
        tokio::time::sleep(Duration::from_secs(20)).await;

        assert!(
            store
                .state(|s| s.seat("B2".parse().unwrap()).unwrap().status.is_locked())
                .await
        );
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_scheduler_stops_reclaims() {
        let clock = SteppingClock::default();
        let store = store_with_clock(clock.clone());
        lock_seat(&store, "C3").await;

        let scheduler = ExpiryScheduler::spawn(store.clone(), Duration::from_secs(5));
        drop(scheduler);
        clock.advance(chrono::Duration::minutes(8));
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert!(
            store
                .state(|s| s.seat("C3".parse().unwrap()).unwrap().status.is_locked())
                .await
        );
    }
}
