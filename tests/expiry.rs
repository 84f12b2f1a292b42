//! Lock expiry and reclaim behavior with a controlled clock.

#![allow(clippy::unwrap_used)]

use cinelock::booking::{
    BookingAction, BookingEnvironment, BookingReducer, BookingState, BookingStore,
};
use cinelock::catalog::Catalog;
use cinelock::config::LatencyConfig;
use cinelock::insight::CannedInsight;
use cinelock::scheduler::ExpiryScheduler;
use cinelock::testing::SteppingClock;
use cinelock::types::{RequesterId, SeatId};
use std::sync::Arc;
use std::time::Duration;

fn store_with_clock(clock: SteppingClock) -> BookingStore {
    let env = BookingEnvironment {
        clock: Arc::new(clock),
        insight: CannedInsight::shared(),
        latency: LatencyConfig::none(),
        lock_duration: Duration::from_secs(7 * 60),
    };
    BookingStore::new(BookingState::new(50), BookingReducer, env)
}

fn id(raw: &str) -> SeatId {
    raw.parse().unwrap()
}

async fn setup(store: &BookingStore, seats: &[&str]) {
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
            seat_ids: seats.iter().map(|s| id(s)).collect(),
        })
        .await
        .unwrap()
        .wait()
        .await;
}

async fn reclaim_entries(store: &BookingStore) -> usize {
    store
        .state(|s| {
            s.log
                .iter()
                .filter(|e| e.message.starts_with("Scheduled task: Released"))
                .count()
        })
        .await
}

#[tokio::test(start_paused = true)]
async fn lock_survives_until_just_before_the_deadline() {
    let clock = SteppingClock::default();
    let store = store_with_clock(clock.clone());
    setup(&store, &["A1"]).await;

    let _scheduler = ExpiryScheduler::spawn(store.clone(), Duration::from_secs(5));

    clock.advance(chrono::Duration::minutes(6) + chrono::Duration::seconds(59));
    tokio::time::sleep(Duration::from_secs(15)).await;
    assert!(
        store
            .state(|s| s.seat(id("A1")).unwrap().status.is_locked())
            .await,
        "6m59s is inside the lock duration"
    );

    clock.advance(chrono::Duration::seconds(2));
    tokio::time::sleep(Duration::from_secs(15)).await;
    assert!(
        store
            .state(|s| s.seat(id("A1")).unwrap().status.is_available())
            .await,
        "7m01s is past the lock duration"
    );
    assert_eq!(reclaim_entries(&store).await, 1);
}

#[tokio::test]
async fn reclaim_passes_are_idempotent_without_elapsed_time() {
    let clock = SteppingClock::default();
    let store = store_with_clock(clock.clone());
    setup(&store, &["B1", "B2"]).await;

    clock.advance(chrono::Duration::minutes(8));
    store
        .send(BookingAction::ReclaimExpired)
        .await
        .unwrap()
        .wait()
        .await;
    store
        .send(BookingAction::ReclaimExpired)
        .await
        .unwrap()
        .wait()
        .await;

    assert_eq!(reclaim_entries(&store).await, 1, "second pass reclaims 0");
    let latest = store
        .state(|s| {
            s.log
                .iter()
                .filter(|e| e.message.starts_with("Scheduled task"))
                .map(|e| e.message.clone())
                .last()
        })
        .await;
    assert_eq!(
        latest.as_deref(),
        Some("Scheduled task: Released 2 expired locks.")
    );
}

#[tokio::test(start_paused = true)]
async fn show_change_discards_locks_before_they_can_expire() {
    let clock = SteppingClock::default();
    let store = store_with_clock(clock.clone());
    setup(&store, &["C1"]).await;

    // Restart the scheduler around the inventory reset, as the driver does.
    let scheduler = ExpiryScheduler::spawn(store.clone(), Duration::from_secs(5));
    drop(scheduler);
    let next = Catalog::builtin().show("s3").cloned().unwrap();
    store
        .send(BookingAction::SelectShow(next))
        .await
        .unwrap()
        .wait()
        .await;
    let _scheduler = ExpiryScheduler::spawn(store.clone(), Duration::from_secs(5));

    clock.advance(chrono::Duration::minutes(10));
    tokio::time::sleep(Duration::from_secs(15)).await;

    assert!(
        store
            .state(|s| s.seats.iter().all(|x| x.status.is_available()))
            .await
    );
    assert_eq!(
        reclaim_entries(&store).await,
        0,
        "the reset discarded the lock, so nothing ever expires"
    );
}

#[tokio::test(start_paused = true)]
async fn commit_racing_expiry_books_nothing_after_reclaim() {
    let clock = SteppingClock::default();
    let store = store_with_clock(clock.clone());
    setup(&store, &["D1"]).await;

    // Payment is in flight while the lock crosses its deadline.
    clock.advance(chrono::Duration::minutes(8));
    store
        .send(BookingAction::ReclaimExpired)
        .await
        .unwrap()
        .wait()
        .await;
    store
        .send(BookingAction::CommitReady {
            requester: RequesterId::new("u1"),
        })
        .await
        .unwrap()
        .wait()
        .await;

    assert!(
        store
            .state(|s| s.seat(id("D1")).unwrap().status.is_available())
            .await
    );
    assert!(
        store
            .state(|s| !s.log.iter().any(|e| e.message.contains("Payment successful")))
            .await
    );
}
