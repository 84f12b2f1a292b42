//! Actor simulators: primary user drivers, the concurrent bot, and the
//! scripted deadlock narrative.
//!
//! Actors never mutate seat state directly; they only dispatch lock manager
//! actions through the store.

use crate::booking::{BookingAction, BookingStore, NarrativeBeat};
use crate::config::LatencyConfig;
use crate::event_log::LogKind;
use crate::runtime::StoreError;
use crate::types::{RequesterId, SeatId, UserSession};
use rand::Rng;
use rand::seq::SliceRandom;
use std::time::Duration;

/// How many seats a bot session tries to grab.
pub const BOT_TARGET_COUNT: usize = 2;

/// Picks the bot's target seats uniformly at random from the available set.
///
/// Returns `None` when fewer than [`BOT_TARGET_COUNT`] seats are available;
/// the bot run is then skipped silently. Pure over its inputs so tests can
/// inject a seeded source.
#[must_use]
pub fn pick_bot_targets<R: Rng + ?Sized>(available: &[SeatId], rng: &mut R) -> Option<Vec<SeatId>> {
    if available.len() < BOT_TARGET_COUNT {
        return None;
    }
    let mut picked: Vec<SeatId> = available
        .choose_multiple(rng, BOT_TARGET_COUNT)
        .copied()
        .collect();
    picked.sort_unstable();
    Some(picked)
}

/// Drives one bot acquisition under a fresh ephemeral identity and waits for
/// its outcome. Returns the bot's identity, or `None` when the run was
/// skipped for lack of available seats.
///
/// # Errors
///
/// Returns [`StoreError`] if the store is shutting down.
pub async fn run_bot_session<R: Rng + ?Sized>(
    store: &BookingStore,
    rng: &mut R,
) -> Result<Option<RequesterId>, StoreError> {
    let available = store.state(|s| s.available_seat_ids()).await;
    let Some(seat_ids) = pick_bot_targets(&available, rng) else {
        tracing::debug!("bot run skipped: fewer than two seats available");
        return Ok(None);
    };
    let requester = RequesterId::bot();
    let dispatched = store
        .send(BookingAction::Acquire {
            requester: requester.clone(),
            seat_ids,
        })
        .await?;
    dispatched.wait().await;
    Ok(Some(requester))
}

/// Acquires whatever the primary actor currently has selected and waits for
/// the outcome. No-op when the selection is empty.
///
/// # Errors
///
/// Returns [`StoreError`] if the store is shutting down.
pub async fn acquire_selected(
    store: &BookingStore,
    session: &UserSession,
) -> Result<(), StoreError> {
    let seat_ids = store.state(|s| s.selection.clone()).await;
    if seat_ids.is_empty() {
        return Ok(());
    }
    let dispatched = store
        .send(BookingAction::Acquire {
            requester: session.user_id.clone(),
            seat_ids,
        })
        .await?;
    dispatched.wait().await;
    Ok(())
}

/// Commits every seat the primary actor holds and waits for the outcome.
///
/// # Errors
///
/// Returns [`StoreError`] if the store is shutting down.
pub async fn commit_booking(store: &BookingStore, session: &UserSession) -> Result<(), StoreError> {
    let dispatched = store
        .send(BookingAction::Commit {
            requester: session.user_id.clone(),
        })
        .await?;
    dispatched.wait().await;
    Ok(())
}

/// The fixed four-beat deadlock story.
#[must_use]
pub fn deadlock_script() -> [NarrativeBeat; 4] {
    [
        NarrativeBeat {
            kind: LogKind::Deadlock,
            message: "Forcing Deadlock Scenario: User A locks S1 -> User B locks S2 -> \
                      User A requests S2 -> User B requests S1"
                .to_string(),
            query: None,
            advisory: Some(
                "A deadlock occurs when two transactions hold locks and wait for \
                 each other. The database detects this and rolls back one."
                    .to_string(),
            ),
        },
        NarrativeBeat {
            kind: LogKind::Error,
            message: "Deadlock detected! Database engine kills Transaction B. \
                      Transaction A retries."
                .to_string(),
            query: Some("ROLLBACK TO SAVEPOINT;".to_string()),
            advisory: None,
        },
        NarrativeBeat {
            kind: LogKind::Info,
            message: "Retrying Transaction A...".to_string(),
            query: None,
            advisory: None,
        },
        NarrativeBeat {
            kind: LogKind::Success,
            message: "Transaction A recovered and completed.".to_string(),
            query: None,
            advisory: None,
        },
    ]
}

/// Plays the deadlock narrative: announcement, detection after a pause,
/// retry, recovery after another pause. Log-only by construction.
///
/// # Errors
///
/// Returns [`StoreError`] if the store is shutting down.
pub async fn run_deadlock_narrative(
    store: &BookingStore,
    latency: &LatencyConfig,
) -> Result<(), StoreError> {
    let [announce, detect, retry, recover] = deadlock_script();

    store.send(BookingAction::Narrate(announce)).await?.wait().await;
    tokio::time::sleep(Duration::from_millis(latency.narrative_detect_ms)).await;
    store.send(BookingAction::Narrate(detect)).await?.wait().await;
    store.send(BookingAction::Narrate(retry)).await?.wait().await;
    tokio::time::sleep(Duration::from_millis(latency.narrative_retry_ms)).await;
    store.send(BookingAction::Narrate(recover)).await?.wait().await;
    Ok(())
}
