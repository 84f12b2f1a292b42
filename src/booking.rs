//! The lock manager: seat lifecycle reducer, actions, and environment.
//!
//! All seat mutation happens inside [`BookingReducer::reduce`], which the
//! store executes under a write lock: the conflict-check-then-mutate sequence
//! of an acquisition and the scan-then-mutate sequence of a reclaim each run
//! as one atomic unit. Operations that simulate backend latency are split
//! into a command action (logs the attempt, returns a delay effect) and a
//! `...Ready` action whose reduction is the atomic phase. The latency phase
//! holds no lock, so overlapping operations interleave only at reduction
//! boundaries and log entries appear in commit order.

use crate::config::{Config, LatencyConfig};
use crate::event_log::{EventLog, LogEntry, LogKind};
use crate::insight::{CannedInsight, INSIGHT_FALLBACK, INSIGHT_WELCOME, InsightService};
use crate::runtime::{Clock, Effect, Reducer, Store, SystemClock};
use crate::types::{RequesterId, Seat, SeatId, SeatStatus, Show};
use serde::{Deserialize, Serialize};
use smallvec::{SmallVec, smallvec};
use std::sync::Arc;
use std::time::Duration;

/// Auditorium rows in the fixed layout.
pub const ROWS: std::ops::RangeInclusive<char> = 'A'..='H';
/// Seats per row in the fixed layout.
pub const SEATS_PER_ROW: u8 = 10;

/// Builds the fresh 80-seat inventory, all available, in row-major order.
fn build_inventory() -> Vec<Seat> {
    ROWS.flat_map(|row| (1..=SEATS_PER_ROW).map(move |n| Seat::available(SeatId::new(row, n))))
        .collect()
}

fn join_ids(ids: &[SeatId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

// ============================================================================
// Failures
// ============================================================================

/// Recoverable failure outcomes of lock operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum BookingFailure {
    /// At least one requested seat was not available at acquire time. The
    /// whole request is rejected; no seat changes state.
    #[error("some seats are already locked or booked")]
    Conflict,
}

// ============================================================================
// State
// ============================================================================

/// The lock manager's owned state: inventory, selection, log, and advisory.
#[derive(Debug, Clone)]
pub struct BookingState {
    /// The currently selected show, if any.
    pub show: Option<Show>,
    /// Seat inventory for the selected show, row-major order.
    pub seats: Vec<Seat>,
    /// The primary actor's locally held selection, in toggle order. Selecting
    /// a seat never mutates seat state.
    pub selection: Vec<SeatId>,
    /// Bounded transition log.
    pub log: EventLog,
    /// Latest advisory text.
    pub insight: String,
    /// Whether an advisory request is in flight.
    pub insight_loading: bool,
    /// Whether a primary-actor operation is between command and completion.
    pub processing: bool,
    /// Failure outcome of the most recent acquisition, if it failed.
    pub last_failure: Option<BookingFailure>,
}

impl BookingState {
    /// Creates empty state with a log bounded to `log_capacity` entries.
    #[must_use]
    pub fn new(log_capacity: usize) -> Self {
        Self {
            show: None,
            seats: Vec::new(),
            selection: Vec::new(),
            log: EventLog::new(log_capacity),
            insight: INSIGHT_WELCOME.to_string(),
            insight_loading: false,
            processing: false,
            last_failure: None,
        }
    }

    /// Snapshot of a single seat.
    #[must_use]
    pub fn seat(&self, id: SeatId) -> Option<&Seat> {
        self.seats.iter().find(|s| s.id == id)
    }

    fn seat_mut(&mut self, id: SeatId) -> Option<&mut Seat> {
        self.seats.iter_mut().find(|s| s.id == id)
    }

    /// Ids of all currently available seats, row-major order.
    #[must_use]
    pub fn available_seat_ids(&self) -> Vec<SeatId> {
        self.seats
            .iter()
            .filter(|s| s.status.is_available())
            .map(|s| s.id)
            .collect()
    }

    /// Ids of all seats currently locked by `requester`.
    #[must_use]
    pub fn seats_locked_by(&self, requester: &RequesterId) -> Vec<SeatId> {
        self.seats
            .iter()
            .filter(|s| s.locked_by() == Some(requester))
            .map(|s| s.id)
            .collect()
    }
}

// ============================================================================
// Actions
// ============================================================================

/// One beat of the scripted deadlock narrative: a log entry plus an optional
/// advisory request. Narration never touches seat state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrativeBeat {
    /// Log category for this beat.
    pub kind: LogKind,
    /// Log message.
    pub message: String,
    /// Illustrative SQL, if the beat simulates a DB operation.
    pub query: Option<String>,
    /// Scenario description to send to the insight service, if any.
    pub advisory: Option<String>,
}

/// Commands and internal completion events of the lock manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BookingAction {
    /// Select a show: rebuilds the inventory from scratch.
    SelectShow(Show),
    /// Toggle a seat in the primary actor's selection.
    ToggleSeat(SeatId),
    /// Request locks on a set of seats. Accepts the request, then completes
    /// atomically in [`BookingAction::AcquireReady`] after simulated latency.
    Acquire {
        /// Who is asking.
        requester: RequesterId,
        /// The seats requested, as one all-or-nothing unit.
        seat_ids: Vec<SeatId>,
    },
    /// Internal: latency elapsed; run the atomic conflict-check-then-lock.
    AcquireReady {
        /// Who asked.
        requester: RequesterId,
        /// The requested unit.
        seat_ids: Vec<SeatId>,
    },
    /// Finalize every seat the requester holds. No-op when nothing is held.
    Commit {
        /// Whose locks to finalize.
        requester: RequesterId,
    },
    /// Internal: payment latency elapsed; book whatever is still held.
    CommitReady {
        /// Whose locks to finalize.
        requester: RequesterId,
    },
    /// Unconditionally return seats to available.
    Release {
        /// Seats to release.
        seat_ids: Vec<SeatId>,
    },
    /// Scan for locks held longer than the lock duration and release them.
    ReclaimExpired,
    /// Append one scripted narrative beat.
    Narrate(NarrativeBeat),
    /// Internal: the insight service answered (or the fallback was used).
    InsightUpdated(String),
}

// ============================================================================
// Environment
// ============================================================================

/// Injected dependencies of the lock manager.
#[derive(Clone)]
pub struct BookingEnvironment {
    /// Time source; all `locked_at` stamps and expiry checks go through it.
    pub clock: Arc<dyn Clock>,
    /// Advisory backend, best-effort.
    pub insight: Arc<dyn InsightService>,
    /// Simulated backend latencies.
    pub latency: LatencyConfig,
    /// How long a lock may be held before it is eligible for reclaim.
    pub lock_duration: Duration,
}

impl BookingEnvironment {
    /// Production environment: system clock, canned insight backend.
    #[must_use]
    pub fn live(config: &Config) -> Self {
        Self {
            clock: Arc::new(SystemClock),
            insight: CannedInsight::shared(),
            latency: config.latency,
            lock_duration: config.lock_duration(),
        }
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// The store driving the lock manager.
pub type BookingStore = Store<BookingState, BookingAction, BookingEnvironment, BookingReducer>;

type Effects = SmallVec<[Effect<BookingAction>; 4]>;

/// Requests an advisory as a fire-and-forget effect. Failures collapse to
/// the fixed fallback text, never to an error.
fn insight_effect(
    state: &mut BookingState,
    env: &BookingEnvironment,
    scenario: &str,
) -> Effect<BookingAction> {
    state.insight_loading = true;
    let response = env.insight.explain(scenario);
    Effect::Future(Box::pin(async move {
        let text = response
            .await
            .unwrap_or_else(|_| INSIGHT_FALLBACK.to_string());
        Some(BookingAction::InsightUpdated(text))
    }))
}

/// The seat lock state machine.
#[derive(Clone, Copy, Debug, Default)]
pub struct BookingReducer;

impl Reducer for BookingReducer {
    type State = BookingState;
    type Action = BookingAction;
    type Environment = BookingEnvironment;

    #[allow(clippy::too_many_lines)]
    fn reduce(
        &self,
        state: &mut BookingState,
        action: BookingAction,
        env: &BookingEnvironment,
    ) -> Effects {
        let now = env.clock.now();
        match action {
            BookingAction::SelectShow(show) => {
                let theater = show.theater.clone();
                state.show = Some(show);
                state.seats = build_inventory();
                state.selection.clear();
                state.last_failure = None;
                state.processing = false;
                state.log.append(LogEntry::new(
                    now,
                    LogKind::Info,
                    format!("Initialized seat inventory for {theater}."),
                ));
                tracing::info!(%theater, seats = state.seats.len(), "inventory initialized");
                smallvec![]
            },

            BookingAction::ToggleSeat(id) => {
                if let Some(pos) = state.selection.iter().position(|s| *s == id) {
                    state.selection.remove(pos);
                } else if state.seat(id).is_some_and(|s| s.status.is_available()) {
                    state.selection.push(id);
                }
                smallvec![]
            },

            BookingAction::Acquire {
                requester,
                seat_ids,
            } => {
                if seat_ids.is_empty() {
                    return smallvec![];
                }
                if requester.is_bot() {
                    state.log.append(LogEntry::new(
                        now,
                        LogKind::Info,
                        "Simulating concurrent bot user access...",
                    ));
                    state.log.append(LogEntry::with_query(
                        now,
                        LogKind::DbLock,
                        format!("Bot User attempting to lock: {}", join_ids(&seat_ids)),
                        "BEGIN TRANSACTION; SELECT FOR UPDATE...",
                    ));
                } else {
                    state.processing = true;
                    state.log.append(LogEntry::new(
                        now,
                        LogKind::Info,
                        format!("Initiating transaction for user {requester}..."),
                    ));
                }
                tracing::debug!(%requester, seats = %join_ids(&seat_ids), "acquire accepted");
                metrics::counter!("booking.acquire.requests").increment(1);
                let duration = env.latency.acquire(requester.is_bot());
                smallvec![Effect::Delay {
                    duration,
                    action: Box::new(BookingAction::AcquireReady {
                        requester,
                        seat_ids,
                    }),
                }]
            },

            BookingAction::AcquireReady {
                requester,
                seat_ids,
            } => {
                let is_bot = requester.is_bot();
                if !is_bot {
                    let quoted = seat_ids
                        .iter()
                        .map(|id| format!("'{id}'"))
                        .collect::<Vec<_>>()
                        .join(",");
                    state.log.append(LogEntry::with_query(
                        now,
                        LogKind::DbLock,
                        format!(
                            "Attempting Pessimistic Lock on seats: {}",
                            join_ids(&seat_ids)
                        ),
                        format!("SELECT * FROM seats WHERE id IN ({quoted}) FOR UPDATE;"),
                    ));
                }

                // All-or-nothing: any non-available seat rejects the request.
                let conflict = seat_ids
                    .iter()
                    .any(|id| state.seat(*id).is_none_or(|s| !s.status.is_available()));

                let effects: Effects = if conflict {
                    state.last_failure = Some(BookingFailure::Conflict);
                    state.log.append(LogEntry::new(
                        now,
                        LogKind::Error,
                        "Transaction failed: Some seats are already locked or booked.",
                    ));
                    tracing::info!(%requester, "acquire rejected: conflict");
                    metrics::counter!("booking.acquire.conflicts").increment(1);
                    smallvec![insight_effect(
                        state,
                        env,
                        "Pessimistic locking prevents a double-booking conflict.",
                    )]
                } else {
                    for id in &seat_ids {
                        if let Some(seat) = state.seat_mut(*id) {
                            seat.status = SeatStatus::Locked {
                                by: requester.clone(),
                                at: now,
                            };
                        }
                    }
                    state.last_failure = None;
                    let minutes = env.lock_duration.as_secs() / 60;
                    state.log.append(LogEntry::new(
                        now,
                        LogKind::Success,
                        if is_bot {
                            "Bot user successfully acquired locks.".to_string()
                        } else {
                            format!("Seats locked for {minutes} minutes. Awaiting payment...")
                        },
                    ));
                    tracing::info!(%requester, seats = %join_ids(&seat_ids), "locks acquired");
                    metrics::counter!("booking.acquire.granted").increment(1);
                    let scenario = if is_bot {
                        "Concurrent access from a second session is serialized by row-level locks."
                    } else {
                        "A user initiates a booking, triggering a row-level lock in the DB."
                    };
                    smallvec![insight_effect(state, env, scenario)]
                };

                if !is_bot {
                    state.selection.clear();
                    state.processing = false;
                }
                effects
            },

            BookingAction::Commit { requester } => {
                if state.seats_locked_by(&requester).is_empty() {
                    tracing::debug!(%requester, "commit with nothing held: no-op");
                    return smallvec![];
                }
                if !requester.is_bot() {
                    state.processing = true;
                }
                state.log.append(LogEntry::new(
                    now,
                    LogKind::Info,
                    "Payment gateway processing...",
                ));
                smallvec![Effect::Delay {
                    duration: env.latency.commit(),
                    action: Box::new(BookingAction::CommitReady { requester }),
                }]
            },

            BookingAction::CommitReady { requester } => {
                let mut booked = 0usize;
                for seat in &mut state.seats {
                    if seat.locked_by() == Some(&requester) {
                        seat.status = SeatStatus::Booked;
                        booked += 1;
                    }
                }
                if !requester.is_bot() {
                    state.processing = false;
                }
                if booked == 0 {
                    // Locks expired while payment was in flight.
                    tracing::info!(%requester, "commit found no surviving locks");
                    return smallvec![];
                }
                state.log.append(LogEntry::with_query(
                    now,
                    LogKind::Success,
                    "Payment successful. Transaction committed.",
                    format!("UPDATE seats SET status = 'BOOKED' WHERE locked_by = '{requester}';"),
                ));
                tracing::info!(%requester, booked, "booking committed");
                metrics::counter!("booking.commits").increment(1);
                smallvec![insight_effect(
                    state,
                    env,
                    "Payment success triggers status update to BOOKED and a database COMMIT.",
                )]
            },

            BookingAction::Release { seat_ids } => {
                for id in seat_ids {
                    if let Some(seat) = state.seat_mut(id) {
                        seat.status = SeatStatus::Available;
                    }
                }
                smallvec![]
            },

            BookingAction::ReclaimExpired => {
                let mut reclaimed = 0usize;
                for seat in &mut state.seats {
                    let expired = match &seat.status {
                        SeatStatus::Locked { at, .. } => now
                            .signed_duration_since(*at)
                            .to_std()
                            .is_ok_and(|held| held > env.lock_duration),
                        _ => false,
                    };
                    if expired {
                        seat.status = SeatStatus::Available;
                        reclaimed += 1;
                    }
                }
                if reclaimed > 0 {
                    state.log.append(LogEntry::new(
                        now,
                        LogKind::Info,
                        format!("Scheduled task: Released {reclaimed} expired locks."),
                    ));
                    tracing::info!(reclaimed, "reclaimed expired locks");
                    metrics::counter!("booking.locks.reclaimed").increment(1);
                }
                smallvec![]
            },

            BookingAction::Narrate(beat) => {
                let entry = match beat.query {
                    Some(query) => LogEntry::with_query(now, beat.kind, beat.message, query),
                    None => LogEntry::new(now, beat.kind, beat.message),
                };
                state.log.append(entry);
                match beat.advisory {
                    Some(scenario) => smallvec![insight_effect(state, env, &scenario)],
                    None => smallvec![],
                }
            },

            BookingAction::InsightUpdated(text) => {
                state.insight = text;
                state.insight_loading = false;
                smallvec![]
            },
        }
    }
}
