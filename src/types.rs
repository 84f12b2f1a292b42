//! Domain types for the CineLock seat-reservation simulator.
//!
//! Value objects and entities shared across the lock manager, actors, and
//! catalog. Seats carry their lock ownership inside [`SeatStatus::Locked`],
//! so a seat can never hold an owner without an acquisition instant (or vice
//! versa).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Identity of a single seat: auditorium row and seat number.
///
/// Seat identity is fixed at inventory construction and never changes; the
/// derived ordering (row-major, then by number) is the display order of the
/// seat grid.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct SeatId {
    row: char,
    number: u8,
}

impl SeatId {
    /// Creates a seat id from a row letter and a 1-based seat number.
    #[must_use]
    pub const fn new(row: char, number: u8) -> Self {
        Self { row, number }
    }

    /// The row letter (`'A'..='H'` in the default layout).
    #[must_use]
    pub const fn row(&self) -> char {
        self.row
    }

    /// The 1-based seat number within the row.
    #[must_use]
    pub const fn number(&self) -> u8 {
        self.number
    }
}

impl fmt::Display for SeatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.row, self.number)
    }
}

/// Error returned when parsing a seat id from text fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid seat id {input:?}: expected a row letter followed by a seat number")]
pub struct ParseSeatIdError {
    /// The rejected input.
    pub input: String,
}

impl FromStr for SeatId {
    type Err = ParseSeatIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let row = chars.next().filter(char::is_ascii_uppercase);
        let number = chars.as_str().parse::<u8>().ok().filter(|n| *n > 0);
        match (row, number) {
            (Some(row), Some(number)) => Ok(Self { row, number }),
            _ => Err(ParseSeatIdError {
                input: s.to_string(),
            }),
        }
    }
}

/// Identity of a lock requester (the primary user session or a bot session).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequesterId(String);

impl RequesterId {
    /// Creates a requester id from an explicit identity string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh ephemeral bot identity (`u-bot-<fragment>`).
    #[must_use]
    pub fn bot() -> Self {
        let fragment: String = Uuid::new_v4().simple().to_string().chars().take(5).collect();
        Self(format!("u-bot-{fragment}"))
    }

    /// Whether this identity was generated for a bot session.
    #[must_use]
    pub fn is_bot(&self) -> bool {
        self.0.starts_with("u-bot-")
    }

    /// The identity as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequesterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Seats
// ============================================================================

/// Lifecycle state of a seat.
///
/// `AVAILABLE --acquire--> LOCKED --commit--> BOOKED` (terminal);
/// `LOCKED --reclaim or release--> AVAILABLE`. The lock owner and acquisition
/// instant live inside the `Locked` variant, making "owner and instant are
/// both present iff the seat is locked" true by construction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeatStatus {
    /// Free for acquisition.
    Available,
    /// Exclusively claimed by one requester, pending commit or expiry.
    Locked {
        /// The requester holding the lock.
        by: RequesterId,
        /// When the lock was acquired.
        at: DateTime<Utc>,
    },
    /// Permanently booked; no outgoing transition.
    Booked,
}

impl SeatStatus {
    /// Whether the seat can be acquired.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }

    /// Whether the seat is currently locked (by anyone).
    #[must_use]
    pub const fn is_locked(&self) -> bool {
        matches!(self, Self::Locked { .. })
    }

    /// Whether the seat is booked.
    #[must_use]
    pub const fn is_booked(&self) -> bool {
        matches!(self, Self::Booked)
    }
}

/// A single seat record in the inventory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seat {
    /// Fixed identity (row + number).
    pub id: SeatId,
    /// Current lifecycle state.
    pub status: SeatStatus,
}

impl Seat {
    /// Creates a fresh, available seat.
    #[must_use]
    pub const fn available(id: SeatId) -> Self {
        Self {
            id,
            status: SeatStatus::Available,
        }
    }

    /// The requester holding this seat's lock, if any.
    #[must_use]
    pub fn locked_by(&self) -> Option<&RequesterId> {
        match &self.status {
            SeatStatus::Locked { by, .. } => Some(by),
            _ => None,
        }
    }

    /// When this seat's lock was acquired, if it is locked.
    #[must_use]
    pub fn locked_at(&self) -> Option<DateTime<Utc>> {
        match &self.status {
            SeatStatus::Locked { at, .. } => Some(*at),
            _ => None,
        }
    }
}

// ============================================================================
// Catalog entities
// ============================================================================

/// A movie offered by the catalog provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movie {
    /// Catalog identifier (e.g. `m1`).
    pub id: String,
    /// Display title.
    pub title: String,
    /// Genre description.
    pub genre: String,
    /// Running time as display text.
    pub duration: String,
    /// Aggregate rating as display text.
    pub rating: String,
}

/// A scheduled showing of a movie.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Show {
    /// Catalog identifier (e.g. `s1`).
    pub id: String,
    /// The movie this show screens.
    pub movie_id: String,
    /// Start time as display text.
    pub time: String,
    /// Theater name.
    pub theater: String,
    /// Ticket price in whole currency units.
    pub price: u32,
}

// ============================================================================
// Sessions
// ============================================================================

/// The stable identity of the primary actor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSession {
    /// Requester identity used for all of this session's lock operations.
    pub user_id: RequesterId,
    /// Display name.
    pub user_name: String,
}

impl UserSession {
    /// The primary user session the simulator runs under.
    #[must_use]
    pub fn main() -> Self {
        Self {
            user_id: RequesterId::new("u-current"),
            user_name: "Main User".to_string(),
        }
    }
}
