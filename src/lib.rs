//! CineLock: a seat-reservation lock lifecycle simulator.
//!
//! Seats move between available, time-bounded locked, and permanently booked
//! states, subject to conflict detection, automatic lock expiry, and
//! illustrative concurrency hazards (parallel acquisition, deadlock). The
//! core is the seat lock state machine in [`booking`], built as a reducer
//! over owned state and driven through the [`runtime`] store; the
//! [`scheduler`] reclaims expired locks on a fixed period, and [`actors`]
//! exercise concurrent scenarios against the same store.
//!
//! Nothing here persists: the whole simulation is in-process state plus a
//! bounded [`event_log`].

pub mod actors;
pub mod booking;
pub mod catalog;
pub mod config;
pub mod event_log;
pub mod insight;
pub mod runtime;
pub mod scheduler;
pub mod testing;
pub mod types;

pub use booking::{
    BookingAction, BookingEnvironment, BookingFailure, BookingReducer, BookingState, BookingStore,
};
pub use catalog::Catalog;
pub use config::Config;
pub use scheduler::ExpiryScheduler;
pub use types::{RequesterId, Seat, SeatId, SeatStatus, UserSession};
