//! Minimal reducer/effect/store runtime.
//!
//! The simulator follows the composable pattern: domain logic lives in a pure
//! [`Reducer`](reducer::Reducer) over an owned state, side effects are
//! described as [`Effect`](effect::Effect) values, and the
//! [`Store`](store::Store) executes them on tokio, feeding resulting actions
//! back into the reducer. The store serializes reducer execution, which is
//! what makes each operation's check-then-mutate sequence atomic.

pub mod effect;
pub mod environment;
pub mod reducer;
pub mod store;

pub use effect::Effect;
pub use environment::{Clock, SystemClock};
pub use reducer::Reducer;
pub use store::{EffectHandle, Store, StoreError};
