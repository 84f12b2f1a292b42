//! Side-effect descriptions.
//!
//! Effects are values, not executions: reducers return them and the
//! [`Store`](crate::runtime::store::Store) runs them. An effect may produce a
//! follow-up action, which the store feeds back into the reducer; that
//! feedback loop is how latency-then-mutate operations are split into a
//! command phase and an atomic completion phase.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// A description of a side effect to be executed by the store.
pub enum Effect<Action> {
    /// No side effect.
    None,
    /// Run the contained effects concurrently.
    Parallel(Vec<Effect<Action>>),
    /// Run the contained effects in order, waiting for each to finish.
    Sequential(Vec<Effect<Action>>),
    /// Dispatch an action after a fixed delay.
    Delay {
        /// How long to wait.
        duration: Duration,
        /// Action dispatched once the delay elapses.
        action: Box<Action>,
    },
    /// An arbitrary async computation; a `Some` result is dispatched back
    /// into the reducer.
    Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),
}

impl<Action> Effect<Action> {
    /// Combines effects to run concurrently.
    #[must_use]
    pub const fn merge(effects: Vec<Effect<Action>>) -> Effect<Action> {
        Effect::Parallel(effects)
    }

    /// Chains effects to run one after another.
    #[must_use]
    pub const fn chain(effects: Vec<Effect<Action>>) -> Effect<Action> {
        Effect::Sequential(effects)
    }
}

// Manual Debug since boxed futures are opaque.
impl<Action: std::fmt::Debug> std::fmt::Debug for Effect<Action> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Effect::None => write!(f, "Effect::None"),
            Effect::Parallel(effects) => f.debug_tuple("Effect::Parallel").field(effects).finish(),
            Effect::Sequential(effects) => {
                f.debug_tuple("Effect::Sequential").field(effects).finish()
            },
            Effect::Delay { duration, action } => f
                .debug_struct("Effect::Delay")
                .field("duration", duration)
                .field("action", action)
                .finish(),
            Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
        }
    }
}
