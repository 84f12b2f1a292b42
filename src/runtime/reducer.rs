//! The reducer trait: pure business logic.

use super::effect::Effect;
use smallvec::SmallVec;

/// Core abstraction for business logic: `(State, Action, Environment) →
/// effects`, mutating state in place.
///
/// Reducers must be deterministic given their inputs; all I/O goes through
/// returned [`Effect`]s, and all ambient inputs (time, randomness, external
/// services) come in through the environment.
pub trait Reducer {
    /// The state this reducer operates on.
    type State;
    /// The actions this reducer processes.
    type Action;
    /// Injected dependencies.
    type Environment;

    /// Validates the action, updates state in place, and returns effect
    /// descriptions for the store to execute.
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]>;
}
