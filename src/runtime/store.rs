//! The store runtime: serialized reducer execution plus async effect
//! execution with an action feedback loop.

use super::effect::Effect;
use super::reducer::Reducer;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{RwLock, broadcast, watch};

/// Errors produced by store operations.
///
/// Domain failures are ordinary state values, never `StoreError`; this type
/// only covers the runtime itself.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store is shutting down and rejecting new actions.
    #[error("store is shutting down")]
    ShutdownInProgress,

    /// Shutdown timed out with effects still running.
    #[error("shutdown timed out with {0} effects still running")]
    ShutdownTimeout(usize),

    /// Timed out waiting for an action's effects to complete.
    #[error("timed out waiting for effects to complete")]
    EffectTimeout,
}

/// Shared completion tracking between a handle and its effect tasks.
#[derive(Clone)]
struct EffectTracking {
    counter: Arc<AtomicUsize>,
    notifier: watch::Sender<()>,
}

impl EffectTracking {
    fn increment(&self) {
        self.counter.fetch_add(1, Ordering::SeqCst);
    }

    fn decrement(&self) {
        if self.counter.fetch_sub(1, Ordering::SeqCst) == 1 {
            let _ = self.notifier.send(());
        }
    }
}

/// Decrements tracking on drop so panicking effect tasks still settle.
struct DecrementGuard(EffectTracking);

impl Drop for DecrementGuard {
    fn drop(&mut self) {
        self.0.decrement();
    }
}

/// Decrements the store-wide pending-effect counter on drop.
struct PendingGuard(Arc<AtomicUsize>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Handle returned from [`Store::send`], used to wait for the action's
/// effects (including fed-back completion actions) to finish.
#[derive(Debug)]
pub struct EffectHandle {
    counter: Arc<AtomicUsize>,
    receiver: watch::Receiver<()>,
}

impl EffectHandle {
    fn new() -> (Self, EffectTracking) {
        let (notifier, receiver) = watch::channel(());
        let counter = Arc::new(AtomicUsize::new(0));
        (
            Self {
                counter: Arc::clone(&counter),
                receiver,
            },
            EffectTracking { counter, notifier },
        )
    }

    /// Waits until every tracked effect of the originating action finished.
    ///
    /// Returns immediately when the action produced no async effects.
    pub async fn wait(mut self) {
        while self.counter.load(Ordering::SeqCst) > 0 {
            if self.receiver.changed().await.is_err() {
                break;
            }
        }
    }

    /// [`wait`](Self::wait) bounded by a timeout.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::EffectTimeout`] if effects are still running
    /// when the timeout elapses.
    pub async fn wait_with_timeout(self, timeout: Duration) -> Result<(), StoreError> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| StoreError::EffectTimeout)
    }
}

/// The runtime that owns state, runs the reducer, and executes effects.
///
/// Reducer execution is serialized behind a write lock: no two reductions
/// ever interleave, which gives every operation's check-then-mutate sequence
/// the atomicity the lock manager relies on. Effects run as spawned tasks
/// and may feed actions back via [`Store::send`].
pub struct Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    state: Arc<RwLock<S>>,
    reducer: R,
    environment: E,
    shutdown: Arc<AtomicBool>,
    pending_effects: Arc<AtomicUsize>,
    /// Every action produced by an effect is broadcast to observers before
    /// being fed back, enabling request-response waits in callers and tests.
    action_broadcast: broadcast::Sender<A>,
}

impl<S, A, E, R> Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E> + Clone + Send + Sync + 'static,
    A: Clone + Send + 'static,
    S: Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Creates a store from initial state, reducer, and environment.
    #[must_use]
    pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
        let (action_broadcast, _) = broadcast::channel(64);
        Self {
            state: Arc::new(RwLock::new(initial_state)),
            reducer,
            environment,
            shutdown: Arc::new(AtomicBool::new(false)),
            pending_effects: Arc::new(AtomicUsize::new(0)),
            action_broadcast,
        }
    }

    /// Sends an action: runs the reducer under the write lock, then starts
    /// executing the returned effects.
    ///
    /// Returns after the reduction committed; effects may still be running.
    /// Use the returned [`EffectHandle`] to wait for them.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] once shutdown started.
    #[tracing::instrument(skip(self, action), name = "store_send")]
    pub async fn send(&self, action: A) -> Result<EffectHandle, StoreError> {
        if self.shutdown.load(Ordering::Acquire) {
            tracing::warn!("rejected action: store is shutting down");
            return Err(StoreError::ShutdownInProgress);
        }

        metrics::counter!("store.actions.total").increment(1);
        let (handle, tracking) = EffectHandle::new();

        let effects = {
            let mut state = self.state.write().await;
            let start = std::time::Instant::now();
            let effects = self.reducer.reduce(&mut state, action, &self.environment);
            metrics::histogram!("store.reducer.duration_seconds")
                .record(start.elapsed().as_secs_f64());
            effects
        };

        tracing::trace!(count = effects.len(), "executing effects");
        #[allow(clippy::cast_precision_loss)]
        metrics::histogram!("store.effects.count").record(effects.len() as f64);

        for effect in effects {
            self.execute_effect(effect, tracking.clone());
        }

        Ok(handle)
    }

    /// Reads current state through a closure, releasing the lock promptly.
    pub async fn state<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&S) -> T,
    {
        let state = self.state.read().await;
        f(&state)
    }

    /// Subscribes to every action produced by effects.
    #[must_use]
    pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
        self.action_broadcast.subscribe()
    }

    /// Initiates graceful shutdown: rejects new actions, then waits for
    /// pending effects to drain.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] if effects are still running
    /// when the timeout expires.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
        tracing::info!("initiating graceful shutdown");
        self.shutdown.store(true, Ordering::Release);

        let start = std::time::Instant::now();
        let poll_interval = Duration::from_millis(25);
        loop {
            let pending = self.pending_effects.load(Ordering::Acquire);
            if pending == 0 {
                return Ok(());
            }
            if start.elapsed() >= timeout {
                tracing::error!(pending, "shutdown timed out with effects running");
                return Err(StoreError::ShutdownTimeout(pending));
            }
            tokio::time::sleep(poll_interval).await;
        }
    }

    /// Executes one effect, tracking completion through `tracking`.
    ///
    /// Feedback actions produced by `Future`/`Delay` effects are broadcast
    /// and re-sent; the tracking guard drops only after the feedback
    /// reduction committed, so `EffectHandle::wait` observes the mutation.
    fn execute_effect(&self, effect: Effect<A>, tracking: EffectTracking) {
        match effect {
            Effect::None => {
                metrics::counter!("store.effects.executed", "type" => "none").increment(1);
            },
            Effect::Future(fut) => {
                metrics::counter!("store.effects.executed", "type" => "future").increment(1);
                tracking.increment();
                self.pending_effects.fetch_add(1, Ordering::SeqCst);
                let pending_guard = PendingGuard(Arc::clone(&self.pending_effects));
                let store = self.clone();
                tokio::spawn(async move {
                    let _guard = DecrementGuard(tracking);
                    let _pending = pending_guard;
                    if let Some(action) = fut.await {
                        let _ = store.action_broadcast.send(action.clone());
                        let _ = store.send(action).await;
                    }
                });
            },
            Effect::Delay { duration, action } => {
                metrics::counter!("store.effects.executed", "type" => "delay").increment(1);
                tracking.increment();
                self.pending_effects.fetch_add(1, Ordering::SeqCst);
                let pending_guard = PendingGuard(Arc::clone(&self.pending_effects));
                let store = self.clone();
                tokio::spawn(async move {
                    let _guard = DecrementGuard(tracking);
                    let _pending = pending_guard;
                    tokio::time::sleep(duration).await;
                    let _ = store.action_broadcast.send((*action).clone());
                    let _ = store.send(*action).await;
                });
            },
            Effect::Parallel(effects) => {
                metrics::counter!("store.effects.executed", "type" => "parallel").increment(1);
                for effect in effects {
                    self.execute_effect(effect, tracking.clone());
                }
            },
            Effect::Sequential(effects) => {
                metrics::counter!("store.effects.executed", "type" => "sequential").increment(1);
                tracking.increment();
                self.pending_effects.fetch_add(1, Ordering::SeqCst);
                let pending_guard = PendingGuard(Arc::clone(&self.pending_effects));
                let store = self.clone();
                tokio::spawn(async move {
                    let _guard = DecrementGuard(tracking);
                    let _pending = pending_guard;
                    for effect in effects {
                        let (sub_handle, sub_tracking) = EffectHandle::new();
                        store.execute_effect(effect, sub_tracking);
                        sub_handle.wait().await;
                    }
                });
            },
        }
    }
}

impl<S, A, E, R> Clone for Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E> + Clone,
    E: Clone,
{
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            reducer: self.reducer.clone(),
            environment: self.environment.clone(),
            shutdown: Arc::clone(&self.shutdown),
            pending_effects: Arc::clone(&self.pending_effects),
            action_broadcast: self.action_broadcast.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::{SmallVec, smallvec};
    use tokio_test::{assert_err, assert_ok};

    #[derive(Debug, Clone, Default)]
    struct TallyState {
        direct: u64,
        via_effect: u64,
    }

    #[derive(Debug, Clone)]
    enum TallyAction {
        Bump,
        BumpLater,
        BumpedLater,
    }

    #[derive(Clone, Copy)]
    struct TallyReducer;

    impl Reducer for TallyReducer {
        type State = TallyState;
        type Action = TallyAction;
        type Environment = ();

        fn reduce(
            &self,
            state: &mut TallyState,
            action: TallyAction,
            _env: &(),
        ) -> SmallVec<[Effect<TallyAction>; 4]> {
            match action {
                TallyAction::Bump => {
                    state.direct += 1;
                    smallvec![Effect::None]
                },
                TallyAction::BumpLater => {
                    smallvec![Effect::Future(Box::pin(async {
                        Some(TallyAction::BumpedLater)
                    }))]
                },
                TallyAction::BumpedLater => {
                    state.via_effect += 1;
                    smallvec![Effect::None]
                },
            }
        }
    }

    fn tally_store() -> Store<TallyState, TallyAction, (), TallyReducer> {
        Store::new(TallyState::default(), TallyReducer, ())
    }

    #[tokio::test]
    async fn send_applies_reduction_synchronously() {
        let store = tally_store();
        assert_ok!(store.send(TallyAction::Bump).await);
        assert_eq!(store.state(|s| s.direct).await, 1);
    }

    #[tokio::test]
    async fn handle_wait_covers_feedback_reduction() {
        let store = tally_store();
        let handle = assert_ok!(store.send(TallyAction::BumpLater).await);
        handle.wait().await;
        assert_eq!(store.state(|s| s.via_effect).await, 1);
    }

    #[tokio::test]
    async fn effect_actions_are_broadcast() {
        let store = tally_store();
        let mut actions = store.subscribe_actions();
        let handle = assert_ok!(store.send(TallyAction::BumpLater).await);
        handle.wait().await;
        assert!(matches!(actions.try_recv(), Ok(TallyAction::BumpedLater)));
    }

    #[tokio::test]
    async fn shutdown_rejects_new_actions() {
        let store = tally_store();
        assert_ok!(store.shutdown(Duration::from_secs(1)).await);
        let rejected = assert_err!(store.send(TallyAction::Bump).await);
        assert!(matches!(rejected, StoreError::ShutdownInProgress));
    }

    #[tokio::test]
    async fn concurrent_sends_serialize_at_the_reducer() {
        let store = tally_store();
        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move {
                    let _ = store.send(TallyAction::Bump).await;
                })
            })
            .collect();
        for task in tasks {
            assert!(task.await.is_ok());
        }
        assert_eq!(store.state(|s| s.direct).await, 16);
    }
}
