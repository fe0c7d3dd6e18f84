//! # Codeblue Runtime
//!
//! Runtime for the recorder: the Store that drives a reducer, executes its
//! effects, and feeds effect-produced actions back in.
//!
//! ## Core Components
//!
//! - **Store**: The runtime that manages state and executes effects
//! - **Effect Executor**: Executes effect descriptions and feeds actions back to reducers
//! - **Session Sync**: Last-write-wins replication of session snapshots ([`sync`])
//!
//! The recorder's one-second tick loop lives entirely in this feedback loop:
//! the reducer returns `Effect::Delay(1s, Tick)`, the store sleeps and sends
//! `Tick` back, and the reducer schedules the next one while the session is
//! active.
//!
//! ## Example
//!
//! ```ignore
//! use codeblue_runtime::Store;
//!
//! let store = Store::new(initial_state, my_reducer, environment);
//!
//! // Send an action
//! store.send(Action::DoSomething).await?;
//!
//! // Read state
//! let value = store.state(|s| s.some_field).await;
//! ```

use codeblue_core::{effect::Effect, reducer::Reducer};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{RwLock, broadcast, watch};

/// Session snapshot replication
pub mod sync;

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug)]
    pub enum StoreError {
        /// Store is shutting down and not accepting new actions
        ///
        /// This error is returned when `send()` is called after shutdown initiated.
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out waiting for effects to complete
        ///
        /// Some effects were still running when the timeout elapsed.
        #[error("Shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),

        /// Timeout waiting for terminal action
        ///
        /// Returned by `send_and_wait_for` when the timeout expires before
        /// a matching action is received.
        #[error("Timeout waiting for action")]
        Timeout,

        /// Action broadcast channel closed
        ///
        /// The action broadcast channel was closed, typically because the
        /// store is shutting down.
        #[error("Action broadcast channel closed")]
        ChannelClosed,
    }
}

pub use error::StoreError;

/// Handle for tracking effect completion
///
/// Returned by [`Store::send()`] to allow waiting for the effects of one
/// action to complete. Feedback actions sent by those effects start their
/// own effect chains with their own handles.
///
/// # Example
///
/// ```ignore
/// let mut handle = store.send(Action::Start).await?;
/// handle.wait_with_timeout(Duration::from_secs(5)).await?;
/// ```
#[derive(Clone)]
pub struct EffectHandle {
    effects: Arc<AtomicUsize>,
    completion: watch::Receiver<()>,
}

impl EffectHandle {
    fn new() -> (Self, EffectTracking) {
        let counter = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = watch::channel(());

        let handle = Self {
            effects: Arc::clone(&counter),
            completion: rx,
        };

        let tracking = EffectTracking {
            counter,
            notifier: tx,
        };

        (handle, tracking)
    }

    /// Create a handle that's already complete
    ///
    /// Useful for initialization in loops where you need a `last_handle`.
    #[must_use]
    pub fn completed() -> Self {
        let (tx, rx) = watch::channel(());
        let _ = tx.send(());

        Self {
            effects: Arc::new(AtomicUsize::new(0)),
            completion: rx,
        }
    }

    /// Wait for all effects of the originating action to complete
    pub async fn wait(&mut self) {
        while self.effects.load(Ordering::SeqCst) > 0 {
            let _ = self.completion.changed().await;
        }
    }

    /// Wait for all effects to complete with a timeout
    ///
    /// # Errors
    ///
    /// Returns `Err(())` if the timeout expires before all effects complete.
    pub async fn wait_with_timeout(&mut self, timeout: Duration) -> Result<(), ()> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| ())
    }
}

impl std::fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectHandle")
            .field("pending_effects", &self.effects.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// Internal: effect tracking context passed through effect execution
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

/// Internal: RAII guard that decrements the effect counter on drop
///
/// Ensures the counter is always decremented, even if the effect panics.
struct DecrementGuard(EffectTracking);

impl Drop for DecrementGuard {
    fn drop(&mut self) {
        self.0.decrement();
    }
}

/// Guard that decrements an atomic counter on drop (for shutdown tracking)
struct AtomicCounterGuard(Arc<AtomicUsize>);

impl Drop for AtomicCounterGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// The Store - runtime coordinator for a reducer
///
/// The Store manages:
/// 1. State (behind `RwLock` for concurrent access)
/// 2. Reducer (business logic)
/// 3. Environment (injected dependencies)
/// 4. Effect execution (with feedback loop)
///
/// Concurrent `send()` calls serialize at the reducer: the reducer runs
/// while holding the state write lock, so state transitions are atomic and
/// readers never observe a half-applied action.
///
/// # Type Parameters
///
/// - `S`: State type
/// - `A`: Action type
/// - `E`: Environment type
/// - `R`: Reducer implementation
pub struct Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    state: Arc<RwLock<S>>,
    reducer: R,
    environment: E,
    shutdown: Arc<AtomicBool>,
    pending_effects: Arc<AtomicUsize>,
    /// Every processed action is re-broadcast to observers, which is what
    /// the session replicator subscribes to.
    action_broadcast: broadcast::Sender<A>,
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

impl<S, A, E, R> Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E> + Clone + Send + Sync + 'static,
    A: Send + Clone + 'static,
    S: Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Create a new store with initial state, reducer, and environment
    ///
    /// Default action broadcast capacity is 16; increase with
    /// [`Store::with_broadcast_capacity`] if observers frequently lag.
    #[must_use]
    pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
        Self::with_broadcast_capacity(initial_state, reducer, environment, 16)
    }

    /// Create a new Store with custom action broadcast capacity
    #[must_use]
    pub fn with_broadcast_capacity(
        initial_state: S,
        reducer: R,
        environment: E,
        capacity: usize,
    ) -> Self {
        let (action_broadcast, _) = broadcast::channel(capacity);

        Self {
            state: Arc::new(RwLock::new(initial_state)),
            reducer,
            environment,
            shutdown: Arc::new(AtomicBool::new(false)),
            pending_effects: Arc::new(AtomicUsize::new(0)),
            action_broadcast,
        }
    }

    /// Initiate graceful shutdown of the store
    ///
    /// Sets the shutdown flag (rejecting new actions), then waits for
    /// pending effects to complete. The tick loop drains naturally: the
    /// pending `Delay` fires, its feedback `Tick` is rejected, and no new
    /// delay is scheduled.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] if the timeout expires before
    /// all pending effects complete.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
        tracing::info!("Initiating graceful shutdown");

        self.shutdown.store(true, Ordering::Release);

        let start = std::time::Instant::now();
        let poll_interval = Duration::from_millis(100);

        loop {
            let pending = self.pending_effects.load(Ordering::Acquire);

            if pending == 0 {
                tracing::info!("All effects completed, shutdown successful");
                return Ok(());
            }

            if start.elapsed() >= timeout {
                tracing::error!(
                    pending_effects = pending,
                    "Shutdown timeout: {} effects still running",
                    pending
                );
                return Err(StoreError::ShutdownTimeout(pending));
            }

            tokio::time::sleep(poll_interval).await;
        }
    }

    /// Send an action to the store
    ///
    /// This is the primary way to interact with the store:
    /// 1. Acquires write lock on state
    /// 2. Calls reducer with (state, action, environment)
    /// 3. Executes returned effects asynchronously
    /// 4. Effects may produce more actions (feedback loop)
    ///
    /// `send()` returns after starting effect execution, not completion;
    /// use the returned [`EffectHandle`] to wait.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
    #[tracing::instrument(skip(self, action), name = "store_send")]
    pub async fn send(&self, action: A) -> Result<EffectHandle, StoreError> {
        if self.shutdown.load(Ordering::Acquire) {
            tracing::warn!("Rejected action: store is shutting down");
            return Err(StoreError::ShutdownInProgress);
        }

        tracing::debug!("Processing action");

        let (handle, tracking) = EffectHandle::new();

        let effects = {
            let mut state = self.state.write().await;
            let effects = self
                .reducer
                .reduce(&mut state, action.clone(), &self.environment);
            tracing::trace!("Reducer completed, returned {} effects", effects.len());
            effects
        };

        // Broadcast after the state transition so observers read
        // post-action state.
        let _ = self.action_broadcast.send(action);

        for effect in effects {
            self.execute_effect_internal(effect, tracking.clone());
        }

        Ok(handle)
    }

    /// Send an action and wait for a matching result action
    ///
    /// Designed for request-response patterns: subscribes to the action
    /// broadcast BEFORE sending (avoiding the race), sends the action, then
    /// returns the first subsequent action matching the predicate.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Timeout`]: Timeout expired before matching action received
    /// - [`StoreError::ChannelClosed`]: Action broadcast channel closed
    /// - [`StoreError::ShutdownInProgress`]: Store is shutting down
    pub async fn send_and_wait_for<F>(
        &self,
        action: A,
        predicate: F,
        timeout: Duration,
    ) -> Result<A, StoreError>
    where
        F: Fn(&A) -> bool,
    {
        let mut rx = self.action_broadcast.subscribe();

        self.send(action).await?;

        tokio::time::timeout(timeout, async {
            loop {
                match rx.recv().await {
                    Ok(action) if predicate(&action) => return Ok(action),
                    Ok(_) => {},
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        // Slow consumer; the timeout catches a dropped
                        // terminal action.
                        tracing::warn!(skipped, "Action observer lagged");
                    },
                    Err(broadcast::error::RecvError::Closed) => {
                        return Err(StoreError::ChannelClosed);
                    },
                }
            }
        })
        .await
        .map_err(|_| StoreError::Timeout)?
    }

    /// Subscribe to all actions processed by this store
    ///
    /// Returns a receiver that gets a clone of every action after the
    /// reducer has applied it, in processing order. The session replicator
    /// consumes this to mirror state after each change.
    #[must_use]
    pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
        self.action_broadcast.subscribe()
    }

    /// Read current state via a closure
    ///
    /// Access state through a closure to ensure the lock is released promptly:
    ///
    /// ```ignore
    /// let shocks = store.state(|s| s.shock_count).await;
    /// ```
    pub async fn state<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&S) -> T,
    {
        let state = self.state.read().await;
        f(&state)
    }

    /// Execute an effect with tracking
    ///
    /// Effects are fire-and-forget: a failed or panicking effect is logged
    /// and the counter still decrements via [`DecrementGuard`]. Reducer
    /// panics, in contrast, propagate and halt the store.
    fn execute_effect_internal(&self, effect: Effect<A>, tracking: EffectTracking) {
        match effect {
            Effect::None => {
                tracing::trace!("Executing Effect::None (no-op)");
            },
            Effect::Future(fut) => {
                tracing::trace!("Executing Effect::Future");
                tracking.increment();

                self.pending_effects.fetch_add(1, Ordering::SeqCst);
                let pending_guard = AtomicCounterGuard(Arc::clone(&self.pending_effects));

                let tracking_clone = tracking.clone();
                let store = self.clone();

                tokio::spawn(async move {
                    let _guard = DecrementGuard(tracking_clone);
                    let _pending_guard = pending_guard;

                    if let Some(action) = fut.await {
                        tracing::trace!("Effect::Future produced an action, sending to store");
                        let _ = store.send(action).await;
                    }
                });
            },
            Effect::Delay { duration, action } => {
                tracing::trace!("Executing Effect::Delay (duration: {:?})", duration);
                tracking.increment();

                self.pending_effects.fetch_add(1, Ordering::SeqCst);
                let pending_guard = AtomicCounterGuard(Arc::clone(&self.pending_effects));

                let tracking_clone = tracking.clone();
                let store = self.clone();

                tokio::spawn(async move {
                    let _guard = DecrementGuard(tracking_clone);
                    let _pending_guard = pending_guard;

                    tokio::time::sleep(duration).await;
                    tracing::trace!("Effect::Delay completed, sending action");

                    let _ = store.send(*action).await;
                });
            },
            Effect::Parallel(effects) => {
                tracing::trace!("Executing Effect::Parallel with {} effects", effects.len());
                for effect in effects {
                    self.execute_effect_internal(effect, tracking.clone());
                }
            },
            Effect::Sequential(effects) => {
                let effect_count = effects.len();
                tracing::trace!("Executing Effect::Sequential with {} effects", effect_count);

                tracking.increment();

                self.pending_effects.fetch_add(1, Ordering::SeqCst);
                let pending_guard = AtomicCounterGuard(Arc::clone(&self.pending_effects));

                let tracking_clone = tracking.clone();
                let store = self.clone();

                tokio::spawn(async move {
                    let _guard = DecrementGuard(tracking_clone);
                    let _pending_guard = pending_guard;

                    for (idx, effect) in effects.into_iter().enumerate() {
                        tracing::trace!(
                            "Executing sequential effect {} of {}",
                            idx + 1,
                            effect_count
                        );

                        let (sub_tx, mut sub_rx) = watch::channel(());
                        let sub_tracking = EffectTracking {
                            counter: Arc::new(AtomicUsize::new(0)),
                            notifier: sub_tx,
                        };

                        store.execute_effect_internal(effect, sub_tracking.clone());

                        // Wait for this effect to complete before continuing
                        if sub_tracking.counter.load(Ordering::SeqCst) > 0 {
                            let _ = sub_rx.changed().await;
                        }
                    }
                    tracing::trace!("Effect::Sequential completed");
                });
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codeblue_core::smallvec;

    #[derive(Clone, Debug, Default)]
    struct TickState {
        active: bool,
        ticks: u32,
    }

    #[derive(Clone, Debug, PartialEq)]
    enum TickAction {
        Start,
        Stop,
        Tick,
    }

    #[derive(Clone)]
    struct TickReducer;

    #[derive(Clone)]
    struct NoEnv;

    impl Reducer for TickReducer {
        type State = TickState;
        type Action = TickAction;
        type Environment = NoEnv;

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            _env: &Self::Environment,
        ) -> codeblue_core::effect::Effects<Self::Action> {
            match action {
                TickAction::Start => {
                    state.active = true;
                    smallvec![Effect::delay(Duration::from_secs(1), TickAction::Tick)]
                },
                TickAction::Stop => {
                    state.active = false;
                    smallvec![]
                },
                TickAction::Tick => {
                    if !state.active {
                        return smallvec![];
                    }
                    state.ticks += 1;
                    smallvec![Effect::delay(Duration::from_secs(1), TickAction::Tick)]
                },
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn tick_loop_advances_once_per_second() {
        let store = Store::new(TickState::default(), TickReducer, NoEnv);
        store.send(TickAction::Start).await.unwrap();

        tokio::time::sleep(Duration::from_millis(3500)).await;

        let ticks = store.state(|s| s.ticks).await;
        assert_eq!(ticks, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn tick_loop_suspends_after_stop() {
        let store = Store::new(TickState::default(), TickReducer, NoEnv);
        store.send(TickAction::Start).await.unwrap();

        tokio::time::sleep(Duration::from_millis(2500)).await;
        store.send(TickAction::Stop).await.unwrap();

        let ticks_at_stop = store.state(|s| s.ticks).await;
        tokio::time::sleep(Duration::from_secs(5)).await;

        let ticks = store.state(|s| s.ticks).await;
        assert_eq!(ticks, ticks_at_stop);
    }

    #[tokio::test(start_paused = true)]
    async fn send_is_rejected_after_shutdown() {
        let store = Store::new(TickState::default(), TickReducer, NoEnv);
        store.send(TickAction::Stop).await.unwrap();

        store.shutdown(Duration::from_secs(1)).await.unwrap();

        let result = store.send(TickAction::Start).await;
        assert!(matches!(result, Err(StoreError::ShutdownInProgress)));
    }

    #[tokio::test(start_paused = true)]
    async fn subscribers_observe_processed_actions() {
        let store = Store::new(TickState::default(), TickReducer, NoEnv);
        let mut rx = store.subscribe_actions();

        store.send(TickAction::Start).await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), TickAction::Start);

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(rx.recv().await.unwrap(), TickAction::Tick);
    }

    #[tokio::test]
    async fn effect_handle_waits_for_future_effects() {
        #[derive(Clone)]
        struct FutureReducer;

        impl Reducer for FutureReducer {
            type State = TickState;
            type Action = TickAction;
            type Environment = NoEnv;

            fn reduce(
                &self,
                state: &mut Self::State,
                action: Self::Action,
                _env: &Self::Environment,
            ) -> codeblue_core::effect::Effects<Self::Action> {
                match action {
                    TickAction::Start => smallvec![Effect::Future(Box::pin(async {
                        Some(TickAction::Tick)
                    }))],
                    TickAction::Tick => {
                        state.ticks += 1;
                        smallvec![]
                    },
                    TickAction::Stop => smallvec![],
                }
            }
        }

        let store = Store::new(TickState::default(), FutureReducer, NoEnv);
        let mut handle = store.send(TickAction::Start).await.unwrap();
        handle
            .wait_with_timeout(Duration::from_secs(5))
            .await
            .unwrap();
    }
}
