//! # Codeblue Core
//!
//! Core traits and types for the codeblue resuscitation recorder.
//!
//! This crate provides the fundamental abstractions the recorder is built on:
//! a single pure transition function per feature, with side effects described
//! as values and executed by the runtime.
//!
//! ## Core Concepts
//!
//! - **State**: Owned domain state for a feature (the session being recorded)
//! - **Action**: Closed tagged union of every possible input to a reducer
//! - **Reducer**: Pure function `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: Side effect descriptions (not execution)
//! - **Environment**: Injected dependencies via traits (the wall clock)
//!
//! ## Architecture Principles
//!
//! - Functional Core, Imperative Shell
//! - Unidirectional Data Flow
//! - Explicit Effects (no hidden I/O)
//! - Dependency Injection via Environment
//!
//! Timestamp capture is the only non-determinism a reducer is allowed, and it
//! is injected through [`environment::Clock`] so tests stay reproducible:
//! same (state, action, clock reading) ⇒ same output.

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{SmallVec, smallvec};

/// Reducer module - the core trait for business logic
///
/// Reducers contain all state mutation. They are deterministic, synchronous,
/// and total: every action produces a next state, and invalid actions leave
/// the state unchanged rather than failing.
pub mod reducer {
    use super::effect::{Effect, Effects};

    /// The Reducer trait - core abstraction for business logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The domain state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    ///
    /// # Example
    ///
    /// ```ignore
    /// impl Reducer for SessionReducer {
    ///     type State = SessionState;
    ///     type Action = SessionAction;
    ///     type Environment = SessionEnvironment;
    ///
    ///     fn reduce(
    ///         &self,
    ///         state: &mut SessionState,
    ///         action: SessionAction,
    ///         env: &SessionEnvironment,
    ///     ) -> Effects<SessionAction> {
    ///         match action {
    ///             SessionAction::Tick => { /* ... */ smallvec![] }
    ///             _ => smallvec![],
    ///         }
    ///     }
    /// }
    /// ```
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// This is a pure function that:
        /// 1. Validates the action (invalid actions are silent no-ops)
        /// 2. Updates state in place
        /// 3. Returns effect descriptions to be executed by the runtime
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> Effects<Self::Action>;

        /// Convenience for tests and scripted drivers: apply a whole sequence
        /// of actions, discarding effects.
        fn reduce_all(
            &self,
            state: &mut Self::State,
            actions: impl IntoIterator<Item = Self::Action>,
            env: &Self::Environment,
        ) {
            for action in actions {
                let _: Effects<Self::Action> = self.reduce(state, action, env);
            }
        }

        /// Apply one action and discard effects, for callers that only care
        /// about the state transition.
        fn apply(&self, state: &mut Self::State, action: Self::Action, env: &Self::Environment) {
            let _: Effects<Self::Action> = self.reduce(state, action, env);
        }
    }
}

/// Effect module - side effect descriptions
///
/// Effects are values returned from reducers and executed by the Store
/// runtime. They are composable and may feed actions back into the reducer
/// (the tick loop of the recorder is built on exactly this feedback).
pub mod effect {
    use std::future::Future;
    use std::pin::Pin;
    use std::time::Duration;

    /// The inline-capacity effect vector returned by reducers.
    ///
    /// Most transitions return zero or one effect; four slots keeps the
    /// common case off the heap.
    pub type Effects<Action> = smallvec::SmallVec<[Effect<Action>; 4]>;

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are NOT executed immediately. They are descriptions of what
    /// should happen, returned from reducers and executed by the Store.
    #[allow(missing_docs)]
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Run effects in parallel
        Parallel(Vec<Effect<Action>>),

        /// Run effects sequentially
        Sequential(Vec<Effect<Action>>),

        /// Delayed action (drives the one-second tick loop)
        Delay {
            /// How long to wait
            duration: Duration,
            /// Action to dispatch after the delay
            action: Box<Action>,
        },

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if Some, the action is fed back into
        /// the reducer
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),
    }

    impl<Action> Effect<Action> {
        /// Schedule `action` after `duration`
        pub fn delay(duration: Duration, action: Action) -> Self {
            Effect::Delay {
                duration,
                action: Box::new(action),
            }
        }

        /// Combine effects to run in parallel
        #[must_use]
        pub const fn merge(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Parallel(effects)
        }

        /// Chain effects to run sequentially
        #[must_use]
        pub const fn chain(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Sequential(effects)
        }
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Parallel(effects) => {
                    f.debug_tuple("Effect::Parallel").field(effects).finish()
                },
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
}

/// Environment module - dependency injection traits
///
/// All external dependencies are abstracted behind traits and injected via
/// the Environment parameter. The recorder needs exactly one: the wall
/// clock, which stamps log entries and gates the medication debounce.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// The session reducer keeps two clocks distinct: the simulated elapsed
    /// clock (advanced one second per `Tick`) and this wall clock (entry
    /// timestamps, debounce). Only the wall clock is injected.
    pub trait Clock: Send + Sync {
        /// Get the current wall-clock time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::effect::Effect;
    use std::time::Duration;

    #[test]
    fn delay_effect_debug_is_readable() {
        let effect = Effect::delay(Duration::from_secs(1), "tick");
        let debug = format!("{effect:?}");
        assert!(debug.contains("Effect::Delay"));
        assert!(debug.contains("tick"));
    }

    #[test]
    fn future_effect_resolves_to_an_action() {
        let effect: Effect<&str> = Effect::Future(Box::pin(async { Some("tick") }));
        match effect {
            Effect::Future(fut) => assert_eq!(tokio_test::block_on(fut), Some("tick")),
            other => panic!("expected a Future effect, got {other:?}"),
        }
    }

    #[test]
    fn merge_and_chain_wrap_variants() {
        let merged: Effect<&str> = Effect::merge(vec![Effect::None, Effect::None]);
        assert!(matches!(merged, Effect::Parallel(ref v) if v.len() == 2));

        let chained: Effect<&str> = Effect::chain(vec![Effect::None]);
        assert!(matches!(chained, Effect::Sequential(ref v) if v.len() == 1));
    }
}
