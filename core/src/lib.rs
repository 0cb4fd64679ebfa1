//! # Loadstate Core
//!
//! Core traits and types for request-tracked entity caches.
//!
//! This crate provides the pieces a feature needs to keep a normalized
//! collection of entities next to the lifecycle of the asynchronous operations
//! that load and mutate it.
//!
//! ## Core Concepts
//!
//! - **Entity Store**: keyed collection with insertion order, bulk upsert and partial update
//! - **Request Registry**: one status slot per operation name
//! - **Lifecycle**: `Pending`, `Fulfilled` or `Rejected` event for a named operation
//! - **Signal**: string-typed lifecycle event from an external transport, classified by suffix
//! - **Coordination**: policies that decide whether an operation should be started
//! - **Reducer**: pure function `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: side effect descriptions, executed by the runtime
//!
//! ## Example
//!
//! ```
//! use loadstate_core::cache::EntityCache;
//! use loadstate_core::entity::Entity;
//! use loadstate_core::request::OperationName;
//!
//! #[derive(Clone, Debug, PartialEq)]
//! struct Team {
//!     id: String,
//!     name: String,
//! }
//!
//! impl Entity for Team {
//!     type Id = String;
//!     type Patch = Team;
//!
//!     fn id(&self) -> &String {
//!         &self.id
//!     }
//!
//!     fn apply_patch(&mut self, patch: Team) {
//!         *self = patch;
//!     }
//! }
//!
//! let fetch_all = OperationName::new("teams/fetchAll");
//! let mut cache: EntityCache<Team, String> = EntityCache::new();
//!
//! cache.requests.start(fetch_all.clone());
//! assert!(cache.status(&fetch_all).pending);
//!
//! cache.requests.fulfill(fetch_all.clone());
//! cache.entities.upsert_many(vec![Team { id: "a".into(), name: "Team A".into() }]);
//!
//! assert_eq!(cache.all().len(), 1);
//! assert!(!cache.status(&fetch_all).pending);
//! ```

// Re-export commonly used types
pub use serde::{Deserialize, Serialize};
pub use smallvec::{smallvec, SmallVec};

/// Combined entity store and request registry for one feature
pub mod cache;

/// Policies deciding whether an operation should be started
pub mod coordination;

/// Declarative macros for effect construction
pub mod effect_macros;

/// Normalized entity storage
pub mod entity;

/// Error types
pub mod error;

/// Operation names, lifecycle events and the request registry
pub mod request;

/// String-typed lifecycle signals and their classifier
pub mod signal;

/// Reducer module - The core trait for business logic
///
/// Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`
///
/// They contain all business logic and are deterministic and testable.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

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
    /// impl Reducer for PluginsReducer {
    ///     type State = PluginsState;
    ///     type Action = PluginsAction;
    ///     type Environment = PluginsEnvironment;
    ///
    ///     fn reduce(
    ///         &self,
    ///         state: &mut PluginsState,
    ///         action: PluginsAction,
    ///         env: &PluginsEnvironment,
    ///     ) -> SmallVec<[Effect<PluginsAction>; 4]> {
    ///         match action {
    ///             PluginsAction::FetchAll => {
    ///                 // Coordination and lifecycle bookkeeping here
    ///                 SmallVec::new()
    ///             }
    ///             _ => SmallVec::new(),
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
        /// 1. Updates state in place
        /// 2. Returns effect descriptions to be executed
        ///
        /// # Arguments
        ///
        /// - `state`: Mutable reference to current state
        /// - `action`: The action to process
        /// - `env`: Reference to injected dependencies
        ///
        /// # Returns
        ///
        /// Effects to be executed by the runtime
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - Side effect descriptions
///
/// Effects describe side effects to be performed by the runtime.
/// They are values (not execution) and are composable.
pub mod effect {
    use crate::request::{Lifecycle, OperationName, RequestEvent};
    use std::future::Future;
    use std::pin::Pin;
    use std::time::Duration;

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are NOT executed immediately. They are descriptions of what should happen,
    /// returned from reducers and executed by the Store runtime.
    ///
    /// # Type Parameters
    ///
    /// - `Action`: The action type that effects can produce (feedback loop)
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Run effects in parallel
        Parallel(Vec<Effect<Action>>),

        /// Run effects sequentially
        Sequential(Vec<Effect<Action>>),

        /// Delayed action
        Delay {
            /// How long to wait
            duration: Duration,
            /// Action to dispatch after delay
            action: Box<Action>,
        },

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if Some, the action is fed back into the reducer
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),
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

    impl<Action> Effect<Action> {
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

    impl<Action: Send + 'static> Effect<Action> {
        /// Run a transport call and feed its settlement back as an action
        ///
        /// The call's `Ok` value becomes [`Lifecycle::Fulfilled`] and its `Err`
        /// value becomes [`Lifecycle::Rejected`], both tagged with `operation`.
        /// Exactly one settle action is produced per call.
        ///
        /// The matching `Pending` event is the caller's job: it has to be
        /// recorded synchronously, before the effect is returned, so that a
        /// second trigger processed before settlement sees it.
        ///
        /// # Example
        ///
        /// ```ignore
        /// state.requests.start(op.clone());
        /// smallvec![Effect::settle(op, async move { transport.fetch_all().await }, |event| {
        ///     PluginsAction::Settled(event.map(PluginsPayload::All))
        /// })]
        /// ```
        pub fn settle<T, E, F, M>(operation: OperationName, call: F, into_action: M) -> Self
        where
            F: Future<Output = Result<T, E>> + Send + 'static,
            M: FnOnce(RequestEvent<T, E>) -> Action + Send + 'static,
            T: Send + 'static,
            E: Send + 'static,
        {
            crate::async_effect! {
                let lifecycle = match call.await {
                    Ok(value) => Lifecycle::Fulfilled(value),
                    Err(error) => Lifecycle::Rejected(error),
                };
                Some(into_action(RequestEvent::new(operation, lifecycle)))
            }
        }
    }
}
