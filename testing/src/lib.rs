//! # Loadstate Testing
//!
//! Testing utilities for reducers built on request-tracked entity caches.
//!
//! This crate provides:
//! - [`ReducerTest`]: Given-When-Then harness for reducers
//! - [`assertions`]: effect and request-status assertions
//! - [`effects`]: drive returned effects by hand, without a Store
//! - [`properties`]: proptest strategies for operation names and lifecycle phases
//!
//! ## Example
//!
//! ```ignore
//! use loadstate_testing::{assertions, ReducerTest};
//!
//! ReducerTest::new(PluginsReducer::new())
//!     .with_env(test_environment())
//!     .given_state(PluginsState::default())
//!     .when_action(PluginsAction::FetchAll)
//!     .then_state(|state| assertions::assert_pending(&state.cache.requests, "plugins/fetchAll"))
//!     .then_effects(assertions::assert_has_future_effect)
//!     .run();
//! ```


pub use reducer_test::{assertions, ReducerTest};

/// Run effects returned by a reducer without a Store
pub mod effects {
    use loadstate_core::effect::Effect;

    /// Await every action the effect would feed back, in execution order.
    ///
    /// `Parallel` children are awaited one after another, so the order of
    /// their results is the order they were listed in. `Delay` actions are
    /// returned without sleeping.
    pub async fn collect_actions<A: Send + 'static>(effect: Effect<A>) -> Vec<A> {
        let mut actions = Vec::new();
        let mut queue = vec![effect];

        while let Some(effect) = queue.pop() {
            match effect {
                Effect::None => {},
                Effect::Future(fut) => actions.extend(fut.await),
                Effect::Delay { action, .. } => actions.push(*action),
                Effect::Parallel(children) | Effect::Sequential(children) => {
                    queue.extend(children.into_iter().rev());
                },
            }
        }

        actions
    }

    /// Await all effects in a reducer's output.
    pub async fn collect_all<A, I>(effects: I) -> Vec<A>
    where
        A: Send + 'static,
        I: IntoIterator<Item = Effect<A>>,
    {
        let mut actions = Vec::new();
        for effect in effects {
            actions.extend(collect_actions(effect).await);
        }
        actions
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use loadstate_core::request::{OperationName, Phase};
    use proptest::prelude::*;

    /// Any of the three lifecycle phases
    pub fn phase() -> impl Strategy<Value = Phase> {
        prop::sample::select(Phase::ALL.to_vec())
    }

    /// Operation names of the form `<namespace>/<operation>`
    pub fn operation_name() -> impl Strategy<Value = OperationName> {
        ("[a-z]{1,8}", "[a-z][a-zA-Z]{0,11}")
            .prop_map(|(namespace, operation)| OperationName::scoped(&namespace, &operation))
    }

    /// Sequences of lifecycle phases for one operation
    pub fn phase_sequence(max_len: usize) -> impl Strategy<Value = Vec<Phase>> {
        prop::collection::vec(phase(), 0..=max_len)
    }
}

/// Install a `tracing` subscriber that writes through the test harness.
///
/// Safe to call from every test; only the first call installs.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}
