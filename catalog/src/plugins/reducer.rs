//! Plugin catalog reducer.
//!
//! Commands run their coordination policy and record `pending` in the same
//! reducer call, under the store's write lock. A second trigger reduced
//! before the first one settles therefore sees `pending` and is declined,
//! which is what keeps duplicate transport calls from being issued.

use super::actions::{PluginsAction, SignalPayload};
use super::state::PluginsState;
use super::types::{CatalogPlugin, PluginPatch};
use crate::error::{log_settlement, TransportError};
use crate::transport::PluginTransport;
use loadstate_core::cache::EntityUpdate;
use loadstate_core::coordination::{self, Decision};
use loadstate_core::request::{OperationName, Phase, RequestEvent};
use loadstate_core::signal::{ClassifiedSignal, Signal, SignalReducer};
use loadstate_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};
use std::sync::Arc;

/// Injected dependencies of [`PluginsReducer`]
#[derive(Clone)]
pub struct PluginsEnvironment {
    /// Catalog backend
    pub transport: Arc<dyn PluginTransport>,
}

impl PluginsEnvironment {
    /// Environment around `transport`
    #[must_use]
    pub fn new(transport: Arc<dyn PluginTransport>) -> Self {
        Self { transport }
    }
}

impl std::fmt::Debug for PluginsEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginsEnvironment").finish_non_exhaustive()
    }
}

/// Reducer for the plugin catalog
#[derive(Debug, Clone, Default)]
pub struct PluginsReducer {
    details_for_unknown_ids: bool,
}

impl PluginsReducer {
    /// Reducer that only fetches details for plugins already in the store
    #[must_use]
    pub const fn new() -> Self {
        Self {
            details_for_unknown_ids: false,
        }
    }

    /// Also fetch details for ids the store does not know yet
    #[must_use]
    pub const fn with_details_for_unknown_ids(mut self, enabled: bool) -> Self {
        self.details_for_unknown_ids = enabled;
        self
    }

    fn declined(operation: &OperationName, decision: Decision) -> SmallVec<[Effect<PluginsAction>; 4]> {
        tracing::debug!(operation = %operation, %decision, "Trigger declined");
        SmallVec::new()
    }
}

impl Reducer for PluginsReducer {
    type State = PluginsState;
    type Action = PluginsAction;
    type Environment = PluginsEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            PluginsAction::FetchAll => {
                let op = state.operations.fetch_all.clone();
                let decision = coordination::fetch_once(&state.cache.requests, &op);
                if !decision.should_start() {
                    return Self::declined(&op, decision);
                }

                state.cache.requests.start(op.clone());
                let transport = Arc::clone(&env.transport);
                smallvec![Effect::settle(
                    op,
                    async move { transport.fetch_all().await },
                    PluginsAction::AllFetched,
                )]
            },

            PluginsAction::FetchDetails { id } => {
                let op = state.operations.fetch_details.clone();
                let decision = coordination::fetch_if_missing(
                    &state.cache.requests,
                    &op,
                    &state.cache.entities,
                    &id,
                    CatalogPlugin::has_details,
                    self.details_for_unknown_ids,
                );
                if !decision.should_start() {
                    return Self::declined(&op, decision);
                }

                state.cache.requests.start(op.clone());
                let transport = Arc::clone(&env.transport);
                smallvec![Effect::settle(
                    op,
                    async move {
                        let details = transport.fetch_details(id.clone()).await?;
                        Ok::<_, TransportError>(EntityUpdate::new(id, PluginPatch::details(details)))
                    },
                    PluginsAction::Updated,
                )]
            },

            PluginsAction::Install { id, version, is_updating } => {
                let op = state.operations.install.clone();
                state.cache.requests.start(op.clone());

                let transport = Arc::clone(&env.transport);
                smallvec![Effect::settle(
                    op,
                    async move {
                        transport.install(id.clone(), version.clone()).await?;
                        Ok::<_, TransportError>(EntityUpdate::new(id, PluginPatch::installed(version, is_updating)))
                    },
                    PluginsAction::Updated,
                )]
            },

            PluginsAction::Uninstall { id } => {
                let op = state.operations.uninstall.clone();
                state.cache.requests.start(op.clone());

                let transport = Arc::clone(&env.transport);
                smallvec![Effect::settle(
                    op,
                    async move {
                        transport.uninstall(id.clone()).await?;
                        Ok::<_, TransportError>(EntityUpdate::new(id, PluginPatch::uninstalled()))
                    },
                    PluginsAction::Updated,
                )]
            },

            PluginsAction::AllFetched(event) => {
                log_settlement(&event);
                state.cache.observe_many(event);
                SmallVec::new()
            },

            PluginsAction::Updated(event) => {
                log_settlement(&event);
                if let Err(missing) = state.cache.observe_update(event) {
                    tracing::debug!(%missing, "Ignored update for plugin not in store");
                }
                SmallVec::new()
            },

            PluginsAction::Signal(signal) => {
                reduce_signal(state, signal);
                SmallVec::new()
            },
        }
    }
}

/// Apply a string-typed lifecycle signal the way the typed events are applied.
fn reduce_signal(state: &mut PluginsState, signal: Signal<SignalPayload>) {
    let signal = match signal.classify() {
        Ok(signal) => signal,
        Err(unrelated) => {
            tracing::trace!(kind = %unrelated.kind, "Ignoring non-lifecycle signal");
            return;
        },
    };
    let scope = SignalReducer::<TransportError>::with_namespace(state.operations.namespace.as_str());
    if !scope.tracks(&signal.operation) {
        tracing::trace!(operation = %signal.operation, "Signal outside tracked namespace");
        return;
    }

    let ClassifiedSignal { operation, phase, payload } = signal;
    match (phase, payload) {
        (Phase::Pending, _) => state.cache.requests.start(operation),
        (Phase::Rejected, payload) => {
            let error = payload.and_then(SignalPayload::into_error);
            tracing::warn!(operation = %operation, ?error, "Operation rejected");
            state.cache.requests.record(operation, Phase::Rejected, error);
        },
        (Phase::Fulfilled, Some(SignalPayload::Plugins(plugins))) => {
            state.cache.observe_many(RequestEvent::fulfilled(operation, plugins));
        },
        (Phase::Fulfilled, Some(SignalPayload::Update { id, changes })) => {
            let event = RequestEvent::fulfilled(operation, EntityUpdate::new(id, changes));
            if let Err(missing) = state.cache.observe_update(event) {
                tracing::debug!(%missing, "Ignored update for plugin not in store");
            }
        },
        (Phase::Fulfilled, _) => state.cache.requests.fulfill(operation),
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mocks::MockTransport;
    use crate::plugins::types::{PluginDetails, PluginType};
    use loadstate_core::request::{Lifecycle, RequestStatus};
    use loadstate_testing::effects::collect_all;
    use loadstate_testing::{assertions, ReducerTest};

    fn plugin(id: &str) -> CatalogPlugin {
        CatalogPlugin::new(id, id, PluginType::Panel)
    }

    fn env(mock: &MockTransport) -> PluginsEnvironment {
        PluginsEnvironment::new(Arc::new(mock.clone()))
    }

    fn state_with(plugins: Vec<CatalogPlugin>) -> PluginsState {
        let mut state = PluginsState::default();
        state.cache.entities.upsert_many(plugins);
        state
    }

    #[test]
    fn fetch_all_records_pending_and_starts_one_call() {
        ReducerTest::new(PluginsReducer::new())
            .with_env(env(&MockTransport::new()))
            .given_state(PluginsState::default())
            .when_action(PluginsAction::FetchAll)
            .then_state(|state| {
                assertions::assert_pending(&state.cache.requests, "plugins/fetchAll");
                assert!(state.fetch_status().pending);
            })
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_has_future_effect(effects);
            })
            .run();
    }

    #[test]
    fn second_fetch_all_is_declined() {
        ReducerTest::new(PluginsReducer::new())
            .with_env(env(&MockTransport::new()))
            .given_state(PluginsState::default())
            .when_actions([PluginsAction::FetchAll, PluginsAction::FetchAll])
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn fetch_all_stays_declined_after_rejection() {
        let op = OperationName::new("plugins/fetchAll");
        ReducerTest::new(PluginsReducer::new())
            .with_env(env(&MockTransport::new()))
            .given_state(PluginsState::default())
            .when_actions([
                PluginsAction::FetchAll,
                PluginsAction::AllFetched(RequestEvent::rejected(
                    op,
                    TransportError::Network("offline".into()),
                )),
                PluginsAction::FetchAll,
            ])
            .then_state(|state| {
                assertions::assert_rejected_with(
                    &state.cache.requests,
                    "plugins/fetchAll",
                    &TransportError::Network("offline".into()),
                );
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn fetch_details_declined_for_unknown_id_by_default() {
        ReducerTest::new(PluginsReducer::new())
            .with_env(env(&MockTransport::new()))
            .given_state(PluginsState::default())
            .when_action(PluginsAction::FetchDetails { id: "clock".into() })
            .then_state(|state| {
                assertions::assert_status(&state.cache.requests, "plugins/fetchDetails", RequestStatus::NotStarted);
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn fetch_details_for_unknown_id_when_enabled() {
        ReducerTest::new(PluginsReducer::new().with_details_for_unknown_ids(true))
            .with_env(env(&MockTransport::new()))
            .given_state(PluginsState::default())
            .when_action(PluginsAction::FetchDetails { id: "clock".into() })
            .then_state(|state| assertions::assert_pending(&state.cache.requests, "plugins/fetchDetails"))
            .then_effects(assertions::assert_has_future_effect)
            .run();
    }

    #[test]
    fn fetch_details_declined_when_details_present() {
        let mut detailed = plugin("clock");
        detailed.details = Some(PluginDetails { readme: String::new(), versions: vec![], links: vec![] });

        ReducerTest::new(PluginsReducer::new())
            .with_env(env(&MockTransport::new()))
            .given_state(state_with(vec![detailed]))
            .when_action(PluginsAction::FetchDetails { id: "clock".into() })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn fetch_details_declined_while_any_details_pending() {
        ReducerTest::new(PluginsReducer::new())
            .with_env(env(&MockTransport::new()))
            .given_state(state_with(vec![plugin("clock"), plugin("worldmap")]))
            .when_actions([
                PluginsAction::FetchDetails { id: "clock".into() },
                PluginsAction::FetchDetails { id: "worldmap".into() },
            ])
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn install_always_starts() {
        let install = || PluginsAction::Install {
            id: "clock".into(),
            version: "1.0.0".into(),
            is_updating: false,
        };

        ReducerTest::new(PluginsReducer::new())
            .with_env(env(&MockTransport::new()))
            .given_state(state_with(vec![plugin("clock")]))
            .when_actions([install(), install()])
            .then_state(|state| assert!(state.install_status().pending))
            .then_effects(|effects| assertions::assert_effects_count(effects, 1))
            .run();
    }

    #[test]
    fn update_for_missing_plugin_is_ignored() {
        let op = OperationName::new("plugins/uninstall");
        ReducerTest::new(PluginsReducer::new())
            .with_env(env(&MockTransport::new()))
            .given_state(PluginsState::default())
            .when_action(PluginsAction::Updated(RequestEvent::fulfilled(
                op,
                EntityUpdate::new("ghost".into(), PluginPatch::uninstalled()),
            )))
            .then_state(|state| {
                assert!(state.cache.entities.is_empty());
                assertions::assert_status(&state.cache.requests, "plugins/uninstall", RequestStatus::Fulfilled);
            })
            .run();
    }

    #[test]
    fn signals_inside_the_namespace_update_status() {
        ReducerTest::new(PluginsReducer::new())
            .with_env(env(&MockTransport::new()))
            .given_state(PluginsState::default())
            .when_actions([
                PluginsAction::Signal(Signal::new("plugins/loadPanelPlugin/pending")),
                PluginsAction::Signal(Signal::new("teams/fetchAll/pending")),
                PluginsAction::Signal(Signal::new("plugins/setSearchQuery")),
            ])
            .then_state(|state| {
                assertions::assert_pending(&state.cache.requests, "plugins/loadPanelPlugin");
                assert_eq!(state.cache.requests.len(), 1);
            })
            .run();
    }

    #[test]
    fn fulfilled_signals_carry_entities_into_the_store() {
        let mut installed = plugin("clock");
        installed.is_installed = true;
        installed.installed_version = Some("1.0.0".into());

        ReducerTest::new(PluginsReducer::new())
            .with_env(env(&MockTransport::new()))
            .given_state(PluginsState::default())
            .when_actions([
                PluginsAction::Signal(Signal::new("plugins/fetchAll/pending")),
                PluginsAction::Signal(Signal::with_payload(
                    "plugins/fetchAll/fulfilled",
                    SignalPayload::Plugins(vec![installed, plugin("worldmap")]),
                )),
                PluginsAction::Signal(Signal::with_payload(
                    "plugins/uninstall/fulfilled",
                    SignalPayload::Update { id: "clock".into(), changes: PluginPatch::uninstalled() },
                )),
                PluginsAction::Signal(Signal::with_payload(
                    "plugins/install/fulfilled",
                    SignalPayload::Update {
                        id: "ghost".into(),
                        changes: PluginPatch::installed("1.0.0".into(), false),
                    },
                )),
            ])
            .then_state(|state| {
                let ids: Vec<&str> = state.all().into_iter().map(|p| p.id.as_str()).collect();
                assert_eq!(ids, vec!["clock", "worldmap"]);
                let clock = state.get("clock").unwrap();
                assert!(!clock.is_installed);
                assert_eq!(clock.installed_version, None);
                assertions::assert_status(&state.cache.requests, "plugins/fetchAll", RequestStatus::Fulfilled);
                assertions::assert_status(&state.cache.requests, "plugins/uninstall", RequestStatus::Fulfilled);
                assertions::assert_status(&state.cache.requests, "plugins/install", RequestStatus::Fulfilled);
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn rejected_signal_keeps_entities_and_records_the_error() {
        let refused = TransportError::Status { code: 403, message: "forbidden".into() };

        ReducerTest::new(PluginsReducer::new())
            .with_env(env(&MockTransport::new()))
            .given_state(state_with(vec![plugin("clock")]))
            .when_actions([
                PluginsAction::Signal(Signal::new("plugins/install/pending")),
                PluginsAction::Signal(Signal::with_payload(
                    "plugins/install/rejected",
                    SignalPayload::Error(refused.clone()),
                )),
            ])
            .then_state(move |state| {
                assert_eq!(state.all(), vec![&plugin("clock")]);
                assertions::assert_rejected_with(&state.cache.requests, "plugins/install", &refused);
            })
            .run();
    }

    #[test]
    fn signal_payload_wire_form() {
        let signal: Signal<SignalPayload> = serde_json::from_str(
            r#"{"type":"plugins/uninstall/fulfilled",
                "payload":{"update":{"id":"clock","changes":{"isInstalled":false,"installedVersion":null}}}}"#,
        )
        .unwrap_or_else(|e| panic!("invalid json: {e}"));

        assert_eq!(
            signal.payload,
            Some(SignalPayload::Update { id: "clock".into(), changes: PluginPatch::uninstalled() })
        );
    }

    #[test]
    fn custom_namespace_scopes_operation_names() {
        ReducerTest::new(PluginsReducer::new())
            .with_env(env(&MockTransport::new()))
            .given_state(PluginsState::new("admin/plugins"))
            .when_action(PluginsAction::FetchAll)
            .then_state(|state| {
                assertions::assert_pending(&state.cache.requests, "admin/plugins/fetchAll");
                assertions::assert_status(&state.cache.requests, "plugins/fetchAll", RequestStatus::NotStarted);
            })
            .run();
    }

    #[tokio::test]
    async fn settle_effects_carry_operation_patches() {
        let mock = MockTransport::new().with_plugins(vec![plugin("clock")]);
        let env = env(&mock);
        let reducer = PluginsReducer::new();
        let mut state = PluginsState::default();

        let effects = reducer.reduce(&mut state, PluginsAction::FetchAll, &env);
        for action in collect_all(effects).await {
            reducer.reduce(&mut state, action, &env);
        }
        assert_eq!(state.all(), vec![&plugin("clock")]);

        let effects = reducer.reduce(
            &mut state,
            PluginsAction::Install { id: "clock".into(), version: "2.1.0".into(), is_updating: true },
            &env,
        );
        let settled = collect_all(effects).await;
        assert_eq!(
            settled,
            vec![PluginsAction::Updated(RequestEvent::new(
                OperationName::new("plugins/install"),
                Lifecycle::Fulfilled(EntityUpdate::new(
                    "clock".to_string(),
                    PluginPatch::installed("2.1.0".into(), true)
                )),
            ))]
        );
        assert!(settled.iter().all(PluginsAction::is_settlement));

        for action in settled {
            reducer.reduce(&mut state, action, &env);
        }
        let clock = state.get("clock").unwrap();
        assert!(clock.is_installed);
        assert_eq!(clock.installed_version.as_deref(), Some("2.1.0"));
        assert_eq!(state.install_status().error, None);
        assert_eq!(mock.calls().install, 1);
    }
}
