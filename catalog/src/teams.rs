//! Team list feature.
//!
//! One operation, `teams/fetchAll`, loads every team into an entity cache.
//! The search query lives next to the cache and only affects the
//! [`TeamsState::filtered`] selector.

use crate::error::{log_settlement, TransportError};
use crate::transport::TeamTransport;
use loadstate_core::cache::EntityCache;
use loadstate_core::coordination;
use loadstate_core::entity::Entity;
use loadstate_core::request::{OperationName, RequestEvent, RequestStatus, RequestView};
use loadstate_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Namespace of the team operations
pub const NAMESPACE: &str = "teams";

/// A team
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    /// Team id
    pub id: u64,
    /// Display name
    pub name: String,
    /// Contact address
    #[serde(default)]
    pub email: String,
    /// Avatar image URL
    #[serde(default)]
    pub avatar_url: String,
    /// Number of members
    #[serde(default)]
    pub member_count: u32,
}

impl Team {
    /// Team with only id and name set
    #[must_use]
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            email: String::new(),
            avatar_url: String::new(),
            member_count: 0,
        }
    }
}

impl Entity for Team {
    type Id = u64;
    type Patch = Self;

    fn id(&self) -> &u64 {
        &self.id
    }

    fn apply_patch(&mut self, patch: Self) {
        *self = patch;
    }
}

/// Team list state
#[derive(Debug, Clone)]
pub struct TeamsState {
    /// Teams and operation status
    pub cache: EntityCache<Team, TransportError>,
    /// Current search text
    pub search_query: String,
    /// Name of the bulk load operation
    pub fetch_all: OperationName,
}

impl TeamsState {
    /// Teams whose name contains the search query, ignoring case
    #[must_use]
    pub fn filtered(&self) -> Vec<&Team> {
        let query = self.search_query.to_lowercase();
        self.cache
            .entities
            .iter()
            .filter(|team| team.name.to_lowercase().contains(&query))
            .collect()
    }

    /// Number of loaded teams, regardless of the search query
    #[must_use]
    pub fn count(&self) -> usize {
        self.cache.entities.len()
    }

    /// Whether the bulk load has settled at least once
    #[must_use]
    pub fn has_fetched(&self) -> bool {
        matches!(
            self.cache.requests.status(&self.fetch_all),
            RequestStatus::Fulfilled | RequestStatus::Rejected
        )
    }

    /// Loading/error view of the bulk load
    #[must_use]
    pub fn fetch_status(&self) -> RequestView<TransportError> {
        self.cache.status(&self.fetch_all)
    }
}

impl Default for TeamsState {
    fn default() -> Self {
        Self {
            cache: EntityCache::new(),
            search_query: String::new(),
            fetch_all: OperationName::scoped(NAMESPACE, "fetchAll"),
        }
    }
}

/// Team list actions
#[derive(Debug, Clone, PartialEq)]
pub enum TeamsAction {
    /// Load the team list unless it was loaded before
    FetchAll,
    /// Load the team list again unless a load is running
    Refresh,
    /// Change the search text
    SetSearchQuery(String),
    /// `fetchAll` settled
    Loaded(RequestEvent<Vec<Team>, TransportError>),
}

/// Injected dependencies of [`TeamsReducer`]
#[derive(Clone)]
pub struct TeamsEnvironment {
    /// Team backend
    pub transport: Arc<dyn TeamTransport>,
}

impl TeamsEnvironment {
    /// Environment around `transport`
    #[must_use]
    pub fn new(transport: Arc<dyn TeamTransport>) -> Self {
        Self { transport }
    }
}

/// Reducer for the team list
#[derive(Debug, Clone, Copy, Default)]
pub struct TeamsReducer;

impl TeamsReducer {
    fn load(state: &mut TeamsState, env: &TeamsEnvironment) -> SmallVec<[Effect<TeamsAction>; 4]> {
        let op = state.fetch_all.clone();
        state.cache.requests.start(op.clone());

        let transport = Arc::clone(&env.transport);
        smallvec![Effect::settle(
            op,
            async move { transport.fetch_teams().await },
            TeamsAction::Loaded,
        )]
    }
}

impl Reducer for TeamsReducer {
    type State = TeamsState;
    type Action = TeamsAction;
    type Environment = TeamsEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            TeamsAction::FetchAll => {
                let decision = coordination::fetch_once(&state.cache.requests, &state.fetch_all);
                if !decision.should_start() {
                    tracing::debug!(operation = %state.fetch_all, %decision, "Trigger declined");
                    return SmallVec::new();
                }
                Self::load(state, env)
            },
            TeamsAction::Refresh => {
                if state.cache.requests.is_pending(&state.fetch_all) {
                    tracing::debug!(operation = %state.fetch_all, "Refresh declined, load running");
                    return SmallVec::new();
                }
                Self::load(state, env)
            },
            TeamsAction::SetSearchQuery(query) => {
                state.search_query = query;
                SmallVec::new()
            },
            TeamsAction::Loaded(event) => {
                log_settlement(&event);
                state.cache.observe_many(event);
                SmallVec::new()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::MockTransport;
    use loadstate_testing::{assertions, ReducerTest};

    fn env() -> TeamsEnvironment {
        TeamsEnvironment::new(Arc::new(MockTransport::new()))
    }

    fn loaded(teams: Vec<Team>) -> TeamsState {
        let mut state = TeamsState::default();
        state
            .cache
            .observe_many(RequestEvent::fulfilled(state.fetch_all.clone(), teams));
        state
    }

    #[test]
    fn fetch_all_end_to_end() {
        let op = OperationName::new("teams/fetchAll");
        ReducerTest::new(TeamsReducer)
            .with_env(env())
            .given_state(TeamsState::default())
            .when_actions([
                TeamsAction::FetchAll,
                TeamsAction::Loaded(RequestEvent::fulfilled(op, vec![Team::new(1, "Team A")])),
            ])
            .then_state(|state| {
                assert_eq!(state.cache.all(), vec![&Team::new(1, "Team A")]);
                let status = state.fetch_status();
                assert!(!status.pending);
                assert_eq!(status.error, None);
                assert!(state.has_fetched());
            })
            .run();
    }

    #[test]
    fn fetch_all_is_once_but_refresh_reloads() {
        ReducerTest::new(TeamsReducer)
            .with_env(env())
            .given_state(loaded(vec![Team::new(1, "Team A")]))
            .when_action(TeamsAction::FetchAll)
            .then_effects(assertions::assert_no_effects)
            .run();

        ReducerTest::new(TeamsReducer)
            .with_env(env())
            .given_state(loaded(vec![Team::new(1, "Team A")]))
            .when_action(TeamsAction::Refresh)
            .then_state(|state| {
                assertions::assert_pending(&state.cache.requests, "teams/fetchAll");
                assert!(!state.has_fetched());
                assert_eq!(state.count(), 1);
            })
            .then_effects(assertions::assert_has_future_effect)
            .run();
    }

    #[test]
    fn refresh_declined_while_pending() {
        ReducerTest::new(TeamsReducer)
            .with_env(env())
            .given_state(TeamsState::default())
            .when_actions([TeamsAction::FetchAll, TeamsAction::Refresh])
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn filtered_matches_name_ignoring_case() {
        let mut state = loaded(vec![
            Team::new(1, "Backend"),
            Team::new(2, "Frontend"),
            Team::new(3, "Support"),
        ]);

        state.search_query = "END".into();
        let names: Vec<&str> = state.filtered().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Backend", "Frontend"]);
        assert_eq!(state.count(), 3);

        state.search_query.clear();
        assert_eq!(state.filtered().len(), 3);
    }

    #[test]
    fn search_query_does_not_touch_requests() {
        ReducerTest::new(TeamsReducer)
            .with_env(env())
            .given_state(TeamsState::default())
            .when_action(TeamsAction::SetSearchQuery("ops".into()))
            .then_state(|state| {
                assert_eq!(state.search_query, "ops");
                assert!(state.cache.requests.is_empty());
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn rejected_load_keeps_previous_teams() {
        let op = OperationName::new("teams/fetchAll");
        let error = TransportError::Status { code: 503, message: "unavailable".into() };
        ReducerTest::new(TeamsReducer)
            .with_env(env())
            .given_state(loaded(vec![Team::new(1, "Team A")]))
            .when_actions([TeamsAction::Refresh, TeamsAction::Loaded(RequestEvent::rejected(op, error.clone()))])
            .then_state(move |state| {
                assertions::assert_rejected_with(&state.cache.requests, "teams/fetchAll", &error);
                assert_eq!(state.count(), 1);
                assert!(state.has_fetched());
            })
            .run();
    }

    proptest::proptest! {
        #[test]
        fn filtered_is_a_subset_containing_every_match(
            names in proptest::collection::vec("[a-zA-Z ]{0,12}", 0..8),
            query in "[a-zA-Z]{0,3}",
        ) {
            let teams: Vec<Team> = names
                .iter()
                .zip(1u64..)
                .map(|(name, id)| Team::new(id, name.as_str()))
                .collect();
            let mut state = loaded(teams);
            state.search_query = query.clone();

            let needle = query.to_lowercase();
            let expected = names.iter().filter(|n| n.to_lowercase().contains(&needle)).count();
            proptest::prop_assert_eq!(state.filtered().len(), expected);
            proptest::prop_assert_eq!(state.count(), names.len());
        }
    }
}
