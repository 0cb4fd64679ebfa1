//! Policies deciding whether an operation should be started.
//!
//! Both policies follow one rule: start an operation for a key only if no
//! cached result exists for that key and the operation is not already
//! pending. A declined trigger is not an error; the [`Decision`] says why it
//! was declined so callers can log it.
//!
//! Policies are plain functions over the current state. They are meant to be
//! evaluated inside a reducer, under the store's write lock, so that the
//! check and the `pending` bookkeeping that follows it happen atomically.

use crate::entity::{Entity, EntityStore};
use crate::request::RequestRegistry;
use std::fmt;

/// Outcome of a coordination policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Start the operation
    Start,
    /// The operation was already attempted in this session
    AlreadyStarted,
    /// The operation is currently pending
    AlreadyPending,
    /// The cached entity already holds the result
    AlreadyLoaded,
    /// The entity is not in the store and the policy does not fetch unknown ids
    UnknownEntity,
}

impl Decision {
    /// Whether the operation should be started
    #[must_use]
    pub const fn should_start(self) -> bool {
        matches!(self, Self::Start)
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::AlreadyStarted => write!(f, "already started"),
            Self::AlreadyPending => write!(f, "already pending"),
            Self::AlreadyLoaded => write!(f, "already loaded"),
            Self::UnknownEntity => write!(f, "unknown entity"),
        }
    }
}

/// Fetch-once policy: start `operation` only if it was never started.
///
/// This looks at the registry only. Emptying the entity store does not make
/// the operation eligible again.
#[must_use]
pub fn fetch_once<E>(requests: &RequestRegistry<E>, operation: &str) -> Decision {
    if requests.is_not_started(operation) {
        Decision::Start
    } else {
        Decision::AlreadyStarted
    }
}

/// Fetch-if-missing policy for a per-entity sub-record.
///
/// Starts `operation` unless it is pending or the entity under `id` already
/// satisfies `is_loaded`. When the entity is not in the store at all, the
/// operation starts only if `fetch_unknown` is set.
#[must_use]
pub fn fetch_if_missing<T, E, F>(
    requests: &RequestRegistry<E>,
    operation: &str,
    entities: &EntityStore<T>,
    id: &T::Id,
    is_loaded: F,
    fetch_unknown: bool,
) -> Decision
where
    T: Entity,
    F: FnOnce(&T) -> bool,
{
    if requests.is_pending(operation) {
        return Decision::AlreadyPending;
    }

    match entities.get(id) {
        Some(entity) if is_loaded(entity) => Decision::AlreadyLoaded,
        Some(_) => Decision::Start,
        None if fetch_unknown => Decision::Start,
        None => Decision::UnknownEntity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::OperationName;

    #[derive(Clone, Debug)]
    struct Plugin {
        id: &'static str,
        details: Option<String>,
    }

    impl Entity for Plugin {
        type Id = &'static str;
        type Patch = Option<String>;

        fn id(&self) -> &&'static str {
            &self.id
        }

        fn apply_patch(&mut self, details: Option<String>) {
            self.details = details;
        }
    }

    const FETCH_ALL: &str = "plugins/fetchAll";
    const FETCH_DETAILS: &str = "plugins/fetchDetails";

    fn has_details(plugin: &Plugin) -> bool {
        plugin.details.is_some()
    }

    fn store_with(plugins: Vec<Plugin>) -> EntityStore<Plugin> {
        plugins.into_iter().collect()
    }

    #[test]
    fn fetch_once_starts_only_when_not_started() {
        let mut requests: RequestRegistry<String> = RequestRegistry::new();
        assert_eq!(fetch_once(&requests, FETCH_ALL), Decision::Start);

        requests.start(OperationName::new(FETCH_ALL));
        assert_eq!(fetch_once(&requests, FETCH_ALL), Decision::AlreadyStarted);

        requests.reject(OperationName::new(FETCH_ALL), "offline".into());
        assert_eq!(fetch_once(&requests, FETCH_ALL), Decision::AlreadyStarted);
    }

    #[test]
    fn fetch_if_missing_starts_for_entity_without_details() {
        let requests: RequestRegistry<String> = RequestRegistry::new();
        let store = store_with(vec![Plugin { id: "clock", details: None }]);

        let decision = fetch_if_missing(&requests, FETCH_DETAILS, &store, &"clock", has_details, false);

        assert_eq!(decision, Decision::Start);
        assert!(decision.should_start());
    }

    #[test]
    fn fetch_if_missing_declines_when_details_present() {
        let requests: RequestRegistry<String> = RequestRegistry::new();
        let store = store_with(vec![Plugin { id: "clock", details: Some("readme".into()) }]);

        assert_eq!(
            fetch_if_missing(&requests, FETCH_DETAILS, &store, &"clock", has_details, true),
            Decision::AlreadyLoaded
        );
    }

    #[test]
    fn fetch_if_missing_declines_while_pending() {
        let mut requests: RequestRegistry<String> = RequestRegistry::new();
        requests.start(OperationName::new(FETCH_DETAILS));
        let store = store_with(vec![Plugin { id: "clock", details: None }]);

        assert_eq!(
            fetch_if_missing(&requests, FETCH_DETAILS, &store, &"clock", has_details, false),
            Decision::AlreadyPending
        );
    }

    #[test]
    fn fetch_if_missing_unknown_entity_follows_flag() {
        let requests: RequestRegistry<String> = RequestRegistry::new();
        let store = store_with(vec![]);

        assert_eq!(
            fetch_if_missing(&requests, FETCH_DETAILS, &store, &"clock", has_details, false),
            Decision::UnknownEntity
        );
        assert_eq!(
            fetch_if_missing(&requests, FETCH_DETAILS, &store, &"clock", has_details, true),
            Decision::Start
        );
    }

    #[test]
    fn fetch_if_missing_retries_after_rejection() {
        let mut requests: RequestRegistry<String> = RequestRegistry::new();
        requests.start(OperationName::new(FETCH_DETAILS));
        requests.reject(OperationName::new(FETCH_DETAILS), "502".into());
        let store = store_with(vec![Plugin { id: "clock", details: None }]);

        assert_eq!(
            fetch_if_missing(&requests, FETCH_DETAILS, &store, &"clock", has_details, false),
            Decision::Start
        );
    }
}
