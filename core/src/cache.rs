//! Entity store and request registry for one feature.
//!
//! [`EntityCache`] is the state a feature reducer owns: the entities it has
//! loaded and the status of every operation that loads or mutates them. The
//! `observe_*` methods apply a settled [`RequestEvent`] to both halves in one
//! step; the accessors are the read side consumers render from.

use crate::entity::{Entity, EntityStore};
use crate::error::NotFoundOnUpdate;
use crate::request::{RequestEvent, RequestRegistry, RequestView};
use std::fmt;

/// Partial update addressed to one entity
pub struct EntityUpdate<T: Entity> {
    /// Target entity
    pub id: T::Id,
    /// Fields to overwrite
    pub changes: T::Patch,
}

impl<T: Entity> EntityUpdate<T> {
    /// Create an update
    #[must_use]
    pub const fn new(id: T::Id, changes: T::Patch) -> Self {
        Self { id, changes }
    }
}

impl<T> Clone for EntityUpdate<T>
where
    T: Entity,
    T::Patch: Clone,
{
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            changes: self.changes.clone(),
        }
    }
}

impl<T> fmt::Debug for EntityUpdate<T>
where
    T: Entity,
    T::Patch: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityUpdate")
            .field("id", &self.id)
            .field("changes", &self.changes)
            .finish()
    }
}

impl<T> PartialEq for EntityUpdate<T>
where
    T: Entity,
    T::Patch: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.changes == other.changes
    }
}

/// Entities plus the status of the operations acting on them
pub struct EntityCache<T: Entity, E> {
    /// Loaded entities
    pub entities: EntityStore<T>,
    /// Operation status slots
    pub requests: RequestRegistry<E>,
}

impl<T: Entity, E> EntityCache<T, E> {
    /// Create an empty cache
    #[must_use]
    pub fn new() -> Self {
        Self {
            entities: EntityStore::new(),
            requests: RequestRegistry::new(),
        }
    }

    /// Record a bulk-load event; on `fulfilled`, upsert every entity.
    pub fn observe_many(&mut self, event: RequestEvent<Vec<T>, E>) {
        if let Some(records) = self.requests.observe(event) {
            self.entities.upsert_many(records);
        }
    }

    /// Record an update event; on `fulfilled`, merge the changes.
    ///
    /// # Errors
    ///
    /// Returns [`NotFoundOnUpdate`] if the event was fulfilled but its target
    /// entity is not in the store. The registry has still recorded the
    /// event as fulfilled and the store is unchanged.
    pub fn observe_update(
        &mut self,
        event: RequestEvent<EntityUpdate<T>, E>,
    ) -> Result<(), NotFoundOnUpdate<T::Id>> {
        match self.requests.observe(event) {
            Some(update) => self.entities.update_one(&update.id, update.changes),
            None => Ok(()),
        }
    }

    /// All entities in insertion order
    #[must_use]
    pub fn all(&self) -> Vec<&T> {
        self.entities.all()
    }

    /// Entity by id
    #[must_use]
    pub fn get(&self, id: &T::Id) -> Option<&T> {
        self.entities.get(id)
    }

    /// Whether `operation` was never started
    #[must_use]
    pub fn is_not_started(&self, operation: &str) -> bool {
        self.requests.is_not_started(operation)
    }
}

impl<T: Entity, E: Clone> EntityCache<T, E> {
    /// Loading/error view of `operation`
    #[must_use]
    pub fn status(&self, operation: &str) -> RequestView<E> {
        self.requests.view(operation)
    }
}

impl<T: Entity, E> Default for EntityCache<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity + Clone, E: Clone> Clone for EntityCache<T, E> {
    fn clone(&self) -> Self {
        Self {
            entities: self.entities.clone(),
            requests: self.requests.clone(),
        }
    }
}

impl<T: Entity + fmt::Debug, E: fmt::Debug> fmt::Debug for EntityCache<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityCache")
            .field("entities", &self.entities)
            .field("requests", &self.requests)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{OperationName, RequestStatus};

    #[derive(Clone, Debug, PartialEq)]
    struct Team {
        id: String,
        name: String,
    }

    impl Entity for Team {
        type Id = String;
        type Patch = String;

        fn id(&self) -> &String {
            &self.id
        }

        fn apply_patch(&mut self, name: String) {
            self.name = name;
        }
    }

    fn team(id: &str, name: &str) -> Team {
        Team { id: id.into(), name: name.into() }
    }

    #[test]
    fn fetch_all_end_to_end() {
        let fetch_all = OperationName::new("fetchAll");
        let mut cache: EntityCache<Team, String> = EntityCache::new();
        assert!(cache.is_not_started(fetch_all.as_str()));

        cache.observe_many(RequestEvent::pending(fetch_all.clone()));
        assert!(cache.status(fetch_all.as_str()).pending);
        assert!(cache.all().is_empty());

        cache.observe_many(RequestEvent::fulfilled(fetch_all.clone(), vec![team("a", "Team A")]));

        assert_eq!(cache.all(), vec![&team("a", "Team A")]);
        let status = cache.status(fetch_all.as_str());
        assert!(!status.pending);
        assert_eq!(status.error, None);
    }

    #[test]
    fn rejection_keeps_stale_entities() {
        let fetch_all = OperationName::new("teams/fetchAll");
        let mut cache: EntityCache<Team, String> = EntityCache::new();
        cache.observe_many(RequestEvent::fulfilled(fetch_all.clone(), vec![team("a", "Team A")]));

        cache.observe_many(RequestEvent::pending(fetch_all.clone()));
        cache.observe_many(RequestEvent::rejected(fetch_all.clone(), "503".into()));

        assert_eq!(cache.get(&"a".to_string()), Some(&team("a", "Team A")));
        assert_eq!(cache.status(fetch_all.as_str()).error, Some("503".to_string()));
    }

    #[test]
    fn observe_update_merges_into_existing_entity() {
        let rename = OperationName::new("teams/rename");
        let mut cache: EntityCache<Team, String> = EntityCache::new();
        cache.entities.upsert_one(team("a", "Team A"));

        let result = cache.observe_update(RequestEvent::fulfilled(
            rename.clone(),
            EntityUpdate::new("a".to_string(), "Renamed".to_string()),
        ));

        assert_eq!(result, Ok(()));
        assert_eq!(cache.get(&"a".to_string()).map(|t| t.name.as_str()), Some("Renamed"));
    }

    #[test]
    fn observe_update_reports_missing_entity_but_still_fulfills() {
        let rename = OperationName::new("teams/rename");
        let mut cache: EntityCache<Team, String> = EntityCache::new();

        let result = cache.observe_update(RequestEvent::fulfilled(
            rename.clone(),
            EntityUpdate::new("ghost".to_string(), "Renamed".to_string()),
        ));

        assert_eq!(result, Err(NotFoundOnUpdate { id: "ghost".to_string() }));
        assert!(cache.entities.is_empty());
        assert_eq!(cache.requests.status(rename.as_str()), RequestStatus::Fulfilled);
    }
}
