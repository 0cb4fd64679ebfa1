//! Normalized entity storage.
//!
//! An [`EntityStore`] keeps at most one record per id together with the
//! order in which ids were first inserted. Re-inserting an id replaces the
//! record but keeps its original position.

use crate::error::NotFoundOnUpdate;
use indexmap::IndexMap;
use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;

/// A record with a stable identifier that can be merged with a partial update.
///
/// `Patch` is the partial form of the record: every field it carries
/// overwrites the matching field of the stored record, every field it leaves
/// out keeps its current value.
///
/// # Example
///
/// ```
/// use loadstate_core::entity::Entity;
///
/// #[derive(Clone, Debug)]
/// struct Team {
///     id: u64,
///     name: String,
///     member_count: u32,
/// }
///
/// #[derive(Default)]
/// struct TeamPatch {
///     name: Option<String>,
///     member_count: Option<u32>,
/// }
///
/// impl Entity for Team {
///     type Id = u64;
///     type Patch = TeamPatch;
///
///     fn id(&self) -> &u64 {
///         &self.id
///     }
///
///     fn apply_patch(&mut self, patch: TeamPatch) {
///         if let Some(name) = patch.name {
///             self.name = name;
///         }
///         if let Some(member_count) = patch.member_count {
///             self.member_count = member_count;
///         }
///     }
/// }
/// ```
pub trait Entity {
    /// Identifier type; unique within a store
    type Id: Clone + Eq + Hash + fmt::Debug;

    /// Partial form of the record used by [`EntityStore::update_one`]
    type Patch;

    /// The record's identifier
    fn id(&self) -> &Self::Id;

    /// Shallow-merge `patch` into this record
    fn apply_patch(&mut self, patch: Self::Patch);
}

/// Keyed collection of entities with insertion order.
pub struct EntityStore<T: Entity> {
    entities: IndexMap<T::Id, T>,
}

impl<T: Entity> EntityStore<T> {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self {
            entities: IndexMap::new(),
        }
    }

    /// Insert or fully replace one entity. Returns `true` if the id was new.
    pub fn upsert_one(&mut self, entity: T) -> bool {
        let id = entity.id().clone();
        // IndexMap keeps the slot of an existing key on insert.
        self.entities.insert(id, entity).is_none()
    }

    /// Insert or fully replace every entity in `records`.
    ///
    /// New ids are appended in iteration order; existing ids keep the
    /// position of their first insertion.
    pub fn upsert_many<I>(&mut self, records: I)
    where
        I: IntoIterator<Item = T>,
    {
        let mut added = 0usize;
        let mut replaced = 0usize;
        for entity in records {
            if self.upsert_one(entity) {
                added += 1;
            } else {
                replaced += 1;
            }
        }
        tracing::trace!(added, replaced, total = self.entities.len(), "Upserted entities");
    }

    /// Merge `patch` into the entity stored under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`NotFoundOnUpdate`] if no entity is stored under `id`. The
    /// store is not modified in that case.
    pub fn update_one(&mut self, id: &T::Id, patch: T::Patch) -> Result<(), NotFoundOnUpdate<T::Id>> {
        match self.entities.get_mut(id) {
            Some(entity) => {
                entity.apply_patch(patch);
                Ok(())
            },
            None => Err(NotFoundOnUpdate { id: id.clone() }),
        }
    }

    /// Look up an entity by id, or by anything the id borrows as
    #[must_use]
    pub fn get<Q>(&self, id: &Q) -> Option<&T>
    where
        T::Id: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entities.get(id)
    }

    /// Whether an entity is stored under `id`
    #[must_use]
    pub fn contains<Q>(&self, id: &Q) -> bool
    where
        T::Id: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entities.contains_key(id)
    }

    /// All entities in insertion order
    #[must_use]
    pub fn all(&self) -> Vec<&T> {
        self.entities.values().collect()
    }

    /// Iterate over entities in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entities.values()
    }

    /// Ids in insertion order
    pub fn ids(&self) -> impl Iterator<Item = &T::Id> {
        self.entities.keys()
    }

    /// Number of stored entities
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl<T: Entity> Default for EntityStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity + Clone> Clone for EntityStore<T> {
    fn clone(&self) -> Self {
        Self {
            entities: self.entities.clone(),
        }
    }
}

impl<T: Entity + fmt::Debug> fmt::Debug for EntityStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entities.iter()).finish()
    }
}

impl<T: Entity> FromIterator<T> for EntityStore<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut store = Self::new();
        store.upsert_many(iter);
        store
    }
}
