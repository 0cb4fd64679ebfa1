//! Error types for the entity cache.
//!
//! Operation failures are not errors at this level: they are recorded as
//! data in the [`RequestRegistry`](crate::request::RequestRegistry). The only
//! error the core produces is the explicit result of updating an entity that
//! is not in the store.

use thiserror::Error;

/// A partial update targeted an id that is not in the store.
///
/// The store is left untouched. Reducers log this and carry on; it is
/// returned rather than swallowed so callers and tests can tell an ignored
/// update apart from one that was applied.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("no entity with id {id:?} to update")]
pub struct NotFoundOnUpdate<Id: std::fmt::Debug> {
    /// The id the update was addressed to
    pub id: Id,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_on_update_display() {
        let error = NotFoundOnUpdate { id: "grafana-clock-panel".to_string() };
        assert_eq!(
            error.to_string(),
            "no entity with id \"grafana-clock-panel\" to update"
        );
    }
}
