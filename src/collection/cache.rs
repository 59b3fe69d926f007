use crate::models::{Entity, EntityKind};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("{kind} {id} is not in the local collection")]
pub struct MissingEntity {
    pub kind: EntityKind,
    pub id: String,
}

/// The most recently fetched collection for one view.
///
/// Items stay in server order. `total` starts as the number of fetched items
/// (or the server-reported count for a paged fetch) and follows local
/// appends and removals.
#[derive(Debug, Clone)]
pub struct LocalCollection<E> {
    items: Vec<E>,
    total: usize,
}

impl<E> Default for LocalCollection<E> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
        }
    }
}

impl<E: Entity> LocalCollection<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: Vec<E>) -> Self {
        let total = items.len();
        Self { items, total }
    }

    /// Swap in a freshly fetched collection.
    pub fn replace(&mut self, items: Vec<E>) {
        self.total = items.len();
        self.items = items;
    }

    /// Swap in one server page; `total` is the count across all pages.
    pub fn replace_page(&mut self, items: Vec<E>, total: usize) {
        self.total = total.max(items.len());
        self.items = items;
    }

    pub fn items(&self) -> &[E] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn get(&self, id: &str) -> Option<&E> {
        self.items.iter().find(|e| e.id() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Add a newly created entity at the end.
    pub fn append(&mut self, entity: E) {
        self.items.push(entity);
        self.total += 1;
    }

    /// Replace the entity with the same id in place.
    pub fn replace_by_id(&mut self, entity: E) -> Result<(), MissingEntity> {
        match self.items.iter_mut().find(|e| e.id() == entity.id()) {
            Some(slot) => {
                *slot = entity;
                Ok(())
            }
            None => Err(MissingEntity {
                kind: E::KIND,
                id: entity.id().to_owned(),
            }),
        }
    }

    /// Remove the entity with `id` and decrement the total.
    pub fn remove_by_id(&mut self, id: &str) -> Result<E, MissingEntity> {
        let pos = self
            .items
            .iter()
            .position(|e| e.id() == id)
            .ok_or_else(|| MissingEntity {
                kind: E::KIND,
                id: id.to_owned(),
            })?;
        self.total = self.total.saturating_sub(1);
        Ok(self.items.remove(pos))
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.total = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::test_support::category;
    use pretty_assertions::assert_eq;

    fn ids<E: Entity>(c: &LocalCollection<E>) -> Vec<&str> {
        c.items().iter().map(|e| e.id()).collect()
    }

    #[test]
    fn test_replace_resets_total() {
        let mut cache = LocalCollection::from_items(vec![category("1", "A")]);
        cache.replace(vec![category("2", "B"), category("3", "C")]);
        assert_eq!(ids(&cache), vec!["2", "3"]);
        assert_eq!(cache.total(), 2);
    }

    #[test]
    fn test_replace_page_keeps_server_total() {
        let mut cache = LocalCollection::new();
        cache.replace_page(vec![category("1", "A")], 21);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.total(), 21);
    }

    #[test]
    fn test_append_and_replace_by_id() {
        let mut cache = LocalCollection::from_items(vec![category("1", "A")]);
        cache.append(category("2", "B"));
        assert_eq!(cache.total(), 2);

        cache.replace_by_id(category("1", "Renamed")).unwrap();
        assert_eq!(cache.get("1").unwrap().name, "Renamed");
        assert_eq!(ids(&cache), vec!["1", "2"]);
    }

    #[test]
    fn test_replace_missing_id_is_error() {
        let mut cache = LocalCollection::from_items(vec![category("1", "A")]);
        let err = cache.replace_by_id(category("9", "Z")).unwrap_err();
        assert_eq!(err.id, "9");
        assert_eq!(err.kind, EntityKind::Category);
        assert_eq!(cache.get("1").unwrap().name, "A");
    }

    #[test]
    fn test_remove_exactly_once() {
        let mut cache = LocalCollection::from_items(
            ["40", "41", "42", "43", "44"]
                .iter()
                .map(|id| category(id, id))
                .collect(),
        );
        let removed = cache.remove_by_id("42").unwrap();
        assert_eq!(removed.id, "42");
        assert_eq!(cache.len(), 4);
        assert_eq!(cache.total(), 4);
        assert!(!cache.contains("42"));

        assert!(cache.remove_by_id("42").is_err());
        assert_eq!(cache.total(), 4);
    }
}
