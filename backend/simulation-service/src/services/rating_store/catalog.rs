use super::{Result, StoreError};
use crate::models::{CatalogEntry, EntityKey};
use std::collections::{BTreeSet, HashMap};

/// Ordered key catalog: position in `entries` is the dense index
#[derive(Debug, Clone)]
pub struct Catalog {
    name: &'static str,
    entries: Vec<CatalogEntry>,
    index: HashMap<EntityKey, usize>,
}

impl Catalog {
    /// Builds a catalog from externally supplied entries.
    ///
    /// Entries are sorted by key; a repeated key is a validation failure.
    pub fn from_entries(name: &'static str, mut entries: Vec<CatalogEntry>) -> Result<Self> {
        entries.sort_by(|a, b| a.key.cmp(&b.key));

        if let Some(pair) = entries.windows(2).find(|w| w[0].key == w[1].key) {
            return Err(StoreError::DuplicateKey {
                catalog: name,
                key: pair[0].key.to_string(),
            });
        }

        Ok(Self::indexed(name, entries))
    }

    /// Builds an attribute-less catalog from the keys seen in the ratings
    pub fn inferred<'a>(name: &'static str, keys: impl IntoIterator<Item = &'a EntityKey>) -> Self {
        let unique: BTreeSet<&EntityKey> = keys.into_iter().collect();
        let entries = unique
            .into_iter()
            .map(|key| CatalogEntry::new(key.clone()))
            .collect();

        Self::indexed(name, entries)
    }

    fn indexed(name: &'static str, entries: Vec<CatalogEntry>) -> Self {
        let index = entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| (entry.key.clone(), idx))
            .collect();

        Self {
            name,
            entries,
            index,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn entry(&self, idx: usize) -> Option<&CatalogEntry> {
        self.entries.get(idx)
    }

    pub fn key(&self, idx: usize) -> Option<&EntityKey> {
        self.entries.get(idx).map(|e| &e.key)
    }

    pub fn index_of(&self, key: &EntityKey) -> Option<usize> {
        self.index.get(key).copied()
    }

    /// Like `index_of`, but a missing key is an error
    pub fn require(&self, key: &EntityKey) -> Result<usize> {
        self.index_of(key).ok_or_else(|| StoreError::UnknownKey {
            catalog: self.name,
            key: key.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inferred_catalog_is_sorted_and_deduplicated() {
        let keys = vec![
            EntityKey::from(30),
            EntityKey::from(10),
            EntityKey::from(30),
            EntityKey::from(20),
        ];
        let catalog = Catalog::inferred("items", &keys);

        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.key(0), Some(&EntityKey::Int(10)));
        assert_eq!(catalog.key(2), Some(&EntityKey::Int(30)));
        assert_eq!(catalog.index_of(&EntityKey::Int(20)), Some(1));
    }

    #[test]
    fn test_duplicate_entries_rejected() {
        let entries = vec![
            CatalogEntry::new("a"),
            CatalogEntry::new("b"),
            CatalogEntry::new("a"),
        ];
        let err = Catalog::from_entries("users", entries).unwrap_err();

        assert_eq!(
            err,
            StoreError::DuplicateKey {
                catalog: "users",
                key: "a".to_string()
            }
        );
    }

    #[test]
    fn test_attributes_follow_sorted_position() {
        let entries = vec![
            CatalogEntry::new("z").with_attribute("genre", "jazz"),
            CatalogEntry::new("m").with_attribute("genre", "rock"),
        ];
        let catalog = Catalog::from_entries("items", entries).unwrap();

        let first = catalog.entry(0).unwrap();
        assert_eq!(first.key, EntityKey::from("m"));
        assert_eq!(first.attributes["genre"], "rock");
    }

    #[test]
    fn test_require_unknown_key() {
        let catalog = Catalog::inferred("users", &[EntityKey::from(1)]);
        assert!(matches!(
            catalog.require(&EntityKey::from(2)),
            Err(StoreError::UnknownKey { catalog: "users", .. })
        ));
    }
}
