use std::sync::Arc;

use dashmap::DashMap;

use crate::schema::SchemaCatalog;
use crate::store::memory::RecordStore;

/// Named shared stores. An explicit object rather than a process-wide
/// static: whoever wants sharing passes the registry around.
///
/// `open` is add-if-absent, so every caller opening the same name gets the
/// same store; the first opener's catalog wins.
pub struct StoreRegistry {
    stores: DashMap<String, Arc<RecordStore>>,
}

impl StoreRegistry {
    pub fn new() -> Self {
        Self {
            stores: DashMap::new(),
        }
    }

    pub fn open(&self, name: &str, catalog: &SchemaCatalog) -> Arc<RecordStore> {
        if let Some(existing) = self.stores.get(name) {
            return existing.value().clone();
        }
        self.stores
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(RecordStore::new(catalog.clone())))
            .value()
            .clone()
    }

    pub fn get(&self, name: &str) -> Option<Arc<RecordStore>> {
        self.stores.get(name).map(|store| store.value().clone())
    }

    /// Drops the named store. Handles already cloned out keep working on
    /// the detached instance.
    pub fn reset(&self, name: &str) -> bool {
        self.stores.remove(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.stores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }
}

impl Default for StoreRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Record;
    use crate::store::options::ServiceOptions;
    use crate::schema::EntityDescriptor;

    fn catalog() -> SchemaCatalog {
        SchemaCatalog::builder()
            .entity(EntityDescriptor::new("widget"))
            .unwrap()
            .build()
    }

    #[test]
    fn test_same_name_shares_state() {
        let registry = StoreRegistry::new();
        let catalog = catalog();
        let a = registry.open("suite", &catalog);
        let b = registry.open("suite", &catalog);

        let id = a
            .create(Record::new("widget"), &ServiceOptions::new())
            .unwrap();
        assert!(b.contains("widget", id));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_distinct_names_are_isolated() {
        let registry = StoreRegistry::new();
        let catalog = catalog();
        let a = registry.open("one", &catalog);
        let b = registry.open("two", &catalog);

        let id = a
            .create(Record::new("widget"), &ServiceOptions::new())
            .unwrap();
        assert!(!b.contains("widget", id));
    }

    #[test]
    fn test_reset() {
        let registry = StoreRegistry::new();
        let catalog = catalog();
        registry.open("suite", &catalog);
        assert!(registry.reset("suite"));
        assert!(!registry.reset("suite"));
        assert!(registry.get("suite").is_none());
    }
}
