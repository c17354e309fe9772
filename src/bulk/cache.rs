use std::collections::BTreeSet;

use dashmap::DashMap;

/// Cyclic-field knowledge accumulated across creation plans.
///
/// Additive only: once a field is known to sit on a reference cycle it
/// stays deferred for every later plan against the same store. Entries
/// use add-if-absent discipline so concurrent planners never clobber
/// each other.
#[derive(Debug, Default)]
pub struct CyclicFieldCache {
    fields: DashMap<String, BTreeSet<String>>,
}

impl CyclicFieldCache {
    pub fn new() -> Self {
        Self {
            fields: DashMap::new(),
        }
    }

    pub fn note(&self, entity: &str, field: &str) {
        self.fields
            .entry(entity.to_string())
            .or_default()
            .insert(field.to_string());
    }

    pub fn is_cyclic(&self, entity: &str, field: &str) -> bool {
        self.fields
            .get(entity)
            .map(|set| set.contains(field))
            .unwrap_or(false)
    }

    /// Known cyclic fields of one type, in name order.
    pub fn fields_for(&self, entity: &str) -> Vec<String> {
        self.fields
            .get(entity)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
