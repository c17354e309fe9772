use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tracing::trace;
use uuid::Uuid;

use crate::bulk::CyclicFieldCache;
use crate::core::{fields, Record, Result, ServiceError, Value};
use crate::query::ast::ColumnSet;
use crate::schema::{ActiveStatePolicy, EntityDescriptor, NamePartsSpec, SchemaCatalog};
use crate::store::options::ServiceOptions;
use crate::store::table::RecordTable;

/// Typed record store: one table per registered record type.
///
/// All operations are synchronous and thread-safe; mutations on one identity
/// are atomic against each other through the table's entry locks. The store
/// carries no caller state, write behavior arrives per call in
/// [`ServiceOptions`].
pub struct RecordStore {
    catalog: SchemaCatalog,
    tables: DashMap<String, Arc<RecordTable>>,
    cyclic_fields: CyclicFieldCache,
}

impl RecordStore {
    pub fn new(catalog: SchemaCatalog) -> Self {
        Self {
            catalog,
            tables: DashMap::new(),
            cyclic_fields: CyclicFieldCache::new(),
        }
    }

    pub fn catalog(&self) -> &SchemaCatalog {
        &self.catalog
    }

    /// Cyclic-field knowledge shared by every bulk-create plan on this store.
    pub fn cyclic_fields(&self) -> &CyclicFieldCache {
        &self.cyclic_fields
    }

    /// Creates the record, stamping identity, audit fields, ownership,
    /// active-state defaults and the composite display name where the caller
    /// did not supply them. Child collections in `related` are the command
    /// layer's job; the store ignores them.
    pub fn create(&self, mut record: Record, options: &ServiceOptions) -> Result<Uuid> {
        let descriptor = self.catalog.entity(&record.entity)?;
        if record.id.is_nil() {
            record.id = Uuid::new_v4();
        }

        let now = Utc::now();
        stamp_if_absent(&mut record, fields::CREATED_AT, Value::Timestamp(now));
        let created = record
            .attribute(fields::CREATED_AT)
            .as_timestamp()
            .unwrap_or(now);
        stamp_if_absent(&mut record, fields::MODIFIED_AT, Value::Timestamp(created));
        stamp_if_absent(&mut record, fields::CREATED_BY, Value::Id(options.caller));
        stamp_if_absent(&mut record, fields::MODIFIED_BY, Value::Id(options.caller));
        stamp_if_absent(&mut record, fields::OWNER_ID, Value::Id(options.caller));
        stamp_if_absent(
            &mut record,
            fields::OWNING_UNIT,
            Value::Id(options.owning_unit),
        );

        match descriptor.active_state {
            ActiveStatePolicy::None => {}
            ActiveStatePolicy::DisabledFlag => {
                stamp_if_absent(&mut record, fields::DISABLED, Value::Boolean(false));
            }
            ActiveStatePolicy::StateStatus => {
                stamp_if_absent(&mut record, fields::STATE, Value::Integer(0));
                stamp_if_absent(&mut record, fields::STATUS, Value::Integer(1));
            }
        }

        if let Some(parts) = &descriptor.name_parts {
            compose_display_name(&mut record, parts, &options.name_template);
        }

        record
            .attributes
            .insert(descriptor.primary_key.clone(), Value::Id(record.id));

        self.validate_values(descriptor, &record)?;
        self.validate_required(descriptor, &record)?;
        if options.validate_references {
            self.validate_references(&record)?;
        }

        let id = record.id;
        let entity = record.entity.clone();
        self.table(&entity).insert(record)?;
        trace!(entity = %entity, id = %id, "record created");
        Ok(id)
    }

    /// Projection-aware read. `ColumnSet::None` yields the identity alone.
    pub fn retrieve(&self, entity: &str, id: Uuid, columns: &ColumnSet) -> Result<Record> {
        let descriptor = self.catalog.entity(entity)?;
        let record = self
            .lookup_table(entity)
            .and_then(|table| table.get(&id))
            .ok_or_else(|| ServiceError::NotFound {
                entity: entity.to_string(),
                id,
            })?;
        Ok(columns.project(record, &descriptor.primary_key))
    }

    /// Merges the supplied attributes into the stored record. Modification
    /// audit fields are stamped unconditionally and `modified_at` strictly
    /// increases even when the clock does not advance.
    pub fn update(&self, record: Record, options: &ServiceOptions) -> Result<()> {
        let descriptor = self.catalog.entity(&record.entity)?;
        if record.id.is_nil() {
            return Err(ServiceError::malformed(
                record.entity.clone(),
                "update requires a saved identity",
            ));
        }
        self.validate_values(descriptor, &record)?;
        if options.validate_references {
            self.validate_references(&record)?;
        }

        let entity = record.entity.clone();
        let id = record.id;
        let primary_key = descriptor.primary_key.clone();
        let caller = options.caller;
        let not_found = || ServiceError::NotFound {
            entity: entity.clone(),
            id,
        };

        let table = self.lookup_table(&entity).ok_or_else(not_found)?;
        let attributes = record.attributes;
        let updated = table.modify(&id, move |stored| {
            for (name, value) in attributes {
                stored.attributes.insert(name, value);
            }
            let previous = stored.attribute(fields::MODIFIED_AT).as_timestamp();
            stored.set(fields::MODIFIED_AT, Value::Timestamp(advance(previous)));
            stored.set(fields::MODIFIED_BY, Value::Id(caller));
            stored.attributes.insert(primary_key, Value::Id(id));
        });
        if !updated {
            return Err(not_found());
        }
        trace!(entity = %entity, id = %id, "record updated");
        Ok(())
    }

    /// Removes the record. A second delete of the same identity is a typed
    /// miss, not a crash. Nothing cascades.
    pub fn delete(&self, entity: &str, id: Uuid) -> Result<()> {
        self.catalog.entity(entity)?;
        let removed = self
            .lookup_table(entity)
            .and_then(|table| table.remove(&id));
        match removed {
            Some(_) => {
                trace!(entity = %entity, id = %id, "record deleted");
                Ok(())
            }
            None => Err(ServiceError::NotFound {
                entity: entity.to_string(),
                id,
            }),
        }
    }

    /// All records of a type, insertion-ordered.
    pub fn snapshot(&self, entity: &str) -> Result<Vec<Record>> {
        self.catalog.entity(entity)?;
        Ok(self
            .lookup_table(entity)
            .map(|table| table.snapshot())
            .unwrap_or_default())
    }

    pub fn contains(&self, entity: &str, id: Uuid) -> bool {
        self.lookup_table(entity)
            .map(|table| table.contains(&id))
            .unwrap_or(false)
    }

    pub fn len(&self, entity: &str) -> usize {
        self.lookup_table(entity)
            .map(|table| table.len())
            .unwrap_or(0)
    }

    fn table(&self, entity: &str) -> Arc<RecordTable> {
        if let Some(existing) = self.tables.get(entity) {
            return existing.value().clone();
        }
        self.tables
            .entry(entity.to_string())
            .or_insert_with(|| Arc::new(RecordTable::new()))
            .value()
            .clone()
    }

    fn lookup_table(&self, entity: &str) -> Option<Arc<RecordTable>> {
        self.tables.get(entity).map(|table| table.value().clone())
    }

    fn validate_values(&self, descriptor: &EntityDescriptor, record: &Record) -> Result<()> {
        for (name, value) in &record.attributes {
            if let Some(attribute) = descriptor.get_attribute(name) {
                attribute.validate(value)?;
            }
        }
        Ok(())
    }

    fn validate_required(&self, descriptor: &EntityDescriptor, record: &Record) -> Result<()> {
        for attribute in descriptor.attributes.iter().filter(|a| a.required) {
            if record.attribute(&attribute.name).is_null() {
                return Err(ServiceError::malformed(
                    attribute.name.clone(),
                    "required attribute missing",
                ));
            }
        }
        Ok(())
    }

    fn validate_references(&self, record: &Record) -> Result<()> {
        for value in record.attributes.values() {
            if let Value::Reference(reference) = value {
                if !self.catalog.has_entity(&reference.entity) {
                    return Err(ServiceError::EntityNotRegistered(reference.entity.clone()));
                }
                if !self.contains(&reference.entity, reference.id) {
                    return Err(ServiceError::NotFound {
                        entity: reference.entity.clone(),
                        id: reference.id,
                    });
                }
            }
        }
        Ok(())
    }
}

fn stamp_if_absent(record: &mut Record, name: &str, value: Value) {
    if !record.contains(name) {
        record.set(name, value);
    }
}

fn advance(previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    match previous {
        Some(prev) if now <= prev => prev + Duration::microseconds(1),
        _ => now,
    }
}

fn compose_display_name(record: &mut Record, parts: &NamePartsSpec, template: &str) {
    if record.contains(&parts.target) {
        return;
    }
    let first = record.attribute(&parts.first).as_str().unwrap_or("");
    let last = record.attribute(&parts.last).as_str().unwrap_or("");
    if first.is_empty() && last.is_empty() {
        return;
    }
    let full = template
        .replace("{first}", first)
        .replace("{last}", last)
        .trim()
        .to_string();
    record.set(parts.target.clone(), full);
}
