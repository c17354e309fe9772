use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use crate::core::{Record, Result, ServiceError};

/// Records of one logical type.
///
/// A `DashMap` keyed by identity gives sharded, per-entry locking; the
/// insertion sequence makes snapshots deterministic so sorting and paging
/// can tie-break on arrival order.
pub struct RecordTable {
    records: DashMap<Uuid, StoredRecord>,
    sequence: AtomicU64,
}

struct StoredRecord {
    seq: u64,
    record: Record,
}

impl RecordTable {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            sequence: AtomicU64::new(0),
        }
    }

    /// Atomic add-if-absent. The record must be fully built; readers never
    /// see it half-constructed because it enters the map in one move.
    pub fn insert(&self, record: Record) -> Result<()> {
        match self.records.entry(record.id) {
            Entry::Occupied(_) => Err(ServiceError::DuplicateIdentity {
                entity: record.entity.clone(),
                id: record.id,
            }),
            Entry::Vacant(slot) => {
                let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
                slot.insert(StoredRecord { seq, record });
                Ok(())
            }
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<Record> {
        self.records.get(id).map(|entry| entry.record.clone())
    }

    /// Read-modify-write under the entry lock. Returns false on a miss.
    pub fn modify<F>(&self, id: &Uuid, apply: F) -> bool
    where
        F: FnOnce(&mut Record),
    {
        match self.records.get_mut(id) {
            Some(mut entry) => {
                apply(&mut entry.record);
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, id: &Uuid) -> Option<Record> {
        self.records.remove(id).map(|(_, stored)| stored.record)
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.records.contains_key(id)
    }

    /// Clones of all records in insertion order.
    pub fn snapshot(&self) -> Vec<Record> {
        let mut rows: Vec<(u64, Record)> = self
            .records
            .iter()
            .map(|entry| (entry.seq, entry.record.clone()))
            .collect();
        rows.sort_by_key(|(seq, _)| *seq);
        rows.into_iter().map(|(_, record)| record).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for RecordTable {
    fn default() -> Self {
        Self::new()
    }
}
