// ============================================================================
// Multi-key record sorting
//
// Stable sort so equal keys keep insertion order. NULL placement follows
// the usual convention: NULLS LAST for ascending, NULLS FIRST for
// descending.
// ============================================================================

use std::cmp::Ordering;

use crate::core::{Record, Value};
use crate::query::ast::OrderKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullOrdering {
    NullsFirst,
    NullsLast,
}

impl NullOrdering {
    pub fn default_for_direction(descending: bool) -> Self {
        if descending {
            Self::NullsFirst
        } else {
            Self::NullsLast
        }
    }
}

/// One attribute in sort priority order.
#[derive(Debug, Clone)]
pub struct SortKey {
    pub attribute: String,
    pub descending: bool,
    pub null_ordering: NullOrdering,
}

impl SortKey {
    pub fn new(attribute: impl Into<String>, descending: bool) -> Self {
        Self {
            attribute: attribute.into(),
            descending,
            null_ordering: NullOrdering::default_for_direction(descending),
        }
    }
}

impl From<&OrderKey> for SortKey {
    fn from(key: &OrderKey) -> Self {
        Self::new(key.attribute.clone(), key.descending)
    }
}

/// Compares two records over a list of sort keys.
pub struct RecordComparator<'a> {
    keys: &'a [SortKey],
}

impl<'a> RecordComparator<'a> {
    pub fn new(keys: &'a [SortKey]) -> Self {
        Self { keys }
    }

    pub fn compare(&self, left: &Record, right: &Record) -> Ordering {
        for key in self.keys {
            let ordering = compare_by_key(left, right, key);
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

fn compare_by_key(left: &Record, right: &Record, key: &SortKey) -> Ordering {
    let a = left.attribute(&key.attribute);
    let b = right.attribute(&key.attribute);

    let ordering = match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => match key.null_ordering {
            NullOrdering::NullsFirst => Ordering::Less,
            NullOrdering::NullsLast => Ordering::Greater,
        },
        (false, true) => match key.null_ordering {
            NullOrdering::NullsFirst => Ordering::Greater,
            NullOrdering::NullsLast => Ordering::Less,
        },
        // Incomparable pairs collapse to Equal so a stray attribute
        // cannot abort a whole result set.
        (false, false) => compare_values(a, b).unwrap_or(Ordering::Equal),
    };

    if key.descending {
        ordering.reverse()
    } else {
        ordering
    }
}

fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    a.compare(b).ok()
}

/// Sort records in place by the given order keys. Stable, so records
/// that tie on every key keep their relative positions.
pub fn sort_records(records: &mut [Record], order: &[OrderKey]) {
    if records.is_empty() || order.is_empty() {
        return;
    }
    let keys: Vec<SortKey> = order.iter().map(SortKey::from).collect();
    let comparator = RecordComparator::new(&keys);
    records.sort_by(|a, b| comparator.compare(a, b));
}
