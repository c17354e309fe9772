use uuid::Uuid;

use crate::core::Record;
use crate::query::RecordSet;
use crate::schema::{AttributeDescriptor, ChoiceList, EntityDescriptor};

// ==================== Response ====================

/// Result of one dispatched request, mirroring the `Request` variants.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Created(Uuid),
    Updated,
    Deleted,
    Retrieved(Record),
    RetrievedMultiple(RecordSet),
    Associated,
    Disassociated,
    StateSet,
    Assigned,
    Upserted(UpsertResult),
    Batch(BatchResult),
    Entity(EntityDescriptor),
    Attribute(AttributeDescriptor),
    Choices(ChoiceList),
    Identity(CallerIdentity),
}

/// Outcome of an upsert: the record's identity and whether the call
/// created it or updated an existing row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertResult {
    pub id: Uuid,
    pub created: bool,
}

/// The configured caller and owning unit, as reported by `WhoAmI`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerIdentity {
    pub caller: Uuid,
    pub owning_unit: Uuid,
}

// ==================== Batch Results ====================

/// A failed batch item, captured as data so the batch can keep going.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchFault {
    /// Position of the faulted request in the batch.
    pub index: usize,
    pub message: String,
    /// What the item was doing when it faulted.
    pub detail: String,
}

/// Per-item outcome. A completed item carries its response only when the
/// batch asked for responses; faults are always recorded.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutcome {
    Completed(Option<Response>),
    Faulted(BatchFault),
}

impl BatchOutcome {
    pub fn is_fault(&self) -> bool {
        matches!(self, BatchOutcome::Faulted(_))
    }
}

/// Outcomes of a batch in execution order. When the batch stopped at a
/// fault, items after it have no outcome entry at all.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BatchResult {
    pub outcomes: Vec<BatchOutcome>,
    pub faulted: bool,
}

impl BatchResult {
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn faults(&self) -> Vec<&BatchFault> {
        self.outcomes
            .iter()
            .filter_map(|outcome| match outcome {
                BatchOutcome::Faulted(fault) => Some(fault),
                BatchOutcome::Completed(_) => None,
            })
            .collect()
    }

    pub fn responses(&self) -> Vec<&Response> {
        self.outcomes
            .iter()
            .filter_map(|outcome| match outcome {
                BatchOutcome::Completed(Some(response)) => Some(response),
                _ => None,
            })
            .collect()
    }
}
