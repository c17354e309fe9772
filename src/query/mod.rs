//! Structured queries: the tree model, condition operators, LIKE
//! matching, multi-key sort and the evaluation pipeline.

pub mod ast;
pub mod evaluator;
pub mod operators;
pub mod pattern;
pub mod sort;

use serde::{Deserialize, Serialize};

use crate::core::Record;

pub use ast::{
    AggregateExpr, AggregateOp, ColumnSet, Condition, ConditionOperator, FilterNode, FilterType,
    GroupByExpr, JoinKind, LinkNode, OrderKey, PagingInfo, QueryTree,
};
pub use evaluator::QueryEvaluator;

/// One page of query results.
///
/// `total` counts every matching row before the page slice, `next_page`
/// is the cursor to hand back when `more_records` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordSet {
    pub records: Vec<Record>,
    pub more_records: bool,
    pub next_page: Option<u32>,
    pub total: u64,
}

impl RecordSet {
    pub fn empty() -> Self {
        Self {
            records: Vec::new(),
            more_records: false,
            next_page: None,
            total: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn first(&self) -> Option<&Record> {
        self.records.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }
}

impl IntoIterator for RecordSet {
    type Item = Record;
    type IntoIter = std::vec::IntoIter<Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}
