// ============================================================================
// Query evaluation pipeline
//
// Root rows come out of the store in insertion order. The pipeline is:
// root filter, link expansion, then either grouped aggregation or the
// sort / page / project tail. Totals are taken before the page slice so
// callers can size their cursors.
// ============================================================================

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::core::{Record, Result, ServiceError, Value};
use crate::query::ast::{
    AggregateExpr, AggregateOp, ColumnSet, Condition, FilterNode, FilterType, JoinKind, LinkNode,
    PagingInfo, QueryTree,
};
use crate::query::operators;
use crate::query::sort::sort_records;
use crate::query::RecordSet;
use crate::store::RecordStore;

pub struct QueryEvaluator<'a> {
    store: &'a RecordStore,
}

impl<'a> QueryEvaluator<'a> {
    pub fn new(store: &'a RecordStore) -> Self {
        Self { store }
    }

    pub fn evaluate(&self, query: &QueryTree) -> Result<RecordSet> {
        let descriptor = self.store.catalog().entity(&query.entity)?;
        let primary_key = descriptor.primary_key.clone();

        let mut rows = self.store.snapshot(&query.entity)?;
        if let Some(filter) = &query.filter {
            rows = filter_rows(rows, filter)?;
        }
        for link in &query.links {
            rows = self.apply_link(rows, link)?;
        }

        if query.is_aggregate() {
            rows = aggregate_rows(rows, query)?;
            sort_records(&mut rows, &query.order);
            let total = rows.len() as u64;
            let (records, more_records, next_page) = paginate(rows, query.paging)?;
            return Ok(RecordSet {
                records,
                more_records,
                next_page,
                total,
            });
        }

        sort_records(&mut rows, &query.order);
        let total = rows.len() as u64;
        let (page, more_records, next_page) = paginate(rows, query.paging)?;
        let records = page
            .into_iter()
            .map(|record| query.columns.project(record, &primary_key))
            .collect();

        Ok(RecordSet {
            records,
            more_records,
            next_page,
            total,
        })
    }

    /// Expand rows through one link. Inner joins drop unmatched parents,
    /// outer joins keep them as-is. Each match yields its own row.
    fn apply_link(&self, parents: Vec<Record>, link: &LinkNode) -> Result<Vec<Record>> {
        self.store.catalog().entity(&link.entity)?;

        let mut candidates = self.store.snapshot(&link.entity)?;
        if let Some(filter) = &link.filter {
            candidates = filter_rows(candidates, filter)?;
        }
        for nested in &link.links {
            candidates = self.apply_link(candidates, nested)?;
        }

        let alias = link.effective_alias();
        let mut out = Vec::new();
        for parent in parents {
            let parent_key = parent.attribute(&link.to);
            let mut matched = false;
            for candidate in &candidates {
                if join_keys_equal(parent_key, candidate.attribute(&link.from)) {
                    matched = true;
                    let mut row = parent.clone();
                    merge_linked(&mut row, candidate, alias, &link.columns);
                    out.push(row);
                }
            }
            if !matched && link.join == JoinKind::Outer {
                out.push(parent);
            }
        }
        Ok(out)
    }
}

fn filter_rows(rows: Vec<Record>, filter: &FilterNode) -> Result<Vec<Record>> {
    let mut kept = Vec::with_capacity(rows.len());
    for record in rows {
        if evaluate_filter(filter, &record)? {
            kept.push(record);
        }
    }
    Ok(kept)
}

/// An empty node matches everything, whichever combinator it carries.
pub fn evaluate_filter(filter: &FilterNode, record: &Record) -> Result<bool> {
    if filter.is_empty() {
        return Ok(true);
    }
    match filter.filter_type {
        FilterType::And => {
            for condition in &filter.conditions {
                if !evaluate_condition(condition, record)? {
                    return Ok(false);
                }
            }
            for nested in &filter.filters {
                if !evaluate_filter(nested, record)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        FilterType::Or => {
            for condition in &filter.conditions {
                if evaluate_condition(condition, record)? {
                    return Ok(true);
                }
            }
            for nested in &filter.filters {
                if evaluate_filter(nested, record)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
    }
}

fn evaluate_condition(condition: &Condition, record: &Record) -> Result<bool> {
    operators::apply(
        condition.operator,
        record.attribute(&condition.attribute),
        &condition.values,
    )
}

/// Null join keys never match, so orphaned references fall out of inner
/// joins instead of cross-matching each other.
fn join_keys_equal(parent: &Value, candidate: &Value) -> bool {
    if parent.is_null() || candidate.is_null() {
        return false;
    }
    parent
        .compare(candidate)
        .map(|o| o == Ordering::Equal)
        .unwrap_or(false)
}

fn merge_linked(row: &mut Record, linked: &Record, alias: &str, columns: &ColumnSet) {
    for (name, value) in &linked.attributes {
        // Attributes already namespaced by a deeper link pass through.
        if name.contains('.') {
            row.set(name.clone(), value.clone());
            continue;
        }
        let wanted = match columns {
            ColumnSet::All => true,
            ColumnSet::None => false,
            ColumnSet::Columns(list) => list.iter().any(|c| c == name),
        };
        if wanted {
            row.set(format!("{}.{}", alias, name), value.clone());
        }
    }
}

// ============================================================================
// Aggregation
// ============================================================================

fn aggregate_rows(rows: Vec<Record>, query: &QueryTree) -> Result<Vec<Record>> {
    let mut order: Vec<Vec<Value>> = Vec::new();
    let mut groups: HashMap<Vec<Value>, Vec<Record>> = HashMap::new();

    for row in rows {
        let key: Vec<Value> = query
            .group_by
            .iter()
            .map(|g| row.attribute(&g.attribute).clone())
            .collect();
        if !groups.contains_key(&key) {
            order.push(key.clone());
        }
        groups.entry(key).or_default().push(row);
    }

    // Without grouping the whole set is one group, present even when empty.
    if query.group_by.is_empty() && order.is_empty() {
        order.push(Vec::new());
        groups.insert(Vec::new(), Vec::new());
    }

    let mut out = Vec::with_capacity(order.len());
    for key in order {
        let members = groups.remove(&key).unwrap_or_default();
        let mut row = Record::new(&query.entity);
        for (part, group) in key.into_iter().zip(&query.group_by) {
            row.set(group.alias.clone(), part);
        }
        for expr in &query.aggregates {
            row.set(expr.alias.clone(), compute_aggregate(expr, &members)?);
        }
        out.push(row);
    }
    Ok(out)
}

fn compute_aggregate(expr: &AggregateExpr, rows: &[Record]) -> Result<Value> {
    let values: Vec<&Value> = rows
        .iter()
        .map(|r| r.attribute(&expr.attribute))
        .filter(|v| !v.is_null())
        .collect();

    match expr.op {
        AggregateOp::Count => Ok(Value::Integer(rows.len() as i64)),
        AggregateOp::CountColumn => Ok(Value::Integer(values.len() as i64)),
        AggregateOp::Sum | AggregateOp::Avg => numeric_fold(expr, &values),
        AggregateOp::Min => Ok(extreme(&values, Ordering::Less)),
        AggregateOp::Max => Ok(extreme(&values, Ordering::Greater)),
    }
}

fn numeric_fold(expr: &AggregateExpr, values: &[&Value]) -> Result<Value> {
    if values.is_empty() {
        return Ok(Value::Null);
    }
    let mut sum = 0.0;
    let mut all_integer = true;
    let mut any_money = false;
    for value in values {
        let n = value.as_f64().ok_or_else(|| {
            ServiceError::TypeMismatch(format!(
                "cannot aggregate '{}' over {}",
                expr.attribute,
                value.type_name()
            ))
        })?;
        sum += n;
        match value {
            Value::Money(_) => {
                any_money = true;
                all_integer = false;
            }
            Value::Integer(_) | Value::Choice(_) => {}
            _ => all_integer = false,
        }
    }
    let result = match expr.op {
        AggregateOp::Avg => sum / values.len() as f64,
        _ => sum,
    };
    if any_money {
        Ok(Value::Money(result))
    } else if all_integer && expr.op != AggregateOp::Avg {
        Ok(Value::Integer(result as i64))
    } else {
        Ok(Value::Float(result))
    }
}

fn extreme(values: &[&Value], keep: Ordering) -> Value {
    let mut best: Option<&Value> = None;
    for value in values {
        match best {
            None => best = Some(value),
            Some(current) => {
                if value.compare(current).map(|o| o == keep).unwrap_or(false) {
                    best = Some(value);
                }
            }
        }
    }
    best.cloned().unwrap_or(Value::Null)
}

// ============================================================================
// Paging
// ============================================================================

fn paginate(
    rows: Vec<Record>,
    paging: Option<PagingInfo>,
) -> Result<(Vec<Record>, bool, Option<u32>)> {
    let Some(paging) = paging else {
        return Ok((rows, false, None));
    };
    if paging.count == 0 {
        return Err(ServiceError::malformed(
            "fetch",
            "page size must be positive",
        ));
    }
    let total = rows.len();
    let page = paging.page.max(1);
    let start = (page as usize - 1) * paging.count as usize;
    let slice: Vec<Record> = rows
        .into_iter()
        .skip(start)
        .take(paging.count as usize)
        .collect();
    let more = start + slice.len() < total;
    let next = if more { Some(page + 1) } else { None };
    Ok((slice, more, next))
}
