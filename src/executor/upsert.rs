use std::cmp::Ordering;

use uuid::Uuid;

use crate::command::{Response, UpsertResult};
use crate::core::{Record, Result};

use super::context::ExecutionContext;
use super::crud;

/// Create-or-update in one call. A saved identity wins; an unsaved record
/// is matched through the entity's alternate key when one is declared and
/// every key attribute is present.
pub fn upsert(ctx: &ExecutionContext<'_>, record: Record) -> Result<Response> {
    Ok(Response::Upserted(resolve(ctx, record)?))
}

fn resolve(ctx: &ExecutionContext<'_>, mut record: Record) -> Result<UpsertResult> {
    if !record.is_unsaved() {
        return if ctx.store.contains(&record.entity, record.id) {
            let id = record.id;
            crud::update(ctx, record)?;
            Ok(UpsertResult { id, created: false })
        } else {
            let id = crud::create_record(ctx, record)?;
            Ok(UpsertResult { id, created: true })
        };
    }

    if let Some(existing) = match_alternate_key(ctx, &record)? {
        record.id = existing;
        crud::update(ctx, record)?;
        return Ok(UpsertResult {
            id: existing,
            created: false,
        });
    }

    let id = crud::create_record(ctx, record)?;
    Ok(UpsertResult { id, created: true })
}

/// Looks for a stored record whose alternate-key attributes all equal the
/// incoming ones. Records missing any key attribute never match.
fn match_alternate_key(ctx: &ExecutionContext<'_>, record: &Record) -> Result<Option<Uuid>> {
    let descriptor = ctx.store.catalog().entity(&record.entity)?;
    let Some(key) = &descriptor.alternate_key else {
        return Ok(None);
    };

    let mut probe = Vec::with_capacity(key.len());
    for field in key {
        match record.get(field) {
            Some(value) if !value.is_null() => probe.push((field.as_str(), value)),
            _ => return Ok(None),
        }
    }

    for row in ctx.store.snapshot(&record.entity)? {
        let matched = probe.iter().all(|(field, value)| {
            row.attribute(field)
                .compare(value)
                .map(|order| order == Ordering::Equal)
                .unwrap_or(false)
        });
        if matched {
            return Ok(Some(row.id));
        }
    }
    Ok(None)
}
