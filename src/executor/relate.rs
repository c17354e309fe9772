use uuid::Uuid;

use crate::command::Response;
use crate::core::{Record, RecordRef, Result, ServiceError, Value};
use crate::query::ColumnSet;
use crate::schema::{RelationshipDef, RelationshipSide};

use super::context::ExecutionContext;

// ==================== Associate ====================

pub fn associate(
    ctx: &ExecutionContext<'_>,
    entity: &str,
    id: Uuid,
    relationship: &str,
    related: &[RecordRef],
) -> Result<Response> {
    ensure_exists(ctx, entity, id)?;
    let definition = ctx.store.catalog().relationship(relationship)?.clone();
    match definition {
        RelationshipDef::OneToMany {
            one_entity,
            many_entity,
            reference_field,
            ..
        } => {
            let source = RecordRef::new(entity, id);
            if entity == one_entity {
                for target in related {
                    expect_side(target, &many_entity, relationship)?;
                    ensure_exists(ctx, &target.entity, target.id)?;
                    set_reference(ctx, target, &reference_field, Value::Reference(source.clone()))?;
                }
            } else if entity == many_entity {
                let target = single_target(related, relationship)?;
                expect_side(target, &one_entity, relationship)?;
                ensure_exists(ctx, &target.entity, target.id)?;
                set_reference(ctx, &source, &reference_field, Value::Reference(target.clone()))?;
            } else {
                return Err(not_a_member(entity, relationship));
            }
        }
        RelationshipDef::ManyToMany {
            intersect,
            side_a,
            side_b,
            ..
        } => {
            let (own, other) = orient(entity, &side_a, &side_b, relationship)?;
            for target in related {
                expect_side(target, &other.entity, relationship)?;
                ensure_exists(ctx, &target.entity, target.id)?;
                if find_link(ctx, &intersect, &own.field, id, &other.field, target.id)?.is_some() {
                    return Err(ServiceError::AssociationExists {
                        relationship: relationship.to_string(),
                        source: id,
                        target: target.id,
                    });
                }
                let row = Record::new(&intersect)
                    .with(own.field.clone(), Value::Reference(RecordRef::new(entity, id)))
                    .with(other.field.clone(), Value::Reference(target.clone()));
                ctx.store.create(row, ctx.options)?;
            }
        }
    }
    Ok(Response::Associated)
}

// ==================== Disassociate ====================

pub fn disassociate(
    ctx: &ExecutionContext<'_>,
    entity: &str,
    id: Uuid,
    relationship: &str,
    related: &[RecordRef],
) -> Result<Response> {
    ensure_exists(ctx, entity, id)?;
    let definition = ctx.store.catalog().relationship(relationship)?.clone();
    match definition {
        RelationshipDef::OneToMany {
            one_entity,
            many_entity,
            reference_field,
            ..
        } => {
            if entity == one_entity {
                for target in related {
                    expect_side(target, &many_entity, relationship)?;
                    clear_reference(ctx, target, &reference_field, id, relationship, target.id)?;
                }
            } else if entity == many_entity {
                let target = single_target(related, relationship)?;
                expect_side(target, &one_entity, relationship)?;
                let source = RecordRef::new(entity, id);
                clear_reference(ctx, &source, &reference_field, target.id, relationship, target.id)?;
            } else {
                return Err(not_a_member(entity, relationship));
            }
        }
        RelationshipDef::ManyToMany {
            intersect,
            side_a,
            side_b,
            ..
        } => {
            let (own, other) = orient(entity, &side_a, &side_b, relationship)?;
            for target in related {
                expect_side(target, &other.entity, relationship)?;
                let Some(row) = find_link(ctx, &intersect, &own.field, id, &other.field, target.id)?
                else {
                    return Err(ServiceError::AssociationNotFound {
                        relationship: relationship.to_string(),
                        source: id,
                        target: target.id,
                    });
                };
                ctx.store.delete(&intersect, row)?;
            }
        }
    }
    Ok(Response::Disassociated)
}

// ==================== Helpers ====================

fn ensure_exists(ctx: &ExecutionContext<'_>, entity: &str, id: Uuid) -> Result<()> {
    ctx.store.catalog().entity(entity)?;
    if ctx.store.contains(entity, id) {
        Ok(())
    } else {
        Err(ServiceError::NotFound {
            entity: entity.to_string(),
            id,
        })
    }
}

fn expect_side(target: &RecordRef, entity: &str, relationship: &str) -> Result<()> {
    if target.entity == entity {
        Ok(())
    } else {
        Err(ServiceError::malformed(
            relationship,
            format!("expected a '{entity}' record, got '{}'", target.entity),
        ))
    }
}

fn single_target<'a>(related: &'a [RecordRef], relationship: &str) -> Result<&'a RecordRef> {
    match related {
        [target] => Ok(target),
        _ => Err(ServiceError::malformed(
            relationship,
            "the referencing side takes exactly one target",
        )),
    }
}

fn not_a_member(entity: &str, relationship: &str) -> ServiceError {
    ServiceError::malformed(
        relationship,
        format!("record type '{entity}' is not a member of the relationship"),
    )
}

fn orient<'a>(
    entity: &str,
    side_a: &'a RelationshipSide,
    side_b: &'a RelationshipSide,
    relationship: &str,
) -> Result<(&'a RelationshipSide, &'a RelationshipSide)> {
    if entity == side_a.entity {
        Ok((side_a, side_b))
    } else if entity == side_b.entity {
        Ok((side_b, side_a))
    } else {
        Err(not_a_member(entity, relationship))
    }
}

fn set_reference(
    ctx: &ExecutionContext<'_>,
    target: &RecordRef,
    field: &str,
    value: Value,
) -> Result<()> {
    let patch = Record::with_id(&target.entity, target.id).with(field.to_string(), value);
    ctx.store.update(patch, ctx.options)
}

/// Clears `field` on `holder`, but only when it currently references
/// `expected`. Anything else means the association does not exist.
fn clear_reference(
    ctx: &ExecutionContext<'_>,
    holder: &RecordRef,
    field: &str,
    expected: Uuid,
    relationship: &str,
    reported_target: Uuid,
) -> Result<()> {
    let current = ctx.store.retrieve(&holder.entity, holder.id, &ColumnSet::All)?;
    match current.get_reference(field) {
        Some(reference) if reference.id == expected => {
            set_reference(ctx, holder, field, Value::Null)
        }
        _ => Err(ServiceError::AssociationNotFound {
            relationship: relationship.to_string(),
            source: holder.id,
            target: reported_target,
        }),
    }
}

/// Finds the intersect row linking the two records, if any.
fn find_link(
    ctx: &ExecutionContext<'_>,
    intersect: &str,
    own_field: &str,
    own_id: Uuid,
    other_field: &str,
    other_id: Uuid,
) -> Result<Option<Uuid>> {
    let rows = ctx.store.snapshot(intersect)?;
    Ok(rows
        .iter()
        .find(|row| {
            row.get_reference(own_field).is_some_and(|r| r.id == own_id)
                && row.get_reference(other_field).is_some_and(|r| r.id == other_id)
        })
        .map(|row| row.id))
}
