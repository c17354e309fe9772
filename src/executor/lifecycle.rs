use uuid::Uuid;

use crate::command::Response;
use crate::core::{fields, Record, Result, ServiceError, Value};
use crate::schema::ActiveStatePolicy;

use super::context::ExecutionContext;

/// Applies the entity's active-state policy. Types without a policy cannot
/// change state.
pub fn set_state(
    ctx: &ExecutionContext<'_>,
    entity: &str,
    id: Uuid,
    state: i64,
    status: i64,
) -> Result<Response> {
    let policy = ctx.store.catalog().entity(entity)?.active_state;
    let patch = match policy {
        ActiveStatePolicy::None => {
            return Err(ServiceError::malformed(
                entity,
                "record type has no active-state policy",
            ));
        }
        ActiveStatePolicy::DisabledFlag => {
            Record::with_id(entity, id).with(fields::DISABLED, state != 0)
        }
        ActiveStatePolicy::StateStatus => Record::with_id(entity, id)
            .with(fields::STATE, state)
            .with(fields::STATUS, status),
    };
    ctx.store.update(patch, ctx.options)?;
    Ok(Response::StateSet)
}

/// Reassigns ownership. Modification audit fields advance with the write.
pub fn assign(ctx: &ExecutionContext<'_>, entity: &str, id: Uuid, owner: Uuid) -> Result<Response> {
    let patch = Record::with_id(entity, id).with(fields::OWNER_ID, Value::Id(owner));
    ctx.store.update(patch, ctx.options)?;
    Ok(Response::Assigned)
}
