//! Request dispatch. One exhaustive `match` routes every command variant
//! to its handler, so the full command surface is checked at compile time.

pub mod batch;
pub mod context;
pub mod crud;
pub mod lifecycle;
pub mod metadata;
pub mod query;
pub mod relate;
pub mod upsert;

pub use context::ExecutionContext;

use tracing::debug;

use crate::command::{Request, Response};
use crate::core::{Result, ServiceError};

pub fn execute(ctx: &ExecutionContext<'_>, request: Request) -> Result<Response> {
    debug!(kind = request.kind(), "executing request");
    match request {
        Request::Create(record) => crud::create(ctx, record),
        Request::Update(record) => crud::update(ctx, record),
        Request::Delete { entity, id } => crud::delete(ctx, &entity, id),
        Request::Retrieve {
            entity,
            id,
            columns,
        } => crud::retrieve(ctx, &entity, id, &columns),
        Request::RetrieveMultiple(input) => query::retrieve_multiple(ctx, input),
        Request::Associate {
            entity,
            id,
            relationship,
            related,
        } => relate::associate(ctx, &entity, id, &relationship, &related),
        Request::Disassociate {
            entity,
            id,
            relationship,
            related,
        } => relate::disassociate(ctx, &entity, id, &relationship, &related),
        Request::SetState {
            entity,
            id,
            state,
            status,
        } => lifecycle::set_state(ctx, &entity, id, state, status),
        Request::Assign { entity, id, owner } => lifecycle::assign(ctx, &entity, id, owner),
        Request::Upsert(record) => upsert::upsert(ctx, record),
        Request::ExecuteBatch(request) => batch::execute_batch(ctx, request),
        Request::DescribeEntity(name) => metadata::describe_entity(ctx, &name),
        Request::DescribeAttribute { entity, attribute } => {
            metadata::describe_attribute(ctx, &entity, &attribute)
        }
        Request::DescribeChoices(name) => metadata::describe_choices(ctx, &name),
        Request::WhoAmI => metadata::who_am_i(ctx),
        Request::Custom { name, .. } => Err(ServiceError::UnsupportedCommand(name)),
    }
}
