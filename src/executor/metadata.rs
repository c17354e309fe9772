use crate::command::{CallerIdentity, Response};
use crate::core::Result;

use super::context::ExecutionContext;

pub fn describe_entity(ctx: &ExecutionContext<'_>, name: &str) -> Result<Response> {
    Ok(Response::Entity(ctx.store.catalog().entity(name)?.clone()))
}

pub fn describe_attribute(
    ctx: &ExecutionContext<'_>,
    entity: &str,
    attribute: &str,
) -> Result<Response> {
    Ok(Response::Attribute(
        ctx.store.catalog().attribute(entity, attribute)?.clone(),
    ))
}

pub fn describe_choices(ctx: &ExecutionContext<'_>, name: &str) -> Result<Response> {
    Ok(Response::Choices(ctx.store.catalog().choices(name)?.clone()))
}

pub fn who_am_i(ctx: &ExecutionContext<'_>) -> Result<Response> {
    Ok(Response::Identity(CallerIdentity {
        caller: ctx.options.caller,
        owning_unit: ctx.options.owning_unit,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ServiceError;
    use crate::schema::{
        AttributeDescriptor, AttributeKind, ChoiceList, EntityDescriptor, SchemaCatalog,
    };
    use crate::store::{RecordStore, ServiceOptions};

    fn store() -> RecordStore {
        let catalog = SchemaCatalog::builder()
            .entity(
                EntityDescriptor::new("widget")
                    .attribute(AttributeDescriptor::new("color", AttributeKind::Choice)),
            )
            .unwrap()
            .choices(ChoiceList::new("colors", [(1, "red"), (2, "blue")]))
            .unwrap()
            .build();
        RecordStore::new(catalog)
    }

    #[test]
    fn descriptors_come_back_as_clones() {
        let store = store();
        let options = ServiceOptions::new();
        let ctx = ExecutionContext::new(&store, &options);

        let Response::Entity(entity) = describe_entity(&ctx, "widget").unwrap() else {
            panic!("expected an entity descriptor");
        };
        assert_eq!(entity.logical_name, "widget");
        assert_eq!(entity.primary_key, "widget_id");

        let Response::Attribute(attribute) = describe_attribute(&ctx, "widget", "color").unwrap()
        else {
            panic!("expected an attribute descriptor");
        };
        assert_eq!(attribute.kind, AttributeKind::Choice);

        let Response::Choices(choices) = describe_choices(&ctx, "colors").unwrap() else {
            panic!("expected a choice list");
        };
        assert_eq!(choices.options.len(), 2);
    }

    #[test]
    fn unknown_names_are_typed_errors() {
        let store = store();
        let options = ServiceOptions::new();
        let ctx = ExecutionContext::new(&store, &options);

        assert!(matches!(
            describe_entity(&ctx, "gadget").unwrap_err(),
            ServiceError::EntityNotRegistered(_)
        ));
        assert!(matches!(
            describe_attribute(&ctx, "widget", "shape").unwrap_err(),
            ServiceError::AttributeNotFound { .. }
        ));
        assert!(matches!(
            describe_choices(&ctx, "sizes").unwrap_err(),
            ServiceError::ChoicesNotFound(_)
        ));
    }

    #[test]
    fn who_am_i_reports_the_configured_identity() {
        let store = store();
        let options = ServiceOptions::new();
        let ctx = ExecutionContext::new(&store, &options);

        let Response::Identity(identity) = who_am_i(&ctx).unwrap() else {
            panic!("expected an identity");
        };
        assert_eq!(identity.caller, options.caller);
        assert_eq!(identity.owning_unit, options.owning_unit);
    }
}
