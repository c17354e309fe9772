use uuid::Uuid;

use crate::command::Response;
use crate::core::{Record, RecordRef, Result, ServiceError, Value};
use crate::query::ColumnSet;
use crate::schema::RelationshipDef;

use super::context::ExecutionContext;
use super::relate;

pub fn create(ctx: &ExecutionContext<'_>, record: Record) -> Result<Response> {
    Ok(Response::Created(create_record(ctx, record)?))
}

pub fn update(ctx: &ExecutionContext<'_>, mut record: Record) -> Result<Response> {
    let related = std::mem::take(&mut record.related);
    let parent = record.reference();
    ctx.store.update(record, ctx.options)?;
    for (relationship, children) in related {
        attach_children(ctx, &parent, &relationship, children)?;
    }
    Ok(Response::Updated)
}

pub fn delete(ctx: &ExecutionContext<'_>, entity: &str, id: Uuid) -> Result<Response> {
    ctx.store.delete(entity, id)?;
    Ok(Response::Deleted)
}

pub fn retrieve(
    ctx: &ExecutionContext<'_>,
    entity: &str,
    id: Uuid,
    columns: &ColumnSet,
) -> Result<Response> {
    Ok(Response::Retrieved(ctx.store.retrieve(entity, id, columns)?))
}

/// Stores the record, then wires any related sub-collections through their
/// named relationships. Children may carry sub-collections of their own.
pub(super) fn create_record(ctx: &ExecutionContext<'_>, mut record: Record) -> Result<Uuid> {
    let related = std::mem::take(&mut record.related);
    let entity = record.entity.clone();
    let id = ctx.store.create(record, ctx.options)?;
    let parent = RecordRef::new(entity, id);
    for (relationship, children) in related {
        attach_children(ctx, &parent, &relationship, children)?;
    }
    Ok(id)
}

fn attach_children(
    ctx: &ExecutionContext<'_>,
    parent: &RecordRef,
    relationship: &str,
    children: Vec<Record>,
) -> Result<()> {
    let definition = ctx.store.catalog().relationship(relationship)?.clone();
    match definition {
        RelationshipDef::OneToMany {
            one_entity,
            many_entity,
            reference_field,
            ..
        } => {
            if parent.entity != one_entity {
                return Err(ServiceError::malformed(
                    relationship,
                    format!("sub-collection parent must be a '{one_entity}' record"),
                ));
            }
            for mut child in children {
                if child.entity != many_entity {
                    return Err(ServiceError::malformed(
                        relationship,
                        format!("sub-collection records must be '{many_entity}' records"),
                    ));
                }
                child.set(reference_field.clone(), Value::Reference(parent.clone()));
                create_record(ctx, child)?;
            }
        }
        RelationshipDef::ManyToMany { .. } => {
            let mut refs = Vec::with_capacity(children.len());
            for child in children {
                let entity = child.entity.clone();
                let id = create_record(ctx, child)?;
                refs.push(RecordRef::new(entity, id));
            }
            relate::associate(ctx, &parent.entity, parent.id, relationship, &refs)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AttributeDescriptor, AttributeKind, EntityDescriptor, SchemaCatalog};
    use crate::store::{RecordStore, ServiceOptions};

    fn catalog() -> SchemaCatalog {
        SchemaCatalog::builder()
            .entity(
                EntityDescriptor::new("author")
                    .attribute(AttributeDescriptor::new("name", AttributeKind::Text)),
            )
            .unwrap()
            .entity(
                EntityDescriptor::new("book")
                    .attribute(AttributeDescriptor::new("title", AttributeKind::Text))
                    .attribute(AttributeDescriptor::new(
                        "author_id",
                        AttributeKind::Reference {
                            target: "author".to_string(),
                        },
                    )),
            )
            .unwrap()
            .relationship(RelationshipDef::one_to_many(
                "author_books",
                "author",
                "book",
                "author_id",
            ))
            .unwrap()
            .build()
    }

    #[test]
    fn create_wires_sub_collections_through_the_relationship() {
        let store = RecordStore::new(catalog());
        let options = ServiceOptions::new();
        let ctx = ExecutionContext::new(&store, &options);

        let mut author = Record::new("author").with("name", "Ann");
        author.add_related("author_books", Record::new("book").with("title", "One"));
        author.add_related("author_books", Record::new("book").with("title", "Two"));

        let Response::Created(author_id) = create(&ctx, author).unwrap() else {
            panic!("expected a created response");
        };

        let books = store.snapshot("book").unwrap();
        assert_eq!(books.len(), 2);
        for book in &books {
            let reference = book.get_reference("author_id").unwrap();
            assert_eq!(reference.id, author_id);
            assert_eq!(reference.entity, "author");
        }
    }

    #[test]
    fn sub_collection_with_wrong_record_type_is_rejected() {
        let store = RecordStore::new(catalog());
        let options = ServiceOptions::new();
        let ctx = ExecutionContext::new(&store, &options);

        let mut author = Record::new("author").with("name", "Ann");
        author.add_related("author_books", Record::new("author").with("name", "Bo"));

        let err = create(&ctx, author).unwrap_err();
        assert!(matches!(err, ServiceError::Malformed { .. }));
    }

    #[test]
    fn retrieve_projects_requested_columns() {
        let store = RecordStore::new(catalog());
        let options = ServiceOptions::new();
        let ctx = ExecutionContext::new(&store, &options);

        let record = Record::new("author").with("name", "Ann");
        let Response::Created(id) = create(&ctx, record).unwrap() else {
            panic!("expected a created response");
        };

        let response = retrieve(&ctx, "author", id, &ColumnSet::columns(["name"])).unwrap();
        let Response::Retrieved(fetched) = response else {
            panic!("expected a retrieved response");
        };
        assert_eq!(fetched.attribute("name"), &Value::Text("Ann".to_string()));
        assert!(fetched.contains("author_id"));
        assert!(!fetched.contains(crate::core::fields::CREATED_AT));
    }
}
