use crate::command::{QueryInput, Response};
use crate::core::Result;
use crate::fetch;
use crate::query::QueryEvaluator;

use super::context::ExecutionContext;

/// Normalizes the input to a query tree, then evaluates it against the
/// store. Documents go through the declarative bridge first.
pub fn retrieve_multiple(ctx: &ExecutionContext<'_>, input: QueryInput) -> Result<Response> {
    let tree = match input {
        QueryInput::Tree(tree) => tree,
        QueryInput::Document(document) => fetch::parse_document(&document)?,
    };
    let set = QueryEvaluator::new(ctx.store).evaluate(&tree)?;
    Ok(Response::RetrievedMultiple(set))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Record;
    use crate::schema::{AttributeDescriptor, AttributeKind, EntityDescriptor, SchemaCatalog};
    use crate::store::{RecordStore, ServiceOptions};

    fn seeded_store() -> RecordStore {
        let catalog = SchemaCatalog::builder()
            .entity(
                EntityDescriptor::new("widget")
                    .attribute(AttributeDescriptor::new("name", AttributeKind::Text))
                    .attribute(AttributeDescriptor::new("price", AttributeKind::Money)),
            )
            .unwrap()
            .build();
        let store = RecordStore::new(catalog);
        let options = ServiceOptions::new();
        for (name, price) in [("anvil", 5.0), ("bolt", 15.0), ("cog", 20.0)] {
            store
                .create(
                    Record::new("widget").with("name", name).with("price", crate::core::Value::Money(price)),
                    &options,
                )
                .unwrap();
        }
        store
    }

    #[test]
    fn document_input_is_parsed_before_evaluation() {
        let store = seeded_store();
        let options = ServiceOptions::new();
        let ctx = ExecutionContext::new(&store, &options);

        let document = r#"<fetch>
  <entity name="widget">
    <attribute name="name"/>
    <filter type="and">
      <condition attribute="price" operator="gt" value="10"/>
    </filter>
    <order attribute="name"/>
  </entity>
</fetch>"#;

        let response = retrieve_multiple(&ctx, QueryInput::Document(document.to_string())).unwrap();
        let Response::RetrievedMultiple(set) = response else {
            panic!("expected a record set");
        };
        let names: Vec<_> = set
            .records
            .iter()
            .map(|r| r.attribute("name").to_string())
            .collect();
        assert_eq!(names, vec!["bolt", "cog"]);
    }

    #[test]
    fn malformed_document_is_rejected() {
        let store = seeded_store();
        let options = ServiceOptions::new();
        let ctx = ExecutionContext::new(&store, &options);

        let err = retrieve_multiple(&ctx, QueryInput::Document("<entity/>".to_string())).unwrap_err();
        assert!(matches!(err, crate::core::ServiceError::Malformed { .. }));
    }
}
