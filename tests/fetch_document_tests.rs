use memcrm::prelude::*;

fn catalog() -> SchemaCatalog {
    SchemaCatalog::builder()
        .entity(
            EntityDescriptor::new("widget")
                .attribute(AttributeDescriptor::new("name", AttributeKind::Text))
                .attribute(AttributeDescriptor::new("price", AttributeKind::Money)),
        )
        .unwrap()
        .entity(
            EntityDescriptor::new("order_line")
                .attribute(AttributeDescriptor::new("quantity", AttributeKind::Integer))
                .attribute(AttributeDescriptor::new(
                    "widget_id",
                    AttributeKind::reference("widget"),
                )),
        )
        .unwrap()
        .build()
}

fn sample_tree() -> QueryTree {
    QueryTree::new("widget")
        .columns(ColumnSet::columns(["name", "price"]))
        .filter(
            FilterNode::and()
                .condition(Condition::single(
                    "price",
                    ConditionOperator::Greater,
                    Value::Text("10".to_string()),
                ))
                .filter(
                    FilterNode::or()
                        .condition(Condition::new(
                            "name",
                            ConditionOperator::In,
                            vec![Value::Text("bolt".into()), Value::Text("cog".into())],
                        ))
                        .condition(Condition::null("name")),
                ),
        )
        .link(
            LinkNode::new("order_line", "widget_id", "widget_id")
                .alias("line")
                .outer(),
        )
        .order_by(OrderKey::desc("price"))
        .page(2, 25)
}

#[test]
fn test_parse_after_render_reproduces_the_tree() {
    let service = RecordService::new(catalog());
    let tree = sample_tree();

    let document = service.render_query(&tree).unwrap();
    let parsed = service.parse_query(&document).unwrap();
    assert_eq!(parsed, tree);
}

#[test]
fn test_render_is_a_fixpoint_for_parsed_documents() {
    let service = RecordService::new(catalog());

    let document = r#"<fetch page="1" count="10">
  <entity name="widget">
    <attribute name="name"/>
    <filter type="or">
      <condition attribute="price" operator="between">
        <value>5</value>
        <value>20</value>
      </condition>
      <condition attribute="name" operator="like" value="%bolt%"/>
    </filter>
    <order attribute="price" descending="true"/>
  </entity>
</fetch>"#;

    let once = service.parse_query(document).unwrap();
    let rendered = service.render_query(&once).unwrap();
    let twice = service.parse_query(&rendered).unwrap();
    assert_eq!(once, twice);
    assert_eq!(rendered, service.render_query(&twice).unwrap());
}

#[test]
fn test_document_drives_the_evaluator_end_to_end() {
    let service = RecordService::new(catalog());
    for (name, price) in [("anvil", 5.0), ("bolt", 15.0), ("cog", 20.0), ("dyno", 30.0)] {
        service
            .create(
                Record::new("widget")
                    .with("name", name)
                    .with("price", Value::Money(price)),
            )
            .unwrap();
    }

    let document = r#"<fetch count="2" page="1">
  <entity name="widget">
    <attribute name="name"/>
    <filter type="and">
      <condition attribute="price" operator="ge" value="15"/>
    </filter>
    <order attribute="price" descending="true"/>
  </entity>
</fetch>"#;

    let set = service.retrieve_multiple(document).unwrap();
    assert_eq!(set.total, 3);
    assert!(set.more_records);
    assert_eq!(set.next_page, Some(2));
    let names: Vec<_> = set
        .records
        .iter()
        .map(|r| r.attribute("name").to_string())
        .collect();
    assert_eq!(names, vec!["dyno", "cog"]);
}

#[test]
fn test_aggregate_documents_round_trip_and_evaluate() {
    let service = RecordService::new(catalog());
    for (name, price) in [("anvil", 10.0), ("bolt", 20.0), ("anvil", 30.0)] {
        service
            .create(
                Record::new("widget")
                    .with("name", name)
                    .with("price", Value::Money(price)),
            )
            .unwrap();
    }

    let document = r#"<fetch aggregate="true">
  <entity name="widget">
    <attribute name="name" alias="bucket" groupby="true"/>
    <attribute name="price" alias="total" aggregate="sum"/>
  </entity>
</fetch>"#;

    let tree = service.parse_query(document).unwrap();
    assert!(tree.is_aggregate());
    let rendered = service.render_query(&tree).unwrap();
    assert_eq!(service.parse_query(&rendered).unwrap(), tree);

    let set = service.retrieve_multiple(document).unwrap();
    assert_eq!(set.len(), 2);
    let anvil = set
        .records
        .iter()
        .find(|r| r.attribute("bucket").as_str() == Some("anvil"))
        .unwrap();
    assert_eq!(anvil.attribute("total"), &Value::Money(40.0));
}

#[test]
fn test_malformed_documents_name_the_offending_node() {
    let service = RecordService::new(catalog());

    let cases = [
        ("<entity name=\"widget\"/>", "fetch"),
        ("<fetch><entity><attribute name=\"x\"/></entity></fetch>", "entity"),
        (
            "<fetch><entity name=\"w\"><filter type=\"nand\"/></entity></fetch>",
            "filter",
        ),
        (
            "<fetch><entity name=\"w\"><filter><condition attribute=\"a\" operator=\"resembles\" value=\"x\"/></filter></entity></fetch>",
            "condition",
        ),
    ];
    for (document, node) in cases {
        let err = service.parse_query(document).unwrap_err();
        match err {
            ServiceError::Malformed { node: named, .. } => assert_eq!(named, node),
            other => panic!("expected malformed error, got {other:?}"),
        }
    }
}

#[test]
fn test_operand_arity_is_checked_at_parse_time() {
    let service = RecordService::new(catalog());

    // between takes exactly two operands.
    let document = r#"<fetch>
  <entity name="widget">
    <filter type="and">
      <condition attribute="price" operator="between">
        <value>5</value>
      </condition>
    </filter>
  </entity>
</fetch>"#;
    assert!(service.parse_query(document).is_err());

    // null takes none.
    let document = r#"<fetch>
  <entity name="widget">
    <filter type="and">
      <condition attribute="price" operator="null" value="5"/>
    </filter>
  </entity>
</fetch>"#;
    assert!(service.parse_query(document).is_err());
}
