// ============================================================================
// Declarative query documents, rendering side
//
// Output is canonical: two-space indent, fixed child order (columns,
// filter, links, orders), default attribute values omitted. Rendering a
// parsed document and parsing a rendered tree are inverse operations for
// everything the grammar covers.
// ============================================================================

use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};

use crate::core::{Result, ServiceError};
use crate::query::ast::{
    ColumnSet, Condition, ConditionOperator, FilterNode, JoinKind, LinkNode, QueryTree,
};

pub fn render_document(tree: &QueryTree) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    write_fetch(&mut writer, tree)?;
    String::from_utf8(writer.into_inner())
        .map_err(|e| ServiceError::malformed("fetch", e.to_string()))
}

type XmlWriter = Writer<Vec<u8>>;

fn emit(writer: &mut XmlWriter, event: Event) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| ServiceError::malformed("fetch", e.to_string()))
}

fn write_fetch(writer: &mut XmlWriter, tree: &QueryTree) -> Result<()> {
    let mut fetch = BytesStart::new("fetch");
    if let Some(paging) = &tree.paging {
        fetch.push_attribute(("page", paging.page.to_string().as_str()));
        fetch.push_attribute(("count", paging.count.to_string().as_str()));
    }
    if tree.is_aggregate() {
        if tree.columns != ColumnSet::All {
            return Err(ServiceError::malformed(
                "fetch",
                "aggregate query cannot project plain columns",
            ));
        }
        fetch.push_attribute(("aggregate", "true"));
    }
    emit(writer, Event::Start(fetch))?;
    write_entity(writer, tree)?;
    emit(writer, Event::End(BytesEnd::new("fetch")))
}

fn write_entity(writer: &mut XmlWriter, tree: &QueryTree) -> Result<()> {
    let mut entity = BytesStart::new("entity");
    entity.push_attribute(("name", tree.entity.as_str()));

    let has_children = tree.is_aggregate()
        || tree.columns != ColumnSet::None
        || tree.filter.is_some()
        || !tree.links.is_empty()
        || !tree.order.is_empty();
    if !has_children {
        return emit(writer, Event::Empty(entity));
    }
    emit(writer, Event::Start(entity))?;

    if tree.is_aggregate() {
        for group in &tree.group_by {
            let mut element = BytesStart::new("attribute");
            element.push_attribute(("name", group.attribute.as_str()));
            element.push_attribute(("alias", group.alias.as_str()));
            element.push_attribute(("groupby", "true"));
            emit(writer, Event::Empty(element))?;
        }
        for aggregate in &tree.aggregates {
            let mut element = BytesStart::new("attribute");
            element.push_attribute(("name", aggregate.attribute.as_str()));
            element.push_attribute(("alias", aggregate.alias.as_str()));
            element.push_attribute(("aggregate", aggregate.op.name()));
            emit(writer, Event::Empty(element))?;
        }
    } else {
        write_columns(writer, &tree.columns)?;
    }

    if let Some(filter) = &tree.filter {
        write_filter(writer, filter)?;
    }
    for link in &tree.links {
        write_link(writer, link)?;
    }
    for key in &tree.order {
        let mut order = BytesStart::new("order");
        order.push_attribute(("attribute", key.attribute.as_str()));
        if key.descending {
            order.push_attribute(("descending", "true"));
        }
        emit(writer, Event::Empty(order))?;
    }

    emit(writer, Event::End(BytesEnd::new("entity")))
}

fn write_columns(writer: &mut XmlWriter, columns: &ColumnSet) -> Result<()> {
    match columns {
        ColumnSet::All => emit(writer, Event::Empty(BytesStart::new("all-attributes"))),
        ColumnSet::None => Ok(()),
        ColumnSet::Columns(list) => {
            for name in list {
                let mut element = BytesStart::new("attribute");
                element.push_attribute(("name", name.as_str()));
                emit(writer, Event::Empty(element))?;
            }
            Ok(())
        }
    }
}

fn write_filter(writer: &mut XmlWriter, filter: &FilterNode) -> Result<()> {
    let mut node = BytesStart::new("filter");
    node.push_attribute(("type", filter.filter_type.name()));
    if filter.is_empty() {
        return emit(writer, Event::Empty(node));
    }
    emit(writer, Event::Start(node))?;
    for condition in &filter.conditions {
        write_condition(writer, condition)?;
    }
    for nested in &filter.filters {
        write_filter(writer, nested)?;
    }
    emit(writer, Event::End(BytesEnd::new("filter")))
}

fn write_condition(writer: &mut XmlWriter, condition: &Condition) -> Result<()> {
    let ok = match condition.operator.expected_operands() {
        Some(expected) => condition.values.len() == expected,
        None => !condition.values.is_empty(),
    };
    if !ok {
        return Err(ServiceError::malformed(
            "condition",
            format!(
                "operator '{}' cannot take {} value(s)",
                condition.operator.name(),
                condition.values.len()
            ),
        ));
    }

    let mut node = BytesStart::new("condition");
    node.push_attribute(("attribute", condition.attribute.as_str()));
    node.push_attribute(("operator", condition.operator.name()));

    let multi_valued = matches!(
        condition.operator,
        ConditionOperator::In
            | ConditionOperator::NotIn
            | ConditionOperator::Between
            | ConditionOperator::NotBetween
    );
    if multi_valued {
        emit(writer, Event::Start(node))?;
        for value in &condition.values {
            emit(writer, Event::Start(BytesStart::new("value")))?;
            emit(writer, Event::Text(BytesText::new(&value.to_string())))?;
            emit(writer, Event::End(BytesEnd::new("value")))?;
        }
        emit(writer, Event::End(BytesEnd::new("condition")))
    } else {
        if let Some(value) = condition.values.first() {
            node.push_attribute(("value", value.to_string().as_str()));
        }
        emit(writer, Event::Empty(node))
    }
}

fn write_link(writer: &mut XmlWriter, link: &LinkNode) -> Result<()> {
    let mut node = BytesStart::new("link");
    node.push_attribute(("name", link.entity.as_str()));
    node.push_attribute(("from", link.from.as_str()));
    node.push_attribute(("to", link.to.as_str()));
    if let Some(alias) = &link.alias {
        node.push_attribute(("alias", alias.as_str()));
    }
    if link.join == JoinKind::Outer {
        node.push_attribute(("type", link.join.name()));
    }

    let has_children =
        link.columns != ColumnSet::None || link.filter.is_some() || !link.links.is_empty();
    if !has_children {
        return emit(writer, Event::Empty(node));
    }
    emit(writer, Event::Start(node))?;
    write_columns(writer, &link.columns)?;
    if let Some(filter) = &link.filter {
        write_filter(writer, filter)?;
    }
    for nested in &link.links {
        write_link(writer, nested)?;
    }
    emit(writer, Event::End(BytesEnd::new("link")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Value;
    use crate::fetch::parse_document;
    use crate::query::ast::{AggregateExpr, AggregateOp, FilterNode, GroupByExpr, OrderKey};

    fn sample_tree() -> QueryTree {
        QueryTree::new("widget")
            .columns(ColumnSet::columns(["name", "price"]))
            .filter(
                FilterNode::and()
                    .condition(Condition::single(
                        "price",
                        ConditionOperator::Greater,
                        "10",
                    ))
                    .filter(
                        FilterNode::or()
                            .condition(Condition::equal("color", "red"))
                            .condition(Condition::equal("color", "blue")),
                    ),
            )
            .link(
                LinkNode::new("order_line", "widget_id", "widget_id")
                    .alias("o")
                    .outer()
                    .columns(ColumnSet::columns(["quantity"])),
            )
            .order_by(OrderKey::desc("price"))
            .page(2, 10)
    }

    #[test]
    fn parse_of_render_reproduces_the_tree() {
        let tree = sample_tree();
        let document = render_document(&tree).unwrap();
        let reparsed = parse_document(&document).unwrap();
        assert_eq!(reparsed, tree);
    }

    #[test]
    fn render_of_parse_is_canonical_fixpoint() {
        let tree = sample_tree();
        let first = render_document(&tree).unwrap();
        let second = render_document(&parse_document(&first).unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn multi_valued_conditions_render_value_children() {
        let tree = QueryTree::new("widget").filter(FilterNode::and().condition(Condition::new(
            "color",
            ConditionOperator::In,
            vec![Value::from("red"), Value::from("blue")],
        )));
        let document = render_document(&tree).unwrap();
        assert!(document.contains("<value>red</value>"));
        assert!(document.contains("<value>blue</value>"));

        let reparsed = parse_document(&document).unwrap();
        assert_eq!(reparsed, tree);
    }

    #[test]
    fn aggregate_trees_round_trip() {
        let tree = QueryTree::new("widget")
            .group(GroupByExpr::new("color", "color_group"))
            .aggregate(AggregateExpr::new("price", "total", AggregateOp::Sum));
        let document = render_document(&tree).unwrap();
        assert!(document.contains("aggregate=\"true\""));
        assert_eq!(parse_document(&document).unwrap(), tree);
    }

    #[test]
    fn typed_operands_normalize_to_a_stable_document() {
        let tree = QueryTree::new("widget").filter(FilterNode::and().condition(
            Condition::single("price", ConditionOperator::Greater, Value::Money(10.5)),
        ));
        let first = render_document(&tree).unwrap();
        let second = render_document(&parse_document(&first).unwrap()).unwrap();
        assert_eq!(first, second);
        assert!(first.contains("value=\"10.5\""));
    }

    #[test]
    fn special_characters_survive_the_round_trip() {
        let tree = QueryTree::new("widget").filter(FilterNode::and().condition(
            Condition::equal("note", "a & b <tag> \"quoted\""),
        ));
        let document = render_document(&tree).unwrap();
        let reparsed = parse_document(&document).unwrap();
        assert_eq!(reparsed, tree);
    }

    #[test]
    fn invalid_arity_is_rejected_before_writing() {
        let tree = QueryTree::new("widget").filter(FilterNode::and().condition(Condition::new(
            "price",
            ConditionOperator::Between,
            vec![Value::from("1")],
        )));
        assert!(render_document(&tree).is_err());
    }

    #[test]
    fn aggregate_with_explicit_columns_is_rejected() {
        let mut tree = QueryTree::new("widget")
            .aggregate(AggregateExpr::new("price", "n", AggregateOp::Count));
        tree.columns = ColumnSet::columns(["name"]);
        assert!(render_document(&tree).is_err());
    }
}
