// ============================================================================
// Declarative query documents, parsing side
//
// Grammar:
//   <fetch [page count] [aggregate="true"]>
//     <entity name>
//       <all-attributes/> | <attribute name [alias aggregate groupby]/>*
//       <filter type="and|or"> condition* filter* </filter>        (0 or 1)
//       <link name from to [alias] [type="inner|outer"]> ... </link>*
//       <order attribute [descending="true"]/>*
//     </entity>
//   </fetch>
//
// Conditions carry one operand in a `value` attribute or several in
// nested <value> elements. Operands stay textual; the evaluator coerces
// them against stored values. Anything outside the grammar fails with an
// error naming the offending node, nothing is dropped silently.
// ============================================================================

use quick_xml::Reader;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesStart, Event};

use crate::core::{Result, ServiceError, Value};
use crate::query::ast::{
    AggregateExpr, AggregateOp, ColumnSet, Condition, ConditionOperator, FilterNode, FilterType,
    GroupByExpr, JoinKind, LinkNode, OrderKey, PagingInfo, QueryTree,
};

pub fn parse_document(document: &str) -> Result<QueryTree> {
    let mut parser = DocumentParser {
        reader: Reader::from_str(document),
    };
    parser.parse()
}

/// One attribute element, classified by its modifiers.
enum ParsedAttribute {
    Column(String),
    Aggregate(AggregateExpr),
    Group(GroupByExpr),
}

struct DocumentParser<'a> {
    reader: Reader<&'a [u8]>,
}

impl<'a> DocumentParser<'a> {
    fn parse(&mut self) -> Result<QueryTree> {
        match self.next()? {
            Event::Start(e) if e.name().as_ref() == b"fetch" => self.parse_fetch(e),
            Event::Empty(e) if e.name().as_ref() == b"fetch" => {
                Err(ServiceError::malformed("fetch", "missing entity node"))
            }
            Event::Eof => Err(ServiceError::malformed("fetch", "document has no fetch node")),
            other => Err(unexpected("fetch", &other)),
        }
    }

    fn parse_fetch(&mut self, start: BytesStart<'a>) -> Result<QueryTree> {
        let mut page = None;
        let mut count = None;
        let mut aggregate = false;
        for attr in start.attributes() {
            let attr = attr.map_err(|e| ServiceError::malformed("fetch", e.to_string()))?;
            let value = attr_text(&attr, "fetch")?;
            match attr.key.as_ref() {
                b"page" => page = Some(parse_u32(&value, "fetch")?),
                b"count" => count = Some(parse_u32(&value, "fetch")?),
                b"aggregate" => aggregate = parse_bool(&value, "fetch")?,
                other => return Err(unknown_attribute("fetch", other)),
            }
        }

        let mut tree: Option<QueryTree> = None;
        loop {
            match self.next()? {
                Event::Start(e) if e.name().as_ref() == b"entity" => {
                    if tree.is_some() {
                        return Err(ServiceError::malformed("fetch", "multiple entity nodes"));
                    }
                    tree = Some(self.parse_entity(e, aggregate, false)?);
                }
                Event::Empty(e) if e.name().as_ref() == b"entity" => {
                    if tree.is_some() {
                        return Err(ServiceError::malformed("fetch", "multiple entity nodes"));
                    }
                    tree = Some(self.parse_entity(e, aggregate, true)?);
                }
                Event::End(e) if e.name().as_ref() == b"fetch" => break,
                other => return Err(unexpected("fetch", &other)),
            }
        }
        let mut tree = tree.ok_or_else(|| ServiceError::malformed("fetch", "missing entity node"))?;

        match (page, count) {
            (Some(_), None) => {
                return Err(ServiceError::malformed("fetch", "page requires count"));
            }
            (page, Some(count)) => tree.paging = Some(PagingInfo::new(page.unwrap_or(1), count)),
            (None, None) => {}
        }
        if aggregate && !tree.is_aggregate() {
            return Err(ServiceError::malformed(
                "fetch",
                "aggregate fetch declares no aggregations",
            ));
        }
        Ok(tree)
    }

    fn parse_entity(
        &mut self,
        start: BytesStart<'a>,
        aggregate_mode: bool,
        is_empty: bool,
    ) -> Result<QueryTree> {
        let mut name = None;
        for attr in start.attributes() {
            let attr = attr.map_err(|e| ServiceError::malformed("entity", e.to_string()))?;
            let value = attr_text(&attr, "entity")?;
            match attr.key.as_ref() {
                b"name" => name = Some(value),
                other => return Err(unknown_attribute("entity", other)),
            }
        }
        let name = name.ok_or_else(|| ServiceError::malformed("entity", "missing name attribute"))?;

        let mut tree = QueryTree::new(name);
        let mut columns: Vec<String> = Vec::new();
        let mut all_attributes = false;

        if !is_empty {
            loop {
                let (element, started) = match self.next()? {
                    Event::Start(e) => (e, true),
                    Event::Empty(e) => (e, false),
                    Event::End(e) if e.name().as_ref() == b"entity" => break,
                    other => return Err(unexpected("entity", &other)),
                };
                match element.name().as_ref() {
                    b"all-attributes" => {
                        all_attributes = true;
                        if started {
                            self.expect_end(b"all-attributes")?;
                        }
                    }
                    b"attribute" => match self.parse_attribute_element(element, started)? {
                        ParsedAttribute::Column(column) => {
                            if aggregate_mode {
                                return Err(ServiceError::malformed(
                                    "attribute",
                                    "aggregate fetch requires aggregate or groupby on every attribute",
                                ));
                            }
                            columns.push(column);
                        }
                        ParsedAttribute::Aggregate(expr) => {
                            if !aggregate_mode {
                                return Err(ServiceError::malformed(
                                    "attribute",
                                    "aggregate requires an aggregate fetch",
                                ));
                            }
                            tree.aggregates.push(expr);
                        }
                        ParsedAttribute::Group(expr) => {
                            if !aggregate_mode {
                                return Err(ServiceError::malformed(
                                    "attribute",
                                    "groupby requires an aggregate fetch",
                                ));
                            }
                            tree.group_by.push(expr);
                        }
                    },
                    b"filter" => {
                        if tree.filter.is_some() {
                            return Err(ServiceError::malformed("entity", "multiple filter nodes"));
                        }
                        tree.filter = Some(self.parse_filter(element, started)?);
                    }
                    b"link" => tree.links.push(self.parse_link(element, started)?),
                    b"order" => tree.order.push(self.parse_order(element, started)?),
                    other => {
                        return Err(ServiceError::malformed(
                            "entity",
                            format!("unexpected node <{}>", String::from_utf8_lossy(other)),
                        ));
                    }
                }
            }
        }

        if all_attributes && aggregate_mode {
            return Err(ServiceError::malformed(
                "entity",
                "all-attributes is meaningless in an aggregate fetch",
            ));
        }
        if all_attributes && !columns.is_empty() {
            return Err(ServiceError::malformed(
                "entity",
                "all-attributes conflicts with an attribute list",
            ));
        }
        if !aggregate_mode {
            tree.columns = if all_attributes {
                ColumnSet::All
            } else if !columns.is_empty() {
                ColumnSet::Columns(columns)
            } else {
                ColumnSet::None
            };
        }
        Ok(tree)
    }

    fn parse_attribute_element(
        &mut self,
        start: BytesStart<'a>,
        started: bool,
    ) -> Result<ParsedAttribute> {
        let mut name = None;
        let mut alias = None;
        let mut aggregate = None;
        let mut groupby = false;
        for attr in start.attributes() {
            let attr = attr.map_err(|e| ServiceError::malformed("attribute", e.to_string()))?;
            let value = attr_text(&attr, "attribute")?;
            match attr.key.as_ref() {
                b"name" => name = Some(value),
                b"alias" => alias = Some(value),
                b"aggregate" => {
                    aggregate = Some(AggregateOp::from_name(&value).ok_or_else(|| {
                        ServiceError::malformed(
                            "attribute",
                            format!("unknown aggregate '{}'", value),
                        )
                    })?);
                }
                b"groupby" => groupby = parse_bool(&value, "attribute")?,
                other => return Err(unknown_attribute("attribute", other)),
            }
        }
        if started {
            self.expect_end(b"attribute")?;
        }
        let name =
            name.ok_or_else(|| ServiceError::malformed("attribute", "missing name attribute"))?;

        if groupby {
            if aggregate.is_some() {
                return Err(ServiceError::malformed(
                    "attribute",
                    "groupby cannot also aggregate",
                ));
            }
            let alias = alias.ok_or_else(|| {
                ServiceError::malformed("attribute", "groupby requires an alias")
            })?;
            return Ok(ParsedAttribute::Group(GroupByExpr::new(name, alias)));
        }
        if let Some(op) = aggregate {
            let alias = alias.ok_or_else(|| {
                ServiceError::malformed("attribute", "aggregate requires an alias")
            })?;
            return Ok(ParsedAttribute::Aggregate(AggregateExpr::new(name, alias, op)));
        }
        if alias.is_some() {
            return Err(ServiceError::malformed(
                "attribute",
                "alias requires aggregate or groupby",
            ));
        }
        Ok(ParsedAttribute::Column(name))
    }

    fn parse_filter(&mut self, start: BytesStart<'a>, started: bool) -> Result<FilterNode> {
        let mut filter_type = FilterType::And;
        for attr in start.attributes() {
            let attr = attr.map_err(|e| ServiceError::malformed("filter", e.to_string()))?;
            let value = attr_text(&attr, "filter")?;
            match attr.key.as_ref() {
                b"type" => {
                    filter_type = FilterType::from_name(&value).ok_or_else(|| {
                        ServiceError::malformed(
                            "filter",
                            format!("unknown filter type '{}'", value),
                        )
                    })?;
                }
                other => return Err(unknown_attribute("filter", other)),
            }
        }

        let mut node = FilterNode {
            filter_type,
            conditions: Vec::new(),
            filters: Vec::new(),
        };
        if started {
            loop {
                let (element, child_started) = match self.next()? {
                    Event::Start(e) => (e, true),
                    Event::Empty(e) => (e, false),
                    Event::End(e) if e.name().as_ref() == b"filter" => break,
                    other => return Err(unexpected("filter", &other)),
                };
                match element.name().as_ref() {
                    b"condition" => node
                        .conditions
                        .push(self.parse_condition(element, child_started)?),
                    b"filter" => node.filters.push(self.parse_filter(element, child_started)?),
                    other => {
                        return Err(ServiceError::malformed(
                            "filter",
                            format!("unexpected node <{}>", String::from_utf8_lossy(other)),
                        ));
                    }
                }
            }
        }
        Ok(node)
    }

    fn parse_condition(&mut self, start: BytesStart<'a>, started: bool) -> Result<Condition> {
        let mut attribute = None;
        let mut operator = None;
        let mut values: Vec<Value> = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| ServiceError::malformed("condition", e.to_string()))?;
            let value = attr_text(&attr, "condition")?;
            match attr.key.as_ref() {
                b"attribute" => attribute = Some(value),
                b"operator" => {
                    operator = Some(ConditionOperator::from_name(&value).ok_or_else(|| {
                        ServiceError::malformed(
                            "condition",
                            format!("unknown operator '{}'", value),
                        )
                    })?);
                }
                b"value" => values.push(Value::Text(value)),
                other => return Err(unknown_attribute("condition", other)),
            }
        }

        let mut children: Vec<Value> = Vec::new();
        if started {
            loop {
                match self.next()? {
                    Event::Start(e) if e.name().as_ref() == b"value" => {
                        children.push(Value::Text(self.read_text_until(b"value")?));
                    }
                    Event::Empty(e) if e.name().as_ref() == b"value" => {
                        children.push(Value::Text(String::new()));
                    }
                    Event::End(e) if e.name().as_ref() == b"condition" => break,
                    other => return Err(unexpected("condition", &other)),
                }
            }
        }
        if !children.is_empty() {
            if !values.is_empty() {
                return Err(ServiceError::malformed(
                    "condition",
                    "value attribute conflicts with value children",
                ));
            }
            values = children;
        }

        let attribute = attribute
            .ok_or_else(|| ServiceError::malformed("condition", "missing attribute name"))?;
        let operator =
            operator.ok_or_else(|| ServiceError::malformed("condition", "missing operator"))?;
        check_operand_count(operator, values.len())?;
        Ok(Condition::new(attribute, operator, values))
    }

    fn parse_link(&mut self, start: BytesStart<'a>, started: bool) -> Result<LinkNode> {
        let mut name = None;
        let mut from = None;
        let mut to = None;
        let mut alias = None;
        let mut join = JoinKind::Inner;
        for attr in start.attributes() {
            let attr = attr.map_err(|e| ServiceError::malformed("link", e.to_string()))?;
            let value = attr_text(&attr, "link")?;
            match attr.key.as_ref() {
                b"name" => name = Some(value),
                b"from" => from = Some(value),
                b"to" => to = Some(value),
                b"alias" => alias = Some(value),
                b"type" => {
                    join = JoinKind::from_name(&value).ok_or_else(|| {
                        ServiceError::malformed("link", format!("unknown join type '{}'", value))
                    })?;
                }
                other => return Err(unknown_attribute("link", other)),
            }
        }
        let name = name.ok_or_else(|| ServiceError::malformed("link", "missing name attribute"))?;
        let from = from.ok_or_else(|| ServiceError::malformed("link", "missing from attribute"))?;
        let to = to.ok_or_else(|| ServiceError::malformed("link", "missing to attribute"))?;

        let mut link = LinkNode::new(name, from, to);
        link.alias = alias;
        link.join = join;
        let mut columns: Vec<String> = Vec::new();
        let mut all_attributes = false;

        if started {
            loop {
                let (element, child_started) = match self.next()? {
                    Event::Start(e) => (e, true),
                    Event::Empty(e) => (e, false),
                    Event::End(e) if e.name().as_ref() == b"link" => break,
                    other => return Err(unexpected("link", &other)),
                };
                match element.name().as_ref() {
                    b"all-attributes" => {
                        all_attributes = true;
                        if child_started {
                            self.expect_end(b"all-attributes")?;
                        }
                    }
                    b"attribute" => match self.parse_attribute_element(element, child_started)? {
                        ParsedAttribute::Column(column) => columns.push(column),
                        _ => {
                            return Err(ServiceError::malformed(
                                "attribute",
                                "aggregate attributes belong on the root entity",
                            ));
                        }
                    },
                    b"filter" => {
                        if link.filter.is_some() {
                            return Err(ServiceError::malformed("link", "multiple filter nodes"));
                        }
                        link.filter = Some(self.parse_filter(element, child_started)?);
                    }
                    b"link" => link.links.push(self.parse_link(element, child_started)?),
                    other => {
                        return Err(ServiceError::malformed(
                            "link",
                            format!("unexpected node <{}>", String::from_utf8_lossy(other)),
                        ));
                    }
                }
            }
        }

        if all_attributes && !columns.is_empty() {
            return Err(ServiceError::malformed(
                "link",
                "all-attributes conflicts with an attribute list",
            ));
        }
        link.columns = if all_attributes {
            ColumnSet::All
        } else if !columns.is_empty() {
            ColumnSet::Columns(columns)
        } else {
            ColumnSet::None
        };
        Ok(link)
    }

    fn parse_order(&mut self, start: BytesStart<'a>, started: bool) -> Result<OrderKey> {
        let mut attribute = None;
        let mut descending = false;
        for attr in start.attributes() {
            let attr = attr.map_err(|e| ServiceError::malformed("order", e.to_string()))?;
            let value = attr_text(&attr, "order")?;
            match attr.key.as_ref() {
                b"attribute" => attribute = Some(value),
                b"descending" => descending = parse_bool(&value, "order")?,
                other => return Err(unknown_attribute("order", other)),
            }
        }
        if started {
            self.expect_end(b"order")?;
        }
        let attribute =
            attribute.ok_or_else(|| ServiceError::malformed("order", "missing attribute name"))?;
        Ok(OrderKey {
            attribute,
            descending,
        })
    }

    /// Next content event. Whitespace, comments and declarations are
    /// transparent; meaningful text is handed to the caller.
    fn next(&mut self) -> Result<Event<'a>> {
        loop {
            let event = self
                .reader
                .read_event()
                .map_err(|e| ServiceError::malformed("fetch", e.to_string()))?;
            match event {
                Event::Text(t) => {
                    let text = t
                        .unescape()
                        .map_err(|e| ServiceError::malformed("fetch", e.to_string()))?;
                    if text.trim().is_empty() {
                        continue;
                    }
                    return Ok(Event::Text(t));
                }
                Event::Comment(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_) => continue,
                other => return Ok(other),
            }
        }
    }

    /// Collect text content up to the matching end tag, whitespace kept.
    fn read_text_until(&mut self, name: &[u8]) -> Result<String> {
        let mut text = String::new();
        loop {
            let event = self
                .reader
                .read_event()
                .map_err(|e| ServiceError::malformed("value", e.to_string()))?;
            match event {
                Event::Text(t) => {
                    let chunk = t
                        .unescape()
                        .map_err(|e| ServiceError::malformed("value", e.to_string()))?;
                    text.push_str(&chunk);
                }
                Event::Comment(_) => continue,
                Event::End(e) if e.name().as_ref() == name => return Ok(text),
                other => return Err(unexpected("value", &other)),
            }
        }
    }

    fn expect_end(&mut self, name: &[u8]) -> Result<()> {
        let label = String::from_utf8_lossy(name).into_owned();
        match self.next()? {
            Event::End(e) if e.name().as_ref() == name => Ok(()),
            other => Err(unexpected(&label, &other)),
        }
    }
}

fn check_operand_count(operator: ConditionOperator, got: usize) -> Result<()> {
    let ok = match operator.expected_operands() {
        Some(expected) => got == expected,
        None => got >= 1,
    };
    if ok {
        Ok(())
    } else {
        Err(ServiceError::malformed(
            "condition",
            format!("operator '{}' cannot take {} value(s)", operator.name(), got),
        ))
    }
}

fn attr_text(attr: &Attribute, node: &str) -> Result<String> {
    attr.unescape_value()
        .map(|v| v.into_owned())
        .map_err(|e| ServiceError::malformed(node, e.to_string()))
}

fn parse_u32(value: &str, node: &str) -> Result<u32> {
    value
        .parse::<u32>()
        .map_err(|_| ServiceError::malformed(node, format!("invalid number '{}'", value)))
}

fn parse_bool(value: &str, node: &str) -> Result<bool> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(ServiceError::malformed(
            node,
            format!("invalid boolean '{}'", other),
        )),
    }
}

fn unknown_attribute(node: &str, key: &[u8]) -> ServiceError {
    ServiceError::malformed(
        node,
        format!("unknown attribute '{}'", String::from_utf8_lossy(key)),
    )
}

fn unexpected(node: &str, event: &Event) -> ServiceError {
    let label = match event {
        Event::Start(e) | Event::Empty(e) => {
            format!("<{}>", String::from_utf8_lossy(e.name().as_ref()))
        }
        Event::End(e) => format!("</{}>", String::from_utf8_lossy(e.name().as_ref())),
        Event::Text(_) => "text content".to_string(),
        Event::Eof => "end of document".to_string(),
        _ => "node".to_string(),
    };
    ServiceError::malformed(node, format!("unexpected {}", label))
}
