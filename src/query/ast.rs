use crate::core::{Record, Value};

/// Which attributes a query or a link contributes to result rows.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ColumnSet {
    #[default]
    All,
    /// Identity only.
    None,
    Columns(Vec<String>),
}

impl ColumnSet {
    pub fn columns(names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::Columns(names.into_iter().map(Into::into).collect())
    }

    /// Strips attributes not selected. The primary key and columns
    /// namespaced by a link alias always survive.
    pub fn project(&self, mut record: Record, primary_key: &str) -> Record {
        match self {
            Self::All => record,
            Self::None => {
                record
                    .attributes
                    .retain(|name, _| name == primary_key || name.contains('.'));
                record
            }
            Self::Columns(list) => {
                record.attributes.retain(|name, _| {
                    name == primary_key || name.contains('.') || list.iter().any(|c| c == name)
                });
                record
            }
        }
    }
}

/// How a filter combines its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    And,
    Or,
}

impl FilterType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "and" => Some(Self::And),
            "or" => Some(Self::Or),
            _ => None,
        }
    }
}

/// Comparison applied by a leaf condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionOperator {
    Equal,
    NotEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    Like,
    NotLike,
    In,
    NotIn,
    Null,
    NotNull,
    Between,
    NotBetween,
    BeginsWith,
    EndsWith,
}

impl ConditionOperator {
    /// Document-form name of the operator.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Equal => "eq",
            Self::NotEqual => "ne",
            Self::Greater => "gt",
            Self::GreaterEqual => "ge",
            Self::Less => "lt",
            Self::LessEqual => "le",
            Self::Like => "like",
            Self::NotLike => "not-like",
            Self::In => "in",
            Self::NotIn => "not-in",
            Self::Null => "null",
            Self::NotNull => "not-null",
            Self::Between => "between",
            Self::NotBetween => "not-between",
            Self::BeginsWith => "begins-with",
            Self::EndsWith => "ends-with",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "eq" => Some(Self::Equal),
            "ne" => Some(Self::NotEqual),
            "gt" => Some(Self::Greater),
            "ge" => Some(Self::GreaterEqual),
            "lt" => Some(Self::Less),
            "le" => Some(Self::LessEqual),
            "like" => Some(Self::Like),
            "not-like" => Some(Self::NotLike),
            "in" => Some(Self::In),
            "not-in" => Some(Self::NotIn),
            "null" => Some(Self::Null),
            "not-null" => Some(Self::NotNull),
            "between" => Some(Self::Between),
            "not-between" => Some(Self::NotBetween),
            "begins-with" => Some(Self::BeginsWith),
            "ends-with" => Some(Self::EndsWith),
            _ => None,
        }
    }

    /// Operand count the operator expects, None when variable.
    pub fn expected_operands(&self) -> Option<usize> {
        match self {
            Self::Null | Self::NotNull => Some(0),
            Self::Between | Self::NotBetween => Some(2),
            Self::In | Self::NotIn => None,
            _ => Some(1),
        }
    }
}

/// Leaf test against one attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub attribute: String,
    pub operator: ConditionOperator,
    pub values: Vec<Value>,
}

impl Condition {
    pub fn new(
        attribute: impl Into<String>,
        operator: ConditionOperator,
        values: Vec<Value>,
    ) -> Self {
        Self {
            attribute: attribute.into(),
            operator,
            values,
        }
    }

    pub fn single(
        attribute: impl Into<String>,
        operator: ConditionOperator,
        value: impl Into<Value>,
    ) -> Self {
        Self::new(attribute, operator, vec![value.into()])
    }

    pub fn equal(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::single(attribute, ConditionOperator::Equal, value)
    }

    pub fn null(attribute: impl Into<String>) -> Self {
        Self::new(attribute, ConditionOperator::Null, Vec::new())
    }

    pub fn not_null(attribute: impl Into<String>) -> Self {
        Self::new(attribute, ConditionOperator::NotNull, Vec::new())
    }
}

/// Recursive AND/OR node holding leaf conditions and nested filters.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterNode {
    pub filter_type: FilterType,
    pub conditions: Vec<Condition>,
    pub filters: Vec<FilterNode>,
}

impl FilterNode {
    pub fn and() -> Self {
        Self {
            filter_type: FilterType::And,
            conditions: Vec::new(),
            filters: Vec::new(),
        }
    }

    pub fn or() -> Self {
        Self {
            filter_type: FilterType::Or,
            conditions: Vec::new(),
            filters: Vec::new(),
        }
    }

    pub fn condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn filter(mut self, filter: FilterNode) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty() && self.filters.is_empty()
    }
}

/// Join flavor of a link node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinKind {
    #[default]
    Inner,
    Outer,
}

impl JoinKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Inner => "inner",
            Self::Outer => "outer",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "inner" => Some(Self::Inner),
            "outer" => Some(Self::Outer),
            _ => None,
        }
    }
}

/// Nested join: `from` names the linked type's field, `to` the parent's.
/// Columns the link contributes land under `alias.field`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkNode {
    pub entity: String,
    pub from: String,
    pub to: String,
    pub alias: Option<String>,
    pub join: JoinKind,
    pub columns: ColumnSet,
    pub filter: Option<FilterNode>,
    pub links: Vec<LinkNode>,
}

impl LinkNode {
    pub fn new(entity: impl Into<String>, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            from: from.into(),
            to: to.into(),
            alias: None,
            join: JoinKind::Inner,
            columns: ColumnSet::None,
            filter: None,
            links: Vec::new(),
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn outer(mut self) -> Self {
        self.join = JoinKind::Outer;
        self
    }

    pub fn columns(mut self, columns: ColumnSet) -> Self {
        self.columns = columns;
        self
    }

    pub fn filter(mut self, filter: FilterNode) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn link(mut self, link: LinkNode) -> Self {
        self.links.push(link);
        self
    }

    /// Namespace prefix for contributed columns.
    pub fn effective_alias(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.entity)
    }
}

/// One sort key; multi-key sorts list several in priority order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderKey {
    pub attribute: String,
    pub descending: bool,
}

impl OrderKey {
    pub fn asc(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            descending: false,
        }
    }

    pub fn desc(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            descending: true,
        }
    }
}

/// 1-based page slice. Reapplying the same cursor over an unchanged store
/// re-derives the same slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagingInfo {
    pub page: u32,
    pub count: u32,
}

impl PagingInfo {
    pub fn new(page: u32, count: u32) -> Self {
        Self { page, count }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateOp {
    Count,
    CountColumn,
    Sum,
    Min,
    Max,
    Avg,
}

impl AggregateOp {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::CountColumn => "countcolumn",
            Self::Sum => "sum",
            Self::Min => "min",
            Self::Max => "max",
            Self::Avg => "avg",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "count" => Some(Self::Count),
            "countcolumn" => Some(Self::CountColumn),
            "sum" => Some(Self::Sum),
            "min" => Some(Self::Min),
            "max" => Some(Self::Max),
            "avg" => Some(Self::Avg),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateExpr {
    pub attribute: String,
    pub alias: String,
    pub op: AggregateOp,
}

impl AggregateExpr {
    pub fn new(attribute: impl Into<String>, alias: impl Into<String>, op: AggregateOp) -> Self {
        Self {
            attribute: attribute.into(),
            alias: alias.into(),
            op,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupByExpr {
    pub attribute: String,
    pub alias: String,
}

impl GroupByExpr {
    pub fn new(attribute: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            alias: alias.into(),
        }
    }
}

/// Structured query over one root record type.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryTree {
    pub entity: String,
    pub columns: ColumnSet,
    pub filter: Option<FilterNode>,
    pub links: Vec<LinkNode>,
    pub order: Vec<OrderKey>,
    pub paging: Option<PagingInfo>,
    pub aggregates: Vec<AggregateExpr>,
    pub group_by: Vec<GroupByExpr>,
}

impl QueryTree {
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            columns: ColumnSet::All,
            filter: None,
            links: Vec::new(),
            order: Vec::new(),
            paging: None,
            aggregates: Vec::new(),
            group_by: Vec::new(),
        }
    }

    pub fn columns(mut self, columns: ColumnSet) -> Self {
        self.columns = columns;
        self
    }

    pub fn filter(mut self, filter: FilterNode) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn link(mut self, link: LinkNode) -> Self {
        self.links.push(link);
        self
    }

    pub fn order_by(mut self, key: OrderKey) -> Self {
        self.order.push(key);
        self
    }

    pub fn page(mut self, page: u32, count: u32) -> Self {
        self.paging = Some(PagingInfo::new(page, count));
        self
    }

    pub fn aggregate(mut self, expr: AggregateExpr) -> Self {
        self.aggregates.push(expr);
        self
    }

    pub fn group(mut self, expr: GroupByExpr) -> Self {
        self.group_by.push(expr);
        self
    }

    /// Aggregate mode replaces row output with grouped computations.
    pub fn is_aggregate(&self) -> bool {
        !self.aggregates.is_empty() || !self.group_by.is_empty()
    }
}
