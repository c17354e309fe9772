use std::collections::BTreeMap;

use uuid::Uuid;

use crate::core::{Record, RecordRef, Value};
use crate::query::{ColumnSet, QueryTree};

// ==================== Query Input ====================

/// Input accepted by `RetrieveMultiple`: either a programmatic query tree
/// or a declarative XML document that is parsed before evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryInput {
    Tree(QueryTree),
    Document(String),
}

impl From<QueryTree> for QueryInput {
    fn from(tree: QueryTree) -> Self {
        QueryInput::Tree(tree)
    }
}

impl From<String> for QueryInput {
    fn from(document: String) -> Self {
        QueryInput::Document(document)
    }
}

impl From<&str> for QueryInput {
    fn from(document: &str) -> Self {
        QueryInput::Document(document.to_string())
    }
}

// ==================== Batch Request ====================

/// An ordered sequence of requests executed as one unit. Item failures are
/// captured as data instead of aborting the caller; completed items are
/// never rolled back.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRequest {
    pub requests: Vec<Request>,
    /// Keep executing after a faulted item instead of stopping at it.
    pub continue_on_error: bool,
    /// Record the response payload of successful items.
    pub return_responses: bool,
}

impl BatchRequest {
    pub fn new(requests: Vec<Request>) -> Self {
        BatchRequest {
            requests,
            continue_on_error: false,
            return_responses: true,
        }
    }

    pub fn continue_on_error(mut self, value: bool) -> Self {
        self.continue_on_error = value;
        self
    }

    pub fn return_responses(mut self, value: bool) -> Self {
        self.return_responses = value;
        self
    }
}

// ==================== Request ====================

/// The closed command surface. Every operation the service performs is a
/// variant here; dispatch is one exhaustive `match`, so an unhandled
/// command is impossible to represent short of `Custom`, which always
/// raises `UnsupportedCommand`.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Create(Record),
    Update(Record),
    Delete {
        entity: String,
        id: Uuid,
    },
    Retrieve {
        entity: String,
        id: Uuid,
        columns: ColumnSet,
    },
    RetrieveMultiple(QueryInput),
    Associate {
        entity: String,
        id: Uuid,
        relationship: String,
        related: Vec<RecordRef>,
    },
    Disassociate {
        entity: String,
        id: Uuid,
        relationship: String,
        related: Vec<RecordRef>,
    },
    SetState {
        entity: String,
        id: Uuid,
        state: i64,
        status: i64,
    },
    Assign {
        entity: String,
        id: Uuid,
        owner: Uuid,
    },
    Upsert(Record),
    ExecuteBatch(BatchRequest),
    DescribeEntity(String),
    DescribeAttribute {
        entity: String,
        attribute: String,
    },
    DescribeChoices(String),
    WhoAmI,
    /// Escape hatch for callers that speak commands this service does not
    /// implement. Always rejected by the dispatcher.
    Custom {
        name: String,
        parameters: BTreeMap<String, Value>,
    },
}

impl Request {
    /// Short label used in logs and batch fault details.
    pub fn kind(&self) -> &'static str {
        match self {
            Request::Create(_) => "create",
            Request::Update(_) => "update",
            Request::Delete { .. } => "delete",
            Request::Retrieve { .. } => "retrieve",
            Request::RetrieveMultiple(_) => "retrieve-multiple",
            Request::Associate { .. } => "associate",
            Request::Disassociate { .. } => "disassociate",
            Request::SetState { .. } => "set-state",
            Request::Assign { .. } => "assign",
            Request::Upsert(_) => "upsert",
            Request::ExecuteBatch(_) => "execute-batch",
            Request::DescribeEntity(_) => "describe-entity",
            Request::DescribeAttribute { .. } => "describe-attribute",
            Request::DescribeChoices(_) => "describe-choices",
            Request::WhoAmI => "who-am-i",
            Request::Custom { .. } => "custom",
        }
    }
}
