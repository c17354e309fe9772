//! One-line import for tests and application code.
//!
//! Brings in the service facade, the record and value types, the schema
//! builders, and the query surface.

pub use crate::command::{
    BatchFault, BatchOutcome, BatchRequest, BatchResult, CallerIdentity, QueryInput, Request,
    Response, UpsertResult,
};
pub use crate::core::{fields, Record, RecordRef, Result, ServiceError, Value};
pub use crate::facade::RecordService;
pub use crate::fetch::{parse_document, render_document};
pub use crate::query::{
    AggregateExpr, AggregateOp, ColumnSet, Condition, ConditionOperator, FilterNode, FilterType,
    GroupByExpr, JoinKind, LinkNode, OrderKey, PagingInfo, QueryTree, RecordSet,
};
pub use crate::schema::{
    ActiveStatePolicy, AttributeDescriptor, AttributeKind, ChoiceList, EntityDescriptor,
    NamePartsSpec, RelationshipDef, RelationshipSide, SchemaCatalog,
};
pub use crate::store::{RecordStore, ServiceOptions, StoreRegistry};
