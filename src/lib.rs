// ============================================================================
// memcrm Library
// ============================================================================

pub mod bulk;
pub mod command;
pub mod core;
pub mod executor;
pub mod facade;
pub mod fetch;
pub mod prelude;
pub mod query;
pub mod schema;
pub mod store;

// Re-export main types for convenience
pub use command::{BatchRequest, QueryInput, Request, Response};
pub use core::{Record, RecordRef, Result, ServiceError, Value};
pub use facade::RecordService;
pub use fetch::{parse_document, render_document};
pub use query::{ColumnSet, QueryTree, RecordSet};
pub use schema::SchemaCatalog;
pub use store::{ServiceOptions, StoreRegistry};
