//! Request and response types for the closed command surface.

pub mod request;
pub mod response;

pub use request::{BatchRequest, QueryInput, Request};
pub use response::{
    BatchFault, BatchOutcome, BatchResult, CallerIdentity, Response, UpsertResult,
};
