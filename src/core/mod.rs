pub mod error;
pub mod record;
pub mod value;

pub use error::{Result, ServiceError};
pub use record::{fields, Record, RecordRef};
pub use value::Value;
